//! Observation and reward transformations that wrap an [`Environment`](crate::env::Environment).

mod action;
mod layout;
mod normalize;
mod reward;
mod skip_frames;
mod tiers;

pub use action::RemoveNoop;
pub use layout::{ChannelFirst, ChannelWiseFrameStack, FrameStack};
pub use normalize::Normalize;
pub use reward::{
    DEFAULT_STOP_REWARD, DEFAULT_SURVIVAL_REWARD, ProgressiveReward, ROUND_WIN_REWARD,
    StopOnRoundEnd, SurvivalReward,
};
pub use skip_frames::{SkipRedundantFrames, TOP_CROP};
pub use tiers::{RewardTier, RewardTierTable, SURVIVAL_TIERS};

/// Access to the environment a wrapper delegates to.
pub trait Wrapper {
    type Inner;

    fn inner(&self) -> &Self::Inner;

    fn inner_mut(&mut self) -> &mut Self::Inner;

    fn into_inner(self) -> Self::Inner;
}
