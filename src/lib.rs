//! Pixel-observation networks and environment wrappers for arcade reinforcement learning.

pub mod env;
pub mod error;
pub mod models;
pub mod observation;
pub mod space;
pub mod surround;
pub mod wrappers;

pub use crate::env::{EnvExt, Environment, Info, Reset, Step};
pub use crate::error::{ConfigError, EnvError};
pub use crate::models::{
    CnnBackbone, CnnBackboneConfig, ResNetExtractor, ResNetExtractorConfig, ResidualBlock,
    ResidualBlockConfig, observations_to_tensor,
};
pub use crate::observation::Observation;
pub use crate::space::{BoxSpace, Discrete, Dtype};
pub use crate::surround::{Surround, SurroundBuilder, SurroundConfig};
pub use crate::wrappers::{
    ChannelFirst, ChannelWiseFrameStack, FrameStack, Normalize, ProgressiveReward, RemoveNoop,
    RewardTierTable, SkipRedundantFrames, StopOnRoundEnd, SurvivalReward, Wrapper,
};
