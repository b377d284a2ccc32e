//! Environment contract shared by simulators and every wrapper in the pipeline.

use std::collections::BTreeMap;

use crate::error::{ConfigError, EnvError};
use crate::observation::Observation;
use crate::space::{BoxSpace, Discrete};
use crate::wrappers::{
    ChannelFirst, ChannelWiseFrameStack, FrameStack, Normalize, ProgressiveReward, RemoveNoop,
    SkipRedundantFrames, StopOnRoundEnd, SurvivalReward,
};

/// Auxiliary diagnostics reported alongside an observation.
pub type Info = BTreeMap<String, f64>;

/// Result of resetting an environment.
#[derive(Clone, Debug, PartialEq)]
pub struct Reset {
    pub observation: Observation,
    pub info: Info,
}

/// Result of a single environment transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub observation: Observation,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

impl Step {
    /// True when either the episode terminated or was truncated.
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Steppable simulation environment.
///
/// Wrappers own their inner environment and implement this same trait, so a pipeline is
/// a nest of owned values that is stepped from the outside in.
pub trait Environment {
    fn observation_space(&self) -> &BoxSpace;

    fn action_space(&self) -> Discrete;

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError>;

    fn step(&mut self, action: usize) -> Result<Step, EnvError>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn observation_space(&self) -> &BoxSpace {
        (**self).observation_space()
    }

    fn action_space(&self) -> Discrete {
        (**self).action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        (**self).reset(seed)
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        (**self).step(action)
    }
}

/// Chaining helpers for assembling a wrapper pipeline.
pub trait EnvExt: Environment + Sized {
    fn survival_reward(self, reward: f64) -> SurvivalReward<Self> {
        SurvivalReward::with_reward(self, reward)
    }

    fn stop_on_round_end(self, stop_reward: f64) -> StopOnRoundEnd<Self> {
        StopOnRoundEnd::with_stop_reward(self, stop_reward)
    }

    fn progressive_reward(self, base_survival_reward: f64) -> ProgressiveReward<Self> {
        ProgressiveReward::with_base_reward(self, base_survival_reward)
    }

    fn channel_first(self) -> Result<ChannelFirst<Self>, ConfigError> {
        ChannelFirst::new(self)
    }

    fn normalize(self) -> Normalize<Self> {
        Normalize::new(self)
    }

    fn frame_stack(self, frames: usize) -> Result<FrameStack<Self>, ConfigError> {
        FrameStack::new(self, frames)
    }

    fn channel_wise_frame_stack(self) -> Result<ChannelWiseFrameStack<Self>, ConfigError> {
        ChannelWiseFrameStack::new(self)
    }

    fn remove_noop(self) -> Result<RemoveNoop<Self>, ConfigError> {
        RemoveNoop::new(self)
    }

    fn skip_redundant_frames(self) -> SkipRedundantFrames<Self> {
        SkipRedundantFrames::new(self)
    }

    fn boxed(self) -> Box<dyn Environment>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<E: Environment> EnvExt for E {}
