use std::collections::VecDeque;

use crate::env::{Environment, Reset, Step};
use crate::error::{ConfigError, EnvError};
use crate::observation::Observation;
use crate::space::{BoxSpace, Discrete};

use super::Wrapper;

fn expect_rank(space: &BoxSpace, expected: usize) -> Result<(), ConfigError> {
    if space.shape.len() == expected {
        Ok(())
    } else {
        Err(ConfigError::ObservationRank {
            expected,
            shape: space.shape.clone(),
        })
    }
}

fn expect_shape(observation: &Observation, expected: &[usize]) -> Result<(), EnvError> {
    if observation.shape() == expected {
        Ok(())
    } else {
        Err(EnvError::ObservationShape {
            expected: expected.to_vec(),
            actual: observation.shape().to_vec(),
        })
    }
}

/// Moves the channel axis of `(height, width, channels)` images to the front.
pub struct ChannelFirst<E> {
    env: E,
    input_shape: Vec<usize>,
    observation_space: BoxSpace,
}

impl<E: Environment> ChannelFirst<E> {
    pub fn new(env: E) -> Result<Self, ConfigError> {
        let inner = env.observation_space();
        expect_rank(inner, 3)?;
        let input_shape = inner.shape.clone();
        let observation_space =
            inner.with_shape(vec![input_shape[2], input_shape[0], input_shape[1]]);
        Ok(Self {
            env,
            input_shape,
            observation_space,
        })
    }

    fn transform(&self, observation: Observation) -> Result<Observation, EnvError> {
        expect_shape(&observation, &self.input_shape)?;
        Ok(observation.permuted(&[2, 0, 1]))
    }
}

impl<E: Environment> Environment for ChannelFirst<E> {
    fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }

    fn action_space(&self) -> Discrete {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        let reset = self.env.reset(seed)?;
        Ok(Reset {
            observation: self.transform(reset.observation)?,
            info: reset.info,
        })
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        let step = self.env.step(action)?;
        Ok(Step {
            observation: self.transform(step.observation)?,
            ..step
        })
    }
}

impl<E: Environment> Wrapper for ChannelFirst<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn into_inner(self) -> E {
        self.env
    }
}

/// Keeps the last `frames` observations and emits them stacked along a new leading axis.
///
/// After a reset every slot holds the reset observation.
pub struct FrameStack<E> {
    env: E,
    frames: usize,
    history: VecDeque<Observation>,
    observation_space: BoxSpace,
}

impl<E: Environment> FrameStack<E> {
    pub fn new(env: E, frames: usize) -> Result<Self, ConfigError> {
        if frames == 0 {
            return Err(ConfigError::NonPositive("frames"));
        }
        let inner = env.observation_space();
        let mut shape = Vec::with_capacity(inner.shape.len() + 1);
        shape.push(frames);
        shape.extend_from_slice(&inner.shape);
        let observation_space = inner.with_shape(shape);
        Ok(Self {
            env,
            frames,
            history: VecDeque::with_capacity(frames),
            observation_space,
        })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    fn stacked(&mut self) -> Result<Observation, EnvError> {
        Observation::stack(self.history.make_contiguous())
    }
}

impl<E: Environment> Environment for FrameStack<E> {
    fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }

    fn action_space(&self) -> Discrete {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        let reset = self.env.reset(seed)?;
        self.history.clear();
        self.history
            .extend(std::iter::repeat_n(reset.observation, self.frames));
        Ok(Reset {
            observation: self.stacked()?,
            info: reset.info,
        })
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        if self.history.is_empty() {
            return Err(EnvError::NeedsReset);
        }
        let step = self.env.step(action)?;
        if self.history.len() == self.frames {
            self.history.pop_front();
        }
        self.history.push_back(step.observation);
        Ok(Step {
            observation: self.stacked()?,
            reward: step.reward,
            terminated: step.terminated,
            truncated: step.truncated,
            info: step.info,
        })
    }
}

impl<E: Environment> Wrapper for FrameStack<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn into_inner(self) -> E {
        self.env
    }
}

/// Folds a `(frames, channels, height, width)` stack into `(frames * channels, height, width)`.
///
/// Axes are first reordered to `(frames, height, width, channels)` and the buffer is then
/// reinterpreted in row-major order.
pub struct ChannelWiseFrameStack<E> {
    env: E,
    input_shape: Vec<usize>,
    observation_space: BoxSpace,
}

impl<E: Environment> ChannelWiseFrameStack<E> {
    pub fn new(env: E) -> Result<Self, ConfigError> {
        let inner = env.observation_space();
        expect_rank(inner, 4)?;
        let input_shape = inner.shape.clone();
        let [frames, channels, height, width] = [
            input_shape[0],
            input_shape[1],
            input_shape[2],
            input_shape[3],
        ];
        let observation_space = inner.with_shape(vec![frames * channels, height, width]);
        Ok(Self {
            env,
            input_shape,
            observation_space,
        })
    }

    fn transform(&self, observation: Observation) -> Result<Observation, EnvError> {
        expect_shape(&observation, &self.input_shape)?;
        observation
            .permuted(&[0, 2, 3, 1])
            .reshaped(&self.observation_space.shape)
    }
}

impl<E: Environment> Environment for ChannelWiseFrameStack<E> {
    fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }

    fn action_space(&self) -> Discrete {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        let reset = self.env.reset(seed)?;
        Ok(Reset {
            observation: self.transform(reset.observation)?,
            info: reset.info,
        })
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        let step = self.env.step(action)?;
        Ok(Step {
            observation: self.transform(step.observation)?,
            ..step
        })
    }
}

impl<E: Environment> Wrapper for ChannelWiseFrameStack<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn into_inner(self) -> E {
        self.env
    }
}
