use crate::env::{Environment, Reset, Step};
use crate::error::EnvError;
use crate::observation::Observation;
use crate::space::{BoxSpace, Discrete, Dtype};

use super::Wrapper;

const PIXEL_SCALE: f32 = 255.0;

/// Rescales pixel intensities into `[0, 1]` floats.
pub struct Normalize<E> {
    env: E,
    observation_space: BoxSpace,
}

impl<E: Environment> Normalize<E> {
    pub fn new(env: E) -> Self {
        let observation_space =
            BoxSpace::new(env.observation_space().shape.clone(), 0.0, 1.0, Dtype::F32);
        Self {
            env,
            observation_space,
        }
    }
}

fn normalize(observation: Observation) -> Observation {
    match observation {
        Observation::U8(array) => {
            Observation::F32(array.mapv(|value| f32::from(value) / PIXEL_SCALE))
        }
        Observation::F32(array) => Observation::F32(array.mapv_into(|value| value / PIXEL_SCALE)),
    }
}

impl<E: Environment> Environment for Normalize<E> {
    fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }

    fn action_space(&self) -> Discrete {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        let reset = self.env.reset(seed)?;
        Ok(Reset {
            observation: normalize(reset.observation),
            info: reset.info,
        })
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        let step = self.env.step(action)?;
        Ok(Step {
            observation: normalize(step.observation),
            ..step
        })
    }
}

impl<E: Environment> Wrapper for Normalize<E> {
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
