use crate::env::{Environment, Reset, Step};
use crate::error::{ConfigError, EnvError};
use crate::space::{BoxSpace, Discrete};

use super::Wrapper;

/// Hides action 0 (no-op) by shifting every action index up by one.
pub struct RemoveNoop<E> {
    env: E,
    action_space: Discrete,
}

impl<E: Environment> RemoveNoop<E> {
    pub fn new(env: E) -> Result<Self, ConfigError> {
        let inner = env.action_space();
        if inner.n < 2 {
            return Err(ConfigError::Environment(
                "removing the no-op requires at least two actions",
            ));
        }
        Ok(Self {
            env,
            action_space: Discrete::new(inner.n - 1),
        })
    }
}

impl<E: Environment> Environment for RemoveNoop<E> {
    fn observation_space(&self) -> &BoxSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> Discrete {
        self.action_space
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        self.env.reset(seed)
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        if !self.action_space.contains(action) {
            return Err(EnvError::InvalidAction {
                action,
                n: self.action_space.n,
            });
        }
        self.env.step(action + 1)
    }
}

impl<E: Environment> Wrapper for RemoveNoop<E> {
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
