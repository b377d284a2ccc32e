use crate::env::{Environment, Reset, Step};
use crate::error::EnvError;
use crate::observation::Observation;
use crate::space::{BoxSpace, Discrete};

use super::Wrapper;

/// Leading rows excluded from the comparison; Surround flickers an indicator there.
pub const TOP_CROP: usize = 5;

/// Repeats the last action while the observation does not change.
///
/// Some emulated games stall for a varying number of frames between real updates. Rather
/// than skipping a fixed number of frames, the inner environment is stepped with the same
/// action until the observation (below the top [`TOP_CROP`] rows) differs from the previous
/// one or the episode ends. Only the final transition is reported.
pub struct SkipRedundantFrames<E> {
    env: E,
    previous: Option<Observation>,
    top_crop: usize,
    max_repeats: Option<usize>,
    repeats: usize,
}

impl<E: Environment> SkipRedundantFrames<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            previous: None,
            top_crop: TOP_CROP,
            max_repeats: None,
            repeats: 0,
        }
    }

    pub fn with_top_crop(mut self, rows: usize) -> Self {
        self.top_crop = rows;
        self
    }

    /// Caps the extra inner steps per call. Unbounded by default.
    pub fn with_max_repeats(mut self, limit: usize) -> Self {
        self.max_repeats = Some(limit);
        self
    }

    /// Extra inner steps taken during the most recent call to `step`.
    pub fn last_repeats(&self) -> usize {
        self.repeats
    }

    fn unchanged(&self, observation: &Observation) -> bool {
        self.previous
            .as_ref()
            .is_some_and(|previous| observation.allclose_skipping(previous, self.top_crop))
    }
}

impl<E: Environment> Environment for SkipRedundantFrames<E> {
    fn observation_space(&self) -> &BoxSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> Discrete {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        let reset = self.env.reset(seed)?;
        self.previous = Some(reset.observation.clone());
        self.repeats = 0;
        Ok(reset)
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        let mut step = self.env.step(action)?;
        self.repeats = 0;
        while !step.is_done()
            && self.unchanged(&step.observation)
            && self.max_repeats.is_none_or(|limit| self.repeats < limit)
        {
            step = self.env.step(action)?;
            self.repeats += 1;
        }
        if self.repeats > 0 {
            log::trace!("skipped {} redundant frames", self.repeats);
        }
        self.previous = Some(step.observation.clone());
        Ok(step)
    }
}

impl<E: Environment> Wrapper for SkipRedundantFrames<E> {
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
