use crate::env::{Environment, Reset, Step};
use crate::error::EnvError;
use crate::space::{BoxSpace, Discrete};

use super::Wrapper;
use super::tiers::{RewardTierTable, SURVIVAL_TIERS};

pub const DEFAULT_SURVIVAL_REWARD: f64 = 0.0001;
pub const DEFAULT_STOP_REWARD: f64 = 1.0;
/// Reward reported in place of a won round by [`ProgressiveReward`].
pub const ROUND_WIN_REWARD: f64 = 100.0;

/// Adds a small constant to the reward of every step that does not terminate the episode.
pub struct SurvivalReward<E> {
    env: E,
    survival_reward: f64,
}

impl<E: Environment> SurvivalReward<E> {
    pub fn new(env: E) -> Self {
        Self::with_reward(env, DEFAULT_SURVIVAL_REWARD)
    }

    pub fn with_reward(env: E, survival_reward: f64) -> Self {
        Self {
            env,
            survival_reward,
        }
    }

    pub fn survival_reward(&self) -> f64 {
        self.survival_reward
    }
}

impl<E: Environment> Environment for SurvivalReward<E> {
    fn observation_space(&self) -> &BoxSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> Discrete {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        self.env.reset(seed)
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        let mut step = self.env.step(action)?;
        if !step.terminated {
            step.reward += self.survival_reward;
        }
        Ok(step)
    }
}

impl<E: Environment> Wrapper for SurvivalReward<E> {
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

/// Ends the episode on a round-deciding reward in multi-round games.
///
/// Matches on the absolute value so games that report a lost round as a negative reward
/// stop as well.
pub struct StopOnRoundEnd<E> {
    env: E,
    stop_reward: f64,
}

impl<E: Environment> StopOnRoundEnd<E> {
    pub fn new(env: E) -> Self {
        Self::with_stop_reward(env, DEFAULT_STOP_REWARD)
    }

    pub fn with_stop_reward(env: E, stop_reward: f64) -> Self {
        Self { env, stop_reward }
    }

    pub fn stop_reward(&self) -> f64 {
        self.stop_reward
    }
}

impl<E: Environment> Environment for StopOnRoundEnd<E> {
    fn observation_space(&self) -> &BoxSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> Discrete {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        self.env.reset(seed)
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        let mut step = self.env.step(action)?;
        if step.reward.abs() == self.stop_reward {
            step.terminated = true;
        }
        Ok(step)
    }
}

impl<E: Environment> Wrapper for StopOnRoundEnd<E> {
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

/// Piecewise survival bonus that grows with the number of steps survived in a round.
///
/// A step with `|reward| == 1` closes the round: the step counter restarts and a won round
/// is reported as [`ROUND_WIN_REWARD`]. Every other step earns
/// `base_survival_reward * tier multiplier` on top of the raw reward.
pub struct ProgressiveReward<E> {
    env: E,
    base_survival_reward: f64,
    tiers: RewardTierTable,
    total_steps: u64,
    round_steps: u64,
    rounds: u64,
}

impl<E: Environment> ProgressiveReward<E> {
    pub fn new(env: E) -> Self {
        Self::with_base_reward(env, DEFAULT_SURVIVAL_REWARD)
    }

    pub fn with_base_reward(env: E, base_survival_reward: f64) -> Self {
        Self {
            env,
            base_survival_reward,
            tiers: SURVIVAL_TIERS,
            total_steps: 0,
            round_steps: 0,
            rounds: 0,
        }
    }

    pub fn with_tiers(mut self, tiers: RewardTierTable) -> Self {
        self.tiers = tiers;
        self
    }

    /// Bonus earned by a step taken after `steps` steps of the current round.
    pub fn survival_bonus(&self, steps: u64) -> f64 {
        self.base_survival_reward * self.tiers.multiplier(steps)
    }

    pub fn round_steps(&self) -> u64 {
        self.round_steps
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }
}

impl<E: Environment> Environment for ProgressiveReward<E> {
    fn observation_space(&self) -> &BoxSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> Discrete {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        self.round_steps = 0;
        self.rounds = 0;
        self.env.reset(seed)
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        let mut step = self.env.step(action)?;
        if step.reward.abs() == 1.0 {
            self.round_steps = 0;
            self.rounds += 1;
            if step.reward == 1.0 {
                step.reward = ROUND_WIN_REWARD;
                log::info!(
                    "round {} won after {} total steps",
                    self.rounds,
                    self.total_steps + 1
                );
            }
        } else {
            step.reward += self.survival_bonus(self.round_steps);
            self.round_steps += 1;
        }
        self.total_steps += 1;
        Ok(step)
    }
}

impl<E: Environment> Wrapper for ProgressiveReward<E> {
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
