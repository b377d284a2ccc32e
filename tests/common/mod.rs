//! Scripted environment for exercising wrappers without a simulator.

use arcadenet::{BoxSpace, Discrete, Dtype, EnvError, Environment, Info, Observation, Reset, Step};

const DEFAULT_ACTIONS: usize = 5;

/// One transition replayed by [`ScriptedEnv`].
#[derive(Clone, Debug)]
pub struct ScriptedStep {
    pub observation: Observation,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

impl ScriptedStep {
    pub fn new(observation: Observation) -> Self {
        Self {
            observation,
            reward: 0.0,
            terminated: false,
            truncated: false,
        }
    }

    pub fn with_reward(mut self, reward: f64) -> Self {
        self.reward = reward;
        self
    }

    pub fn terminated(mut self) -> Self {
        self.terminated = true;
        self
    }
}

/// Replays a fixed list of transitions and records every action it receives.
///
/// Running past the end of the script is reported as a simulator failure.
#[derive(Clone, Debug)]
pub struct ScriptedEnv {
    observation_space: BoxSpace,
    action_space: Discrete,
    reset_observation: Observation,
    script: Vec<ScriptedStep>,
    cursor: usize,
    actions: Vec<usize>,
    resets: usize,
}

impl ScriptedEnv {
    pub fn new(reset_observation: Observation, observations: Vec<Observation>) -> Self {
        Self::from_steps(
            reset_observation,
            observations.into_iter().map(ScriptedStep::new).collect(),
        )
    }

    pub fn from_steps(reset_observation: Observation, script: Vec<ScriptedStep>) -> Self {
        let shape = reset_observation.shape().to_vec();
        let observation_space = match reset_observation.dtype() {
            Dtype::U8 => BoxSpace::pixels(shape),
            Dtype::F32 => BoxSpace::new(shape, 0.0, 1.0, Dtype::F32),
        };
        Self {
            observation_space,
            action_space: Discrete::new(DEFAULT_ACTIONS),
            reset_observation,
            script,
            cursor: 0,
            actions: Vec::new(),
            resets: 0,
        }
    }

    pub fn with_action_count(mut self, n: usize) -> Self {
        self.action_space = Discrete::new(n);
        self
    }

    /// Actions received by `step`, in call order.
    pub fn actions(&self) -> &[usize] {
        &self.actions
    }

    pub fn steps_taken(&self) -> usize {
        self.cursor
    }

    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl Environment for ScriptedEnv {
    fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }

    fn action_space(&self) -> Discrete {
        self.action_space
    }

    fn reset(&mut self, _seed: Option<u64>) -> Result<Reset, EnvError> {
        self.resets += 1;
        Ok(Reset {
            observation: self.reset_observation.clone(),
            info: Info::new(),
        })
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        if !self.action_space.contains(action) {
            return Err(EnvError::InvalidAction {
                action,
                n: self.action_space.n,
            });
        }
        self.actions.push(action);
        let Some(scripted) = self.script.get(self.cursor).cloned() else {
            return Err(EnvError::Simulator(
                format!("script exhausted after {} steps", self.cursor).into(),
            ));
        };
        self.cursor += 1;
        let mut info = Info::new();
        info.insert("frame".to_string(), self.cursor as f64);
        Ok(Step {
            observation: scripted.observation,
            reward: scripted.reward,
            terminated: scripted.terminated,
            truncated: scripted.truncated,
            info,
        })
    }
}
