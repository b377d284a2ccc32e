use ndarray::Array3;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::env::{Environment, Info, Reset, Step};
use crate::error::{ConfigError, EnvError};
use crate::observation::Observation;
use crate::space::{BoxSpace, Discrete};

const DEFAULT_SEED: u64 = 0x5EED_C1C1_E5EE_D5EE;
/// Rows at the top of every frame reserved for the score display and tick indicator.
pub const HUD_ROWS: usize = 5;
pub const ACTION_COUNT: usize = 5;
const MIN_GRID_WIDTH: usize = 8;
const MIN_GRID_HEIGHT: usize = 4;
const OPPONENT_TURN_CHANCE: f64 = 0.05;

const AGENT_TRAIL: [u8; 3] = [214, 92, 92];
const AGENT_HEAD: [u8; 3] = [255, 160, 160];
const OPPONENT_TRAIL: [u8; 3] = [84, 92, 214];
const OPPONENT_HEAD: [u8; 3] = [160, 170, 255];
const INDICATOR: [u8; 3] = [255, 255, 255];

/// Heading of a light cycle. Action indices follow the arcade layout:
/// 0 no-op, 1 up, 2 right, 3 left, 4 down.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Up,
    Right,
    Left,
    Down,
}

impl Direction {
    pub fn from_action(action: usize) -> Option<Self> {
        match action {
            1 => Some(Direction::Up),
            2 => Some(Direction::Right),
            3 => Some(Direction::Left),
            4 => Some(Direction::Down),
            _ => None,
        }
    }

    fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Settings for a Surround match.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SurroundConfig {
    pub grid_width: usize,
    pub grid_height: usize,
    pub cell_size: usize,
    pub frames_per_tick: usize,
    pub points_to_win: u32,
    pub max_frames: Option<usize>,
    pub seed: u64,
}

impl Default for SurroundConfig {
    fn default() -> Self {
        Self {
            grid_width: 40,
            grid_height: 20,
            cell_size: 4,
            frames_per_tick: 4,
            points_to_win: 10,
            max_frames: Some(108_000),
            seed: DEFAULT_SEED,
        }
    }
}

/// Builder for [`Surround`].
#[derive(Clone, Debug, Default)]
pub struct SurroundBuilder {
    config: SurroundConfig,
}

impl SurroundBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, width: usize, height: usize) -> Self {
        self.config.grid_width = width;
        self.config.grid_height = height;
        self
    }

    pub fn with_cell_size(mut self, cell_size: usize) -> Self {
        self.config.cell_size = cell_size;
        self
    }

    /// Number of rendered frames per game update. Frames in between only differ in the HUD.
    pub fn with_frames_per_tick(mut self, frames: usize) -> Self {
        self.config.frames_per_tick = frames;
        self
    }

    pub fn with_points_to_win(mut self, points: u32) -> Self {
        self.config.points_to_win = points;
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.config.max_frames = max_frames;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn build(self) -> Result<Surround, ConfigError> {
        Surround::new(self.config)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cell {
    Empty,
    Agent,
    Opponent,
}

#[derive(Clone, Copy, Debug)]
struct Cycle {
    row: usize,
    col: usize,
    heading: Direction,
}

/// Outcome of a single game tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TickOutcome {
    Running,
    AgentScored,
    OpponentScored,
    Draw,
}

/// Two-player light-cycle game rendered as an `(height, width, 3)` RGB frame.
///
/// The controlled cycle scores `+1` when the opponent crashes and `-1` when it crashes
/// itself; rounds restart until one side reaches `points_to_win`.
pub struct Surround {
    config: SurroundConfig,
    observation_space: BoxSpace,
    rng: StdRng,
    grid: Vec<Cell>,
    agent: Cycle,
    opponent: Cycle,
    pending: Option<Direction>,
    scores: [u32; 2],
    frame: usize,
    indicator_on: bool,
    started: bool,
    finished: bool,
}

impl Surround {
    pub fn builder() -> SurroundBuilder {
        SurroundBuilder::new()
    }

    pub fn new(config: SurroundConfig) -> Result<Self, ConfigError> {
        if config.grid_width < MIN_GRID_WIDTH || config.grid_height < MIN_GRID_HEIGHT {
            return Err(ConfigError::Environment("grid must be at least 8x4 cells"));
        }
        if config.cell_size == 0 {
            return Err(ConfigError::NonPositive("cell_size"));
        }
        if config.frames_per_tick == 0 {
            return Err(ConfigError::NonPositive("frames_per_tick"));
        }
        if config.points_to_win == 0 {
            return Err(ConfigError::NonPositive("points_to_win"));
        }
        let observation_space = BoxSpace::pixels(vec![
            HUD_ROWS + config.grid_height * config.cell_size,
            config.grid_width * config.cell_size,
            3,
        ]);
        let placeholder = Cycle {
            row: 0,
            col: 0,
            heading: Direction::Right,
        };
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            grid: vec![Cell::Empty; config.grid_width * config.grid_height],
            agent: placeholder,
            opponent: placeholder,
            pending: None,
            scores: [0, 0],
            frame: 0,
            indicator_on: false,
            started: false,
            finished: false,
            config,
            observation_space,
        })
    }

    pub fn config(&self) -> &SurroundConfig {
        &self.config
    }

    /// `[agent, opponent]` points in the current match.
    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.config.grid_width + col
    }

    fn start_round(&mut self) {
        self.grid.fill(Cell::Empty);
        let height = self.config.grid_height;
        let lane = height / 3;
        let jitter = self.rng.gen_range(0..=height / 6);
        let agent_row = lane.saturating_sub(jitter);
        let opponent_row = (height - 1 - lane + jitter).min(height - 1);
        self.agent = Cycle {
            row: agent_row,
            col: self.config.grid_width / 4,
            heading: Direction::Right,
        };
        self.opponent = Cycle {
            row: opponent_row,
            col: self.config.grid_width - 1 - self.config.grid_width / 4,
            heading: Direction::Left,
        };
        let agent_cell = self.index(self.agent.row, self.agent.col);
        let opponent_cell = self.index(self.opponent.row, self.opponent.col);
        self.grid[agent_cell] = Cell::Agent;
        self.grid[opponent_cell] = Cell::Opponent;
        self.pending = None;
    }

    fn next_cell(&self, cycle: &Cycle, heading: Direction) -> Option<(usize, usize)> {
        let (dr, dc) = heading.delta();
        let row = cycle.row.checked_add_signed(dr)?;
        let col = cycle.col.checked_add_signed(dc)?;
        (row < self.config.grid_height && col < self.config.grid_width).then_some((row, col))
    }

    fn is_free(&self, target: Option<(usize, usize)>) -> bool {
        target.is_some_and(|(row, col)| self.grid[self.index(row, col)] == Cell::Empty)
    }

    fn steer_opponent(&mut self) -> Direction {
        let current = self.opponent.heading;
        let turns = match current {
            Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
            Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        };
        let ahead_free = self.is_free(self.next_cell(&self.opponent, current));
        if ahead_free && !self.rng.gen_bool(OPPONENT_TURN_CHANCE) {
            return current;
        }
        let mut open: Vec<Direction> = turns
            .into_iter()
            .filter(|turn| self.is_free(self.next_cell(&self.opponent, *turn)))
            .collect();
        if ahead_free {
            open.push(current);
        }
        open.choose(&mut self.rng).copied().unwrap_or(current)
    }

    fn tick(&mut self) -> TickOutcome {
        if let Some(heading) = self.pending.take() {
            if heading != self.agent.heading.opposite() {
                self.agent.heading = heading;
            }
        }
        self.opponent.heading = self.steer_opponent();

        let agent_target = self.next_cell(&self.agent, self.agent.heading);
        let opponent_target = self.next_cell(&self.opponent, self.opponent.heading);
        let head_on = agent_target.is_some() && agent_target == opponent_target;
        let agent_crashed = head_on || !self.is_free(agent_target);
        let opponent_crashed = head_on || !self.is_free(opponent_target);

        match (agent_crashed, opponent_crashed) {
            (true, true) => TickOutcome::Draw,
            (true, false) => TickOutcome::OpponentScored,
            (false, true) => TickOutcome::AgentScored,
            (false, false) => {
                if let (Some((ar, ac)), Some((or, oc))) = (agent_target, opponent_target) {
                    self.agent.row = ar;
                    self.agent.col = ac;
                    self.opponent.row = or;
                    self.opponent.col = oc;
                    let agent_cell = self.index(ar, ac);
                    let opponent_cell = self.index(or, oc);
                    self.grid[agent_cell] = Cell::Agent;
                    self.grid[opponent_cell] = Cell::Opponent;
                }
                TickOutcome::Running
            }
        }
    }

    fn render(&self) -> Observation {
        let cell = self.config.cell_size;
        let shape = &self.observation_space.shape;
        let mut image = Array3::<u8>::zeros((shape[0], shape[1], shape[2]));

        let mut paint = |top: usize, left: usize, height: usize, width: usize, color: [u8; 3]| {
            for row in top..top + height {
                for col in left..left + width {
                    for (channel, value) in color.iter().enumerate() {
                        image[[row, col, channel]] = *value;
                    }
                }
            }
        };

        if self.indicator_on {
            paint(0, 0, HUD_ROWS, 4.min(shape[1]), INDICATOR);
        }
        let pip_width = 2;
        let field_width = shape[1];
        for point in 0..self.scores[0] as usize {
            let left = 6 + point * (pip_width + 1);
            if left + pip_width <= field_width / 2 {
                paint(1, left, HUD_ROWS - 2, pip_width, AGENT_TRAIL);
            }
        }
        for point in 0..self.scores[1] as usize {
            let offset = 1 + point * (pip_width + 1) + pip_width;
            if offset <= field_width / 2 {
                paint(1, field_width - offset, HUD_ROWS - 2, pip_width, OPPONENT_TRAIL);
            }
        }

        for row in 0..self.config.grid_height {
            for col in 0..self.config.grid_width {
                let color = match self.grid[self.index(row, col)] {
                    Cell::Empty => continue,
                    Cell::Agent => AGENT_TRAIL,
                    Cell::Opponent => OPPONENT_TRAIL,
                };
                paint(HUD_ROWS + row * cell, col * cell, cell, cell, color);
            }
        }
        paint(
            HUD_ROWS + self.agent.row * cell,
            self.agent.col * cell,
            cell,
            cell,
            AGENT_HEAD,
        );
        paint(
            HUD_ROWS + self.opponent.row * cell,
            self.opponent.col * cell,
            cell,
            cell,
            OPPONENT_HEAD,
        );

        Observation::U8(image.into_dyn())
    }

    fn info(&self) -> Info {
        let mut info = Info::new();
        info.insert("frame".to_string(), self.frame as f64);
        info.insert("agent_score".to_string(), f64::from(self.scores[0]));
        info.insert("opponent_score".to_string(), f64::from(self.scores[1]));
        info
    }
}

impl Environment for Surround {
    fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }

    fn action_space(&self) -> Discrete {
        Discrete::new(ACTION_COUNT)
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.scores = [0, 0];
        self.frame = 0;
        self.indicator_on = false;
        self.started = true;
        self.finished = false;
        self.start_round();
        Ok(Reset {
            observation: self.render(),
            info: self.info(),
        })
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        if action >= ACTION_COUNT {
            return Err(EnvError::InvalidAction {
                action,
                n: ACTION_COUNT,
            });
        }
        if !self.started {
            return Err(EnvError::NeedsReset);
        }
        if self.finished {
            return Err(EnvError::EpisodeOver);
        }
        if let Some(heading) = Direction::from_action(action) {
            self.pending = Some(heading);
        }
        self.frame += 1;
        self.indicator_on = !self.indicator_on;

        let mut reward = 0.0;
        if self.frame % self.config.frames_per_tick == 0 {
            let outcome = self.tick();
            match outcome {
                TickOutcome::Running => {}
                TickOutcome::AgentScored => {
                    self.scores[0] += 1;
                    reward = 1.0;
                }
                TickOutcome::OpponentScored => {
                    self.scores[1] += 1;
                    reward = -1.0;
                }
                TickOutcome::Draw => {}
            }
            if outcome != TickOutcome::Running {
                log::debug!(
                    "surround round over at frame {}: {:?}, score {:?}",
                    self.frame,
                    outcome,
                    self.scores
                );
                self.start_round();
            }
        }

        let terminated = self.scores.iter().any(|score| *score >= self.config.points_to_win);
        let truncated = !terminated
            && self
                .config
                .max_frames
                .is_some_and(|limit| self.frame >= limit);
        self.finished = terminated || truncated;

        Ok(Step {
            observation: self.render(),
            reward,
            terminated,
            truncated,
            info: self.info(),
        })
    }
}
