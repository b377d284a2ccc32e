use thiserror::Error;

/// Errors raised while building a network from its configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "channels ({channels}), kernel_sizes ({kernels}) and strides ({strides}) must have the same length"
    )]
    LayerSpecMismatch {
        channels: usize,
        kernels: usize,
        strides: usize,
    },
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error("observation shape {shape:?} must have {expected} dimensions")]
    ObservationRank { expected: usize, shape: Vec<usize> },
    #[error("convolution stack reduces observation {0:?} to an empty feature map")]
    EmptyFeatureMap(Vec<usize>),
    #[error("invalid observation space: {0}")]
    SpaceBounds(&'static str),
    #[error("invalid reward tier table: {0}")]
    RewardTiers(&'static str),
    #[error("invalid environment configuration: {0}")]
    Environment(&'static str),
}

/// Errors surfaced by an environment or one of its wrappers.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("action {action} is outside the action space of size {n}")]
    InvalidAction { action: usize, n: usize },
    #[error("environment must be reset before stepping")]
    NeedsReset,
    #[error("episode is over; call reset before stepping again")]
    EpisodeOver,
    #[error("observation has shape {actual:?}, expected {expected:?}")]
    ObservationShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("observation shape {shape:?} must have {expected} dimensions")]
    ObservationRank { expected: usize, shape: Vec<usize> },
    #[error("cannot batch or stack an empty list of observations")]
    EmptyBatch,
    #[error("observation reshape failed: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("simulator failure: {0}")]
    Simulator(#[source] Box<dyn std::error::Error + Send + Sync>),
}
