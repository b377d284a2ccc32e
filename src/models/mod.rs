pub mod backbone;
pub mod input;
pub mod residual;

pub use backbone::{
    CnnBackbone, CnnBackboneConfig, DEFAULT_CHANNELS, DEFAULT_HIDDEN_DIMS, DEFAULT_KERNEL_SIZES,
    DEFAULT_OBS_SHAPE, DEFAULT_OUTPUT_DIM, DEFAULT_STRIDES, DenseHead,
};
pub use input::observations_to_tensor;
pub use residual::{
    DEFAULT_DEPTH, DEFAULT_FEATURES_DIM, Projection, ResNetExtractor, ResNetExtractorConfig,
    ResidualBlock, ResidualBlockConfig, ResidualStage, STEM_CHANNELS,
};
