use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d};
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::space::BoxSpace;

use super::input::observations_to_tensor;

pub const STEM_CHANNELS: usize = 32;
const STEM_KERNEL: usize = 8;
const STEM_STRIDE: usize = 4;
pub const DEFAULT_FEATURES_DIM: usize = 512;
pub const DEFAULT_DEPTH: usize = 2;
const DEFAULT_SAMPLE_SEED: u64 = 0x0B5E_57A7_E5EE_D000;

/// Settings for a single [`ResidualBlock`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResidualBlockConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    pub stride: usize,
}

impl ResidualBlockConfig {
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            stride: 1,
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// True when the shortcut needs a 1x1 projection to match the main path.
    pub fn needs_projection(&self) -> bool {
        self.stride != 1 || self.in_channels != self.out_channels
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ResidualBlock<B> {
        assert!(self.stride > 0, "residual block stride must be positive");
        let conv1 = Conv2dConfig::new([self.in_channels, self.out_channels], [3, 3])
            .with_stride([self.stride, self.stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let conv2 = Conv2dConfig::new([self.out_channels, self.out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let shortcut = self.needs_projection().then(|| Projection {
            conv: Conv2dConfig::new([self.in_channels, self.out_channels], [1, 1])
                .with_stride([self.stride, self.stride])
                .init(device),
            norm: BatchNormConfig::new(self.out_channels).init(device),
        });
        ResidualBlock {
            conv1,
            norm1: BatchNormConfig::new(self.out_channels).init(device),
            conv2,
            norm2: BatchNormConfig::new(self.out_channels).init(device),
            shortcut,
        }
    }
}

/// Strided 1x1 convolution that reshapes the shortcut to the main path's output.
#[derive(Module, Debug)]
pub struct Projection<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B>,
}

impl<B: Backend> Projection<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.norm.forward(self.conv.forward(input))
    }
}

/// Two 3x3 convolutions with batch normalization and an additive shortcut.
///
/// Maps `(batch, in, h, w)` to `(batch, out, ceil(h / stride), ceil(w / stride))`.
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    conv1: Conv2d<B>,
    norm1: BatchNorm<B>,
    conv2: Conv2d<B>,
    norm2: BatchNorm<B>,
    shortcut: Option<Projection<B>>,
}

impl<B: Backend> ResidualBlock<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.shortcut {
            Some(projection) => projection.forward(input.clone()),
            None => input.clone(),
        };
        let out = relu(self.norm1.forward(self.conv1.forward(input)));
        let out = self.norm2.forward(self.conv2.forward(out));
        relu(out + identity)
    }

    /// Convolutions only. Produces the output geometry without touching batch statistics.
    fn forward_shape(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv2.forward(self.conv1.forward(input))
    }

    pub fn is_projected(&self) -> bool {
        self.shortcut.is_some()
    }
}

/// A downsampling residual block followed by shape-preserving ones.
#[derive(Module, Debug)]
pub struct ResidualStage<B: Backend> {
    blocks: Vec<ResidualBlock<B>>,
}

impl<B: Backend> ResidualStage<B> {
    /// Builds `blocks` blocks; only the first changes channels and applies `stride`.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        blocks: usize,
        device: &B::Device,
    ) -> Self {
        assert!(blocks >= 2, "a residual stage holds at least two blocks");
        let mut stage = Vec::with_capacity(blocks);
        stage.push(
            ResidualBlockConfig::new(in_channels, out_channels)
                .with_stride(stride)
                .init(device),
        );
        for _ in 1..blocks {
            stage.push(ResidualBlockConfig::new(out_channels, out_channels).init(device));
        }
        Self { blocks: stage }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks
            .iter()
            .fold(input, |activations, block| block.forward(activations))
    }

    fn forward_shape(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks
            .iter()
            .fold(input, |activations, block| block.forward_shape(activations))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Settings for [`ResNetExtractor`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResNetExtractorConfig {
    pub features_dim: usize,
    pub depth: usize,
    /// Seed for the observation sampled during shape discovery.
    pub sample_seed: u64,
}

impl Default for ResNetExtractorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURES_DIM)
    }
}

impl ResNetExtractorConfig {
    pub fn new(features_dim: usize) -> Self {
        Self {
            features_dim,
            depth: DEFAULT_DEPTH,
            sample_seed: DEFAULT_SAMPLE_SEED,
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = seed;
        self
    }

    /// Builds the extractor for channel-first observations drawn from `observation_space`.
    pub fn init<B: Backend>(
        &self,
        observation_space: &BoxSpace,
        device: &B::Device,
    ) -> Result<ResNetExtractor<B>, ConfigError> {
        if self.features_dim == 0 {
            return Err(ConfigError::NonPositive("features_dim"));
        }
        observation_space.validate()?;
        let shape = observation_space.shape.as_slice();
        let &[in_channels, height, width] = shape else {
            return Err(ConfigError::ObservationRank {
                expected: 3,
                shape: shape.to_vec(),
            });
        };
        if in_channels == 0 {
            return Err(ConfigError::NonPositive("observation channels"));
        }
        if height < STEM_KERNEL || width < STEM_KERNEL {
            return Err(ConfigError::EmptyFeatureMap(shape.to_vec()));
        }

        let stem = Conv2dConfig::new([in_channels, STEM_CHANNELS], [STEM_KERNEL, STEM_KERNEL])
            .with_stride([STEM_STRIDE, STEM_STRIDE])
            .init(device);
        let stem_norm = BatchNormConfig::new(STEM_CHANNELS).init(device);
        let mut stages = Vec::with_capacity(self.depth);
        let mut channels = STEM_CHANNELS;
        for _ in 0..self.depth {
            stages.push(ResidualStage::new(channels, channels * 2, 2, 2, device));
            channels *= 2;
        }

        let mut rng = StdRng::seed_from_u64(self.sample_seed);
        let sample = observation_space.sample(&mut rng);
        let probe = observations_to_tensor::<B>(std::slice::from_ref(&sample), device)
            .map_err(|_| ConfigError::ObservationRank {
                expected: 3,
                shape: sample.shape().to_vec(),
            })?;
        let flattened_dim = probe_flattened_dim(&stem, &stages, probe);
        log::debug!(
            "resnet extractor flattens {:?} observations to {} features",
            shape,
            flattened_dim
        );

        Ok(ResNetExtractor {
            stem,
            stem_norm,
            stages,
            projection: LinearConfig::new(flattened_dim, self.features_dim).init(device),
            flattened_dim,
            features_dim: self.features_dim,
        })
    }
}

/// Shape discovery over the convolutional path on a gradient-free copy.
fn probe_flattened_dim<B: Backend>(
    stem: &Conv2d<B>,
    stages: &[ResidualStage<B>],
    sample: Tensor<B, 4>,
) -> usize {
    let stem = stem.clone().no_grad();
    let stages = stages.to_vec().no_grad();
    let activations = stages
        .iter()
        .fold(stem.forward(sample), |activations, stage| {
            stage.forward_shape(activations)
        });
    let [_, channels, height, width] = activations.dims();
    channels * height * width
}

/// Residual CNN that maps pixel observations to a fixed-size feature vector.
///
/// An 8x8/4 stem with 32 channels is followed by `depth` stages, each doubling the
/// channel count and halving the resolution, then a linear projection with ReLU.
#[derive(Module, Debug)]
pub struct ResNetExtractor<B: Backend> {
    stem: Conv2d<B>,
    stem_norm: BatchNorm<B>,
    stages: Vec<ResidualStage<B>>,
    projection: Linear<B>,
    flattened_dim: usize,
    features_dim: usize,
}

impl<B: Backend> ResNetExtractor<B> {
    fn forward_conv(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let stem = relu(self.stem_norm.forward(self.stem.forward(input)));
        self.stages
            .iter()
            .fold(stem, |activations, stage| stage.forward(activations))
    }

    pub fn forward(&self, observations: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.forward_conv(observations).flatten::<2>(1, 3);
        relu(self.projection.forward(features))
    }

    pub fn flattened_dim(&self) -> usize {
        self.flattened_dim
    }

    pub fn features_dim(&self) -> usize {
        self.features_dim
    }

    pub fn depth(&self) -> usize {
        self.stages.len()
    }
}
