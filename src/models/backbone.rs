use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig};
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_OBS_SHAPE: [usize; 3] = [3, 84, 84];
pub const DEFAULT_OUTPUT_DIM: usize = 6;
pub const DEFAULT_CHANNELS: [usize; 3] = [32, 64, 64];
pub const DEFAULT_KERNEL_SIZES: [usize; 3] = [8, 4, 3];
pub const DEFAULT_STRIDES: [usize; 3] = [4, 2, 1];
pub const DEFAULT_HIDDEN_DIMS: [usize; 1] = [512];

/// Layer specification for [`CnnBackbone`].
///
/// `channels`, `kernel_sizes` and `strides` describe one unpadded convolution each and
/// must have the same length.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CnnBackboneConfig {
    pub obs_shape: [usize; 3],
    pub output_dim: usize,
    pub channels: Vec<usize>,
    pub kernel_sizes: Vec<usize>,
    pub strides: Vec<usize>,
    pub hidden_dims: Vec<usize>,
}

impl Default for CnnBackboneConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OBS_SHAPE, DEFAULT_OUTPUT_DIM)
    }
}

impl CnnBackboneConfig {
    pub fn new(obs_shape: [usize; 3], output_dim: usize) -> Self {
        Self {
            obs_shape,
            output_dim,
            channels: DEFAULT_CHANNELS.to_vec(),
            kernel_sizes: DEFAULT_KERNEL_SIZES.to_vec(),
            strides: DEFAULT_STRIDES.to_vec(),
            hidden_dims: DEFAULT_HIDDEN_DIMS.to_vec(),
        }
    }

    pub fn with_channels(mut self, channels: Vec<usize>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_kernel_sizes(mut self, kernel_sizes: Vec<usize>) -> Self {
        self.kernel_sizes = kernel_sizes;
        self
    }

    pub fn with_strides(mut self, strides: Vec<usize>) -> Self {
        self.strides = strides;
        self
    }

    /// Fully connected widths applied after flattening. An empty list leaves the network
    /// without a dense head, so it emits the flattened convolution features.
    pub fn with_hidden_dims(mut self, hidden_dims: Vec<usize>) -> Self {
        self.hidden_dims = hidden_dims;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.len() != self.kernel_sizes.len()
            || self.channels.len() != self.strides.len()
        {
            return Err(ConfigError::LayerSpecMismatch {
                channels: self.channels.len(),
                kernels: self.kernel_sizes.len(),
                strides: self.strides.len(),
            });
        }
        if self.obs_shape.contains(&0) {
            return Err(ConfigError::NonPositive("obs_shape"));
        }
        if self.channels.contains(&0) {
            return Err(ConfigError::NonPositive("channels"));
        }
        if self.kernel_sizes.contains(&0) {
            return Err(ConfigError::NonPositive("kernel_sizes"));
        }
        if self.strides.contains(&0) {
            return Err(ConfigError::NonPositive("strides"));
        }
        if self.output_dim == 0 {
            return Err(ConfigError::NonPositive("output_dim"));
        }
        if self.hidden_dims.contains(&0) {
            return Err(ConfigError::NonPositive("hidden_dims"));
        }
        let [_, height, width] = self.obs_shape;
        let mut extent = (height, width);
        for (&kernel, &stride) in self.kernel_sizes.iter().zip(&self.strides) {
            if extent.0 < kernel || extent.1 < kernel {
                return Err(ConfigError::EmptyFeatureMap(self.obs_shape.to_vec()));
            }
            extent = (
                (extent.0 - kernel) / stride + 1,
                (extent.1 - kernel) / stride + 1,
            );
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<CnnBackbone<B>, ConfigError> {
        self.validate()?;
        let mut stages = Vec::with_capacity(self.channels.len());
        let mut in_channels = self.obs_shape[0];
        for ((&out_channels, &kernel), &stride) in self
            .channels
            .iter()
            .zip(&self.kernel_sizes)
            .zip(&self.strides)
        {
            let conv = Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
                .with_stride([stride, stride])
                .init(device);
            stages.push(conv);
            in_channels = out_channels;
        }

        let flattened_dim = probe_flattened_dim(&stages, self.obs_shape, device);
        log::debug!(
            "cnn backbone flattens {:?} observations to {} features",
            self.obs_shape,
            flattened_dim
        );

        let (head, output_dim) = if self.hidden_dims.is_empty() {
            if flattened_dim != self.output_dim {
                log::warn!(
                    "cnn backbone has no hidden layers; emitting {} features instead of the requested {}",
                    flattened_dim,
                    self.output_dim
                );
            }
            (None, flattened_dim)
        } else {
            let head = DenseHead::new(flattened_dim, &self.hidden_dims, self.output_dim, device);
            (Some(head), self.output_dim)
        };

        Ok(CnnBackbone {
            stages,
            head,
            flattened_dim,
            output_dim,
        })
    }
}

/// Runs an all-zero observation through a gradient-free copy of the convolutions.
fn probe_flattened_dim<B: Backend>(
    stages: &[Conv2d<B>],
    obs_shape: [usize; 3],
    device: &B::Device,
) -> usize {
    let stages = stages.to_vec().no_grad();
    let [channels, height, width] = obs_shape;
    let mut activations = Tensor::<B, 4>::zeros([1, channels, height, width], device);
    for stage in &stages {
        activations = relu(stage.forward(activations));
    }
    let [_, channels, height, width] = activations.dims();
    channels * height * width
}

/// Fully connected layers with ReLU between them and a linear output.
#[derive(Module, Debug)]
pub struct DenseHead<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
}

impl<B: Backend> DenseHead<B> {
    pub fn new(
        input_dim: usize,
        hidden_dims: &[usize],
        output_dim: usize,
        device: &B::Device,
    ) -> Self {
        let mut hidden = Vec::with_capacity(hidden_dims.len());
        let mut input_size = input_dim;
        for &width in hidden_dims {
            hidden.push(LinearConfig::new(input_size, width).init(device));
            input_size = width;
        }
        let output = LinearConfig::new(input_size, output_dim).init(device);
        Self { hidden, output }
    }

    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut activations = input;
        for layer in &self.hidden {
            activations = relu(layer.forward(activations));
        }
        self.output.forward(activations)
    }
}

/// Convolutional feature extractor with an optional fully connected head.
#[derive(Module, Debug)]
pub struct CnnBackbone<B: Backend> {
    stages: Vec<Conv2d<B>>,
    head: Option<DenseHead<B>>,
    flattened_dim: usize,
    output_dim: usize,
}

impl<B: Backend> CnnBackbone<B> {
    /// Maps `(batch, channels, height, width)` observations to `(batch, output_dim)`.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut activations = input;
        for stage in &self.stages {
            activations = relu(stage.forward(activations));
        }
        let features = activations.flatten::<2>(1, 3);
        match &self.head {
            Some(head) => head.forward(features),
            None => features,
        }
    }

    /// Size of the flattened convolution output, discovered at construction.
    pub fn flattened_dim(&self) -> usize {
        self.flattened_dim
    }

    /// Width of the tensor returned by [`Self::forward`].
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn has_head(&self) -> bool {
        self.head.is_some()
    }
}
