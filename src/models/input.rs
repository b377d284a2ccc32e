use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use crate::error::EnvError;
use crate::observation::Observation;

/// Packs channel-first `(channels, height, width)` observations into a
/// `(batch, channels, height, width)` float tensor. Values are copied as-is.
pub fn observations_to_tensor<B: Backend>(
    observations: &[Observation],
    device: &B::Device,
) -> Result<Tensor<B, 4>, EnvError> {
    let Some(first) = observations.first() else {
        return Err(EnvError::EmptyBatch);
    };
    let &[channels, height, width] = first.shape() else {
        return Err(EnvError::ObservationRank {
            expected: 3,
            shape: first.shape().to_vec(),
        });
    };
    let batch = observations.len();
    let mut values = Vec::with_capacity(batch * channels * height * width);
    for observation in observations {
        if observation.shape() != first.shape() {
            return Err(EnvError::ObservationShape {
                expected: first.shape().to_vec(),
                actual: observation.shape().to_vec(),
            });
        }
        values.extend(observation.to_f32_vec());
    }
    Ok(Tensor::<B, 4>::from_data(
        TensorData::new(values, [batch, channels, height, width]),
        device,
    ))
}
