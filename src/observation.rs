use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice, Zip};

use crate::error::EnvError;
use crate::space::Dtype;

const RELATIVE_TOLERANCE: f32 = 1.0e-5;
const ABSOLUTE_TOLERANCE: f32 = 1.0e-8;

/// Observation produced by an environment, tagged with its element type.
#[derive(Clone, Debug, PartialEq)]
pub enum Observation {
    U8(ArrayD<u8>),
    F32(ArrayD<f32>),
}

impl Observation {
    pub fn shape(&self) -> &[usize] {
        match self {
            Observation::U8(array) => array.shape(),
            Observation::F32(array) => array.shape(),
        }
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            Observation::U8(_) => Dtype::U8,
            Observation::F32(_) => Dtype::F32,
        }
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the observation into a float array without rescaling.
    pub fn to_f32(&self) -> ArrayD<f32> {
        match self {
            Observation::U8(array) => array.mapv(f32::from),
            Observation::F32(array) => array.clone(),
        }
    }

    /// Flat row-major values, used when building tensors.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            Observation::U8(array) => array.iter().copied().map(f32::from).collect(),
            Observation::F32(array) => array.iter().copied().collect(),
        }
    }

    /// Reorders axes and materializes the result in standard layout.
    pub fn permuted(self, axes: &[usize]) -> Self {
        match self {
            Observation::U8(array) => Observation::U8(permute(array, axes)),
            Observation::F32(array) => Observation::F32(permute(array, axes)),
        }
    }

    pub fn reshaped(self, shape: &[usize]) -> Result<Self, EnvError> {
        Ok(match self {
            Observation::U8(array) => {
                Observation::U8(array.into_shape_with_order(IxDyn(shape))?)
            }
            Observation::F32(array) => {
                Observation::F32(array.into_shape_with_order(IxDyn(shape))?)
            }
        })
    }

    /// Element-wise closeness check that ignores the first `skip` entries of the leading axis.
    pub fn allclose_skipping(&self, other: &Observation, skip: usize) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        let lhs = self.to_f32();
        let rhs = other.to_f32();
        let rows = lhs.shape().first().copied().unwrap_or(0);
        let start = skip.min(rows);
        let lhs = lhs.slice_axis(Axis(0), Slice::from(start..));
        let rhs = rhs.slice_axis(Axis(0), Slice::from(start..));
        Zip::from(&lhs).and(&rhs).all(|a, b| {
            (a - b).abs() <= ABSOLUTE_TOLERANCE + RELATIVE_TOLERANCE * b.abs()
        })
    }

    /// Stacks equally shaped observations along a new leading axis.
    pub fn stack(frames: &[Observation]) -> Result<Self, EnvError> {
        let Some(first) = frames.first() else {
            return Err(EnvError::EmptyBatch);
        };
        if let Some(odd) = frames.iter().find(|frame| frame.shape() != first.shape()) {
            return Err(EnvError::ObservationShape {
                expected: first.shape().to_vec(),
                actual: odd.shape().to_vec(),
            });
        }
        let all_bytes = frames.iter().all(|frame| frame.dtype() == Dtype::U8);
        if all_bytes {
            let views: Vec<ArrayViewD<'_, u8>> = frames
                .iter()
                .filter_map(|frame| match frame {
                    Observation::U8(array) => Some(array.view()),
                    Observation::F32(_) => None,
                })
                .collect();
            Ok(Observation::U8(ndarray::stack(Axis(0), &views)?))
        } else {
            let owned: Vec<ArrayD<f32>> = frames.iter().map(Observation::to_f32).collect();
            let views: Vec<ArrayViewD<'_, f32>> = owned.iter().map(|array| array.view()).collect();
            Ok(Observation::F32(ndarray::stack(Axis(0), &views)?))
        }
    }
}

impl From<ArrayD<u8>> for Observation {
    fn from(value: ArrayD<u8>) -> Self {
        Observation::U8(value)
    }
}

impl From<ArrayD<f32>> for Observation {
    fn from(value: ArrayD<f32>) -> Self {
        Observation::F32(value)
    }
}

fn permute<A: Clone>(array: ArrayD<A>, axes: &[usize]) -> ArrayD<A> {
    array
        .permuted_axes(IxDyn(axes))
        .as_standard_layout()
        .into_owned()
}
