use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Exp1, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::observation::Observation;

/// Element type of an observation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Dtype {
    U8,
    F32,
}

/// Bounded n-dimensional observation space with a uniform `[low, high]` range.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BoxSpace {
    pub shape: Vec<usize>,
    pub low: f32,
    pub high: f32,
    pub dtype: Dtype,
}

impl BoxSpace {
    pub fn new(shape: Vec<usize>, low: f32, high: f32, dtype: Dtype) -> Self {
        Self {
            shape,
            low,
            high,
            dtype,
        }
    }

    /// Pixel space spanning `[0, 255]` stored as bytes.
    pub fn pixels(shape: Vec<usize>) -> Self {
        Self::new(shape, 0.0, 255.0, Dtype::U8)
    }

    pub fn with_shape(&self, shape: Vec<usize>) -> Self {
        Self {
            shape,
            ..self.clone()
        }
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn contains(&self, observation: &Observation) -> bool {
        if observation.shape() != self.shape.as_slice() || observation.dtype() != self.dtype {
            return false;
        }
        observation
            .to_f32()
            .iter()
            .all(|value| *value >= self.low && *value <= self.high)
    }

    /// Rejects NaN bounds and `low > high`. Infinite bounds are allowed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low.is_nan() || self.high.is_nan() {
            return Err(ConfigError::SpaceBounds("bounds must not be NaN"));
        }
        if self.low > self.high {
            return Err(ConfigError::SpaceBounds("low must not exceed high"));
        }
        Ok(())
    }

    /// Draws an observation from the space.
    ///
    /// Finite boxes are sampled uniformly. A half-open box draws `low + Exp(1)` or
    /// `high - Exp(1)`, and a box unbounded on both sides draws from a standard normal.
    /// Bounds that fail [`Self::validate`] yield a box filled with the lower bound, or zero
    /// when that bound is not finite.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Observation {
        let shape = IxDyn(&self.shape);
        match self.dtype {
            Dtype::U8 => {
                let low = self.low.clamp(0.0, 255.0) as u8;
                let high = self.high.clamp(0.0, 255.0) as u8;
                Observation::U8(ArrayD::from_shape_simple_fn(shape, || {
                    if high > low {
                        rng.gen_range(low..=high)
                    } else {
                        low
                    }
                }))
            }
            Dtype::F32 => {
                let (low, high) = (f64::from(self.low), f64::from(self.high));
                Observation::F32(ArrayD::from_shape_simple_fn(shape, || {
                    sample_scalar(low, high, rng) as f32
                }))
            }
        }
    }
}

fn sample_scalar<R: Rng>(low: f64, high: f64, rng: &mut R) -> f64 {
    match (low.is_finite(), high.is_finite()) {
        (true, true) if high > low => rng.gen_range(low..=high),
        (true, false) if high > low => low + Distribution::<f64>::sample(&Exp1, rng),
        (false, true) if high > low => high - Distribution::<f64>::sample(&Exp1, rng),
        (false, false) if high > low => Distribution::<f64>::sample(&StandardNormal, rng),
        _ if low.is_finite() => low,
        _ => 0.0,
    }
}

/// Finite set of actions `0..n`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Discrete {
    pub n: usize,
}

impl Discrete {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    pub fn contains(&self, action: usize) -> bool {
        action < self.n
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn sampled_pixels_stay_in_bounds() {
        let space = BoxSpace::pixels(vec![4, 6, 3]);
        let mut rng = StdRng::seed_from_u64(7);
        let sample = space.sample(&mut rng);
        assert_eq!(sample.shape(), &[4, 6, 3]);
        assert!(space.contains(&sample));
    }

    #[test]
    fn unbounded_float_spaces_sample_finite_values() {
        let mut rng = StdRng::seed_from_u64(3);
        let cases = [
            (f32::NEG_INFINITY, f32::INFINITY),
            (f32::MIN, f32::MAX),
            (-1.0, f32::INFINITY),
            (f32::NEG_INFINITY, 2.0),
        ];
        for (low, high) in cases {
            let space = BoxSpace::new(vec![3, 4, 4], low, high, Dtype::F32);
            assert!(space.validate().is_ok());
            let sample = space.sample(&mut rng);
            assert!(space.contains(&sample), "sample escaped {low}..{high}");
            assert!(sample.to_f32().iter().all(|value| value.is_finite()));
        }
    }

    #[test]
    fn degenerate_bounds_do_not_panic() {
        let mut rng = StdRng::seed_from_u64(5);
        let inverted = BoxSpace::new(vec![2, 2], 200.0, 10.0, Dtype::U8);
        assert!(matches!(inverted.validate(), Err(ConfigError::SpaceBounds(_))));
        assert_eq!(inverted.sample(&mut rng).shape(), &[2, 2]);

        let nan = BoxSpace::new(vec![2], f32::NAN, 1.0, Dtype::F32);
        assert!(nan.validate().is_err());
        let Observation::F32(values) = nan.sample(&mut rng) else {
            panic!("dtype changed");
        };
        assert!(values.iter().all(|value| *value == 0.0));

        let point = BoxSpace::new(vec![2], 0.5, 0.5, Dtype::F32);
        assert!(point.contains(&point.sample(&mut rng)));
    }

    #[test]
    fn float_space_rejects_byte_observation() {
        let space = BoxSpace::new(vec![2, 2], 0.0, 1.0, Dtype::F32);
        let bytes = Observation::U8(ArrayD::zeros(IxDyn(&[2, 2])));
        assert!(!space.contains(&bytes));
    }
}
