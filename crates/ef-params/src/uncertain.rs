//! Scalar values with optional sampling distributions.

use std::collections::VecDeque;

use ef_core::Real;
use rand::Rng;
use rand_distr::Distribution;

use crate::error::{ParamsError, ParamsResult};

/// Resampling attempts for the truncated normal before falling back to a clamp.
const MAX_TRUNCATION_ATTEMPTS: usize = 10;

/// Normal distribution truncated to `[lower, upper]` by resampling.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalDistribution {
    pub mean: Real,
    pub std_dev: Real,
    pub lower: Real,
    pub upper: Real,
    predefined: VecDeque<Real>,
}

impl NormalDistribution {
    pub fn new(mean: Real, std_dev: Real, lower: Real, upper: Real) -> ParamsResult<Self> {
        if !(std_dev >= 0.0) {
            return Err(ParamsError::InvalidDistribution {
                what: format!("standard deviation must be non-negative, got {std_dev}"),
            });
        }
        if lower > upper {
            return Err(ParamsError::InvalidDistribution {
                what: format!("lower bound {lower} exceeds upper bound {upper}"),
            });
        }
        Ok(Self {
            mean,
            std_dev,
            lower,
            upper,
            predefined: VecDeque::new(),
        })
    }

    fn sample(&self, rng: &mut impl Rng) -> Real {
        if self.std_dev == 0.0 {
            return self.mean.clamp(self.lower, self.upper);
        }
        // std_dev > 0 was checked at construction
        let normal = rand_distr::Normal::new(self.mean, self.std_dev)
            .expect("valid normal parameters");
        for _ in 0..MAX_TRUNCATION_ATTEMPTS {
            let draw = normal.sample(rng);
            if draw >= self.lower && draw <= self.upper {
                return draw;
            }
        }
        normal.sample(rng).clamp(self.lower, self.upper)
    }
}

/// Uniform distribution over `[lower, upper]`.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformDistribution {
    pub lower: Real,
    pub upper: Real,
    predefined: VecDeque<Real>,
}

impl UniformDistribution {
    pub fn new(lower: Real, upper: Real) -> ParamsResult<Self> {
        if lower > upper {
            return Err(ParamsError::InvalidDistribution {
                what: format!("lower bound {lower} exceeds upper bound {upper}"),
            });
        }
        Ok(Self {
            lower,
            upper,
            predefined: VecDeque::new(),
        })
    }

    fn sample(&self, rng: &mut impl Rng) -> Real {
        if self.lower == self.upper {
            return self.lower;
        }
        rand_distr::Uniform::new_inclusive(self.lower, self.upper).sample(rng)
    }
}

/// A sampling distribution attached to an uncertain value.
///
/// Each distribution carries a FIFO of predefined samples; `draw`
/// consumes the queue before touching the random number generator, which
/// lets tests and replays pin exact values.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterDistribution {
    Normal(NormalDistribution),
    Uniform(UniformDistribution),
}

impl ParameterDistribution {
    pub fn add_predefined_sample(&mut self, sample: Real) {
        match self {
            ParameterDistribution::Normal(d) => d.predefined.push_back(sample),
            ParameterDistribution::Uniform(d) => d.predefined.push_back(sample),
        }
    }

    pub fn predefined_samples(&self) -> impl Iterator<Item = Real> + '_ {
        match self {
            ParameterDistribution::Normal(d) => d.predefined.iter().copied(),
            ParameterDistribution::Uniform(d) => d.predefined.iter().copied(),
        }
    }

    pub fn draw(&mut self, rng: &mut impl Rng) -> Real {
        let queued = match self {
            ParameterDistribution::Normal(d) => d.predefined.pop_front(),
            ParameterDistribution::Uniform(d) => d.predefined.pop_front(),
        };
        if let Some(sample) = queued {
            return sample;
        }
        match self {
            ParameterDistribution::Normal(d) => d.sample(rng),
            ParameterDistribution::Uniform(d) => d.sample(rng),
        }
    }
}

/// A scalar parameter that may carry a sampling distribution.
///
/// Deterministic by default; `draw_sample` replaces the scalar with a
/// fresh draw when a distribution is attached and is a no-op otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct UncertainValue {
    value: Real,
    distribution: Option<ParameterDistribution>,
}

impl UncertainValue {
    pub fn new(value: Real) -> Self {
        Self {
            value,
            distribution: None,
        }
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn set_value(&mut self, value: Real) {
        self.value = value;
    }

    pub fn distribution(&self) -> Option<&ParameterDistribution> {
        self.distribution.as_ref()
    }

    pub fn distribution_mut(&mut self) -> Option<&mut ParameterDistribution> {
        self.distribution.as_mut()
    }

    pub fn set_distribution(&mut self, distribution: ParameterDistribution) {
        self.distribution = Some(distribution);
    }

    pub fn draw_sample(&mut self, rng: &mut impl Rng) {
        if let Some(distribution) = self.distribution.as_mut() {
            self.value = distribution.draw(rng);
        }
    }
}

impl From<Real> for UncertainValue {
    fn from(value: Real) -> Self {
        UncertainValue::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn predefined_samples_are_consumed_first() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut dist =
            ParameterDistribution::Normal(NormalDistribution::new(5.0, 1.0, 0.0, 10.0).unwrap());
        dist.add_predefined_sample(4.5);
        dist.add_predefined_sample(5.5);
        assert_eq!(dist.draw(&mut rng), 4.5);
        assert_eq!(dist.draw(&mut rng), 5.5);
        // queue exhausted, sampling takes over and respects the bounds
        let sampled = dist.draw(&mut rng);
        assert!(sampled >= 0.0 && sampled <= 10.0);
    }

    #[test]
    fn truncated_normal_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let dist = NormalDistribution::new(1.0, 5.0, 0.5, 1.5).unwrap();
        for _ in 0..200 {
            let draw = dist.sample(&mut rng);
            assert!(draw >= 0.5 && draw <= 1.5);
        }
    }

    #[test]
    fn zero_std_dev_returns_clamped_mean() {
        let mut rng = StdRng::seed_from_u64(2);
        let dist = NormalDistribution::new(3.0, 0.0, 0.0, 2.0).unwrap();
        assert_eq!(dist.sample(&mut rng), 2.0);
    }

    #[test]
    fn uniform_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let dist = UniformDistribution::new(2.0, 4.0).unwrap();
        for _ in 0..100 {
            let draw = dist.sample(&mut rng);
            assert!(draw >= 2.0 && draw <= 4.0);
        }
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(NormalDistribution::new(0.0, 1.0, 1.0, 0.0).is_err());
        assert!(NormalDistribution::new(0.0, -1.0, 0.0, 1.0).is_err());
        assert!(UniformDistribution::new(1.0, 0.0).is_err());
    }

    #[test]
    fn value_without_distribution_is_stable() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut value = UncertainValue::new(7.0);
        value.draw_sample(&mut rng);
        assert_eq!(value.value(), 7.0);

        value.set_distribution(ParameterDistribution::Uniform(
            UniformDistribution::new(0.0, 1.0).unwrap(),
        ));
        value.draw_sample(&mut rng);
        assert!(value.value() >= 0.0 && value.value() <= 1.0);
    }
}
