/// Floating point type used throughout the engine
pub type Real = f64;

/// Absolute/relative tolerance pair for comparing simulation output.
///
/// The relative part is scaled by the larger magnitude of the two
/// operands, so comparisons behave the same for populations of 1e4 and
/// 1e7 people.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Tolerances {
    /// Tolerances for conservation checks on population counts: a few
    /// ulps of integrator rounding per step, nothing more.
    pub const fn conservation() -> Self {
        Self {
            abs: 1e-9,
            rel: 1e-6,
        }
    }

    /// True when `a` and `b` agree within these tolerances.
    pub fn within(&self, a: Real, b: Real) -> bool {
        let diff = (a - b).abs();
        diff <= self.abs || diff <= self.rel * a.abs().max(b.abs())
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

/// Clamp a value into the unit interval.
pub fn clamp_unit(v: Real) -> Real {
    v.clamp(0.0, 1.0)
}

/// All entries finite (no NaN, no infinity).
pub fn all_finite(values: &[Real]) -> bool {
    values.iter().all(|v| v.is_finite())
}
