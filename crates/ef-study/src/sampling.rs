//! Attaching distributions to a model and drawing parameter samples.

use ef_core::{AgeGroup, Real};
use ef_model::{Compartment, SecihurdModel};
use ef_params::{NormalDistribution, ParameterDistribution, UncertainValue};
use rand::Rng;

/// Attach a truncated normal to one value: mean = current value,
/// sigma = `sigma_rel * mean`, bounds `max(0, mean (1 - 3 sigma_rel))`
/// and `mean (1 + 3 sigma_rel)`.
fn attach_relative_normal(value: &mut UncertainValue, sigma_rel: Real) {
    let mean = value.value();
    let std_dev = (sigma_rel * mean).abs();
    let lower = (mean * (1.0 - 3.0 * sigma_rel)).max(0.0);
    let upper = mean * (1.0 + 3.0 * sigma_rel);
    if let Ok(normal) = NormalDistribution::new(mean, std_dev, lower, upper) {
        value.set_distribution(ParameterDistribution::Normal(normal));
    }
}

/// Attach relative truncated normals to every numerical parameter and
/// every initial population cell of the model.
///
/// `t0`/`tmax` delimit the study window; they are part of the signature
/// so callers can scope time-dependent uncertainty consistently with the
/// simulated horizon.
pub fn set_params_distributions_normal(
    model: &mut SecihurdModel,
    t0: Real,
    tmax: Real,
    sigma_rel: Real,
) {
    debug_assert!(t0 <= tmax);
    for value in model.parameters.uncertain_values_mut() {
        // capacities left at "unlimited" carry no meaningful mean
        if value.value() == Real::MAX {
            continue;
        }
        attach_relative_normal(value, sigma_rel);
    }
    for cell in model.populations.cells_mut() {
        attach_relative_normal(cell, sigma_rel);
    }
}

/// Replace every uncertain scalar by a fresh draw (predefined samples are
/// consumed first), then restore the invariants the draw may break:
/// group totals are preserved by re-deriving Susceptible, and the
/// constraint layer clamps out-of-range parameters.
pub fn draw_sample(model: &mut SecihurdModel, rng: &mut impl Rng) {
    for value in model.parameters.uncertain_values_mut() {
        value.draw_sample(rng);
    }

    let group_totals: Vec<Real> = AgeGroup::range(model.num_groups())
        .map(|age| model.populations.get_group_total(age))
        .collect();

    for cell in model.populations.cells_mut() {
        cell.draw_sample(rng);
    }
    for (age, &total) in AgeGroup::range(model.num_groups()).zip(&group_totals) {
        model
            .populations
            .set_difference_from_group_total(age, Compartment::Susceptible, total);
    }

    model.apply_constraints();
}
