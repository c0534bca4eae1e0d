//! Reductions over simulation results and ensembles.
//!
//! Ensemble inputs are `runs x nodes` collections of time series. Shapes
//! may be ragged after failed runs; reductions iterate over the common
//! prefix of nodes and time points and warn about the rest.

use ef_core::{Real, TimeSeries};
use ef_model::{Compartment, SecihurdModel, NUM_COMPARTMENTS};
use tracing::warn;

/// Piecewise-linear interpolation of a series onto integer days
/// `floor(t0) ..= ceil(tmax)`; boundary values are held constant.
///
/// A series already sampled at integer days comes back unchanged.
pub fn interpolate_simulation_result(result: &TimeSeries) -> TimeSeries {
    assert!(!result.is_empty(), "time series must not be empty");

    let t0 = result.time(0);
    let tmax = result.last_time();
    let day_max = tmax.ceil() as i64;

    let mut day = t0.floor() as i64;
    let mut interpolated = TimeSeries::new(result.num_elements());
    interpolated.add_time_point(day as Real, result.value(0).clone());
    day += 1;

    // walk pairs of samples bracketing each integer day; one pair can
    // bracket several days
    let mut i = 0;
    while i + 1 < result.num_time_points() {
        let t_left = result.time(i);
        let t_right = result.time(i + 1);
        if t_left < day as Real && t_right >= day as Real {
            let weight = (day as Real - t_left) / (t_right - t_left);
            let value = result.value(i) + (result.value(i + 1) - result.value(i)) * weight;
            interpolated.add_time_point(day as Real, value);
            day += 1;
        } else {
            i += 1;
        }
    }

    if day_max as Real > tmax {
        interpolated.add_time_point(day as Real, result.last_value().clone());
    }

    interpolated
}

fn common_shape(ensemble: &[Vec<TimeSeries>]) -> Option<(usize, usize, usize)> {
    if ensemble.is_empty() || ensemble.iter().any(|run| run.is_empty()) {
        return None;
    }
    let num_nodes = ensemble.iter().map(|run| run.len()).min().unwrap();
    let num_points = ensemble
        .iter()
        .flat_map(|run| run.iter().map(|ts| ts.num_time_points()))
        .min()
        .unwrap();
    let num_elements = ensemble[0][0].num_elements();
    if num_points == 0 {
        return None;
    }
    if ensemble
        .iter()
        .any(|run| run.iter().any(|ts| ts.num_elements() != num_elements))
    {
        return None;
    }
    let max_nodes = ensemble.iter().map(|run| run.len()).max().unwrap();
    if max_nodes != num_nodes {
        warn!(num_nodes, max_nodes, "ragged ensemble, reducing common node prefix");
    }
    Some((num_nodes, num_points, num_elements))
}

/// Per run, sum the node series into a single network-wide series.
pub fn sum_nodes(ensemble: &[Vec<TimeSeries>]) -> Vec<TimeSeries> {
    let Some((num_nodes, num_points, num_elements)) = common_shape(ensemble) else {
        return Vec::new();
    };
    ensemble
        .iter()
        .map(|run| {
            let mut sum = TimeSeries::zero(num_points, num_elements);
            for time in 0..num_points {
                sum.set_time(time, run[0].time(time));
                for node in run.iter().take(num_nodes) {
                    *sum.value_mut(time) += node.value(time);
                }
            }
            sum
        })
        .collect()
}

/// Arithmetic mean over runs, per node, per time point, per element.
pub fn ensemble_mean(ensemble: &[Vec<TimeSeries>]) -> Vec<TimeSeries> {
    let Some((num_nodes, num_points, num_elements)) = common_shape(ensemble) else {
        return Vec::new();
    };
    let num_runs = ensemble.len() as Real;
    let mut mean = vec![TimeSeries::zero(num_points, num_elements); num_nodes];
    for run in ensemble {
        for (node, series) in run.iter().take(num_nodes).enumerate() {
            for time in 0..num_points {
                mean[node].set_time(time, series.time(time));
                *mean[node].value_mut(time) += series.value(time) / num_runs;
            }
        }
    }
    mean
}

/// The `p`-percentile over runs, per node, per time point, per element:
/// the value at index `floor(num_runs * p)` of the sorted sample.
pub fn ensemble_percentile(ensemble: &[Vec<TimeSeries>], p: Real) -> Vec<TimeSeries> {
    assert!(p > 0.0 && p < 1.0, "percentile must lie in (0, 1)");
    let Some((num_nodes, num_points, num_elements)) = common_shape(ensemble) else {
        return Vec::new();
    };
    let num_runs = ensemble.len();
    let pick = ((num_runs as Real * p) as usize).min(num_runs - 1);

    let mut percentile = vec![TimeSeries::zero(num_points, num_elements); num_nodes];
    let mut sample = vec![0.0; num_runs];
    for node in 0..num_nodes {
        for time in 0..num_points {
            percentile[node].set_time(time, ensemble[0][node].time(time));
            for element in 0..num_elements {
                for (run, value) in ensemble.iter().zip(sample.iter_mut()) {
                    *value = run[node].value(time)[element];
                }
                sample.sort_by(|a, b| a.total_cmp(b));
                percentile[node].value_mut(time)[element] = sample[pick];
            }
        }
    }
    percentile
}

/// Per-leaf `p`-percentile over the sampled models of an ensemble,
/// reassembled into models of the same shape (one per node).
pub fn ensemble_params_percentile(
    ensemble: &[Vec<SecihurdModel>],
    p: Real,
) -> Vec<SecihurdModel> {
    assert!(p > 0.0 && p < 1.0, "percentile must lie in (0, 1)");
    if ensemble.is_empty() || ensemble[0].is_empty() {
        return Vec::new();
    }
    let num_nodes = ensemble.iter().map(|run| run.len()).min().unwrap();
    let num_runs = ensemble.len();
    let pick = ((num_runs as Real * p) as usize).min(num_runs - 1);

    let mut out = Vec::with_capacity(num_nodes);
    let mut sample = vec![0.0; num_runs];
    for node in 0..num_nodes {
        let mut assembled = ensemble[0][node].clone();
        let leaves: Vec<Vec<Real>> = ensemble
            .iter()
            .map(|run| run[node].leaf_values())
            .collect();
        let num_leaves = leaves[0].len();
        let mut values = vec![0.0; num_leaves];
        for leaf in 0..num_leaves {
            for (run, value) in leaves.iter().zip(sample.iter_mut()) {
                *value = run[leaf];
            }
            sample.sort_by(|a, b| a.total_cmp(b));
            values[leaf] = sample[pick];
        }
        assembled
            .set_leaf_values(&values)
            .expect("models of one node share a shape");
        out.push(assembled);
    }
    out
}

/// Euclidean distance between two per-node result sets.
pub fn result_distance_2norm(a: &[TimeSeries], b: &[TimeSeries]) -> Real {
    assert_eq!(a.len(), b.len());
    let mut norm_sqr = 0.0;
    for (sa, sb) in a.iter().zip(b) {
        for time in 0..sa.num_time_points().min(sb.num_time_points()) {
            let diff = sa.value(time) - sb.value(time);
            norm_sqr += diff.dot(&diff);
        }
    }
    norm_sqr.sqrt()
}

/// Euclidean distance restricted to one compartment.
pub fn result_distance_2norm_compartment(
    a: &[TimeSeries],
    b: &[TimeSeries],
    compartment: Compartment,
) -> Real {
    assert_eq!(a.len(), b.len());
    let mut norm_sqr = 0.0;
    for (sa, sb) in a.iter().zip(b) {
        let num_groups = sa.num_elements() / NUM_COMPARTMENTS;
        for time in 0..sa.num_time_points().min(sb.num_time_points()) {
            for age in 0..num_groups {
                let idx = age * NUM_COMPARTMENTS + compartment.index();
                let d = sa.value(time)[idx] - sb.value(time)[idx];
                norm_sqr += d * d;
            }
        }
    }
    norm_sqr.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn series(points: &[(Real, &[Real])]) -> TimeSeries {
        let mut ts = TimeSeries::new(points[0].1.len());
        for (t, v) in points {
            ts.add_time_point(*t, DVector::from_row_slice(v));
        }
        ts
    }

    #[test]
    fn interpolation_hits_integer_days() {
        let ts = series(&[
            (0.0, &[0.0]),
            (0.4, &[4.0]),
            (1.5, &[15.0]),
            (3.1, &[31.0]),
        ]);
        let interp = interpolate_simulation_result(&ts);
        assert_eq!(interp.times(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!((interp.value(1)[0] - 10.0).abs() < 1e-12);
        assert!((interp.value(2)[0] - 20.0).abs() < 1e-12);
        assert!((interp.value(3)[0] - 30.0).abs() < 1e-12);
        // boundary held constant past tmax
        assert_eq!(interp.value(4)[0], 31.0);
    }

    #[test]
    fn interpolation_is_idempotent_on_integer_days() {
        let ts = series(&[(0.0, &[1.0, 2.0]), (1.0, &[3.0, 4.0]), (2.0, &[5.0, 6.0])]);
        let once = interpolate_simulation_result(&ts);
        assert_eq!(once, ts);
        let twice = interpolate_simulation_result(&once);
        assert_eq!(twice, once);
    }

    #[test]
    fn interpolation_spans_gaps_of_several_days() {
        let ts = series(&[(0.0, &[0.0]), (4.0, &[40.0])]);
        let interp = interpolate_simulation_result(&ts);
        assert_eq!(interp.times(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        for (i, t) in interp.times().iter().enumerate() {
            assert!((interp.value(i)[0] - 10.0 * t).abs() < 1e-12);
        }
    }

    #[test]
    fn sum_nodes_adds_elementwise() {
        let run = vec![
            series(&[(0.0, &[1.0, 2.0]), (1.0, &[3.0, 4.0])]),
            series(&[(0.0, &[10.0, 20.0]), (1.0, &[30.0, 40.0])]),
        ];
        let summed = sum_nodes(&[run]);
        assert_eq!(summed.len(), 1);
        assert_eq!(summed[0].value(0)[0], 11.0);
        assert_eq!(summed[0].value(1)[1], 44.0);
        assert_eq!(summed[0].times(), &[0.0, 1.0]);
    }

    #[test]
    fn mean_is_the_average_over_runs() {
        let ensemble = vec![
            vec![series(&[(0.0, &[1.0]), (1.0, &[2.0])])],
            vec![series(&[(0.0, &[3.0]), (1.0, &[6.0])])],
        ];
        let mean = ensemble_mean(&ensemble);
        assert_eq!(mean.len(), 1);
        assert!((mean[0].value(0)[0] - 2.0).abs() < 1e-12);
        assert!((mean[0].value(1)[0] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn percentile_picks_sorted_index() {
        // four runs, single node/time/element with values 0.0, 0.1, 0.2, 0.3
        let ensemble: Vec<Vec<TimeSeries>> = [0.1, 0.3, 0.0, 0.2]
            .iter()
            .map(|&v| vec![series(&[(1.0, &[v])])])
            .collect();
        assert_eq!(ensemble_percentile(&ensemble, 0.2)[0].value(0)[0], 0.0);
        assert_eq!(ensemble_percentile(&ensemble, 0.4)[0].value(0)[0], 0.1);
        assert_eq!(ensemble_percentile(&ensemble, 0.7)[0].value(0)[0], 0.2);
        assert_eq!(ensemble_percentile(&ensemble, 0.9)[0].value(0)[0], 0.3);
    }

    #[test]
    fn percentile_is_monotone_in_p() {
        let ensemble: Vec<Vec<TimeSeries>> = [5.0, 1.0, 4.0, 2.0, 3.0]
            .iter()
            .map(|&v| vec![series(&[(0.0, &[v])])])
            .collect();
        let mut last = f64::NEG_INFINITY;
        for p in [0.1, 0.25, 0.5, 0.75, 0.9] {
            let value = ensemble_percentile(&ensemble, p)[0].value(0)[0];
            assert!(value >= last);
            last = value;
        }
    }

    #[test]
    fn ragged_ensembles_reduce_common_prefix() {
        let ensemble = vec![
            vec![
                series(&[(0.0, &[1.0]), (1.0, &[2.0])]),
                series(&[(0.0, &[5.0]), (1.0, &[6.0])]),
            ],
            // this run lost its second node and one time point
            vec![series(&[(0.0, &[3.0])])],
        ];
        let mean = ensemble_mean(&ensemble);
        assert_eq!(mean.len(), 1);
        assert_eq!(mean[0].num_time_points(), 1);
        assert!((mean[0].value(0)[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_ensembles_reduce_to_nothing() {
        assert!(ensemble_mean(&[]).is_empty());
        assert!(sum_nodes(&[]).is_empty());
    }

    #[test]
    fn distance_counts_all_elements() {
        let a = vec![series(&[(0.0, &[1.0, 1.0]), (1.0, &[2.0, 2.0])])];
        let b = vec![series(&[(0.0, &[3.0, 3.0]), (1.0, &[2.0, 2.0])])];
        assert!((result_distance_2norm(&a, &a)).abs() < 1e-15);
        assert!((result_distance_2norm(&a, &b) - (8.0_f64).sqrt()).abs() < 1e-12);
    }
}
