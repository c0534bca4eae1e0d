use nalgebra::DVector;

use crate::numeric::Real;

/// Append-only buffer of `(time, value)` samples produced by a simulation.
///
/// Times are monotone non-decreasing; every value vector has the same
/// length (`num_elements`, the flattened age x compartment size). The
/// buffer only ever grows forward; analysis code mutates values in place
/// but never removes points.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    num_elements: usize,
    times: Vec<Real>,
    values: Vec<DVector<Real>>,
}

impl TimeSeries {
    pub fn new(num_elements: usize) -> Self {
        Self {
            num_elements,
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    /// A series of `num_points` zero vectors with zeroed times, used by
    /// analysis code as an accumulator.
    pub fn zero(num_points: usize, num_elements: usize) -> Self {
        Self {
            num_elements,
            times: vec![0.0; num_points],
            values: vec![DVector::zeros(num_elements); num_points],
        }
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn num_time_points(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Append a sample. Times must not decrease.
    pub fn add_time_point(&mut self, t: Real, value: DVector<Real>) {
        debug_assert_eq!(value.len(), self.num_elements);
        debug_assert!(
            self.times.last().map_or(true, |&last| t >= last),
            "time series must grow forward"
        );
        self.times.push(t);
        self.values.push(value);
    }

    pub fn time(&self, i: usize) -> Real {
        self.times[i]
    }

    pub fn set_time(&mut self, i: usize, t: Real) {
        self.times[i] = t;
    }

    pub fn times(&self) -> &[Real] {
        &self.times
    }

    pub fn value(&self, i: usize) -> &DVector<Real> {
        &self.values[i]
    }

    pub fn value_mut(&mut self, i: usize) -> &mut DVector<Real> {
        &mut self.values[i]
    }

    pub fn last_time(&self) -> Real {
        *self.times.last().expect("time series is empty")
    }

    pub fn last_value(&self) -> &DVector<Real> {
        self.values.last().expect("time series is empty")
    }

    pub fn last_value_mut(&mut self) -> &mut DVector<Real> {
        self.values.last_mut().expect("time series is empty")
    }

    pub fn iter(&self) -> impl Iterator<Item = (Real, &DVector<Real>)> {
        self.times.iter().copied().zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_forward() {
        let mut ts = TimeSeries::new(2);
        assert!(ts.is_empty());
        ts.add_time_point(0.0, DVector::from_vec(vec![1.0, 2.0]));
        ts.add_time_point(0.5, DVector::from_vec(vec![3.0, 4.0]));
        assert_eq!(ts.num_time_points(), 2);
        assert_eq!(ts.last_time(), 0.5);
        assert_eq!(ts.value(0)[1], 2.0);
        assert_eq!(ts.last_value()[0], 3.0);
    }

    #[test]
    fn zero_has_requested_shape() {
        let ts = TimeSeries::zero(3, 4);
        assert_eq!(ts.num_time_points(), 3);
        assert_eq!(ts.num_elements(), 4);
        assert!(ts.value(2).iter().all(|&v| v == 0.0));
    }

    #[test]
    #[should_panic(expected = "grow forward")]
    fn rejects_backwards_time() {
        let mut ts = TimeSeries::new(1);
        ts.add_time_point(1.0, DVector::from_vec(vec![0.0]));
        ts.add_time_point(0.5, DVector::from_vec(vec![0.0]));
    }
}
