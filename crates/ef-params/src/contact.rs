//! Baseline contact matrices with attached damping sequences.

use std::ops::{Index, IndexMut};

use ef_core::Real;
use nalgebra::DMatrix;

use crate::damping::Dampings;

/// Contact frequencies between age groups for one contact setting
/// (e.g. home, school, work, other), with its damping sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactMatrix {
    baseline: DMatrix<Real>,
    dampings: Dampings,
}

impl ContactMatrix {
    pub fn new(baseline: DMatrix<Real>) -> Self {
        debug_assert_eq!(baseline.nrows(), baseline.ncols());
        Self {
            baseline,
            dampings: Dampings::new(),
        }
    }

    /// Square matrix with all entries equal; the common single-setting setup.
    pub fn from_constant(num_groups: usize, value: Real) -> Self {
        Self::new(DMatrix::from_element(num_groups, num_groups, value))
    }

    pub fn num_groups(&self) -> usize {
        self.baseline.nrows()
    }

    pub fn baseline(&self) -> &DMatrix<Real> {
        &self.baseline
    }

    pub fn baseline_mut(&mut self) -> &mut DMatrix<Real> {
        &mut self.baseline
    }

    pub fn dampings(&self) -> &Dampings {
        &self.dampings
    }

    /// Append a damping matrix taking effect at `time`.
    pub fn add_damping(&mut self, value: DMatrix<Real>, time: Real) {
        debug_assert_eq!(value.nrows(), self.baseline.nrows());
        debug_assert_eq!(value.ncols(), self.baseline.ncols());
        self.dampings.add(value, time);
    }

    /// Append a uniform damping of strength `value` taking effect at `time`.
    pub fn add_damping_constant(&mut self, value: Real, time: Real) {
        let n = self.num_groups();
        self.dampings.add(DMatrix::from_element(n, n, value), time);
    }

    /// Effective contact matrix at time `t`: `B_ij * (1 - D_ij(t))`.
    pub fn effective_at(&self, t: Real) -> DMatrix<Real> {
        let n = self.num_groups();
        let damping = self.dampings.cumulative_at(t, n, n);
        let mut effective = self.baseline.clone();
        effective.zip_apply(&damping, |b, d| *b *= 1.0 - d);
        effective
    }
}

/// One contact matrix per contact setting; the effective contact
/// structure at a time is the sum over settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactMatrixGroup {
    matrices: Vec<ContactMatrix>,
}

impl ContactMatrixGroup {
    /// `num_settings` zero matrices of size `num_groups`.
    pub fn new(num_settings: usize, num_groups: usize) -> Self {
        debug_assert!(num_settings > 0);
        Self {
            matrices: vec![ContactMatrix::from_constant(num_groups, 0.0); num_settings],
        }
    }

    pub fn num_settings(&self) -> usize {
        self.matrices.len()
    }

    pub fn num_groups(&self) -> usize {
        self.matrices[0].num_groups()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContactMatrix> {
        self.matrices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ContactMatrix> {
        self.matrices.iter_mut()
    }

    /// Sum of the settings' effective matrices at time `t`.
    pub fn effective_at(&self, t: Real) -> DMatrix<Real> {
        let n = self.num_groups();
        let mut sum = DMatrix::zeros(n, n);
        for matrix in &self.matrices {
            sum += matrix.effective_at(t);
        }
        sum
    }
}

impl Index<usize> for ContactMatrixGroup {
    type Output = ContactMatrix;

    fn index(&self, setting: usize) -> &ContactMatrix {
        &self.matrices[setting]
    }
}

impl IndexMut<usize> for ContactMatrixGroup {
    fn index_mut(&mut self, setting: usize) -> &mut ContactMatrix {
        &mut self.matrices[setting]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_matrix_applies_damping() {
        let mut cm = ContactMatrix::from_constant(1, 10.0);
        cm.add_damping_constant(0.7, 30.0);
        assert_eq!(cm.effective_at(0.0)[(0, 0)], 10.0);
        assert_eq!(cm.effective_at(29.9)[(0, 0)], 10.0);
        assert!((cm.effective_at(30.0)[(0, 0)] - 3.0).abs() < 1e-12);
        assert!((cm.effective_at(50.0)[(0, 0)] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn group_sums_over_settings() {
        let mut group = ContactMatrixGroup::new(2, 1);
        group[0] = ContactMatrix::from_constant(1, 6.0);
        group[1] = ContactMatrix::from_constant(1, 4.0);
        group[1].add_damping_constant(0.5, 10.0);
        assert_eq!(group.effective_at(0.0)[(0, 0)], 10.0);
        assert_eq!(group.effective_at(10.0)[(0, 0)], 8.0);
    }

    #[test]
    fn elementwise_damping() {
        let baseline = DMatrix::from_row_slice(2, 2, &[4.0, 2.0, 2.0, 4.0]);
        let mut cm = ContactMatrix::new(baseline);
        let damping = DMatrix::from_row_slice(2, 2, &[0.5, 0.0, 0.0, 1.0]);
        cm.add_damping(damping, 0.0);
        let eff = cm.effective_at(0.0);
        assert_eq!(eff[(0, 0)], 2.0);
        assert_eq!(eff[(0, 1)], 2.0);
        assert_eq!(eff[(1, 1)], 0.0);
    }
}
