//! The dense population cube over (age group, compartment).

use ef_core::{AgeGroup, Real};
use ef_params::UncertainValue;
use nalgebra::DVector;

use crate::compartments::{Compartment, NUM_COMPARTMENTS};

/// Population counts per (age group, compartment) cell.
///
/// Cells are `UncertainValue`s so initial states can be sampled in an
/// ensemble. Flat indexing is age-major: cell `(a, c)` lives at
/// `a * NUM_COMPARTMENTS + c`, matching the layout of simulation state
/// vectors and exported time series.
#[derive(Clone, Debug, PartialEq)]
pub struct Populations {
    num_groups: usize,
    cells: Vec<UncertainValue>,
}

impl Populations {
    pub fn new(num_groups: usize) -> Self {
        Self {
            num_groups,
            cells: vec![UncertainValue::new(0.0); num_groups * NUM_COMPARTMENTS],
        }
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn num_compartments(&self) -> usize {
        self.cells.len()
    }

    pub fn flat_index(&self, age: AgeGroup, compartment: Compartment) -> usize {
        debug_assert!(age.get() < self.num_groups);
        age.get() * NUM_COMPARTMENTS + compartment.index()
    }

    pub fn get(&self, age: AgeGroup, compartment: Compartment) -> Real {
        self.cells[self.flat_index(age, compartment)].value()
    }

    pub fn set(&mut self, age: AgeGroup, compartment: Compartment, value: Real) {
        let idx = self.flat_index(age, compartment);
        self.cells[idx].set_value(value);
    }

    pub fn cell(&self, age: AgeGroup, compartment: Compartment) -> &UncertainValue {
        &self.cells[self.flat_index(age, compartment)]
    }

    pub fn cell_mut(&mut self, age: AgeGroup, compartment: Compartment) -> &mut UncertainValue {
        let idx = self.flat_index(age, compartment);
        &mut self.cells[idx]
    }

    pub fn cells(&self) -> impl Iterator<Item = &UncertainValue> {
        self.cells.iter()
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut UncertainValue> {
        self.cells.iter_mut()
    }

    pub fn get_total(&self) -> Real {
        self.cells.iter().map(|c| c.value()).sum()
    }

    pub fn get_group_total(&self, age: AgeGroup) -> Real {
        let start = age.get() * NUM_COMPARTMENTS;
        self.cells[start..start + NUM_COMPARTMENTS]
            .iter()
            .map(|c| c.value())
            .sum()
    }

    /// Rescale all cells proportionally so they sum to `total`.
    ///
    /// An all-zero cube is split evenly across the cells.
    pub fn set_total(&mut self, total: Real) {
        let current = self.get_total();
        if current > 0.0 {
            let factor = total / current;
            for cell in &mut self.cells {
                let v = cell.value();
                cell.set_value(v * factor);
            }
        } else {
            let share = total / self.cells.len() as Real;
            for cell in &mut self.cells {
                cell.set_value(share);
            }
        }
    }

    /// Rescale the cells of one age group so they sum to `total`.
    pub fn set_group_total(&mut self, age: AgeGroup, total: Real) {
        let current = self.get_group_total(age);
        let start = age.get() * NUM_COMPARTMENTS;
        let group = &mut self.cells[start..start + NUM_COMPARTMENTS];
        if current > 0.0 {
            let factor = total / current;
            for cell in group.iter_mut() {
                let v = cell.value();
                cell.set_value(v * factor);
            }
        } else {
            let share = total / NUM_COMPARTMENTS as Real;
            for cell in group.iter_mut() {
                cell.set_value(share);
            }
        }
    }

    /// Set one cell so the whole cube sums to `total`.
    ///
    /// A target that would need a negative cell is zeroed with a warning.
    pub fn set_difference_from_total(
        &mut self,
        age: AgeGroup,
        compartment: Compartment,
        total: Real,
    ) {
        let idx = self.flat_index(age, compartment);
        let rest = self.get_total() - self.cells[idx].value();
        self.set_checked(idx, total - rest);
    }

    /// Set one cell so its age group sums to `total`.
    pub fn set_difference_from_group_total(
        &mut self,
        age: AgeGroup,
        compartment: Compartment,
        total: Real,
    ) {
        let idx = self.flat_index(age, compartment);
        let rest = self.get_group_total(age) - self.cells[idx].value();
        self.set_checked(idx, total - rest);
    }

    fn set_checked(&mut self, idx: usize, value: Real) {
        if value < 0.0 {
            tracing::warn!(
                value,
                "population difference would be negative, setting cell to 0"
            );
            self.cells[idx].set_value(0.0);
        } else {
            self.cells[idx].set_value(value);
        }
    }

    /// The cube flattened into a state vector for the integrator.
    pub fn get_compartments(&self) -> DVector<Real> {
        DVector::from_iterator(self.cells.len(), self.cells.iter().map(|c| c.value()))
    }

    /// Overwrite all cell values from a flat state vector.
    pub fn set_compartments(&mut self, values: &DVector<Real>) {
        debug_assert_eq!(values.len(), self.cells.len());
        for (cell, &v) in self.cells.iter_mut().zip(values.iter()) {
            cell.set_value(v);
        }
    }
}
