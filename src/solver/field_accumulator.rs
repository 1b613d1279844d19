use crate::base::{EquationPartition, Field, FieldTable};
use crate::StrError;
use russell_lab::{vec_inner, vec_update, Vector};

/// Holds the increments of one field
pub struct FieldAccumulator {
    /// Increment of the field in the last iteration (the search direction restricted to the field)
    ///
    /// (n_equation_field)
    pub increment: Vector,

    /// Increment of the field accumulated during the step
    ///
    /// (n_equation_field)
    pub total: Vector,
}

impl FieldAccumulator {
    /// Allocates a new instance
    pub fn new(n_equation_field: usize) -> Self {
        FieldAccumulator {
            increment: Vector::new(n_equation_field),
            total: Vector::new(n_equation_field),
        }
    }

    /// Returns the number of equations of the field
    #[inline]
    pub fn dim(&self) -> usize {
        self.total.dim()
    }

    /// Returns the squared norm of the last (unscaled) increment |δx|²
    pub fn increment_norm_sq(&self) -> f64 {
        vec_inner(&self.increment, &self.increment)
    }

    /// Returns the squared norm of the accumulated increment |Δx|²
    pub fn total_norm_sq(&self) -> f64 {
        vec_inner(&self.total, &self.total)
    }
}

/// Holds the trial increment of the step and the per-field accumulators
pub struct IterateState {
    /// Increment of all equations accumulated during the step
    ///
    /// (n_equation)
    pub total: Vector,

    /// Per-field accumulators
    pub fields: FieldTable<FieldAccumulator>,
}

impl IterateState {
    /// Allocates a new instance
    pub fn new(partition: &EquationPartition) -> Self {
        IterateState {
            total: Vector::new(partition.n_equation()),
            fields: FieldTable::from_fn(|field| FieldAccumulator::new(partition.equations(field).len())),
        }
    }

    /// Resets all increments (at the beginning of a step)
    pub fn reset(&mut self) {
        self.total.fill(0.0);
        for (_, acc) in self.fields.iter_mut() {
            acc.increment.fill(0.0);
            acc.total.fill(0.0);
        }
    }

    /// Extracts the per-field increments from the search direction
    pub fn set_direction(&mut self, partition: &EquationPartition, ui: &Vector) -> Result<(), StrError> {
        for (field, acc) in self.fields.iter_mut() {
            partition.gather(field, ui, &mut acc.increment)?;
        }
        Ok(())
    }

    /// Accumulates the scaled search direction (after the line search)
    pub fn accumulate(&mut self, ui: &Vector, s: f64) -> Result<(), StrError> {
        vec_update(&mut self.total, s, ui)?;
        for (_, acc) in self.fields.iter_mut() {
            vec_update(&mut acc.total, s, &acc.increment)?;
        }
        Ok(())
    }

    /// Returns the accumulator of a field
    #[inline]
    pub fn field(&self, field: Field) -> &FieldAccumulator {
        &self.fields[field]
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
