use super::{Field, FieldTable};
use serde::{Deserialize, Serialize};

/// Holds the convergence tolerances
///
/// All relative tolerances are compared against squared norms, as follows:
///
/// ```text
/// residual:  R₁·R₁         ≤ tol_residual · R₀·R₀ (initial)
/// energy:    s |d·R₁|      ≤ tol_energy · |d₀·R₀| (initial)
/// field:     s² |δx|²      ≤ tol_field² · |Δx|²   (accumulated during the step)
/// ```
///
/// A tolerance equal to zero (or negative) disables the respective criterion.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ConvergenceTolerances {
    /// Relative tolerance on the residual norm
    pub residual: f64,

    /// Relative tolerance on the energy norm
    pub energy: f64,

    /// Relative tolerances on the increments of each field
    pub fields: FieldTable<f64>,

    /// Absolute floor on the squared residual norm
    ///
    /// Below this floor the residual is considered zero.
    pub min_residual: f64,

    /// Floor on the squared residual norm relative to the initial one
    ///
    /// Below `min_residual_ratio · R₀·R₀` the residual is considered zero, regardless of the
    /// scale of the problem.
    pub min_residual_ratio: f64,

    /// Minimum allowed line search step
    pub min_step: f64,
}

impl ConvergenceTolerances {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        ConvergenceTolerances {
            residual: 0.0,
            energy: 0.01,
            fields: FieldTable::from_fn(|field| match field {
                Field::Displacement => 0.001,
                _ => 0.01,
            }),
            min_residual: 1e-20,
            min_residual_ratio: 1e-20,
            min_step: 0.01,
        }
    }

    /// Returns the tolerance of a field
    #[inline]
    pub fn field(&self, field: Field) -> f64 {
        self.fields[field]
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if !self.residual.is_finite() || !self.energy.is_finite() {
            return Some("tolerances must be finite".to_string());
        }
        for (field, tol) in self.fields.iter() {
            if !tol.is_finite() {
                return Some(format!("tolerance for {} must be finite", field));
            }
        }
        if self.min_residual < 0.0 {
            return Some(format!(
                "min_residual = {:?} is incorrect; it must be ≥ 0.0",
                self.min_residual
            ));
        }
        if self.min_residual_ratio < 0.0 || self.min_residual_ratio >= 1.0 {
            return Some(format!(
                "min_residual_ratio = {:?} is incorrect; it must be 0.0 ≤ min_residual_ratio < 1.0",
                self.min_residual_ratio
            ));
        }
        if self.min_step <= 0.0 || self.min_step >= 1.0 {
            return Some(format!(
                "min_step = {:?} is incorrect; it must be 0.0 < min_step < 1.0",
                self.min_step
            ));
        }
        None // all good
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::ConvergenceTolerances;
    use crate::base::Field;

    #[test]
    fn new_works() {
        let tol = ConvergenceTolerances::new();
        assert_eq!(tol.residual, 0.0);
        assert_eq!(tol.energy, 0.01);
        assert_eq!(tol.field(Field::Displacement), 0.001);
        assert_eq!(tol.field(Field::Pressure), 0.01);
        assert_eq!(tol.field(Field::Concentration), 0.01);
        assert_eq!(tol.field(Field::Temperature), 0.01);
        assert_eq!(tol.min_residual, 1e-20);
        assert_eq!(tol.min_residual_ratio, 1e-20);
        assert_eq!(tol.min_step, 0.01);
        assert_eq!(tol.validate(), None);
    }

    #[test]
    fn validate_captures_errors() {
        let mut tol = ConvergenceTolerances::new();
        tol.energy = f64::NAN;
        assert_eq!(tol.validate(), Some("tolerances must be finite".to_string()));
        tol.energy = 0.01;
        tol.fields[Field::Pressure] = f64::INFINITY;
        assert_eq!(
            tol.validate(),
            Some("tolerance for fluid pressure must be finite".to_string())
        );
        tol.fields[Field::Pressure] = 0.01;
        tol.min_residual = -1.0;
        assert_eq!(
            tol.validate(),
            Some("min_residual = -1.0 is incorrect; it must be ≥ 0.0".to_string())
        );
        tol.min_residual = 0.0;
        tol.min_residual_ratio = 1.0;
        assert_eq!(
            tol.validate(),
            Some("min_residual_ratio = 1.0 is incorrect; it must be 0.0 ≤ min_residual_ratio < 1.0".to_string())
        );
        tol.min_residual_ratio = 0.0;
        tol.min_step = 1.0;
        assert_eq!(
            tol.validate(),
            Some("min_step = 1.0 is incorrect; it must be 0.0 < min_step < 1.0".to_string())
        );
        tol.min_step = 0.1;
        assert_eq!(tol.validate(), None);
    }
}
