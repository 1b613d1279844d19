use super::{ConstraintAugmenter, EquilibriumState};
use crate::StrError;
use russell_lab::Vector;
use russell_sparse::CooMatrix;
use serde::{Deserialize, Serialize};

/// Holds a homogeneous linear constraint Σ cᵢ uᵢ = 0 and its Lagrange multiplier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearConstraint {
    /// Holds the (equation, coefficient) pairs
    pub terms: Vec<(usize, f64)>,

    /// Lagrange multiplier λ
    pub multiplier: f64,
}

impl LinearConstraint {
    /// Computes the gap g = Σ cᵢ uᵢ
    pub fn gap(&self, uu: &Vector) -> f64 {
        self.terms.iter().fold(0.0, |acc, (eq, c)| acc + c * uu[*eq])
    }
}

/// Enforces a set of linear constraints with the augmented Lagrangian method
///
/// The constraint energy is `λ g + ε g² / 2`; hence, the internal force is `(λ + ε g) c` and
/// the tangent is `ε c cᵀ`. After the equilibrium iterations converge, the multipliers are
/// updated with `λ ← λ + ε g` until the relative change of `Σ λ²` is below the tolerance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearConstraintSet {
    /// Holds all constraints
    pub constraints: Vec<LinearConstraint>,

    /// Penalty factor ε
    pub penalty: f64,

    /// Tolerance on the relative change of the multipliers
    pub tolerance: f64,

    /// Indicates that the multipliers are carried across steps
    pub persist: bool,
}

impl LinearConstraintSet {
    /// Allocates a new (empty) instance
    pub fn new(penalty: f64, tolerance: f64) -> Result<Self, StrError> {
        if penalty <= 0.0 {
            return Err("penalty factor must be > 0.0");
        }
        if tolerance <= 0.0 {
            return Err("augmentation tolerance must be > 0.0");
        }
        Ok(LinearConstraintSet {
            constraints: Vec::new(),
            penalty,
            tolerance,
            persist: true,
        })
    }

    /// Adds a new constraint Σ cᵢ uᵢ = 0
    pub fn add(&mut self, terms: &[(usize, f64)]) -> Result<&mut Self, StrError> {
        if terms.len() == 0 {
            return Err("a linear constraint must have at least one term");
        }
        self.constraints.push(LinearConstraint {
            terms: terms.to_vec(),
            multiplier: 0.0,
        });
        Ok(self)
    }

    /// Returns the supremum of the number of non-zero values added to the tangent
    pub fn nnz_sup(&self) -> usize {
        self.constraints.iter().map(|c| c.terms.len() * c.terms.len()).sum()
    }

    /// Returns the largest absolute gap
    pub fn max_gap(&self, uu: &Vector) -> f64 {
        self.constraints.iter().fold(0.0, |acc, c| f64::max(acc, f64::abs(c.gap(uu))))
    }

    /// Subtracts the constraint forces from the residual R = F_ext - F_int
    pub fn add_to_residual(&self, rr: &mut Vector, uu: &Vector) {
        for constraint in &self.constraints {
            let force = constraint.multiplier + self.penalty * constraint.gap(uu);
            for (eq, c) in &constraint.terms {
                rr[*eq] -= c * force;
            }
        }
    }

    /// Adds the penalty stiffness to the tangent matrix
    pub fn add_to_tangent(&self, kk: &mut CooMatrix) -> Result<(), StrError> {
        for constraint in &self.constraints {
            for (i, ci) in &constraint.terms {
                for (j, cj) in &constraint.terms {
                    kk.put(*i, *j, self.penalty * ci * cj)?;
                }
            }
        }
        Ok(())
    }
}

impl ConstraintAugmenter for LinearConstraintSet {
    fn has_constraints(&self) -> bool {
        self.constraints.len() > 0
    }

    fn constraints_persist(&self) -> bool {
        self.persist
    }

    fn reset_constraints(&mut self) {
        for constraint in &mut self.constraints {
            constraint.multiplier = 0.0;
        }
    }

    fn augment(&mut self, uu: &Vector, _state: &EquilibriumState) -> Result<bool, StrError> {
        let mut norm_0 = 0.0;
        let mut norm_1 = 0.0;
        let mut updated = Vec::with_capacity(self.constraints.len());
        for constraint in &self.constraints {
            let lambda = constraint.multiplier + self.penalty * constraint.gap(uu);
            norm_0 += constraint.multiplier * constraint.multiplier;
            norm_1 += lambda * lambda;
            updated.push(lambda);
        }
        let pctn = if norm_1 > 0.0 {
            f64::abs((norm_1 - norm_0) / norm_1)
        } else {
            0.0
        };
        if pctn < self.tolerance {
            return Ok(true);
        }
        for (constraint, lambda) in self.constraints.iter_mut().zip(updated) {
            constraint.multiplier = lambda;
        }
        Ok(false)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
