use super::EquilibriumState;
use crate::StrError;
use russell_lab::Vector;
use russell_sparse::CooMatrix;

/// Computes the global residual vector of the discretized model
///
/// The residual follows the convention `R = F_ext - F_int`; thus the solution increment
/// is obtained from `K·d = R` and the trial solution is updated with `u ← u + s·d`.
pub trait ResidualProvider {
    /// Computes the residual vector at a trial solution
    ///
    /// # Input
    ///
    /// * `rr` -- (output) the residual vector (n_equation); it must be completely overwritten
    /// * `uu` -- the trial solution, i.e., the last accepted solution plus the increment of the step
    /// * `state` -- the state at the new time; `state.uu` still holds the last accepted solution
    ///
    /// **Note:** The residual must be a pure function of (uu, state). The concentrated loads must
    /// not be included because they are added by the solver.
    fn residual(&mut self, rr: &mut Vector, uu: &Vector, state: &EquilibriumState) -> Result<(), StrError>;

    /// Adds the concentrated (solution-independent) loads of the step
    ///
    /// This function is called once per step and the result is added to every residual.
    fn concentrated_loads(&mut self, _ff: &mut Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        Ok(())
    }
}

/// Computes the tangent (stiffness) matrix of the discretized model
pub trait TangentProvider {
    /// Returns the supremum of the number of non-zero values of the tangent matrix
    fn nnz_sup(&self) -> usize;

    /// Assembles the tangent matrix `K = -∂R/∂u` at a trial solution
    ///
    /// The matrix is reset before this call.
    fn tangent(&mut self, kk: &mut CooMatrix, uu: &Vector, state: &EquilibriumState) -> Result<(), StrError>;

    /// Computes the right-hand-side correction associated with the tangent (e.g., the capacitance
    /// matrix times the last accepted temperature in transient heat transfer)
    ///
    /// The vector is zeroed before this call.
    fn rhs_correction(&mut self, _rr: &mut Vector, _uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        Ok(())
    }
}

/// Assembles and solves the linearized system `K·x = b`
///
/// The factorization is computed by [LinearSystemAdapter::reform] and reused by all subsequent
/// calls to [LinearSystemAdapter::solve] until the next reformation.
pub trait LinearSystemAdapter {
    /// Assembles and factorizes the tangent matrix
    ///
    /// If `rhs_correction` is given, the correction computed by the tangent provider is written to it.
    fn reform(
        &mut self,
        tangent: &mut dyn TangentProvider,
        uu: &Vector,
        state: &EquilibriumState,
        rhs_correction: Option<&mut Vector>,
    ) -> Result<(), StrError>;

    /// Solves the linear system with the last factorization
    fn solve(&mut self, x: &mut Vector, rhs: &Vector) -> Result<(), StrError>;
}

/// Enforces the constraints of the model by augmentations (e.g., augmented Lagrangian)
pub trait ConstraintAugmenter {
    /// Returns whether the model has constraints requiring augmentations or not
    fn has_constraints(&self) -> bool {
        false
    }

    /// Returns whether the constraint state is carried across steps or not
    fn constraints_persist(&self) -> bool {
        true
    }

    /// Resets the constraint state (e.g., the Lagrange multipliers)
    fn reset_constraints(&mut self) {}

    /// Performs an augmentation at the converged trial solution
    ///
    /// Returns true if the constraints are satisfied; otherwise, the constraint state has been
    /// updated and the residual must be recomputed.
    fn augment(&mut self, _uu: &Vector, _state: &EquilibriumState) -> Result<bool, StrError> {
        Ok(true)
    }
}

/// Combines the capabilities of a model solved by the equilibrium solver
pub trait EquilibriumModel: ResidualProvider + TangentProvider + ConstraintAugmenter {}

impl<T> EquilibriumModel for T where T: ResidualProvider + TangentProvider + ConstraintAugmenter {}
