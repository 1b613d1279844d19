//! Synthetic models for documentation and tests
//!
//! All models follow the residual convention `R = F_ext - F_int` and the tangent `K = -∂R/∂u`.

use super::{ConstraintAugmenter, EquilibriumState, LinearConstraintSet, ResidualProvider, TangentProvider};
use crate::StrError;
use russell_lab::{mat_vec_mul, Matrix, Vector};
use russell_sparse::CooMatrix;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Implements a system of linear springs `K u = f`
pub struct LinearSpringModel {
    /// Stiffness matrix
    pub kk: Matrix,

    /// Concentrated loads
    pub ff: Vector,

    /// Number of residual evaluations
    pub n_residual: usize,
}

impl LinearSpringModel {
    /// Allocates a new instance
    pub fn new<const N: usize>(kk: &[[f64; N]; N], ff: &[f64; N]) -> Self {
        LinearSpringModel {
            kk: Matrix::from(kk),
            ff: Vector::from(ff),
            n_residual: 0,
        }
    }
}

impl ResidualProvider for LinearSpringModel {
    fn residual(&mut self, rr: &mut Vector, uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        mat_vec_mul(rr, -1.0, &self.kk, uu)?;
        self.n_residual += 1;
        Ok(())
    }

    fn concentrated_loads(&mut self, ff: &mut Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        for i in 0..ff.dim() {
            ff[i] += self.ff[i];
        }
        Ok(())
    }
}

impl TangentProvider for LinearSpringModel {
    fn nnz_sup(&self) -> usize {
        let (nrow, ncol) = self.kk.dims();
        nrow * ncol
    }

    fn tangent(&mut self, kk: &mut CooMatrix, _uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        let (nrow, ncol) = self.kk.dims();
        for i in 0..nrow {
            for j in 0..ncol {
                if self.kk.get(i, j) != 0.0 {
                    kk.put(i, j, self.kk.get(i, j))?;
                }
            }
        }
        Ok(())
    }
}

impl ConstraintAugmenter for LinearSpringModel {}

/// Implements the scalar nonlinear spring `u + u³ = target`
///
/// The root is `u = 2` for `target = 10`.
pub struct CubicSpringModel {
    /// External load
    pub target: f64,
}

impl CubicSpringModel {
    /// Allocates a new instance
    pub fn new(target: f64) -> Self {
        CubicSpringModel { target }
    }
}

impl ResidualProvider for CubicSpringModel {
    fn residual(&mut self, rr: &mut Vector, uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        rr[0] = -uu[0] - uu[0] * uu[0] * uu[0];
        Ok(())
    }

    fn concentrated_loads(&mut self, ff: &mut Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        ff[0] += self.target;
        Ok(())
    }
}

impl TangentProvider for CubicSpringModel {
    fn nnz_sup(&self) -> usize {
        1
    }

    fn tangent(&mut self, kk: &mut CooMatrix, uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        kk.put(0, 0, 1.0 + 3.0 * uu[0] * uu[0])
    }
}

impl ConstraintAugmenter for CubicSpringModel {}

/// Implements a scalar system whose residual grows along the search direction
///
/// The residual is `R = 1 + u` whereas the (inconsistent) tangent is `K = 1`.
pub struct DivergingModel {}

impl DivergingModel {
    /// Allocates a new instance
    pub fn new() -> Self {
        DivergingModel {}
    }
}

impl ResidualProvider for DivergingModel {
    fn residual(&mut self, rr: &mut Vector, uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        rr[0] = 1.0 + uu[0];
        Ok(())
    }
}

impl TangentProvider for DivergingModel {
    fn nnz_sup(&self) -> usize {
        1
    }

    fn tangent(&mut self, kk: &mut CooMatrix, _uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        kk.put(0, 0, 1.0)
    }
}

impl ConstraintAugmenter for DivergingModel {}

/// Implements a scalar system whose residual is NaN
///
/// If `finite_at_origin` is set, the residual is `R = 1` at `u = 0` and NaN elsewhere.
pub struct NanModel {
    /// Keeps the residual finite at the origin
    pub finite_at_origin: bool,
}

impl NanModel {
    /// Allocates a new instance (NaN everywhere)
    pub fn new() -> Self {
        NanModel { finite_at_origin: false }
    }

    /// Allocates a new instance with a finite residual at the origin
    pub fn finite_at_origin() -> Self {
        NanModel { finite_at_origin: true }
    }
}

impl ResidualProvider for NanModel {
    fn residual(&mut self, rr: &mut Vector, uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        rr[0] = if self.finite_at_origin && uu[0] == 0.0 {
            1.0
        } else {
            f64::NAN
        };
        Ok(())
    }
}

impl TangentProvider for NanModel {
    fn nnz_sup(&self) -> usize {
        1
    }

    fn tangent(&mut self, kk: &mut CooMatrix, _uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        kk.put(0, 0, 1.0)
    }
}

impl ConstraintAugmenter for NanModel {}

/// Implements the scalar spring `k u = 1` assembled with the unit tangent `K = 1`
///
/// With a large `k`, the full step overshoots the root by far and the line search collapses.
pub struct SoftTangentModel {
    /// Actual stiffness
    pub stiffness: f64,
}

impl SoftTangentModel {
    /// Allocates a new instance
    pub fn new(stiffness: f64) -> Self {
        SoftTangentModel { stiffness }
    }
}

impl ResidualProvider for SoftTangentModel {
    fn residual(&mut self, rr: &mut Vector, uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        rr[0] = 1.0 - self.stiffness * uu[0];
        Ok(())
    }
}

impl TangentProvider for SoftTangentModel {
    fn nnz_sup(&self) -> usize {
        1
    }

    fn tangent(&mut self, kk: &mut CooMatrix, _uu: &Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        kk.put(0, 0, 1.0)
    }
}

impl ConstraintAugmenter for SoftTangentModel {}

/// Implements linear springs with linear constraints enforced by the augmented Lagrangian method
pub struct ConstrainedSpringsModel {
    /// Linear springs
    pub springs: LinearSpringModel,

    /// Linear constraints
    pub constraints: LinearConstraintSet,
}

impl ConstrainedSpringsModel {
    /// Allocates a new instance
    pub fn new(springs: LinearSpringModel, constraints: LinearConstraintSet) -> Self {
        ConstrainedSpringsModel { springs, constraints }
    }
}

impl ResidualProvider for ConstrainedSpringsModel {
    fn residual(&mut self, rr: &mut Vector, uu: &Vector, state: &EquilibriumState) -> Result<(), StrError> {
        self.springs.residual(rr, uu, state)?;
        self.constraints.add_to_residual(rr, uu);
        Ok(())
    }

    fn concentrated_loads(&mut self, ff: &mut Vector, state: &EquilibriumState) -> Result<(), StrError> {
        self.springs.concentrated_loads(ff, state)
    }
}

impl TangentProvider for ConstrainedSpringsModel {
    fn nnz_sup(&self) -> usize {
        self.springs.nnz_sup() + self.constraints.nnz_sup()
    }

    fn tangent(&mut self, kk: &mut CooMatrix, uu: &Vector, state: &EquilibriumState) -> Result<(), StrError> {
        self.springs.tangent(kk, uu, state)?;
        self.constraints.add_to_tangent(kk)
    }
}

impl ConstraintAugmenter for ConstrainedSpringsModel {
    fn has_constraints(&self) -> bool {
        self.constraints.has_constraints()
    }

    fn constraints_persist(&self) -> bool {
        self.constraints.constraints_persist()
    }

    fn reset_constraints(&mut self) {
        self.constraints.reset_constraints();
    }

    fn augment(&mut self, uu: &Vector, state: &EquilibriumState) -> Result<bool, StrError> {
        self.constraints.augment(uu, state)
    }
}

/// Implements the transient heat balance of a single node
///
/// ```text
/// C (T - Tₙ) / Δt + k T = q
/// ```
///
/// The residual and tangent consider `(C/Δt + k) T` only; the term `C Tₙ / Δt` is the
/// right-hand-side correction computed with the last accepted temperature.
pub struct HeatCapacitanceModel {
    /// Conductance k
    pub conductance: f64,

    /// Capacitance C
    pub capacitance: f64,

    /// Heat source q
    pub source: f64,
}

impl HeatCapacitanceModel {
    /// Allocates a new instance
    pub fn new(conductance: f64, capacitance: f64, source: f64) -> Self {
        HeatCapacitanceModel {
            conductance,
            capacitance,
            source,
        }
    }

    /// Returns the coefficient C/Δt + k
    fn coefficient(&self, state: &EquilibriumState) -> f64 {
        self.capacitance / state.dt + self.conductance
    }
}

impl ResidualProvider for HeatCapacitanceModel {
    fn residual(&mut self, rr: &mut Vector, uu: &Vector, state: &EquilibriumState) -> Result<(), StrError> {
        rr[0] = -self.coefficient(state) * uu[0];
        Ok(())
    }

    fn concentrated_loads(&mut self, ff: &mut Vector, _state: &EquilibriumState) -> Result<(), StrError> {
        ff[0] += self.source;
        Ok(())
    }
}

impl TangentProvider for HeatCapacitanceModel {
    fn nnz_sup(&self) -> usize {
        1
    }

    fn tangent(&mut self, kk: &mut CooMatrix, _uu: &Vector, state: &EquilibriumState) -> Result<(), StrError> {
        kk.put(0, 0, self.coefficient(state))
    }

    fn rhs_correction(&mut self, rr: &mut Vector, _uu: &Vector, state: &EquilibriumState) -> Result<(), StrError> {
        rr[0] = self.capacitance * state.uu[0] / state.dt;
        Ok(())
    }
}

impl ConstraintAugmenter for HeatCapacitanceModel {}

/// Wraps a model and raises the cancel flag after a number of residual evaluations
pub struct Cancelling<M> {
    /// The wrapped model
    pub model: M,

    /// The flag shared with the solver
    pub flag: Arc<AtomicBool>,

    /// Number of residual evaluations before raising the flag
    pub n_evaluations: usize,

    /// Number of residual evaluations so far
    pub count: usize,
}

impl<M> Cancelling<M> {
    /// Allocates a new instance
    pub fn new(model: M, flag: Arc<AtomicBool>, n_evaluations: usize) -> Self {
        Cancelling {
            model,
            flag,
            n_evaluations,
            count: 0,
        }
    }
}

impl<M: ResidualProvider> ResidualProvider for Cancelling<M> {
    fn residual(&mut self, rr: &mut Vector, uu: &Vector, state: &EquilibriumState) -> Result<(), StrError> {
        self.count += 1;
        if self.count >= self.n_evaluations {
            self.flag.store(true, Ordering::Relaxed);
        }
        self.model.residual(rr, uu, state)
    }

    fn concentrated_loads(&mut self, ff: &mut Vector, state: &EquilibriumState) -> Result<(), StrError> {
        self.model.concentrated_loads(ff, state)
    }
}

impl<M: TangentProvider> TangentProvider for Cancelling<M> {
    fn nnz_sup(&self) -> usize {
        self.model.nnz_sup()
    }

    fn tangent(&mut self, kk: &mut CooMatrix, uu: &Vector, state: &EquilibriumState) -> Result<(), StrError> {
        self.model.tangent(kk, uu, state)
    }

    fn rhs_correction(&mut self, rr: &mut Vector, uu: &Vector, state: &EquilibriumState) -> Result<(), StrError> {
        self.model.rhs_correction(rr, uu, state)
    }
}

impl<M: ConstraintAugmenter> ConstraintAugmenter for Cancelling<M> {
    fn has_constraints(&self) -> bool {
        self.model.has_constraints()
    }

    fn constraints_persist(&self) -> bool {
        self.model.constraints_persist()
    }

    fn reset_constraints(&mut self) {
        self.model.reset_constraints();
    }

    fn augment(&mut self, uu: &Vector, state: &EquilibriumState) -> Result<bool, StrError> {
        self.model.augment(uu, state)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
