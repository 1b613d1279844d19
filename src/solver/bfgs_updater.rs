use super::LinearSystemAdapter;
use crate::StrError;
use russell_lab::{vec_copy, vec_inner, vec_update, Vector};
use serde::{Deserialize, Serialize};

/// Holds the result of an attempt to append a BFGS update to the history
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SecantUpdate {
    /// The pair was appended to the history
    Accepted,

    /// The curvature condition failed (the update would not be positive definite)
    NotPositiveDefinite,

    /// The condition number estimate exceeded the allowed maximum
    IllConditioned,
}

/// Implements the BFGS (quasi-Newton) update of the inverse tangent
///
/// The inverse tangent is approximated by the product
///
/// ```text
/// H = (I + wₙ vₙᵀ) ⋯ (I + w₁ v₁ᵀ) K⁻¹ (I + v₁ w₁ᵀ) ⋯ (I + vₙ wₙᵀ)
/// ```
///
/// where K is the tangent at the last reformation and (vᵢ, wᵢ) are the stored pairs.
/// Thus, H is never formed and the search direction `d = H R` requires only one back-solve.
///
/// Given the step length `s`, the direction `d`, and the residuals before (R₀) and after (R₁)
/// the step, the update is computed as follows (Matthies and Strang, 1979):
///
/// ```text
/// D = s d      G = R₀ - R₁      H = s R₀
/// r = (D·G) / (D·H)             c = √r      (condition number estimate)
/// v = -c H - G
/// w = D / (D·G)
/// ```
///
/// The update is rejected if `r ≤ 0` (not positive definite) or `c > cond_max`.
pub struct BfgsUpdater {
    /// Maximum number of stored pairs
    capacity: usize,

    /// Maximum allowed condition number estimate
    cond_max: f64,

    /// Number of stored pairs
    n_updates: usize,

    /// Holds the v vectors (capacity)
    vv: Vec<Vector>,

    /// Holds the w vectors (capacity)
    ww: Vec<Vector>,

    /// Auxiliary vector
    tmp: Vector,
}

impl BfgsUpdater {
    /// Allocates a new instance
    ///
    /// A zero capacity yields the full-Newton method (the history is always full).
    pub fn new(n_equation: usize, capacity: usize, cond_max: f64) -> Self {
        BfgsUpdater {
            capacity,
            cond_max,
            n_updates: 0,
            vv: (0..capacity).map(|_| Vector::new(n_equation)).collect(),
            ww: (0..capacity).map(|_| Vector::new(n_equation)).collect(),
            tmp: Vector::new(n_equation),
        }
    }

    /// Returns the number of stored pairs
    #[inline]
    pub fn n_updates(&self) -> usize {
        self.n_updates
    }

    /// Returns the maximum number of stored pairs
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns whether the history is full (a reformation is required) or not
    #[inline]
    pub fn is_full(&self) -> bool {
        self.n_updates >= self.capacity
    }

    /// Clears the history (after a reformation)
    pub fn reset(&mut self) {
        self.n_updates = 0;
    }

    /// Attempts to append a new pair to the history
    ///
    /// # Input
    ///
    /// * `s` -- the step length from the line search
    /// * `ui` -- the search direction
    /// * `rr0` -- the residual before the step
    /// * `rr1` -- the residual after the step
    ///
    /// Nothing is appended if the update fails the curvature or conditioning checks.
    pub fn update(&mut self, s: f64, ui: &Vector, rr0: &Vector, rr1: &Vector) -> Result<SecantUpdate, StrError> {
        if self.is_full() {
            return Err("the BFGS history is full; a reformation is required");
        }
        let neq = ui.dim();
        if rr0.dim() != neq || rr1.dim() != neq || self.tmp.dim() != neq {
            return Err("vectors in the BFGS update must have compatible dimensions");
        }

        // dg = D·G and dh = D·H
        let mut dg = 0.0;
        let mut dh = 0.0;
        for i in 0..neq {
            dg += s * ui[i] * (rr0[i] - rr1[i]);
            dh += s * ui[i] * rr0[i];
        }

        // curvature (positive definiteness) check
        let r = dg / dh;
        if !r.is_finite() || r <= 0.0 || dg == 0.0 {
            return Ok(SecantUpdate::NotPositiveDefinite);
        }

        // conditioning check
        let c = f64::sqrt(r);
        if c > self.cond_max {
            return Ok(SecantUpdate::IllConditioned);
        }

        // store the pair
        let k = self.n_updates;
        let v = &mut self.vv[k];
        let w = &mut self.ww[k];
        for i in 0..neq {
            v[i] = -c * s * rr0[i] - (rr0[i] - rr1[i]);
            w[i] = s * ui[i] / dg;
        }
        self.n_updates += 1;
        Ok(SecantUpdate::Accepted)
    }

    /// Computes the search direction `x = H R`
    ///
    /// The back-solve with the last factorized tangent is delegated to the linear system.
    pub fn solve_direction(
        &mut self,
        lin_sys: &mut dyn LinearSystemAdapter,
        x: &mut Vector,
        rr: &Vector,
    ) -> Result<(), StrError> {
        // tmp = (I + v wᵀ) ⋯ R  (from the last pair to the first)
        vec_copy(&mut self.tmp, rr)?;
        for k in (0..self.n_updates).rev() {
            let wr = vec_inner(&self.ww[k], &self.tmp);
            vec_update(&mut self.tmp, wr, &self.vv[k])?;
        }

        // x = K⁻¹ tmp
        lin_sys.solve(x, &self.tmp)?;

        // x = (I + w vᵀ) ⋯ x  (from the first pair to the last)
        for k in 0..self.n_updates {
            let vx = vec_inner(&self.vv[k], x);
            vec_update(x, vx, &self.ww[k])?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
