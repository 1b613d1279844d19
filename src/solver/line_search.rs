use crate::base::Config;
use crate::StrError;
use russell_lab::{vec_inner, Vector};

/// Defines the magnitude below which the directional energies are considered zero
const ZERO_ENERGY: f64 = 1e-20;

/// Holds the results of a line search
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSearchOutcome {
    /// The accepted step length
    pub step: f64,

    /// Indicates that the step fell below the minimum allowed value
    pub collapsed: bool,

    /// Number of residual evaluations
    pub n_evaluations: usize,
}

/// Implements the line search along the search direction
///
/// The merit function is the directional derivative of the residual energy `r(s) = d·R(s)`.
/// A step is accepted when `|r(s) / r(0)| ≤ tolerance`; otherwise, a new step is obtained from
/// the quadratic interpolation
///
/// ```text
/// a = r₀ / r₁      A = 1 + a (s - 1)      B = a s²      D = B² - 4 A B
/// s ← (B + √D) / (2A)   or   (B - √D) / (2A)   or   0        if D ≥ 0
/// s ← B / (2A)                                               otherwise
/// ```
///
/// The interpolated step is clipped to `s ≤ 1`. After the maximum number of iterations, or when
/// the step falls below the minimum allowed value (collapse), the step with the smallest |r(s)|
/// is applied.
pub struct LineSearch {
    /// Tolerance on the ratio of energies (zero disables the line search)
    pub tolerance: f64,

    /// Maximum number of iterations
    pub max_iterations: usize,

    /// Minimum allowed step
    pub min_step: f64,
}

impl LineSearch {
    /// Allocates a new instance
    pub fn new(config: &Config) -> Self {
        LineSearch {
            tolerance: config.ls_tol,
            max_iterations: config.ls_max_iterations,
            min_step: config.tolerances.min_step,
        }
    }

    /// Returns whether the line search is enabled or not
    #[inline]
    pub fn enabled(&self) -> bool {
        self.tolerance > 0.0
    }

    /// Searches for the step length
    ///
    /// # Input
    ///
    /// * `ui` -- the search direction
    /// * `rr0` -- the residual at the base state (s = 0)
    /// * `rr1` -- (output) the residual at the accepted step
    /// * `residual_at` -- computes the residual at `base + s·ui`
    ///
    /// If the line search is disabled, the step is 1 and the residual is computed at the
    /// full increment.
    pub fn search<F>(
        &self,
        ui: &Vector,
        rr0: &Vector,
        rr1: &mut Vector,
        mut residual_at: F,
    ) -> Result<LineSearchOutcome, StrError>
    where
        F: FnMut(f64, &mut Vector) -> Result<(), StrError>,
    {
        // full step
        let mut s = 1.0;
        residual_at(s, rr1)?;
        let mut n_evaluations = 1;
        let accept = |n_evaluations| {
            Ok(LineSearchOutcome {
                step: 1.0,
                collapsed: false,
                n_evaluations,
            })
        };
        if !self.enabled() {
            return accept(n_evaluations);
        }

        // initial energy
        let r0 = vec_inner(ui, rr0);
        if f64::abs(r0) < ZERO_ENERGY {
            return accept(n_evaluations);
        }

        // energy at the full step
        let mut r1 = vec_inner(ui, rr1);
        let mut s_min = s;
        let mut r_min = f64::abs(r1);
        let mut ratio = if f64::abs(r1) < ZERO_ENERGY { 0.0 } else { f64::abs(r1 / r0) };
        let mut collapsed = false;
        let mut n_iterations = 0;
        while ratio > self.tolerance && n_iterations < self.max_iterations {
            // quadratic interpolation
            let a = r0 / r1;
            let aa = 1.0 + a * (s - 1.0);
            let bb = a * s * s;
            let dd = bb * bb - 4.0 * aa * bb;
            s = if dd >= 0.0 {
                let mut x = (bb + f64::sqrt(dd)) / (2.0 * aa);
                if x < 0.0 {
                    x = (bb - f64::sqrt(dd)) / (2.0 * aa);
                }
                if x < 0.0 {
                    x = 0.0;
                }
                x
            } else {
                0.5 * bb / aa
            };
            if !s.is_finite() {
                s = 0.0;
            }
            s = f64::min(s, 1.0);
            n_iterations += 1;

            // collapse
            if s < self.min_step {
                collapsed = true;
                break;
            }

            // energy at the new step
            residual_at(s, rr1)?;
            n_evaluations += 1;
            r1 = vec_inner(ui, rr1);
            if f64::abs(r1) < r_min {
                s_min = s;
                r_min = f64::abs(r1);
            }
            ratio = if f64::abs(r1) < ZERO_ENERGY { 0.0 } else { f64::abs(r1 / r0) };
        }

        // apply the best step if the search failed
        if collapsed || ratio > self.tolerance {
            if s != s_min || collapsed {
                s = s_min;
                residual_at(s, rr1)?;
                n_evaluations += 1;
            }
        }
        Ok(LineSearchOutcome {
            step: s,
            collapsed,
            n_evaluations,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
