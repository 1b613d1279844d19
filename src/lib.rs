//! qnsolve -- Quasi-Newton equilibrium solver for coupled multi-physics finite element analyses
//!
//! The crate implements the iteration control engine of a nonlinear finite element code:
//!
//! * the BFGS (secant) update of the inverse tangent with periodic reformations,
//! * the line search on the residual energy,
//! * the multi-field convergence check (displacement, pressure, concentration, temperature),
//! * the reformation policy, and
//! * the outer augmented-Lagrangian loop enforcing constraints.
//!
//! Elements, materials, and the assembly of residual vectors and tangent matrices are provided
//! by the user via the traits in [crate::solver] (see [crate::solver::ResidualProvider] and
//! [crate::solver::TangentProvider]).

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

pub mod base;
pub mod prelude;
pub mod solver;
pub mod util;
