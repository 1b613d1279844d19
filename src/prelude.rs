//! Makes available common structures needed to solve equilibrium steps
//!
//! You may write `use qnsolve::prelude::*` in your code and obtain
//! access to commonly used functionality.

pub use crate::base::{Config, EquationPartition, Field, NodalEquations, Physics, DEFAULT_OUT_DIR, DEFAULT_TEST_DIR};
pub use crate::solver::{Checkpoint, EquilibriumModel, EquilibriumSolver, EquilibriumState, StepOutcome};
pub use crate::solver::{ConstraintAugmenter, LinearSystemAdapter, ResidualProvider, TangentProvider};
pub use crate::solver::{DenseLinearSystem, LinearConstraintSet, NonConvergence, SolverLog, SparseLinearSystem};
pub use crate::util::ConvergenceHistory;
