//! Implements the quasi-Newton equilibrium solver and its collaborators

mod augmentation_loop;
mod bfgs_updater;
mod collaborators;
mod convergence_monitor;
mod dense_linear_system;
mod equilibrium_solver;
mod equilibrium_state;
mod field_accumulator;
mod line_search;
mod linear_constraints;
mod reformation_policy;
pub mod samples;
mod solver_log;
mod sparse_linear_system;
pub use crate::solver::augmentation_loop::*;
pub use crate::solver::bfgs_updater::*;
pub use crate::solver::collaborators::*;
pub use crate::solver::convergence_monitor::*;
pub use crate::solver::dense_linear_system::*;
pub use crate::solver::equilibrium_solver::*;
pub use crate::solver::equilibrium_state::*;
pub use crate::solver::field_accumulator::*;
pub use crate::solver::line_search::*;
pub use crate::solver::linear_constraints::*;
pub use crate::solver::reformation_policy::*;
pub use crate::solver::solver_log::*;
pub use crate::solver::sparse_linear_system::*;
