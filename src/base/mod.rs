//! Implements the base structures: fields, physics modes, tolerances, configuration, and equation numbers

mod config;
mod constants;
mod equation_partition;
mod field;
mod nodal_equations;
mod physics;
mod tolerances;
pub use crate::base::config::*;
pub use crate::base::constants::*;
pub use crate::base::equation_partition::*;
pub use crate::base::field::*;
pub use crate::base::nodal_equations::*;
pub use crate::base::physics::*;
pub use crate::base::tolerances::*;
