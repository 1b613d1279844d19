//! Contains some utility functions and structures

mod convergence_graph;

pub use convergence_graph::*;
