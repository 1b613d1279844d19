use crate::base::{ConvergenceTolerances, EquationPartition, FieldTable};
use crate::StrError;
use russell_lab::Vector;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds the state of the solution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EquilibriumState {
    /// Time (or load factor)
    pub t: f64,

    /// Delta time of the current (or last) step
    pub dt: f64,

    /// Number of accepted steps
    pub n_step: usize,

    /// Last accepted solution {U}
    ///
    /// (n_equation)
    pub uu: Vector,

    /// Per-field snapshots of the last accepted solution
    ///
    /// Each vector has the dimension equal to the number of equations of the field in the
    /// partition used by the last accepted step (zero otherwise).
    pub previous: FieldTable<Vector>,
}

impl EquilibriumState {
    /// Allocates a new instance
    pub fn new(n_equation: usize) -> Self {
        EquilibriumState {
            t: 0.0,
            dt: 0.0,
            n_step: 0,
            uu: Vector::new(n_equation),
            previous: FieldTable::from_fn(|_| Vector::new(0)),
        }
    }

    /// Records the per-field snapshots of the current solution
    pub(crate) fn record_previous(&mut self, partition: &EquationPartition) -> Result<(), StrError> {
        for (field, snapshot) in self.previous.iter_mut() {
            let n = partition.equations(field).len();
            if snapshot.dim() != n {
                *snapshot = Vector::new(n);
            }
            partition.gather(field, &self.uu, snapshot)?;
        }
        Ok(())
    }

    /// Reads a JSON file containing the state data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let input = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(input);
        let state = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(state)
    }

    /// Writes a JSON file with the state data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }
}

/// Holds the iteration counters of the solver
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverCounters {
    /// Number of iterations in the current (or last) step
    pub n_iterations: usize,

    /// Number of stiffness reformations in the current (or last) step
    pub n_reformations: usize,

    /// Number of BFGS updates in the current (or last) step
    pub n_updates: usize,

    /// Number of right-hand-side (residual) evaluations in the current (or last) step
    pub n_rhs: usize,

    /// Number of augmentations in the current (or last) step
    pub n_augmentations: usize,

    /// Total number of iterations
    pub total_iterations: usize,

    /// Total number of stiffness reformations
    pub total_reformations: usize,

    /// Total number of BFGS updates
    pub total_updates: usize,

    /// Total number of right-hand-side evaluations
    pub total_rhs: usize,

    /// Number of converged steps
    pub n_converged_steps: usize,

    /// Number of failed (not converged or corrupted) steps
    pub n_failed_steps: usize,

    /// Number of steps cancelled by the operator
    pub n_cancelled_steps: usize,
}

impl SolverCounters {
    /// Resets the counters of the step
    pub fn start_step(&mut self) {
        self.n_iterations = 0;
        self.n_reformations = 0;
        self.n_updates = 0;
        self.n_rhs = 0;
        self.n_augmentations = 0;
    }

    /// Adds the counters of the step to the totals
    pub fn finish_step(&mut self, converged: bool) {
        self.add_totals();
        if converged {
            self.n_converged_steps += 1;
        } else {
            self.n_failed_steps += 1;
        }
    }

    /// Adds the counters of a cancelled step to the totals
    pub fn cancel_step(&mut self) {
        self.add_totals();
        self.n_cancelled_steps += 1;
    }

    fn add_totals(&mut self) {
        self.total_iterations += self.n_iterations;
        self.total_reformations += self.n_reformations;
        self.total_updates += self.n_updates;
        self.total_rhs += self.n_rhs;
    }
}

/// Holds the persisted solver data allowing a run to be resumed
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Convergence tolerances
    pub tolerances: ConvergenceTolerances,

    /// Iteration counters
    pub counters: SolverCounters,

    /// State including the per-field "previous accepted" snapshots
    pub state: EquilibriumState,
}

impl Checkpoint {
    /// Reads a JSON file containing the checkpoint data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let input = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(input);
        let checkpoint = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(checkpoint)
    }

    /// Writes a JSON file with the checkpoint data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer_pretty(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
