use super::{ConvergenceTolerances, Field, Physics};
use crate::StrError;
use russell_sparse::{Genie, LinSolParams};
use std::fmt;

/// Defines the smallest allowed tolerance (Config)
pub const CONFIG_MIN_TOL: f64 = 1e-15;

/// Defines the largest allowed line search tolerance (Config)
pub const CONFIG_MAX_LS_TOL: f64 = 1.0;

/// Holds the configuration parameters of the equilibrium solver
pub struct Config {
    /// Physics mode (selects the fields in the convergence check)
    pub physics: Physics,

    /// Transient analysis (enables the right-hand-side correction of heat transfer)
    pub transient: bool,

    /// Convergence tolerances
    pub tolerances: ConvergenceTolerances,

    /// Line search tolerance on the ratio of energies |d·R(s)| / |d·R₀|
    ///
    /// A zero value disables the line search (the step is always 1).
    pub ls_tol: f64,

    /// Maximum number of line search iterations
    pub ls_max_iterations: usize,

    /// Maximum number of BFGS updates before a reformation is forced
    ///
    /// A zero value yields the full-Newton method (reformation at every iteration).
    pub max_updates: usize,

    /// Maximum allowed condition number estimate of a BFGS update
    pub cond_max: f64,

    /// Maximum number of iterations per step
    pub n_max_iterations: usize,

    /// Maximum number of stiffness reformations per step (or between augmentations)
    pub max_reformations: usize,

    /// Maximum number of augmentations per step
    pub max_augmentations: usize,

    /// Linear solver type
    pub lin_sol_genie: Genie,

    /// Parameters for the linear solver
    pub lin_sol_params: LinSolParams,

    /// Keeps the records of all steps in the solver log
    ///
    /// If false, the log is cleared at the beginning of each step; thus, it holds the current
    /// (or last) step only and does not grow during long runs.
    pub log_all_steps: bool,

    /// Verbose mode during steps
    pub verbose_steps: bool,

    /// Verbose mode during iterations
    pub verbose_iterations: bool,
}

impl Config {
    /// Allocates a new instance with default values
    pub fn new(physics: Physics) -> Self {
        Config {
            physics,
            transient: false,
            tolerances: ConvergenceTolerances::new(),
            ls_tol: 0.9,
            ls_max_iterations: 5,
            max_updates: 10,
            cond_max: 1e5,
            n_max_iterations: 50,
            max_reformations: 15,
            max_augmentations: 10,
            lin_sol_genie: Genie::Umfpack,
            lin_sol_params: LinSolParams::new(),
            log_all_steps: true,
            verbose_steps: false,
            verbose_iterations: false,
        }
    }

    /// Sets the flag to keep the records of all steps in the solver log
    pub fn set_log_all_steps(&mut self, flag: bool) -> &mut Self {
        self.log_all_steps = flag;
        self
    }

    /// Sets the transient flag
    pub fn set_transient(&mut self, flag: bool) -> &mut Self {
        self.transient = flag;
        self
    }

    /// Sets the relative tolerance on the residual norm (zero disables the check)
    pub fn set_tol_residual(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value < 0.0 {
            return Err("residual tolerance must be ≥ 0.0");
        }
        self.tolerances.residual = value;
        Ok(self)
    }

    /// Sets the relative tolerance on the energy norm (zero disables the check)
    pub fn set_tol_energy(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value < 0.0 {
            return Err("energy tolerance must be ≥ 0.0");
        }
        self.tolerances.energy = value;
        Ok(self)
    }

    /// Sets the relative tolerance on the increment of a field (zero disables the check)
    pub fn set_tol_field(&mut self, field: Field, value: f64) -> Result<&mut Self, StrError> {
        if value < 0.0 {
            return Err("field tolerance must be ≥ 0.0");
        }
        self.tolerances.fields[field] = value;
        Ok(self)
    }

    /// Sets all relative tolerances at once (residual, energy, and all fields)
    pub fn set_tol_all(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value < CONFIG_MIN_TOL {
            return Err("tolerance must be ≥ 1e-15");
        }
        self.tolerances.residual = value;
        self.tolerances.energy = value;
        for (_, tol) in self.tolerances.fields.iter_mut() {
            *tol = value;
        }
        Ok(self)
    }

    /// Sets the absolute floor on the squared residual norm
    pub fn set_min_residual(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value < 0.0 {
            return Err("min_residual must be ≥ 0.0");
        }
        self.tolerances.min_residual = value;
        Ok(self)
    }

    /// Sets the floor on the squared residual norm relative to the initial one
    pub fn set_min_residual_ratio(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value < 0.0 || value >= 1.0 {
            return Err("min_residual_ratio must satisfy 0.0 ≤ ratio < 1.0");
        }
        self.tolerances.min_residual_ratio = value;
        Ok(self)
    }

    /// Sets the line search parameters (a zero tolerance disables the line search)
    pub fn set_line_search(&mut self, tolerance: f64, max_iterations: usize) -> Result<&mut Self, StrError> {
        if tolerance < 0.0 || tolerance >= CONFIG_MAX_LS_TOL {
            return Err("line search tolerance must satisfy 0.0 ≤ tol < 1.0");
        }
        if max_iterations < 1 {
            return Err("the maximum number of line search iterations must be ≥ 1");
        }
        self.ls_tol = tolerance;
        self.ls_max_iterations = max_iterations;
        Ok(self)
    }

    /// Sets the minimum allowed line search step
    pub fn set_min_step(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 0.0 || value >= 1.0 {
            return Err("min_step must satisfy 0.0 < min_step < 1.0");
        }
        self.tolerances.min_step = value;
        Ok(self)
    }

    /// Sets the maximum number of BFGS updates (zero means full-Newton)
    pub fn set_max_updates(&mut self, value: usize) -> &mut Self {
        self.max_updates = value;
        self
    }

    /// Sets the maximum condition number estimate of a BFGS update
    pub fn set_cond_max(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 1.0 {
            return Err("cond_max must be > 1.0");
        }
        self.cond_max = value;
        Ok(self)
    }

    /// Sets the maximum number of iterations per step
    pub fn set_n_max_iterations(&mut self, value: usize) -> Result<&mut Self, StrError> {
        if value < 1 {
            return Err("n_max_iterations must be ≥ 1");
        }
        self.n_max_iterations = value;
        Ok(self)
    }

    /// Sets the maximum number of reformations per step
    pub fn set_max_reformations(&mut self, value: usize) -> Result<&mut Self, StrError> {
        if value < 1 {
            return Err("max_reformations must be ≥ 1");
        }
        self.max_reformations = value;
        Ok(self)
    }

    /// Sets the maximum number of augmentations per step
    pub fn set_max_augmentations(&mut self, value: usize) -> Result<&mut Self, StrError> {
        if value < 1 {
            return Err("max_augmentations must be ≥ 1");
        }
        self.max_augmentations = value;
        Ok(self)
    }

    /// Sets the linear solver type
    pub fn set_lin_sol_genie(&mut self, genie: Genie) -> &mut Self {
        self.lin_sol_genie = genie;
        self
    }

    /// Sets the verbose mode
    pub fn set_verbose(&mut self, steps: bool, iterations: bool) -> &mut Self {
        self.verbose_steps = steps;
        self.verbose_iterations = iterations;
        self
    }

    /// Returns whether the line search is enabled or not
    #[inline]
    pub fn line_search_enabled(&self) -> bool {
        self.ls_tol > 0.0
    }

    /// Returns whether the right-hand side must be corrected during the tangent assembly
    #[inline]
    pub fn rhs_correction(&self) -> bool {
        self.physics.rhs_correction(self.transient)
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if let Some(msg) = self.tolerances.validate() {
            return Some(msg);
        }
        if self.ls_tol < 0.0 || self.ls_tol >= CONFIG_MAX_LS_TOL {
            return Some(format!(
                "ls_tol = {:?} is incorrect; it must be 0.0 ≤ ls_tol < 1.0",
                self.ls_tol
            ));
        }
        if self.ls_max_iterations < 1 {
            return Some("ls_max_iterations = 0 is incorrect; it must be ≥ 1".to_string());
        }
        if self.cond_max <= 1.0 {
            return Some(format!("cond_max = {:?} is incorrect; it must be > 1.0", self.cond_max));
        }
        if self.n_max_iterations < 1 {
            return Some("n_max_iterations = 0 is incorrect; it must be ≥ 1".to_string());
        }
        if self.max_reformations < 1 {
            return Some("max_reformations = 0 is incorrect; it must be ≥ 1".to_string());
        }
        if self.max_augmentations < 1 {
            return Some("max_augmentations = 0 is incorrect; it must be ≥ 1".to_string());
        }
        None // all good
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration data\n")?;
        write!(f, "==================\n")?;
        write!(f, "physics = {:?}\n", self.physics)?;
        write!(f, "transient = {:?}\n", self.transient)?;
        write!(f, "ls_tol = {:?}\n", self.ls_tol)?;
        write!(f, "ls_max_iterations = {:?}\n", self.ls_max_iterations)?;
        write!(f, "max_updates = {:?}\n", self.max_updates)?;
        write!(f, "cond_max = {:?}\n", self.cond_max)?;
        write!(f, "n_max_iterations = {:?}\n", self.n_max_iterations)?;
        write!(f, "max_reformations = {:?}\n", self.max_reformations)?;
        write!(f, "max_augmentations = {:?}\n", self.max_augmentations)?;
        write!(f, "log_all_steps = {:?}\n", self.log_all_steps)?;

        write!(f, "\nConvergence tolerances\n")?;
        write!(f, "======================\n")?;
        write!(f, "residual = {:?}\n", self.tolerances.residual)?;
        write!(f, "energy = {:?}\n", self.tolerances.energy)?;
        for field in self.physics.fields() {
            write!(f, "{} = {:?}\n", field, self.tolerances.field(*field))?;
        }
        write!(f, "min_residual = {:?}\n", self.tolerances.min_residual)?;
        write!(f, "min_residual_ratio = {:?}\n", self.tolerances.min_residual_ratio)?;
        write!(f, "min_step = {:?}\n", self.tolerances.min_step)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
