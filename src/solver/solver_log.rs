use super::{AugmentOutcome, NormSnapshot, ReformReason, StepOutcome, Verdict};
use crate::base::Config;
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt::Write;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Defines the width of the warning boxes
const BOX_WIDTH: usize = 73;

/// Holds the data reported once per iteration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Step number (the number of accepted steps before this one)
    pub step: usize,

    /// Iteration number in the step (one is the first)
    pub iteration: usize,

    /// Number of BFGS updates in the current history
    pub n_updates: usize,

    /// Number of residual evaluations in the step
    pub n_rhs: usize,

    /// Number of reformations in the step
    pub n_reformations: usize,

    /// Convergence norms
    pub norms: NormSnapshot,

    /// Verdict of the convergence check
    pub verdict: Verdict,
}

/// Defines the events reported by the solver
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SolverEvent {
    /// A new step started
    StepStarted { step: usize, t: f64, dt: f64 },

    /// The initial residual vanished (no load driving the system)
    NoForceActing { step: usize, iteration: usize },

    /// The tangent matrix was reformed
    Reformation {
        step: usize,
        iteration: usize,
        reason: ReformReason,
        count: usize,
    },

    /// An augmentation was performed
    Augmentation {
        step: usize,
        number: usize,
        outcome: AugmentOutcome,
    },

    /// The step finished
    StepFinished {
        step: usize,
        n_iterations: usize,
        n_reformations: usize,
        outcome: StepOutcome,
    },
}

/// Records (and optionally prints) the iterations and events of the solver
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolverLog {
    /// Prints the step messages
    pub verbose_steps: bool,

    /// Prints the iteration tables and warnings
    pub verbose_iterations: bool,

    /// Capacity of the BFGS history (zero means full-Newton)
    pub max_updates: usize,

    /// Holds all iteration records
    pub records: Vec<IterationRecord>,

    /// Holds all events
    pub events: Vec<SolverEvent>,
}

impl SolverLog {
    /// Allocates a new instance
    pub fn new(config: &Config) -> Self {
        SolverLog {
            verbose_steps: config.verbose_steps,
            verbose_iterations: config.verbose_iterations,
            max_updates: config.max_updates,
            records: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Clears all records and events
    pub fn clear(&mut self) {
        self.records.clear();
        self.events.clear();
    }

    /// Records an iteration
    pub fn record(&mut self, record: IterationRecord) {
        if self.verbose_iterations {
            print!("{}", format_record(&record));
        }
        self.records.push(record);
    }

    /// Records an event
    pub fn event(&mut self, event: SolverEvent) {
        match event {
            SolverEvent::StepStarted { step, t, .. } => {
                if self.verbose_steps {
                    println!("\n===== beginning time step {} : {} =====", step + 1, t);
                }
            }
            SolverEvent::NoForceActing { .. } => {
                if self.verbose_iterations {
                    print!("{}", format_warning("No force acting on the system."));
                }
            }
            SolverEvent::Reformation { reason, count, .. } => {
                if self.verbose_iterations {
                    if let Some(message) = reason.warning(self.max_updates) {
                        print!("{}", format_warning(message));
                    }
                    println!("Reforming stiffness matrix: reformation #{} ({})\n", count, reason);
                }
            }
            SolverEvent::Augmentation { number, outcome, .. } => {
                if self.verbose_iterations {
                    println!("\n........................ augmentation # {} ({:?})", number, outcome);
                }
            }
            SolverEvent::StepFinished {
                n_iterations,
                n_reformations,
                outcome,
                ..
            } => {
                if self.verbose_steps {
                    println!("\nconvergence summary ({:?})", outcome);
                    println!("    number of iterations   : {}", n_iterations);
                    println!("    number of reformations : {}", n_reformations);
                }
            }
        }
        self.events.push(event);
    }

    /// Returns the iteration records of a step
    pub fn step_records(&self, step: usize) -> Vec<&IterationRecord> {
        self.records.iter().filter(|r| r.step == step).collect()
    }

    /// Returns the (step, iteration, reason) triples of all reformations
    pub fn reformations(&self) -> Vec<(usize, usize, ReformReason)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SolverEvent::Reformation {
                    step, iteration, reason, ..
                } => Some((*step, *iteration, *reason)),
                _ => None,
            })
            .collect()
    }

    /// Returns the outcomes of all finished steps
    pub fn outcomes(&self) -> Vec<StepOutcome> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SolverEvent::StepFinished { outcome, .. } => Some(*outcome),
                _ => None,
            })
            .collect()
    }

    /// Reads a JSON file containing the log
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
        let log = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(log)
    }

    /// Writes a JSON file with the log
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

/// Formats the convergence table of an iteration
pub fn format_record(record: &IterationRecord) -> String {
    let mut buffer = String::new();
    let norms = &record.norms;
    write!(&mut buffer, " Nonlinear solution status: iteration = {}\n", record.iteration).unwrap();
    write!(&mut buffer, "\tstiffness updates             = {}\n", record.n_updates).unwrap();
    write!(&mut buffer, "\tright hand side evaluations   = {}\n", record.n_rhs).unwrap();
    write!(&mut buffer, "\tstiffness matrix reformations = {}\n", record.n_reformations).unwrap();
    write!(&mut buffer, "\tstep from line search         = {}\n", norms.step).unwrap();
    write!(
        &mut buffer,
        "\tconvergence norms :        INITIAL         CURRENT         REQUIRED\n"
    )
    .unwrap();
    let mut row = |name: &str, initial: f64, current: f64, required: f64| {
        write!(
            &mut buffer,
            "\t {:<20} {:>15.6e} {:>15.6e} {:>15.6e}\n",
            name, initial, current, required
        )
        .unwrap();
    };
    row("residual", norms.residual.initial, norms.residual.current, norms.residual.required);
    row("energy", norms.energy.initial, norms.energy.current, norms.energy.required);
    for (field, entry) in &norms.fields {
        row(field.name(), entry.initial, entry.current, entry.required);
    }
    buffer
}

/// Formats a warning message within a box
pub fn format_warning(message: &str) -> String {
    let mut buffer = String::new();
    let border = "*".repeat(BOX_WIDTH);
    write!(&mut buffer, "{}\n", border).unwrap();
    write!(&mut buffer, "*{:^w$}*\n", "WARNING", w = BOX_WIDTH - 2).unwrap();
    for line in message.lines() {
        write!(&mut buffer, "* {:<w$}*\n", line, w = BOX_WIDTH - 3).unwrap();
    }
    write!(&mut buffer, "{}\n\n", border).unwrap();
    buffer
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
