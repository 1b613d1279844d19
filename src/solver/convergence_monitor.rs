use super::IterateState;
use crate::base::{Config, ConvergenceTolerances, EquationPartition, Field, FieldTable};
use russell_lab::{vec_inner, Vector};
use serde::{Deserialize, Serialize};

/// Holds the initial, current, and required values of a convergence norm
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormEntry {
    /// Value at the beginning of the step (or at the last baseline reset)
    pub initial: f64,

    /// Value at the current iteration
    pub current: f64,

    /// Required value (the current value must not exceed it)
    pub required: f64,
}

/// Holds the convergence norms of one iteration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormSnapshot {
    /// Squared residual norm R·R
    pub residual: NormEntry,

    /// Energy norm s |d·R|
    pub energy: NormEntry,

    /// Largest energy norm allowed before the iteration is considered diverging
    pub energy_max: f64,

    /// Squared increment norms s² |δx|² of the participating fields
    pub fields: Vec<(Field, NormEntry)>,

    /// Step length from the line search
    pub step: f64,
}

/// Defines the reasons for not converging
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Failure {
    /// The line search collapsed or the step is below the minimum
    LineSearch,

    /// The energy norm exceeded its running maximum
    Diverging,

    /// The residual norm is above the required value
    Residual,

    /// The energy norm is above the required value
    Energy,

    /// The increment norm of a field is above the required value
    Field(Field),
}

/// Holds the verdict of the convergence check
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    /// All criteria are satisfied (or the residual vanished)
    Converged,

    /// The initial residual is below the absolute floor (no load driving the system)
    ConvergedTrivial,

    /// Some criterion failed
    NotConverged(Failure),
}

impl Verdict {
    /// Returns whether the verdict is converged (including the trivial case) or not
    pub fn converged(&self) -> bool {
        match self {
            Verdict::NotConverged(..) => false,
            _ => true,
        }
    }
}

/// Evaluates the multi-field convergence criteria
///
/// All norms are squared Euclidean norms except the energy norm:
///
/// ```text
/// residual:  R₁·R₁      ≤ tol_residual · R₀·R₀         (first iteration)
/// energy:    s |d·R₁|   ≤ tol_energy · |d₀·R₀|         (first iteration)
/// field:     s² |δx|²   ≤ tol_field² · |Δx|²           (accumulated in the step)
/// step:      s          ≥ min_step                     (if the line search is enabled)
/// diverging: s |d·R₁|   ≤ max energy norm
/// ```
///
/// Every criterion must hold for every participating field. Nonetheless, the iteration is
/// converged if the residual vanished, i.e., `R₁·R₁ < min_residual` (absolute floor) or
/// `R₁·R₁ ≤ min_residual_ratio · R₀·R₀` (relative floor). The relative floor makes the check
/// independent of the scale of the tangent; e.g., a linear problem converges in one iteration.
pub struct ConvergenceMonitor {
    /// Convergence tolerances
    tolerances: ConvergenceTolerances,

    /// Indicates that the line search is enabled
    line_search_enabled: bool,

    /// Fields of the physics mode
    physics_fields: &'static [Field],

    /// Participating fields (handled by the physics mode and present in the partition)
    fields: Vec<Field>,

    /// Initial squared residual norm
    norm_ri: f64,

    /// Initial energy norm
    norm_ei: f64,

    /// Maximum energy norm
    norm_em: f64,

    /// Initial squared increment norms
    initial_fields: FieldTable<f64>,

    /// Norms of the last evaluation
    snapshot: NormSnapshot,
}

impl ConvergenceMonitor {
    /// Allocates a new instance
    pub fn new(config: &Config, partition: &EquationPartition) -> Self {
        let mut monitor = ConvergenceMonitor {
            tolerances: config.tolerances.clone(),
            line_search_enabled: config.line_search_enabled(),
            physics_fields: config.physics.fields(),
            fields: Vec::new(),
            norm_ri: 0.0,
            norm_ei: 0.0,
            norm_em: 0.0,
            initial_fields: FieldTable::filled(0.0),
            snapshot: NormSnapshot::default(),
        };
        monitor.set_partition(partition);
        monitor
    }

    /// Updates the participating fields from a new partition
    pub fn set_partition(&mut self, partition: &EquationPartition) {
        self.fields = self
            .physics_fields
            .iter()
            .filter(|f| partition.equations(**f).len() > 0)
            .copied()
            .collect();
    }

    /// Returns the participating fields
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the tolerances
    pub fn tolerances(&self) -> &ConvergenceTolerances {
        &self.tolerances
    }

    /// Replaces the tolerances (e.g., when restoring a checkpoint)
    pub fn set_tolerances(&mut self, tolerances: &ConvergenceTolerances) {
        self.tolerances = tolerances.clone();
    }

    /// Returns the norms of the last evaluation
    pub fn snapshot(&self) -> &NormSnapshot {
        &self.snapshot
    }

    /// Resets all norms (at the beginning of a step)
    pub fn start_step(&mut self) {
        self.norm_ri = 0.0;
        self.norm_ei = 0.0;
        self.norm_em = 0.0;
        self.initial_fields = FieldTable::filled(0.0);
        self.snapshot = NormSnapshot::default();
    }

    /// Sets the initial norms from the first residual and search direction of the step
    pub fn set_baseline(&mut self, rr0: &Vector, ui: &Vector, iterate: &IterateState) {
        self.norm_ri = f64::abs(vec_inner(rr0, rr0));
        self.norm_ei = f64::abs(vec_inner(ui, rr0));
        self.norm_em = self.norm_ei;
        for field in &self.fields {
            self.initial_fields[*field] = iterate.field(*field).increment_norm_sq();
        }
    }

    /// Resets the baseline to the current norms (after a divergence-triggered reformation)
    pub fn reset_baseline(&mut self) {
        self.norm_em = self.snapshot.energy.current;
        self.norm_ei = self.snapshot.energy.current;
        self.norm_ri = self.snapshot.residual.current;
        for (field, entry) in &self.snapshot.fields {
            self.initial_fields[*field] = entry.current;
        }
    }

    /// Evaluates the convergence criteria
    ///
    /// # Input
    ///
    /// * `iteration` -- the iteration number in the step (zero is the first)
    /// * `rr1` -- the residual after the step
    /// * `ui` -- the search direction
    /// * `s` -- the step length
    /// * `collapsed` -- whether the line search collapsed or not
    /// * `iterate` -- the accumulators (already updated with the step)
    pub fn evaluate(
        &mut self,
        iteration: usize,
        rr1: &Vector,
        ui: &Vector,
        s: f64,
        collapsed: bool,
        iterate: &IterateState,
    ) -> Verdict {
        let tol = &self.tolerances;

        // norms
        let norm_r1 = vec_inner(rr1, rr1);
        let norm_e1 = s * f64::abs(vec_inner(ui, rr1));
        self.snapshot.residual = NormEntry {
            initial: self.norm_ri,
            current: norm_r1,
            required: tol.residual * self.norm_ri,
        };
        self.snapshot.energy = NormEntry {
            initial: self.norm_ei,
            current: norm_e1,
            required: tol.energy * self.norm_ei,
        };
        self.snapshot.energy_max = self.norm_em;
        self.snapshot.step = s;
        self.snapshot.fields.clear();
        for field in &self.fields {
            let acc = iterate.field(*field);
            let tol_field = tol.field(*field);
            self.snapshot.fields.push((
                *field,
                NormEntry {
                    initial: self.initial_fields[*field],
                    current: s * s * acc.increment_norm_sq(),
                    required: tol_field * tol_field * acc.total_norm_sq(),
                },
            ));
        }

        // checks
        let residual_ok = tol.residual <= 0.0 || norm_r1 <= self.snapshot.residual.required;
        let energy_ok = tol.energy <= 0.0 || norm_e1 <= self.snapshot.energy.required;
        let failed_field = self
            .snapshot
            .fields
            .iter()
            .find(|(field, entry)| tol.field(*field) > 0.0 && entry.current > entry.required)
            .map(|(field, _)| *field);
        let step_ok = !collapsed && !(self.line_search_enabled && s < tol.min_step);
        let diverging = norm_e1 > self.norm_em;
        let vanished = norm_r1 < tol.min_residual
            || (tol.min_residual_ratio > 0.0 && norm_r1 <= tol.min_residual_ratio * self.norm_ri);

        // verdict
        if iteration == 0 && self.norm_ri < tol.min_residual {
            Verdict::ConvergedTrivial
        } else if residual_ok && energy_ok && failed_field.is_none() && step_ok && !diverging {
            Verdict::Converged
        } else if vanished {
            Verdict::Converged
        } else if !step_ok {
            Verdict::NotConverged(Failure::LineSearch)
        } else if diverging {
            Verdict::NotConverged(Failure::Diverging)
        } else if !residual_ok {
            Verdict::NotConverged(Failure::Residual)
        } else if !energy_ok {
            Verdict::NotConverged(Failure::Energy)
        } else {
            // failed_field must be Some here
            Verdict::NotConverged(Failure::Field(failed_field.unwrap_or(Field::Displacement)))
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
