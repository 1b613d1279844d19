use super::{AugmentOutcome, AugmentationLoop, BfgsUpdater, Checkpoint, ConvergenceMonitor, EquilibriumModel};
use super::{EquilibriumState, IterateState, IterationAction, IterationRecord, LineSearch, LinearSystemAdapter, NormSnapshot};
use super::{ReformReason, ReformationPolicy, SecantUpdate, SolverCounters, SolverEvent, SolverLog, Verdict};
use crate::base::{Config, EquationPartition};
use crate::StrError;
use russell_lab::{vec_copy, vec_update, Vector};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Defines the reasons for a step not converging
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NonConvergence {
    /// The maximum number of iterations was reached
    IterationLimit,

    /// The maximum number of reformations was reached
    ReformationLimit,

    /// The maximum number of augmentations was reached
    AugmentationLimit,
}

/// Holds the outcome of a step
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The equilibrium (and the constraints) are satisfied; the state holds the new solution
    Converged,

    /// The step failed; the state is left at the beginning of the step and the driver may retry
    /// with a smaller increment
    NotConverged(NonConvergence),

    /// Non-finite values were found in the residual or in the search direction
    Corrupted,

    /// The step was cancelled by the operator; the state holds the last completed iterate
    Cancelled,
}

/// Implements the quasi-Newton (BFGS) equilibrium solver with line search
///
/// One call to [EquilibriumSolver::solve_step] performs the nonlinear iterations of one load (or
/// time) increment:
///
/// ```text
/// R₀ ← R(U)                                     (concentrated loads added once per step)
/// K  ← K(U)                                     (reformation)
/// loop
///     d  ← H R₀                                 (BFGS-corrected back-solve)
///     s  ← line search on r(s) = d·R(U + ΔU + s d)
///     ΔU ← ΔU + s d
///     check convergence (residual, energy, per-field increments, step, divergence)
///     converged  → augment; done if the constraints are satisfied
///     otherwise  → BFGS update or reformation
///     R₀ ← R₁
/// ```
///
/// The accepted solution is updated (U ← U + ΔU) only when the step converges.
pub struct EquilibriumSolver<'a> {
    /// Holds configuration parameters
    config: &'a Config,

    /// Holds the equations of each field
    partition: EquationPartition,

    /// Holds the BFGS history
    updater: BfgsUpdater,

    /// Performs the line search
    line_search: LineSearch,

    /// Evaluates the convergence criteria
    monitor: ConvergenceMonitor,

    /// Bounds the number of reformations
    policy: ReformationPolicy,

    /// Drives the augmentations
    augmentation: AugmentationLoop,

    /// Holds the increments of the step
    iterate: IterateState,

    /// Holds the iteration counters
    counters: SolverCounters,

    /// Records the iterations and events
    log: SolverLog,

    /// Flag set by the operator to cancel the current step
    cancel: Option<Arc<AtomicBool>>,

    /// Concentrated loads of the step
    ff: Vector,

    /// Right-hand-side correction computed at the last reformation
    rhs_correction: Vector,

    /// Residual at the beginning of the iteration
    rr0: Vector,

    /// Residual after the line search
    rr1: Vector,

    /// Search direction
    ui: Vector,

    /// Trial solution U + ΔU
    uu_trial: Vector,
}

impl<'a> EquilibriumSolver<'a> {
    /// Allocates a new instance
    pub fn new(config: &'a Config, partition: EquationPartition) -> Result<Self, StrError> {
        if let Some(msg) = config.validate() {
            println!("ERROR: {}", msg);
            return Err("cannot allocate solver because config.validate() failed");
        }
        let neq = partition.n_equation();
        Ok(EquilibriumSolver {
            config,
            updater: BfgsUpdater::new(neq, config.max_updates, config.cond_max),
            line_search: LineSearch::new(config),
            monitor: ConvergenceMonitor::new(config, &partition),
            policy: ReformationPolicy::new(config),
            augmentation: AugmentationLoop::new(config),
            iterate: IterateState::new(&partition),
            counters: SolverCounters::default(),
            log: SolverLog::new(config),
            cancel: None,
            ff: Vector::new(neq),
            rhs_correction: Vector::new(neq),
            rr0: Vector::new(neq),
            rr1: Vector::new(neq),
            ui: Vector::new(neq),
            uu_trial: Vector::new(neq),
            partition,
        })
    }

    /// Replaces the partition (e.g., when fields are activated or deactivated between steps)
    pub fn set_partition(&mut self, partition: EquationPartition) {
        let neq = partition.n_equation();
        if neq != self.partition.n_equation() {
            self.updater = BfgsUpdater::new(neq, self.config.max_updates, self.config.cond_max);
            self.ff = Vector::new(neq);
            self.rhs_correction = Vector::new(neq);
            self.rr0 = Vector::new(neq);
            self.rr1 = Vector::new(neq);
            self.ui = Vector::new(neq);
            self.uu_trial = Vector::new(neq);
        }
        self.iterate = IterateState::new(&partition);
        self.monitor.set_partition(&partition);
        self.partition = partition;
    }

    /// Sets the flag that cancels the current step when it becomes true
    ///
    /// The flag is checked before the step starts and at the end of each iteration.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    /// Returns the partition
    pub fn partition(&self) -> &EquationPartition {
        &self.partition
    }

    /// Returns the log of iterations and events
    pub fn log(&self) -> &SolverLog {
        &self.log
    }

    /// Returns an access to the log (e.g., to save or clear it between steps)
    pub fn log_mut(&mut self) -> &mut SolverLog {
        &mut self.log
    }

    /// Returns the counters
    pub fn counters(&self) -> &SolverCounters {
        &self.counters
    }

    /// Returns the norms of the last iteration
    pub fn last_norms(&self) -> &NormSnapshot {
        self.monitor.snapshot()
    }

    /// Returns the data required to resume the run
    pub fn checkpoint(&self, state: &EquilibriumState) -> Checkpoint {
        Checkpoint {
            tolerances: self.monitor.tolerances().clone(),
            counters: self.counters,
            state: state.clone(),
        }
    }

    /// Restores the tolerances and counters from a checkpoint and returns the state
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<EquilibriumState, StrError> {
        if checkpoint.state.uu.dim() != self.partition.n_equation() {
            return Err("the checkpoint state has an incompatible dimension");
        }
        self.monitor.set_tolerances(&checkpoint.tolerances);
        self.counters = checkpoint.counters;
        Ok(checkpoint.state.clone())
    }

    /// Solves the equilibrium equations of one step
    ///
    /// # Input
    ///
    /// * `model` -- computes the residual and tangent and performs the augmentations
    /// * `lin_sys` -- factorizes the tangent and solves the linear systems
    /// * `state` -- the state at the beginning of the step (updated on convergence)
    /// * `dt` -- the time (or load factor) increment
    ///
    /// # Output
    ///
    /// Returns the outcome of the step. An error is returned only when a collaborator fails;
    /// in this case, the state is left at the beginning of the step.
    pub fn solve_step<M>(
        &mut self,
        model: &mut M,
        lin_sys: &mut dyn LinearSystemAdapter,
        state: &mut EquilibriumState,
        dt: f64,
    ) -> Result<StepOutcome, StrError>
    where
        M: EquilibriumModel,
    {
        // check
        let neq = self.partition.n_equation();
        if state.uu.dim() != neq {
            return Err("the state vector has an incompatible dimension");
        }
        if dt <= 0.0 {
            return Err("dt must be > 0.0");
        }

        // keep the current step only
        if !self.config.log_all_steps {
            self.log.clear();
        }

        // cancelled before any work
        if self.cancelled() {
            self.counters.start_step();
            self.counters.cancel_step();
            self.finish(state.n_step, 0, StepOutcome::Cancelled);
            return Ok(StepOutcome::Cancelled);
        }

        // new time
        let t0 = state.t;
        let dt0 = state.dt;
        state.t += dt;
        state.dt = dt;

        // reset step variables
        self.iterate.reset();
        self.updater.reset();
        self.monitor.start_step();
        self.policy.reset_count();
        self.augmentation.start_step(model);
        self.counters.start_step();
        self.log.event(SolverEvent::StepStarted {
            step: state.n_step,
            t: state.t,
            dt,
        });

        // run the iterations
        let outcome = match self.iterate_step(model, lin_sys, state) {
            Ok(outcome) => outcome,
            Err(err) => {
                state.t = t0;
                state.dt = dt0;
                self.counters.finish_step(false);
                return Err(err);
            }
        };

        // update the state
        match outcome {
            StepOutcome::Converged => {
                vec_update(&mut state.uu, 1.0, &self.iterate.total)?;
                state.record_previous(&self.partition)?;
                state.n_step += 1;
                self.counters.finish_step(true);
            }
            StepOutcome::Cancelled => {
                vec_update(&mut state.uu, 1.0, &self.iterate.total)?;
                self.counters.cancel_step();
            }
            StepOutcome::NotConverged(..) | StepOutcome::Corrupted => {
                state.t = t0;
                state.dt = dt0;
                self.counters.finish_step(false);
            }
        }
        let step = if outcome == StepOutcome::Converged {
            state.n_step - 1
        } else {
            state.n_step
        };
        self.finish(step, self.counters.n_iterations, outcome);
        Ok(outcome)
    }

    /// Runs the nonlinear iterations of the step
    fn iterate_step<M>(
        &mut self,
        model: &mut M,
        lin_sys: &mut dyn LinearSystemAdapter,
        state: &EquilibriumState,
    ) -> Result<StepOutcome, StrError>
    where
        M: EquilibriumModel,
    {
        // concentrated loads
        self.ff.fill(0.0);
        model.concentrated_loads(&mut self.ff, state)?;
        self.rhs_correction.fill(0.0);

        // trial solution
        vec_copy(&mut self.uu_trial, &state.uu)?;

        // initial reformation
        if !self.reform(model, lin_sys, state, ReformReason::Initial, 0)? {
            return Ok(StepOutcome::NotConverged(NonConvergence::ReformationLimit));
        }

        // initial residual
        self.residual(model, state)?;
        if !all_finite(&self.rr0) {
            return Ok(StepOutcome::Corrupted);
        }

        // iterations
        let mut iteration = 0;
        loop {
            if iteration >= self.config.n_max_iterations {
                return Ok(StepOutcome::NotConverged(NonConvergence::IterationLimit));
            }

            // search direction
            self.updater.solve_direction(lin_sys, &mut self.ui, &self.rr0)?;
            if !all_finite(&self.ui) {
                return Ok(StepOutcome::Corrupted);
            }
            self.iterate.set_direction(&self.partition, &self.ui)?;
            if iteration == 0 {
                self.monitor.set_baseline(&self.rr0, &self.ui, &self.iterate);
            }

            // line search
            let ls = {
                // accessors
                let ui = &self.ui;
                let total = &self.iterate.total;
                let ff = &self.ff;
                let corr = &self.rhs_correction;
                let uu_trial = &mut self.uu_trial;
                let use_corr = self.config.rhs_correction();
                self.line_search.search(ui, &self.rr0, &mut self.rr1, |s, rr| {
                    for i in 0..uu_trial.dim() {
                        uu_trial[i] = state.uu[i] + total[i] + s * ui[i];
                    }
                    model.residual(rr, uu_trial, state)?;
                    add_loads(rr, ff, corr, use_corr);
                    Ok(())
                })?
            };
            self.counters.n_rhs += ls.n_evaluations;
            if !all_finite(&self.rr1) {
                return Ok(StepOutcome::Corrupted);
            }

            // accept the step
            self.iterate.accumulate(&self.ui, ls.step)?;
            vec_copy(&mut self.uu_trial, &state.uu)?;
            vec_update(&mut self.uu_trial, 1.0, &self.iterate.total)?;

            // check convergence
            let verdict = self.monitor.evaluate(
                iteration,
                &self.rr1,
                &self.ui,
                ls.step,
                ls.collapsed,
                &self.iterate,
            );
            iteration += 1;
            self.counters.n_iterations = iteration;
            self.log.record(IterationRecord {
                step: state.n_step,
                iteration,
                n_updates: self.updater.n_updates(),
                n_rhs: self.counters.n_rhs,
                n_reformations: self.counters.n_reformations,
                norms: self.monitor.snapshot().clone(),
                verdict,
            });

            match verdict {
                Verdict::Converged | Verdict::ConvergedTrivial => {
                    if verdict == Verdict::ConvergedTrivial {
                        self.log.event(SolverEvent::NoForceActing {
                            step: state.n_step,
                            iteration,
                        });
                    }
                    let outcome = self.augmentation.augment(model, &self.uu_trial, state)?;
                    self.counters.n_augmentations = self.augmentation.n_augmentations();
                    if self.augmentation.n_augmentations() > 0 {
                        self.log.event(SolverEvent::Augmentation {
                            step: state.n_step,
                            number: self.augmentation.n_augmentations(),
                            outcome,
                        });
                    }
                    match outcome {
                        AugmentOutcome::Accepted => return Ok(StepOutcome::Converged),
                        AugmentOutcome::Exhausted => {
                            return Ok(StepOutcome::NotConverged(NonConvergence::AugmentationLimit))
                        }
                        AugmentOutcome::Rejected => {
                            // the constraint state changed; thus the residual must be recomputed
                            self.policy.reset_count();
                            self.residual(model, state)?;
                            if !all_finite(&self.rr0) {
                                return Ok(StepOutcome::Corrupted);
                            }
                            if self.config.max_updates == 0 {
                                let reason = ReformReason::Augmentation;
                                if !self.reform(model, lin_sys, state, reason, iteration)? {
                                    return Ok(StepOutcome::NotConverged(NonConvergence::ReformationLimit));
                                }
                            }
                        }
                    }
                }
                Verdict::NotConverged(failure) => {
                    let reason = match self.policy.decide(failure, self.updater.is_full()) {
                        IterationAction::ReformAndResetBaseline => {
                            self.monitor.reset_baseline();
                            Some(ReformReason::Diverging)
                        }
                        IterationAction::Reform(reason) => Some(reason),
                        IterationAction::Update => {
                            match self.updater.update(ls.step, &self.ui, &self.rr0, &self.rr1)? {
                                SecantUpdate::Accepted => {
                                    self.counters.n_updates += 1;
                                    None
                                }
                                rejected => Some(ReformReason::SecantRejected(rejected)),
                            }
                        }
                    };
                    if let Some(reason) = reason {
                        if !self.reform(model, lin_sys, state, reason, iteration)? {
                            return Ok(StepOutcome::NotConverged(NonConvergence::ReformationLimit));
                        }
                    }
                    vec_copy(&mut self.rr0, &self.rr1)?;
                }
            }

            // iteration boundary
            if self.cancelled() {
                return Ok(StepOutcome::Cancelled);
            }
        }
    }

    /// Reforms the tangent matrix at the trial solution and clears the BFGS history
    ///
    /// Returns false if the maximum number of reformations has been reached.
    fn reform<M>(
        &mut self,
        model: &mut M,
        lin_sys: &mut dyn LinearSystemAdapter,
        state: &EquilibriumState,
        reason: ReformReason,
        iteration: usize,
    ) -> Result<bool, StrError>
    where
        M: EquilibriumModel,
    {
        if !self.policy.register() {
            return Ok(false);
        }
        let correction = if self.config.rhs_correction() {
            Some(&mut self.rhs_correction)
        } else {
            None
        };
        lin_sys.reform(model, &self.uu_trial, state, correction)?;
        self.updater.reset();
        self.counters.n_reformations += 1;
        self.log.event(SolverEvent::Reformation {
            step: state.n_step,
            iteration,
            reason,
            count: self.policy.n_reformations(),
        });
        Ok(true)
    }

    /// Computes R₀ at the trial solution
    fn residual<M>(&mut self, model: &mut M, state: &EquilibriumState) -> Result<(), StrError>
    where
        M: EquilibriumModel,
    {
        model.residual(&mut self.rr0, &self.uu_trial, state)?;
        add_loads(&mut self.rr0, &self.ff, &self.rhs_correction, self.config.rhs_correction());
        self.counters.n_rhs += 1;
        Ok(())
    }

    /// Returns whether the operator cancelled the step or not
    fn cancelled(&self) -> bool {
        match &self.cancel {
            Some(flag) => flag.load(Ordering::Relaxed),
            None => false,
        }
    }

    /// Records the end of the step
    fn finish(&mut self, step: usize, n_iterations: usize, outcome: StepOutcome) {
        self.log.event(SolverEvent::StepFinished {
            step,
            n_iterations,
            n_reformations: self.counters.n_reformations,
            outcome,
        });
    }
}

/// Adds the concentrated loads (and the right-hand-side correction) to the residual
fn add_loads(rr: &mut Vector, ff: &Vector, correction: &Vector, use_correction: bool) {
    for i in 0..rr.dim() {
        rr[i] += ff[i];
        if use_correction {
            rr[i] += correction[i];
        }
    }
}

/// Returns whether all components are finite or not
fn all_finite(v: &Vector) -> bool {
    v.as_data().iter().all(|x| x.is_finite())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{EquilibriumSolver, NonConvergence, StepOutcome};
    use crate::base::{Config, EquationPartition, Field, Physics};
    use crate::solver::samples::{CubicSpringModel, DivergingModel, LinearSpringModel, NanModel, SoftTangentModel};
    use crate::solver::{DenseLinearSystem, EquilibriumState, LinearSystemAdapter, TangentProvider};
    use crate::solver::{Failure, ReformReason, SecantUpdate, SolverEvent, Verdict};
    use crate::StrError;
    use russell_lab::{approx_eq, vec_approx_eq, Vector};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn new_captures_errors() {
        let mut config = Config::new(Physics::Solid);
        config.n_max_iterations = 0;
        let partition = EquationPartition::single(Field::Displacement, 1);
        assert_eq!(
            EquilibriumSolver::new(&config, partition).err(),
            Some("cannot allocate solver because config.validate() failed")
        );
    }

    #[test]
    fn solve_step_captures_errors() {
        let config = Config::new(Physics::Solid);
        let partition = EquationPartition::single(Field::Displacement, 2);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = LinearSpringModel::new(&[[2.0, -1.0], [-1.0, 2.0]], &[1.0, 1.0]);
        let mut lin_sys = DenseLinearSystem::new(2, 4).unwrap();
        let mut state = EquilibriumState::new(3);
        assert_eq!(
            solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).err(),
            Some("the state vector has an incompatible dimension")
        );
        let mut state = EquilibriumState::new(2);
        assert_eq!(
            solver.solve_step(&mut model, &mut lin_sys, &mut state, 0.0).err(),
            Some("dt must be > 0.0")
        );
    }

    #[test]
    fn linear_problem_converges_in_one_iteration() {
        let config = Config::new(Physics::Solid);
        let partition = EquationPartition::single(Field::Displacement, 2);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = LinearSpringModel::new(&[[2.0, -1.0], [-1.0, 2.0]], &[1.0, 1.0]);
        let mut lin_sys = DenseLinearSystem::new(2, 4).unwrap();
        let mut state = EquilibriumState::new(2);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(outcome, StepOutcome::Converged);
        vec_approx_eq(&state.uu, &[1.0, 1.0], 1e-14);
        vec_approx_eq(&state.previous[Field::Displacement], &[1.0, 1.0], 1e-14);
        assert_eq!(state.t, 1.0);
        assert_eq!(state.n_step, 1);
        let counters = solver.counters();
        assert_eq!(counters.n_iterations, 1);
        assert_eq!(counters.n_reformations, 1);
        assert_eq!(counters.n_converged_steps, 1);
        assert_eq!(solver.log().records.len(), 1);
        assert_eq!(solver.log().records[0].verdict, Verdict::Converged);
        assert_eq!(solver.log().outcomes(), &[StepOutcome::Converged]);
    }

    #[test]
    fn nonlinear_problem_converges() {
        let mut config = Config::new(Physics::Solid);
        config.set_tol_all(1e-10).unwrap();
        let partition = EquationPartition::single(Field::Displacement, 1);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = CubicSpringModel::new(10.0);
        let mut lin_sys = DenseLinearSystem::new(1, 1).unwrap();
        let mut state = EquilibriumState::new(1);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(outcome, StepOutcome::Converged);
        approx_eq(state.uu[0], 2.0, 1e-8);
        let n_iterations = solver.counters().n_iterations;
        assert!(n_iterations > 1);

        // the iteration count is reproducible
        let mut state = EquilibriumState::new(1);
        solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(solver.counters().n_iterations, n_iterations);
    }

    #[test]
    fn diverging_problem_hits_the_reformation_limit() {
        // without line search, each full step doubles the energy norm
        let mut config = Config::new(Physics::Solid);
        config.set_line_search(0.0, 5).unwrap().set_max_reformations(3).unwrap();
        let partition = EquationPartition::single(Field::Displacement, 1);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = DivergingModel::new();
        let mut lin_sys = DenseLinearSystem::new(1, 1).unwrap();
        let mut state = EquilibriumState::new(1);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(outcome, StepOutcome::NotConverged(NonConvergence::ReformationLimit));
        assert_eq!(state.uu[0], 0.0);
        assert_eq!(state.t, 0.0);
        assert_eq!(state.n_step, 0);
        assert_eq!(solver.counters().n_reformations, 3);
        assert_eq!(solver.counters().n_iterations, 3);
        assert_eq!(solver.counters().n_failed_steps, 1);
        let reasons: Vec<_> = solver.log().reformations().iter().map(|(_, _, r)| *r).collect();
        assert_eq!(reasons[0], ReformReason::Initial);
        assert!(reasons[1..].iter().all(|r| *r == ReformReason::Diverging));
    }

    #[test]
    fn non_finite_residual_corrupts_the_step() {
        let config = Config::new(Physics::Solid);
        let partition = EquationPartition::single(Field::Displacement, 1);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = NanModel::new();
        let mut lin_sys = DenseLinearSystem::new(1, 1).unwrap();
        let mut state = EquilibriumState::new(1);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(outcome, StepOutcome::Corrupted);
        assert_eq!(state.uu[0], 0.0);
        assert_eq!(state.t, 0.0);
    }

    #[test]
    fn negative_curvature_rejects_the_update() {
        // with a single interpolation, the line search stops at s = 0.25 where R = 1.25 > R₀;
        // the energy norm 0.3125 stays below its maximum but d·(R₀ - R₁) < 0
        let mut config = Config::new(Physics::Solid);
        config.set_line_search(0.9, 1).unwrap();
        let partition = EquationPartition::single(Field::Displacement, 1);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = DivergingModel::new();
        let mut lin_sys = DenseLinearSystem::new(1, 1).unwrap();
        let mut state = EquilibriumState::new(1);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(outcome, StepOutcome::NotConverged(NonConvergence::ReformationLimit));
        let records = &solver.log().records;
        assert_eq!(records[0].norms.step, 0.25);
        approx_eq(records[0].norms.energy.current, 0.3125, 1e-15);
        assert_eq!(records[0].verdict, Verdict::NotConverged(Failure::Energy));
        let reformations = solver.log().reformations();
        assert_eq!(reformations[0], (0, 0, ReformReason::Initial));
        assert_eq!(
            reformations[1],
            (0, 1, ReformReason::SecantRejected(SecantUpdate::NotPositiveDefinite))
        );
        assert!(records.iter().all(|r| r.n_updates == 0));
        assert_eq!(solver.counters().n_updates, 0);
    }

    #[test]
    fn collapsed_line_search_reforms_without_resetting_the_baseline() {
        let mut config = Config::new(Physics::Solid);
        config.set_max_reformations(3).unwrap();
        let partition = EquationPartition::single(Field::Displacement, 1);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = SoftTangentModel::new(1e8);
        let mut lin_sys = DenseLinearSystem::new(1, 1).unwrap();
        let mut state = EquilibriumState::new(1);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(outcome, StepOutcome::NotConverged(NonConvergence::ReformationLimit));
        let reasons: Vec<_> = solver.log().reformations().iter().map(|(_, _, r)| *r).collect();
        assert_eq!(
            reasons,
            &[
                ReformReason::Initial,
                ReformReason::LineSearchCollapsed,
                ReformReason::LineSearchCollapsed
            ]
        );
        let records = &solver.log().records;
        assert_eq!(records.len(), 3);
        for record in records {
            assert_eq!(record.verdict, Verdict::NotConverged(Failure::LineSearch));
            assert_eq!(record.norms.energy.initial, 1.0);
            assert_eq!(record.norms.residual.initial, 1.0);
        }
    }

    #[test]
    fn non_finite_trial_residual_corrupts_the_step() {
        let config = Config::new(Physics::Solid);
        let partition = EquationPartition::single(Field::Displacement, 1);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = NanModel::finite_at_origin();
        let mut lin_sys = DenseLinearSystem::new(1, 1).unwrap();
        let mut state = EquilibriumState::new(1);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(outcome, StepOutcome::Corrupted);
        assert_eq!(state.uu[0], 0.0);
        assert_eq!(state.t, 0.0);
        assert_eq!(solver.counters().n_iterations, 0);
        assert_eq!(solver.counters().n_failed_steps, 1);
        assert_eq!(solver.log().records.len(), 0);
    }

    /// Solves the linear system with a NaN result
    struct NanLinearSystem {}

    impl LinearSystemAdapter for NanLinearSystem {
        fn reform(
            &mut self,
            _tangent: &mut dyn TangentProvider,
            _uu: &Vector,
            _state: &EquilibriumState,
            _rhs_correction: Option<&mut Vector>,
        ) -> Result<(), StrError> {
            Ok(())
        }

        fn solve(&mut self, x: &mut Vector, _rhs: &Vector) -> Result<(), StrError> {
            x.fill(f64::NAN);
            Ok(())
        }
    }

    #[test]
    fn non_finite_direction_corrupts_the_step() {
        let config = Config::new(Physics::Solid);
        let partition = EquationPartition::single(Field::Displacement, 1);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = CubicSpringModel::new(10.0);
        let mut lin_sys = NanLinearSystem {};
        let mut state = EquilibriumState::new(1);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(outcome, StepOutcome::Corrupted);
        assert_eq!(state.uu[0], 0.0);
        assert_eq!(solver.counters().n_rhs, 1);
        assert_eq!(solver.log().records.len(), 0);
    }

    #[test]
    fn log_can_be_limited_to_the_last_step() {
        let mut config = Config::new(Physics::Solid);
        config.set_tol_all(1e-10).unwrap().set_log_all_steps(false);
        let partition = EquationPartition::single(Field::Displacement, 1);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = CubicSpringModel::new(10.0);
        let mut lin_sys = DenseLinearSystem::new(1, 1).unwrap();
        let mut state = EquilibriumState::new(1);
        solver.solve_step(&mut model, &mut lin_sys, &mut state, 0.5).unwrap();
        solver.solve_step(&mut model, &mut lin_sys, &mut state, 0.5).unwrap();
        assert_eq!(state.n_step, 2);
        assert!(solver.log().records.len() > 0);
        assert!(solver.log().records.iter().all(|r| r.step == 1));
        assert!(matches!(
            solver.log().events.first(),
            Some(SolverEvent::StepStarted { step: 1, .. })
        ));
        assert_eq!(solver.log().outcomes(), &[StepOutcome::Converged]);

        // the default log keeps every step but may be cleared by the caller
        let config = Config::new(Physics::Solid);
        let partition = EquationPartition::single(Field::Displacement, 2);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = LinearSpringModel::new(&[[2.0, -1.0], [-1.0, 2.0]], &[1.0, 1.0]);
        let mut lin_sys = DenseLinearSystem::new(2, 4).unwrap();
        let mut state = EquilibriumState::new(2);
        solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(solver.log().records.len(), 2);
        assert_eq!(solver.log().outcomes().len(), 2);
        solver.log_mut().clear();
        assert_eq!(solver.log().records.len(), 0);
        assert_eq!(solver.log().events.len(), 0);
    }

    #[test]
    fn cancel_flag_works() {
        let config = Config::new(Physics::Solid);
        let partition = EquationPartition::single(Field::Displacement, 2);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        solver.set_cancel_flag(flag.clone());
        let mut model = LinearSpringModel::new(&[[2.0, -1.0], [-1.0, 2.0]], &[1.0, 1.0]);
        let mut lin_sys = DenseLinearSystem::new(2, 4).unwrap();
        let mut state = EquilibriumState::new(2);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(outcome, StepOutcome::Cancelled);
        assert_eq!(state.t, 0.0);
        assert_eq!(solver.counters().n_iterations, 0);
        assert_eq!(solver.log().records.len(), 0);
        assert!(matches!(
            solver.log().events.last(),
            Some(SolverEvent::StepFinished {
                outcome: StepOutcome::Cancelled,
                ..
            })
        ));

        flag.store(false, Ordering::Relaxed);
        let outcome = solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        assert_eq!(outcome, StepOutcome::Converged);
        assert_eq!(solver.counters().n_converged_steps, 1);
        assert_eq!(solver.counters().n_failed_steps, 0);
        assert_eq!(solver.counters().n_cancelled_steps, 1);
    }

    #[test]
    fn checkpoint_and_restore_work() {
        let mut config = Config::new(Physics::Solid);
        config.set_tol_energy(1e-6).unwrap();
        let partition = EquationPartition::single(Field::Displacement, 2);
        let mut solver = EquilibriumSolver::new(&config, partition).unwrap();
        let mut model = LinearSpringModel::new(&[[2.0, -1.0], [-1.0, 2.0]], &[1.0, 1.0]);
        let mut lin_sys = DenseLinearSystem::new(2, 4).unwrap();
        let mut state = EquilibriumState::new(2);
        solver.solve_step(&mut model, &mut lin_sys, &mut state, 1.0).unwrap();
        let checkpoint = solver.checkpoint(&state);
        assert_eq!(checkpoint.tolerances.energy, 1e-6);
        assert_eq!(checkpoint.counters.n_converged_steps, 1);

        let partition = EquationPartition::single(Field::Displacement, 2);
        let mut other = EquilibriumSolver::new(&config, partition).unwrap();
        let restored = other.restore(&checkpoint).unwrap();
        assert_eq!(other.counters(), solver.counters());
        assert_eq!(restored.n_step, 1);
        vec_approx_eq(&restored.uu, &[1.0, 1.0], 1e-14);

        let partition = EquationPartition::single(Field::Displacement, 3);
        let mut wrong = EquilibriumSolver::new(&config, partition).unwrap();
        assert_eq!(
            wrong.restore(&checkpoint).err(),
            Some("the checkpoint state has an incompatible dimension")
        );
    }
}
