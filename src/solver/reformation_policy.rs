use super::{Failure, SecantUpdate};
use crate::base::Config;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines the reasons for reforming the tangent matrix
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ReformReason {
    /// First reformation of the step
    Initial,

    /// The line search collapsed (or the step is below the minimum)
    LineSearchCollapsed,

    /// The energy norm exceeded its running maximum
    Diverging,

    /// The BFGS update was rejected
    SecantRejected(SecantUpdate),

    /// The BFGS history reached its capacity
    HistoryExhausted,

    /// Full-Newton reformation after a rejected augmentation
    Augmentation,
}

impl ReformReason {
    /// Returns the warning message associated with this reason (if any)
    ///
    /// The history exhaustion is silent in full-Newton mode (`max_updates = 0`).
    pub fn warning(&self, max_updates: usize) -> Option<&'static str> {
        match self {
            ReformReason::Initial => None,
            ReformReason::LineSearchCollapsed => Some("Zero linestep size. Stiffness matrix will now be reformed"),
            ReformReason::Diverging => Some("Problem is diverging. Stiffness matrix will now be reformed"),
            ReformReason::SecantRejected(..) => {
                Some("The BFGS update has failed.\nStiffness matrix will now be reformed.")
            }
            ReformReason::HistoryExhausted => {
                if max_updates > 0 {
                    Some("Max nr of BFGS updates reached.\nStiffness matrix will now be reformed.")
                } else {
                    None
                }
            }
            ReformReason::Augmentation => None,
        }
    }
}

impl fmt::Display for ReformReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReformReason::Initial => write!(f, "initial"),
            ReformReason::LineSearchCollapsed => write!(f, "line search collapsed"),
            ReformReason::Diverging => write!(f, "diverging"),
            ReformReason::SecantRejected(SecantUpdate::IllConditioned) => write!(f, "BFGS update ill-conditioned"),
            ReformReason::SecantRejected(..) => write!(f, "BFGS update not positive definite"),
            ReformReason::HistoryExhausted => write!(f, "BFGS history exhausted"),
            ReformReason::Augmentation => write!(f, "augmentation (full-Newton)"),
        }
    }
}

/// Defines the action after a non-converged iteration
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IterationAction {
    /// Attempt a BFGS update and continue with the secant direction
    Update,

    /// Reform the tangent matrix (clearing the BFGS history)
    Reform(ReformReason),

    /// Reform the tangent matrix and reset the convergence baseline to the current iterate
    ReformAndResetBaseline,
}

/// Decides when the tangent matrix must be recomputed and bounds the number of reformations
pub struct ReformationPolicy {
    /// Maximum number of reformations per step (or between augmentations)
    max_reformations: usize,

    /// Number of reformations since the beginning of the step or the last augmentation
    n_reformations: usize,
}

impl ReformationPolicy {
    /// Allocates a new instance
    pub fn new(config: &Config) -> Self {
        ReformationPolicy {
            max_reformations: config.max_reformations,
            n_reformations: 0,
        }
    }

    /// Returns the number of reformations since the beginning of the step or the last augmentation
    #[inline]
    pub fn n_reformations(&self) -> usize {
        self.n_reformations
    }

    /// Resets the counter (at the beginning of a step or after an augmentation)
    pub fn reset_count(&mut self) {
        self.n_reformations = 0;
    }

    /// Decides the action after a non-converged iteration
    ///
    /// # Input
    ///
    /// * `failure` -- the reason for not converging
    /// * `history_full` -- whether the BFGS history reached its capacity or not
    pub fn decide(&self, failure: Failure, history_full: bool) -> IterationAction {
        match failure {
            Failure::Diverging => IterationAction::ReformAndResetBaseline,
            Failure::LineSearch => IterationAction::Reform(ReformReason::LineSearchCollapsed),
            _ => {
                if history_full {
                    IterationAction::Reform(ReformReason::HistoryExhausted)
                } else {
                    IterationAction::Update
                }
            }
        }
    }

    /// Registers a new reformation
    ///
    /// Returns false if the maximum number of reformations has been reached; in this case,
    /// the reformation must not be performed and the step fails.
    pub fn register(&mut self) -> bool {
        if self.n_reformations >= self.max_reformations {
            return false;
        }
        self.n_reformations += 1;
        true
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{IterationAction, ReformReason, ReformationPolicy};
    use crate::base::{Config, Field, Physics};
    use crate::solver::{Failure, SecantUpdate};

    #[test]
    fn decide_works() {
        let config = Config::new(Physics::Solid);
        let policy = ReformationPolicy::new(&config);
        assert_eq!(
            policy.decide(Failure::Diverging, false),
            IterationAction::ReformAndResetBaseline
        );
        assert_eq!(
            policy.decide(Failure::LineSearch, false),
            IterationAction::Reform(ReformReason::LineSearchCollapsed)
        );
        assert_eq!(policy.decide(Failure::Energy, false), IterationAction::Update);
        assert_eq!(policy.decide(Failure::Field(Field::Displacement), false), IterationAction::Update);
        assert_eq!(
            policy.decide(Failure::Residual, true),
            IterationAction::Reform(ReformReason::HistoryExhausted)
        );
    }

    #[test]
    fn register_respects_the_limit() {
        let mut config = Config::new(Physics::Solid);
        config.set_max_reformations(2).unwrap();
        let mut policy = ReformationPolicy::new(&config);
        assert_eq!(policy.register(), true);
        assert_eq!(policy.register(), true);
        assert_eq!(policy.register(), false);
        assert_eq!(policy.n_reformations(), 2);
        policy.reset_count();
        assert_eq!(policy.n_reformations(), 0);
        assert_eq!(policy.register(), true);
    }

    #[test]
    fn warning_and_display_work() {
        assert_eq!(ReformReason::Initial.warning(10), None);
        assert_eq!(ReformReason::HistoryExhausted.warning(0), None);
        assert_eq!(
            ReformReason::HistoryExhausted.warning(10),
            Some("Max nr of BFGS updates reached.\nStiffness matrix will now be reformed.")
        );
        assert!(ReformReason::SecantRejected(SecantUpdate::NotPositiveDefinite)
            .warning(0)
            .is_some());
        assert_eq!(format!("{}", ReformReason::Diverging), "diverging");
        assert_eq!(
            format!("{}", ReformReason::SecantRejected(SecantUpdate::IllConditioned)),
            "BFGS update ill-conditioned"
        );
    }
}
