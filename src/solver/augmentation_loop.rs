use super::{ConstraintAugmenter, EquilibriumState};
use crate::base::Config;
use crate::StrError;
use russell_lab::Vector;
use serde::{Deserialize, Serialize};

/// Holds the result of an augmentation request
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AugmentOutcome {
    /// The constraints are satisfied (or there are no constraints)
    Accepted,

    /// The constraint state was updated; the residual must be recomputed and the iterations resumed
    Rejected,

    /// The maximum number of augmentations was reached without satisfying the constraints
    Exhausted,
}

/// Drives the outer constraint-enforcement loop around the equilibrium iterations
pub struct AugmentationLoop {
    /// Maximum number of augmentations per step
    max_augmentations: usize,

    /// Number of augmentations in the current step
    n_augmentations: usize,
}

impl AugmentationLoop {
    /// Allocates a new instance
    pub fn new(config: &Config) -> Self {
        AugmentationLoop {
            max_augmentations: config.max_augmentations,
            n_augmentations: 0,
        }
    }

    /// Returns the number of augmentations in the current step
    #[inline]
    pub fn n_augmentations(&self) -> usize {
        self.n_augmentations
    }

    /// Prepares the loop for a new step
    ///
    /// The constraint state is reset only if the model does not carry it across steps.
    pub fn start_step(&mut self, augmenter: &mut dyn ConstraintAugmenter) {
        self.n_augmentations = 0;
        if augmenter.has_constraints() && !augmenter.constraints_persist() {
            augmenter.reset_constraints();
        }
    }

    /// Performs an augmentation after the equilibrium iterations have converged
    pub fn augment(
        &mut self,
        augmenter: &mut dyn ConstraintAugmenter,
        uu: &Vector,
        state: &EquilibriumState,
    ) -> Result<AugmentOutcome, StrError> {
        if !augmenter.has_constraints() {
            return Ok(AugmentOutcome::Accepted);
        }
        if self.n_augmentations >= self.max_augmentations {
            return Ok(AugmentOutcome::Exhausted);
        }
        self.n_augmentations += 1;
        if augmenter.augment(uu, state)? {
            Ok(AugmentOutcome::Accepted)
        } else {
            Ok(AugmentOutcome::Rejected)
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
