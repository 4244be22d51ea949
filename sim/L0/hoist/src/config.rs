//! Solver tunables.
//!
//! [`SolverConfig`] controls the iterative multilateration solver and the
//! gravity direction shared by both solvers.

use crate::error::{HoistError, Result};
use crate::gravity::Gravity;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the rig solvers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Hard cap on descent iterations per solve.
    pub max_iterations: usize,

    /// Mean absolute residual below which the descent stops early.
    pub convergence_threshold: f64,

    /// Step size of the first descent iteration.
    pub initial_step: f64,

    /// Factor applied to the step size after every iteration.
    pub step_decay: f64,

    /// Extra movement along gravity per iteration, as a fraction of the
    /// current step size.
    ///
    /// Keeps the descent drifting toward the lower root when several
    /// positions fit the cables equally well. Large values stop the
    /// residual from reaching `convergence_threshold`.
    pub gravity_bias: f64,

    /// Offset along gravity from the anchor centroid for the initial guess.
    pub initial_drop: f64,

    /// Relative tolerance under which two residuals count as equal.
    pub tie_tolerance: f64,

    /// Direction considered "down".
    pub gravity: Gravity,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_threshold: 1e-3,
            initial_step: 1.0,
            step_decay: 0.99,
            gravity_bias: 1e-4,
            initial_drop: 1.0,
            tie_tolerance: 1e-6,
            gravity: Gravity::z_down(),
        }
    }
}

impl SolverConfig {
    /// Configuration for cheap interactive updates.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            max_iterations: 25,
            convergence_threshold: 1e-2,
            ..Default::default()
        }
    }

    /// Configuration for tight convergence.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            max_iterations: 1000,
            convergence_threshold: 1e-5,
            step_decay: 0.995,
            gravity_bias: 1e-6,
            ..Default::default()
        }
    }

    /// Set the iteration cap.
    #[must_use]
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence threshold.
    #[must_use]
    pub fn convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    /// Set the initial step size and its per-iteration decay.
    #[must_use]
    pub fn step(mut self, initial_step: f64, step_decay: f64) -> Self {
        self.initial_step = initial_step;
        self.step_decay = step_decay;
        self
    }

    /// Set the per-iteration gravity bias.
    #[must_use]
    pub fn gravity_bias(mut self, bias: f64) -> Self {
        self.gravity_bias = bias;
        self
    }

    /// Set the gravity direction.
    #[must_use]
    pub fn gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(HoistError::invalid_config("max_iterations must be positive"));
        }

        if !self.convergence_threshold.is_finite() || self.convergence_threshold <= 0.0 {
            return Err(HoistError::invalid_config(format!(
                "convergence_threshold must be positive, got {}",
                self.convergence_threshold
            )));
        }

        if !self.initial_step.is_finite() || self.initial_step <= 0.0 {
            return Err(HoistError::invalid_config(format!(
                "initial_step must be positive, got {}",
                self.initial_step
            )));
        }

        if !(self.step_decay > 0.0 && self.step_decay < 1.0) {
            return Err(HoistError::invalid_config(format!(
                "step_decay must be in (0, 1), got {}",
                self.step_decay
            )));
        }

        for (name, value) in [
            ("gravity_bias", self.gravity_bias),
            ("initial_drop", self.initial_drop),
            ("tie_tolerance", self.tie_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(HoistError::invalid_config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }

        Ok(())
    }
}
