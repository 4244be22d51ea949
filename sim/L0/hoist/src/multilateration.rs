//! Iterative position solve for a load hanging from three or more cables.
//!
//! Each cable says "the load is `rᵢ` away from anchor `pᵢ`". With three or
//! more cables the spheres rarely meet in exactly one point: three
//! coplanar anchors leave two mirror-image roots, and conserved-length
//! bookkeeping can make the set inconsistent. The solver minimizes the
//! mean mismatch by gradient descent:
//!
//! ```text
//! eᵢ = |x − pᵢ| − rᵢ
//! ∇  = (1/N) Σᵢ (eᵢ / |x − pᵢ|) (x − pᵢ)
//! x ← x − s·∇ + s·β·ĝ
//! s ← s·γ
//! ```
//!
//! where `ĝ` is the gravity direction, `β` the gravity bias, and `γ` the
//! step decay. The guess starts below the anchor centroid so the descent
//! falls into the lower root, and the best guess seen so far is returned,
//! preferring the lower of two equally good candidates.
//!
//! # Example
//!
//! ```
//! use sim_hoist::multilateration::{MultilaterationSolver, SphereTarget};
//! use nalgebra::Point3;
//!
//! let load = Point3::new(1.0, 0.5, -4.0);
//! let anchors = [
//!     Point3::new(-5.0, -5.0, 0.0),
//!     Point3::new(5.0, -5.0, 0.0),
//!     Point3::new(5.0, 5.0, 0.0),
//!     Point3::new(-5.0, 5.0, 0.0),
//! ];
//! let targets: Vec<_> = anchors
//!     .iter()
//!     .map(|anchor| SphereTarget::new(*anchor, (load - anchor).norm()))
//!     .collect();
//!
//! let result = MultilaterationSolver::with_defaults().solve(&targets).unwrap();
//! assert!(result.converged);
//! assert!((result.position - load).norm() < 0.01);
//! ```

use nalgebra::{Point3, Vector3};
use tracing::trace;

use crate::config::SolverConfig;
use crate::gravity::Gravity;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A distance constraint: the load should lie `radius` away from `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SphereTarget {
    /// Anchor position.
    pub center: Point3<f64>,

    /// Target distance from the anchor. May be zero or negative.
    pub radius: f64,
}

impl SphereTarget {
    /// Create a target.
    #[must_use]
    pub fn new(center: Point3<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Signed distance mismatch at `point`.
    #[must_use]
    pub fn residual(&self, point: &Point3<f64>) -> f64 {
        (point - self.center).norm() - self.radius
    }
}

/// Mean absolute residual of `point` against `targets`.
///
/// Zero for an empty slice.
#[must_use]
pub fn mean_residual(targets: &[SphereTarget], point: &Point3<f64>) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    targets.iter().map(|t| t.residual(point).abs()).sum::<f64>() / targets.len() as f64
}

/// Outcome of an iterative solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultilaterationResult {
    /// Best position found.
    pub position: Point3<f64>,

    /// Mean absolute residual at `position`.
    pub error: f64,

    /// Descent steps taken.
    pub iterations: usize,

    /// Whether `error` dropped below the convergence threshold.
    pub converged: bool,
}

/// Best-so-far tracking with a gravity tie-break.
///
/// A candidate replaces the incumbent when its error is strictly lower,
/// or when the errors are equal within the relative tolerance and the
/// candidate lies lower along gravity.
#[derive(Debug, Clone)]
pub struct BestCandidate {
    gravity: Gravity,
    tie_tolerance: f64,
    best: Option<(Point3<f64>, f64)>,
}

impl BestCandidate {
    /// Create an empty tracker.
    #[must_use]
    pub fn new(gravity: Gravity, tie_tolerance: f64) -> Self {
        Self {
            gravity,
            tie_tolerance,
            best: None,
        }
    }

    /// Offer a candidate. Returns `true` if it became the incumbent.
    pub fn offer(&mut self, position: Point3<f64>, error: f64) -> bool {
        let accept = match self.best {
            None => true,
            Some((best_position, best_error)) => {
                error < best_error
                    || (approx_equal(error, best_error, self.tie_tolerance)
                        && self.gravity.is_lower(&position, &best_position))
            }
        };

        if accept {
            self.best = Some((position, error));
        }
        accept
    }

    /// The incumbent position and its error.
    #[must_use]
    pub fn best(&self) -> Option<(Point3<f64>, f64)> {
        self.best
    }
}

fn approx_equal(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs())
}

/// Weighted gradient-descent multilateration.
#[derive(Debug, Clone, Default)]
pub struct MultilaterationSolver {
    config: SolverConfig,
}

impl MultilaterationSolver {
    /// Create a solver with the given configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(SolverConfig::default())
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Find the position best matching all `targets`.
    ///
    /// Always produces a position for non-empty input, converged or not;
    /// returns `None` only when `targets` is empty.
    #[must_use]
    pub fn solve(&self, targets: &[SphereTarget]) -> Option<MultilaterationResult> {
        if targets.is_empty() {
            return None;
        }

        let config = &self.config;
        let down = config.gravity.direction().into_inner();

        let centroid = targets
            .iter()
            .fold(Vector3::zeros(), |sum, t| sum + t.center.coords)
            / targets.len() as f64;
        let mut guess = Point3::from(centroid) + down * config.initial_drop;

        let mut step = config.initial_step;
        let mut best = BestCandidate::new(config.gravity, config.tie_tolerance);
        let mut iterations = 0;
        let mut converged = false;

        loop {
            let (gradient, error) = evaluate(targets, &guess);
            if !error.is_finite() {
                break;
            }

            best.offer(guess, error);

            if error < config.convergence_threshold {
                converged = true;
                break;
            }
            if iterations >= config.max_iterations {
                break;
            }

            guess -= gradient * step;
            guess += down * (step * config.gravity_bias);
            step *= config.step_decay;
            iterations += 1;
        }

        // The initial guess is always finite for finite input; fall back to
        // it when the evaluation itself was poisoned.
        let (position, error) = best.best().unwrap_or((guess, f64::INFINITY));
        trace!(iterations, error, converged, "multilateration finished");

        Some(MultilaterationResult {
            position,
            error,
            iterations,
            converged,
        })
    }
}

/// Mean gradient and mean absolute error at `guess`.
///
/// Targets whose anchor coincides with the guess still count toward the
/// error but contribute no gradient.
fn evaluate(targets: &[SphereTarget], guess: &Point3<f64>) -> (Vector3<f64>, f64) {
    let mut gradient = Vector3::zeros();
    let mut total_error = 0.0;

    for target in targets {
        let offset = guess - target.center;
        let distance = offset.norm();
        let error = distance - target.radius;
        total_error += error.abs();

        if distance > 0.0 {
            gradient += offset * (error / distance);
        }
    }

    let n = targets.len() as f64;
    (gradient / n, total_error / n)
}
