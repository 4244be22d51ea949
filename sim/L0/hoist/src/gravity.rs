//! The "down" direction used to break ties between valid solutions.
//!
//! A pulley rig is usually under-determined: two cables leave a whole
//! circle of positions, three cables leave two mirror-image points. The
//! rig always settles on the candidate that lies furthest along
//! [`Gravity`]. Only the direction matters; magnitude is discarded.

use nalgebra::{Point3, Unit, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Below this length a projected direction is treated as degenerate.
const DEGENERATE_PROJECTION: f64 = 1e-9;

/// Unit gravity direction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gravity {
    direction: Unit<Vector3<f64>>,
}

impl Default for Gravity {
    fn default() -> Self {
        Self::z_down()
    }
}

impl Gravity {
    /// Gravity along an arbitrary direction.
    ///
    /// Returns `None` for a zero-length or non-finite vector.
    #[must_use]
    pub fn new(direction: Vector3<f64>) -> Option<Self> {
        if !direction.iter().all(|c| c.is_finite()) {
            return None;
        }
        Unit::try_new(direction, DEGENERATE_PROJECTION).map(|direction| Self { direction })
    }

    /// World −Z (Z-up scenes).
    #[must_use]
    pub fn z_down() -> Self {
        Self {
            direction: Unit::new_unchecked(-Vector3::z()),
        }
    }

    /// World −Y (Y-up scenes).
    #[must_use]
    pub fn y_down() -> Self {
        Self {
            direction: Unit::new_unchecked(-Vector3::y()),
        }
    }

    /// The unit direction gravity points in.
    #[must_use]
    pub fn direction(&self) -> Unit<Vector3<f64>> {
        self.direction
    }

    /// How far `point` lies along gravity. Larger is lower.
    #[must_use]
    pub fn depth(&self, point: &Point3<f64>) -> f64 {
        self.direction.dot(&point.coords)
    }

    /// Whether `a` lies strictly below `b`.
    #[must_use]
    pub fn is_lower(&self, a: &Point3<f64>, b: &Point3<f64>) -> bool {
        self.direction.dot(&(a - b)) > 0.0
    }

    /// Unit direction of steepest descent within the plane with `normal`.
    ///
    /// Gravity is projected onto the plane. When gravity is parallel to
    /// `normal` the projection vanishes and every in-plane direction is
    /// equally low; the world axis least aligned with `normal` is projected
    /// instead (X, then Y, then Z on ties) so the result stays deterministic.
    #[must_use]
    pub fn downhill_in_plane(&self, normal: &Unit<Vector3<f64>>) -> Unit<Vector3<f64>> {
        let projected = project_on_plane(&self.direction.into_inner(), normal);
        if let Some(down) = Unit::try_new(projected, DEGENERATE_PROJECTION) {
            return down;
        }

        let fallback = least_aligned_axis(normal);
        let projected = project_on_plane(&fallback.into_inner(), normal);
        Unit::try_new(projected, DEGENERATE_PROJECTION).unwrap_or(fallback)
    }
}

fn project_on_plane(v: &Vector3<f64>, normal: &Unit<Vector3<f64>>) -> Vector3<f64> {
    let n = normal.into_inner();
    v - n * v.dot(&n)
}

fn least_aligned_axis(normal: &Unit<Vector3<f64>>) -> Unit<Vector3<f64>> {
    let axes = [Vector3::x_axis(), Vector3::y_axis(), Vector3::z_axis()];
    let mut best = axes[0];
    let mut best_alignment = normal.x.abs();

    for axis in &axes[1..] {
        let alignment = axis.dot(&normal.into_inner()).abs();
        if alignment < best_alignment {
            best = *axis;
            best_alignment = alignment;
        }
    }

    best
}
