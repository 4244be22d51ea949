//! Exact solution for a load hanging from two cables.
//!
//! Two distance constraints describe two spheres. Where they meet they
//! form a circle:
//!
//! ```text
//!              anchor 1 ●───────a───────┼───────────● anchor 2
//!                         ╲             │ h        ╱
//!                       r1 ╲            │        ╱ r2
//!                           ╲           │      ╱
//!                             ──────────●──────
//!                                 lowest point
//! ```
//!
//! With `d = |anchor2 − anchor1|` the circle's plane sits at
//! `a = (r1² − r2² + d²) / 2d` along the anchor axis and the circle has
//! radius `h = √(r1² − a²)`. The load takes the point of that circle
//! lying furthest along gravity.

use nalgebra::{Point3, Unit, Vector3};

use crate::gravity::Gravity;

/// Slack admitted at the tangency limits before the spheres count as apart.
pub const TANGENCY_TOLERANCE: f64 = 1e-9;

/// Anchor separations below this are treated as coincident.
const COINCIDENT_ANCHORS: f64 = 1e-12;

/// Circle where two spheres intersect.
///
/// A tangent pair produces a circle of zero radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionCircle {
    /// Circle center, on the segment through both anchors.
    pub center: Point3<f64>,

    /// Plane normal, pointing from the first anchor to the second.
    pub normal: Unit<Vector3<f64>>,

    /// Circle radius.
    pub radius: f64,
}

impl IntersectionCircle {
    /// The point of the circle furthest along gravity.
    #[must_use]
    pub fn lowest_point(&self, gravity: &Gravity) -> Point3<f64> {
        let down = gravity.downhill_in_plane(&self.normal);
        self.center + down.into_inner() * self.radius
    }

    /// The point of the circle least far along gravity.
    ///
    /// Mirror of [`lowest_point`](Self::lowest_point) through the center.
    #[must_use]
    pub fn highest_point(&self, gravity: &Gravity) -> Point3<f64> {
        let down = gravity.downhill_in_plane(&self.normal);
        self.center - down.into_inner() * self.radius
    }

    /// Point on the circle at `angle` radians from the lowest point.
    #[must_use]
    pub fn point_at(&self, gravity: &Gravity, angle: f64) -> Point3<f64> {
        let down = gravity.downhill_in_plane(&self.normal).into_inner();
        let side = self.normal.cross(&down);
        self.center + (down * angle.cos() + side * angle.sin()) * self.radius
    }
}

/// Intersect the sphere of radius `r1` around `p1` with the sphere of
/// radius `r2` around `p2`.
///
/// Returns `None` when the spheres are apart, when one lies strictly
/// inside the other, or when the centers coincide (no unique plane).
/// Negative radii never intersect.
#[must_use]
pub fn sphere_intersection(
    p1: &Point3<f64>,
    r1: f64,
    p2: &Point3<f64>,
    r2: f64,
) -> Option<IntersectionCircle> {
    let axis = p2 - p1;
    let d = axis.norm();

    if !d.is_finite() || d < COINCIDENT_ANCHORS {
        return None;
    }
    if d > r1 + r2 + TANGENCY_TOLERANCE || d < (r1 - r2).abs() - TANGENCY_TOLERANCE {
        return None;
    }

    let normal = Unit::new_unchecked(axis / d);
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    // Rounding near tangency can leave a tiny negative under the root.
    let radius = (r1 * r1 - a * a).max(0.0).sqrt();

    Some(IntersectionCircle {
        center: p1 + normal.into_inner() * a,
        normal,
        radius,
    })
}

/// Lowest point at distance `r1` from `p1` and `r2` from `p2`.
///
/// Returns `None` when no such point exists; the caller should keep the
/// load where it was.
#[must_use]
pub fn solve_two_point(
    p1: &Point3<f64>,
    r1: f64,
    p2: &Point3<f64>,
    r2: f64,
    gravity: &Gravity,
) -> Option<Point3<f64>> {
    sphere_intersection(p1, r1, p2, r2).map(|circle| circle.lowest_point(gravity))
}
