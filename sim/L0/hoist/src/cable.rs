//! Conserved-length cables.
//!
//! Each cable runs from an origin (the handle) over an ordered chain of
//! pulleys to an anchor pulley, and from there straight to the load:
//!
//! ```text
//!   origin ──── pulley ──── ... ──── anchor
//!                                       │
//!                                       │  target distance
//!                                       ●
//!                                      load
//! ```
//!
//! The cable is inextensible, so its total length is conserved:
//!
//! ```text
//! L_total = L_chain + L_anchor→load
//! ```
//!
//! When the origin-to-anchor path grows by Δ, the anchor-to-load segment
//! must shrink by Δ. The target distance may go negative when the chain
//! is pulled further than the hanging segment allows; that value is passed
//! through unchanged and the solvers treat it as "pull onto the anchor".

use nalgebra::Point3;

use crate::error::{HoistError, Result};
use crate::pulley::{PulleyMount, path_length};
use crate::scene::SceneGraph;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lengths captured when the rig was last (re)activated.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CableBaseline {
    /// Path length from the origin through every pulley to the anchor.
    pub chain_length: f64,

    /// Straight distance from the anchor to the load.
    pub anchor_load_length: f64,
}

impl CableBaseline {
    /// Total conserved cable length.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.chain_length + self.anchor_load_length
    }

    /// Anchor-to-load distance implied by the current chain length.
    #[must_use]
    pub fn target_for(&self, current_chain_length: f64) -> f64 {
        self.anchor_load_length - (current_chain_length - self.chain_length)
    }
}

/// One cable of the rig: an origin, a pulley chain, and the load tether.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CableConstraint {
    name: String,

    /// Free end of the cable.
    origin: PulleyMount,

    /// Guide pulleys between the origin and the anchor, in order.
    guides: Vec<PulleyMount>,

    /// Pulley the load hangs from.
    anchor: PulleyMount,

    baseline: Option<CableBaseline>,

    /// Anchor-to-load distance for the current cycle.
    target_distance: f64,
}

impl CableConstraint {
    /// Create a cable.
    ///
    /// `pulleys` must contain at least the anchor.
    pub fn new(
        name: impl Into<String>,
        origin: impl Into<PulleyMount>,
        pulleys: Vec<PulleyMount>,
    ) -> Result<Self> {
        let name = name.into();
        let mut guides = pulleys;
        let Some(anchor) = guides.pop() else {
            return Err(HoistError::empty_chain(name));
        };

        Ok(Self {
            name,
            origin: origin.into(),
            guides,
            anchor,
            baseline: None,
            target_distance: 0.0,
        })
    }

    /// Create a cable with no guide pulleys: origin straight to anchor.
    pub fn direct(
        name: impl Into<String>,
        origin: impl Into<PulleyMount>,
        anchor: impl Into<PulleyMount>,
    ) -> Result<Self> {
        Self::new(name, origin, vec![anchor.into()])
    }

    /// Get the cable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the origin (handle) mount.
    #[must_use]
    pub fn origin(&self) -> &PulleyMount {
        &self.origin
    }

    /// Get the guide pulleys between origin and anchor.
    #[must_use]
    pub fn guides(&self) -> &[PulleyMount] {
        &self.guides
    }

    /// Get the anchor pulley the load hangs from.
    #[must_use]
    pub fn anchor(&self) -> &PulleyMount {
        &self.anchor
    }

    /// Baseline captured at the last activation, if any.
    #[must_use]
    pub fn baseline(&self) -> Option<CableBaseline> {
        self.baseline
    }

    /// Anchor-to-load distance computed by the last refresh.
    #[must_use]
    pub fn target_distance(&self) -> f64 {
        self.target_distance
    }

    /// Whether the load can hang below the anchor at all this cycle.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.target_distance > 0.0
    }

    /// Signed length mismatch for a load at `load` under anchor `anchor`.
    #[must_use]
    pub fn residual(&self, anchor: &Point3<f64>, load: &Point3<f64>) -> f64 {
        (load - anchor).norm() - self.target_distance
    }

    /// Resolve `[origin, guides…, anchor]` to world positions.
    pub fn chain_points<S>(&self, scene: &S) -> Result<Vec<Point3<f64>>>
    where
        S: SceneGraph + ?Sized,
    {
        std::iter::once(&self.origin)
            .chain(&self.guides)
            .chain(std::iter::once(&self.anchor))
            .map(|mount| mount.world_position(scene))
            .collect()
    }

    /// Current path length from the origin to the anchor.
    pub fn chain_length<S>(&self, scene: &S) -> Result<f64>
    where
        S: SceneGraph + ?Sized,
    {
        Ok(path_length(&self.chain_points(scene)?))
    }

    /// Current world position of the anchor.
    pub fn anchor_position<S>(&self, scene: &S) -> Result<Point3<f64>>
    where
        S: SceneGraph + ?Sized,
    {
        self.anchor().world_position(scene)
    }

    /// Measure the conserved lengths with the load at `load`, without
    /// storing them.
    pub fn measure_baseline<S>(&self, scene: &S, load: &Point3<f64>) -> Result<CableBaseline>
    where
        S: SceneGraph + ?Sized,
    {
        let points = self.chain_points(scene)?;
        let anchor = self.anchor.world_position(scene)?;

        Ok(CableBaseline {
            chain_length: path_length(&points),
            anchor_load_length: (load - anchor).norm(),
        })
    }

    /// Capture the conserved lengths with the load at `load`.
    ///
    /// Also resets the target distance to the captured hanging length.
    pub fn recompute_baseline<S>(&mut self, scene: &S, load: &Point3<f64>) -> Result<CableBaseline>
    where
        S: SceneGraph + ?Sized,
    {
        let baseline = self.measure_baseline(scene, load)?;
        self.apply_baseline(baseline);
        Ok(baseline)
    }

    pub(crate) fn apply_baseline(&mut self, baseline: CableBaseline) {
        self.baseline = Some(baseline);
        self.target_distance = baseline.anchor_load_length;
    }

    /// Recompute the target distance from the live chain length.
    ///
    /// No clamping is applied; the result may be zero or negative.
    pub fn refresh_target<S>(&mut self, scene: &S) -> Result<f64>
    where
        S: SceneGraph + ?Sized,
    {
        let baseline = self
            .baseline
            .ok_or_else(|| HoistError::baseline_missing(self.name.clone()))?;

        let current = self.chain_length(scene)?;
        self.target_distance = baseline.target_for(current);
        Ok(self.target_distance)
    }

    /// Polyline `[origin, guides…, anchor, load]` for rendering the wire.
    pub fn wire_vertices<S>(&self, scene: &S, load: &Point3<f64>) -> Result<Vec<Point3<f64>>>
    where
        S: SceneGraph + ?Sized,
    {
        let mut vertices = self.chain_points(scene)?;
        vertices.push(*load);
        Ok(vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeId, StaticScene};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const HANDLE: NodeId = NodeId::new(0);

    /// Handle at (0,0,0), guide at (0,0,5), anchor at (4,0,5), load at (4,0,2).
    fn routed_cable() -> (CableConstraint, StaticScene, Point3<f64>) {
        let cable = CableConstraint::new(
            "routed",
            HANDLE,
            vec![
                PulleyMount::fixed(Point3::new(0.0, 0.0, 5.0)),
                PulleyMount::fixed(Point3::new(4.0, 0.0, 5.0)),
            ],
        )
        .unwrap();
        let scene = StaticScene::new().with_node(HANDLE, Point3::origin());
        (cable, scene, Point3::new(4.0, 0.0, 2.0))
    }

    #[test]
    fn test_empty_chain_rejected() {
        let err = CableConstraint::new("bare", HANDLE, Vec::new()).unwrap_err();
        assert_eq!(err, HoistError::EmptyChain("bare".to_string()));
    }

    #[test]
    fn test_baseline_components() {
        let (mut cable, scene, load) = routed_cable();

        let baseline = cable.recompute_baseline(&scene, &load).unwrap();
        assert_relative_eq!(baseline.chain_length, 9.0, epsilon = 1e-12);
        assert_relative_eq!(baseline.anchor_load_length, 3.0, epsilon = 1e-12);
        assert_relative_eq!(baseline.total_length(), 12.0, epsilon = 1e-12);
        assert_relative_eq!(cable.target_distance(), 3.0, epsilon = 1e-12);
        assert_eq!(cable.baseline(), Some(baseline));
    }

    #[test]
    fn test_pulling_handle_shortens_target() {
        let (mut cable, mut scene, load) = routed_cable();
        cable.recompute_baseline(&scene, &load).unwrap();

        // Pull the handle 1.5 further from the guide pulley.
        scene.set(HANDLE, Point3::new(0.0, 0.0, -1.5));
        let target = cable.refresh_target(&scene).unwrap();
        assert_relative_eq!(target, 1.5, epsilon = 1e-12);

        // Feed 0.5 back.
        scene.set(HANDLE, Point3::new(0.0, 0.0, -1.0));
        let target = cable.refresh_target(&scene).unwrap();
        assert_relative_eq!(target, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_target_may_go_negative() {
        let (mut cable, mut scene, load) = routed_cable();
        cable.recompute_baseline(&scene, &load).unwrap();

        scene.set(HANDLE, Point3::new(0.0, 0.0, -4.0));
        let target = cable.refresh_target(&scene).unwrap();
        assert_relative_eq!(target, -1.0, epsilon = 1e-12);
        assert!(!cable.is_reachable());
    }

    #[test]
    fn test_direct_cable() {
        let anchor = NodeId::new(1);
        let mut scene = StaticScene::new()
            .with_node(HANDLE, Point3::new(-2.0, 0.0, 5.0))
            .with_node(anchor, Point3::new(0.0, 0.0, 5.0));
        let mut cable = CableConstraint::direct("direct", HANDLE, anchor).unwrap();

        assert!(cable.guides().is_empty());
        assert_relative_eq!(cable.chain_length(&scene).unwrap(), 2.0, epsilon = 1e-12);

        cable.recompute_baseline(&scene, &Point3::origin()).unwrap();
        scene.translate(HANDLE, Vector3::new(-0.25, 0.0, 0.0));
        assert_relative_eq!(cable.refresh_target(&scene).unwrap(), 4.75, epsilon = 1e-12);
    }

    #[test]
    fn test_moving_anchor_changes_chain_length() {
        let anchor = NodeId::new(1);
        let mut scene = StaticScene::new()
            .with_node(HANDLE, Point3::new(0.0, 0.0, 5.0))
            .with_node(anchor, Point3::new(3.0, 0.0, 5.0));
        let mut cable = CableConstraint::direct("trolley", HANDLE, anchor).unwrap();
        cable.recompute_baseline(&scene, &Point3::new(3.0, 0.0, 1.0)).unwrap();

        // Trolley rolls away from the handle: the hanging segment shrinks.
        scene.set(anchor, Point3::new(4.0, 0.0, 5.0));
        assert_relative_eq!(cable.refresh_target(&scene).unwrap(), 3.0, epsilon = 1e-12);
        assert_eq!(cable.anchor_position(&scene).unwrap(), Point3::new(4.0, 0.0, 5.0));
    }

    #[test]
    fn test_refresh_requires_baseline() {
        let (mut cable, scene, _) = routed_cable();
        let err = cable.refresh_target(&scene).unwrap_err();
        assert_eq!(err, HoistError::BaselineMissing("routed".to_string()));
    }

    #[test]
    fn test_missing_node_leaves_state_untouched() {
        let (mut cable, _, load) = routed_cable();
        let err = cable.recompute_baseline(&StaticScene::new(), &load).unwrap_err();
        assert_eq!(err, HoistError::NodeNotFound(HANDLE));
        assert_eq!(cable.baseline(), None);
    }

    #[test]
    fn test_wire_vertices() {
        let (cable, scene, load) = routed_cable();
        let vertices = cable.wire_vertices(&scene, &load).unwrap();

        assert_eq!(
            vertices,
            vec![
                Point3::origin(),
                Point3::new(0.0, 0.0, 5.0),
                Point3::new(4.0, 0.0, 5.0),
                load,
            ]
        );
    }

    #[test]
    fn test_residual() {
        let (mut cable, scene, load) = routed_cable();
        cable.recompute_baseline(&scene, &load).unwrap();
        let anchor = cable.anchor_position(&scene).unwrap();

        assert_relative_eq!(cable.residual(&anchor, &load), 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            cable.residual(&anchor, &Point3::new(4.0, 0.0, 1.0)),
            1.0,
            epsilon = 1e-12
        );
    }
}
