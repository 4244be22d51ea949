//! The rig: cables, a load, and the per-tick solve.
//!
//! A [`PulleyRig`] is either [`Suspended`](SolverMode::Suspended), while
//! the host edits handles and pulleys freely, or
//! [`Active`](SolverMode::Active), where every tick:
//!
//! 1. refreshes each cable's target distance from its live chain length,
//! 2. positions the load (exact for two cables, iterative for three or
//!    more, untouched for fewer),
//! 3. publishes the load and one wire polyline per cable.
//!
//! Every mode change recaptures all cable baselines, so the cable lengths
//! the rig conserves are the ones the host left when it switched modes.
//!
//! # Example
//!
//! ```
//! use sim_hoist::{CableConstraint, PulleyRig, SolverConfig};
//! use sim_hoist::scene::{NodeId, StaticScene};
//! use nalgebra::{Point3, Vector3};
//!
//! let (left, right) = (NodeId::new(0), NodeId::new(1));
//! let mut scene = StaticScene::new()
//!     .with_node(left, Point3::new(-1.0, 0.0, 5.0))
//!     .with_node(right, Point3::new(5.0, 0.0, 5.0));
//!
//! let mut rig = PulleyRig::new(Point3::new(2.0, 0.0, 1.0), SolverConfig::default())
//!     .unwrap()
//!     .with_cable(CableConstraint::direct("left", left, Point3::new(0.0, 0.0, 5.0)).unwrap())
//!     .with_cable(CableConstraint::direct("right", right, Point3::new(4.0, 0.0, 5.0)).unwrap());
//!
//! rig.activate(&scene).unwrap();
//!
//! // Pull both handles outward: the load rises.
//! scene.translate(left, Vector3::new(-0.5, 0.0, 0.0));
//! scene.translate(right, Vector3::new(0.5, 0.0, 0.0));
//! let report = rig.tick(&scene, &mut ()).unwrap();
//!
//! assert!(report.load.z > 1.0);
//! ```

use nalgebra::Point3;
use tracing::{debug, trace, warn};

use crate::cable::CableConstraint;
use crate::config::SolverConfig;
use crate::error::{HoistError, Result};
use crate::multilateration::{MultilaterationSolver, SphereTarget, mean_residual};
use crate::scene::{NodeId, RigSink, SceneGraph};
use crate::two_point::solve_two_point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether the rig is solving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolverMode {
    /// Editing: the load is left alone and baselines are frozen.
    #[default]
    Suspended,
    /// Solving every tick.
    Active,
}

impl SolverMode {
    /// Human-readable label for UI display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Suspended => "Suspended",
            Self::Active => "Active",
        }
    }

    /// Whether this mode positions the load.
    #[must_use]
    pub const fn is_solving(self) -> bool {
        matches!(self, Self::Active)
    }

    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Suspended => Self::Active,
            Self::Active => Self::Suspended,
        }
    }
}

/// What a tick did to the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CycleOutcome {
    /// The rig is suspended; nothing was solved.
    Suspended,
    /// Fewer than two cables; the load kept its position.
    Underdetermined,
    /// Two cables, solved exactly.
    Exact,
    /// Two cables with no common point; the load kept its position.
    Infeasible,
    /// Three or more cables, solved by descent.
    Iterative {
        /// Descent steps taken.
        iterations: usize,
        /// Whether the residual dropped below the threshold.
        converged: bool,
    },
}

impl CycleOutcome {
    /// Whether the load was moved this tick.
    #[must_use]
    pub const fn moved_load(self) -> bool {
        matches!(self, Self::Exact | Self::Iterative { .. })
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CycleReport {
    /// Mode during the tick.
    pub mode: SolverMode,
    /// What happened to the load.
    pub outcome: CycleOutcome,
    /// Load position after the tick.
    pub load: Point3<f64>,
    /// Mean absolute cable residual at `load`.
    pub error: f64,
}

/// A load suspended from conserved-length cables.
#[derive(Debug, Clone)]
pub struct PulleyRig {
    cables: Vec<CableConstraint>,
    load: Point3<f64>,
    /// Scene node mirroring the load, read while suspended.
    load_node: Option<NodeId>,
    mode: SolverMode,
    solver: MultilaterationSolver,
    error: f64,
}

impl PulleyRig {
    /// Create a suspended rig with no cables.
    pub fn new(load: Point3<f64>, config: SolverConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            cables: Vec::new(),
            load,
            load_node: None,
            mode: SolverMode::Suspended,
            solver: MultilaterationSolver::new(config),
            error: 0.0,
        })
    }

    /// Create a suspended rig with default configuration.
    #[must_use]
    pub fn with_defaults(load: Point3<f64>) -> Self {
        Self {
            cables: Vec::new(),
            load,
            load_node: None,
            mode: SolverMode::Suspended,
            solver: MultilaterationSolver::with_defaults(),
            error: 0.0,
        }
    }

    /// Add a cable (builder style). The rig starts suspended, so this
    /// cannot conflict with solving.
    #[must_use]
    pub fn with_cable(mut self, cable: CableConstraint) -> Self {
        self.cables.push(cable);
        self
    }

    /// Follow a scene node for the load while suspended.
    ///
    /// The host may drag the load around while editing; the rig reads it
    /// back before recapturing baselines and before drawing wires.
    #[must_use]
    pub fn with_load_node(mut self, node: NodeId) -> Self {
        self.load_node = Some(node);
        self
    }

    /// Add a cable, returning its index.
    pub fn add_cable(&mut self, cable: CableConstraint) -> Result<usize> {
        self.ensure_suspended()?;
        self.cables.push(cable);
        Ok(self.cables.len() - 1)
    }

    /// Remove every cable.
    pub fn clear_cables(&mut self) -> Result<()> {
        self.ensure_suspended()?;
        self.cables.clear();
        Ok(())
    }

    /// Move the load by hand.
    pub fn set_load(&mut self, load: Point3<f64>) -> Result<()> {
        self.ensure_suspended()?;
        self.load = load;
        Ok(())
    }

    /// Replace the solver configuration.
    pub fn set_config(&mut self, config: SolverConfig) -> Result<()> {
        config.validate()?;
        self.solver = MultilaterationSolver::new(config);
        Ok(())
    }

    /// Get the cables.
    #[must_use]
    pub fn cables(&self) -> &[CableConstraint] {
        &self.cables
    }

    /// Current load position.
    #[must_use]
    pub fn load(&self) -> Point3<f64> {
        self.load
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> SolverMode {
        self.mode
    }

    /// Solver configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        self.solver.config()
    }

    /// Mean absolute residual from the last active tick.
    #[must_use]
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Switch modes. Returns `true` if the mode changed.
    ///
    /// Any change recaptures every cable's baseline against the current
    /// scene. If a scene node is missing the mode stays as it was.
    pub fn set_mode<S>(&mut self, mode: SolverMode, scene: &S) -> Result<bool>
    where
        S: SceneGraph + ?Sized,
    {
        if mode == self.mode {
            return Ok(false);
        }

        if !self.mode.is_solving() {
            self.sync_load(scene)?;
        }
        self.recompute_baselines(scene)?;

        debug!(
            from = self.mode.label(),
            to = mode.label(),
            cables = self.cables.len(),
            "rig mode changed; baselines recaptured"
        );
        self.mode = mode;
        Ok(true)
    }

    /// Start solving.
    pub fn activate<S>(&mut self, scene: &S) -> Result<bool>
    where
        S: SceneGraph + ?Sized,
    {
        self.set_mode(SolverMode::Active, scene)
    }

    /// Stop solving.
    pub fn suspend<S>(&mut self, scene: &S) -> Result<bool>
    where
        S: SceneGraph + ?Sized,
    {
        self.set_mode(SolverMode::Suspended, scene)
    }

    /// Flip between suspended and active.
    pub fn toggle<S>(&mut self, scene: &S) -> Result<SolverMode>
    where
        S: SceneGraph + ?Sized,
    {
        self.set_mode(self.mode.toggled(), scene)?;
        Ok(self.mode)
    }

    /// Capture every cable's baseline at the current load position.
    ///
    /// All cables are measured before any is updated, so a missing node
    /// leaves every baseline as it was.
    pub fn recompute_baselines<S>(&mut self, scene: &S) -> Result<()>
    where
        S: SceneGraph + ?Sized,
    {
        let baselines = self
            .cables
            .iter()
            .map(|cable| cable.measure_baseline(scene, &self.load))
            .collect::<Result<Vec<_>>>()?;

        for (cable, baseline) in self.cables.iter_mut().zip(baselines) {
            cable.apply_baseline(baseline);
        }
        Ok(())
    }

    /// Run one cycle and publish its results to `sink`.
    ///
    /// While active the load is written to the sink; wires are published
    /// in both modes so edits stay visible. Scene lookup failures abort
    /// the tick before anything is published and leave the load alone.
    pub fn tick<S, K>(&mut self, scene: &S, sink: &mut K) -> Result<CycleReport>
    where
        S: SceneGraph + ?Sized,
        K: RigSink + ?Sized,
    {
        let result = if self.mode.is_solving() {
            self.solve(scene)
        } else {
            self.sync_load(scene).map(|()| CycleOutcome::Suspended)
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%err, mode = self.mode.label(), "rig tick aborted");
                return Err(err);
            }
        };

        let wires = self
            .cables
            .iter()
            .map(|cable| cable.wire_vertices(scene, &self.load))
            .collect::<Result<Vec<_>>>()?;

        if self.mode.is_solving() {
            sink.publish_load(self.load);
        }
        for (index, vertices) in wires.iter().enumerate() {
            sink.publish_wire(index, vertices);
        }

        trace!(?outcome, error = self.error, "rig tick");
        Ok(CycleReport {
            mode: self.mode,
            outcome,
            load: self.load,
            error: self.error,
        })
    }

    fn solve<S>(&mut self, scene: &S) -> Result<CycleOutcome>
    where
        S: SceneGraph + ?Sized,
    {
        let mut targets = Vec::with_capacity(self.cables.len());
        for cable in &mut self.cables {
            let radius = cable.refresh_target(scene)?;
            targets.push(SphereTarget::new(cable.anchor_position(scene)?, radius));
        }

        let outcome = match targets.as_slice() {
            [] | [_] => CycleOutcome::Underdetermined,
            [first, second] => {
                let gravity = self.solver.config().gravity;
                let solution =
                    solve_two_point(&first.center, first.radius, &second.center, second.radius, &gravity);
                match solution {
                    Some(position) => {
                        self.load = position;
                        CycleOutcome::Exact
                    }
                    None => {
                        warn!(
                            r1 = first.radius,
                            r2 = second.radius,
                            separation = (second.center - first.center).norm(),
                            "no two-cable solution; holding load"
                        );
                        CycleOutcome::Infeasible
                    }
                }
            }
            _ => match self.solver.solve(&targets) {
                Some(result) => {
                    self.load = result.position;
                    CycleOutcome::Iterative {
                        iterations: result.iterations,
                        converged: result.converged,
                    }
                }
                None => CycleOutcome::Underdetermined,
            },
        };

        self.error = mean_residual(&targets, &self.load);
        Ok(outcome)
    }

    fn sync_load<S>(&mut self, scene: &S) -> Result<()>
    where
        S: SceneGraph + ?Sized,
    {
        if let Some(node) = self.load_node {
            self.load = scene.position(node).ok_or(HoistError::NodeNotFound(node))?;
        }
        Ok(())
    }

    fn ensure_suspended(&self) -> Result<()> {
        if self.mode.is_solving() {
            Err(HoistError::RigActive)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gravity::Gravity;
    use crate::pulley::PulleyMount;
    use crate::scene::StaticScene;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const LEFT: NodeId = NodeId::new(0);
    const RIGHT: NodeId = NodeId::new(1);

    /// Two handles beside two ceiling anchors, load hanging between them.
    fn two_cable_rig() -> (PulleyRig, StaticScene) {
        let scene = StaticScene::new()
            .with_node(LEFT, Point3::new(-1.0, 0.0, 5.0))
            .with_node(RIGHT, Point3::new(5.0, 0.0, 5.0));

        let rig = PulleyRig::with_defaults(Point3::new(2.0, 0.0, 1.0))
            .with_cable(CableConstraint::direct("left", LEFT, Point3::new(0.0, 0.0, 5.0)).unwrap())
            .with_cable(
                CableConstraint::direct("right", RIGHT, Point3::new(4.0, 0.0, 5.0)).unwrap(),
            );

        (rig, scene)
    }

    #[derive(Default)]
    struct Recorder {
        loads: Vec<Point3<f64>>,
        wires: Vec<(usize, Vec<Point3<f64>>)>,
    }

    impl RigSink for Recorder {
        fn publish_load(&mut self, position: Point3<f64>) {
            self.loads.push(position);
        }

        fn publish_wire(&mut self, cable: usize, vertices: &[Point3<f64>]) {
            self.wires.push((cable, vertices.to_vec()));
        }
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(SolverMode::default(), SolverMode::Suspended);
        assert_eq!(SolverMode::Suspended.toggled(), SolverMode::Active);
        assert!(SolverMode::Active.is_solving());
        assert_eq!(SolverMode::Active.label(), "Active");
    }

    #[test]
    fn test_activation_captures_baselines() {
        let (mut rig, scene) = two_cable_rig();
        assert!(rig.cables().iter().all(|c| c.baseline().is_none()));

        assert!(rig.activate(&scene).unwrap());
        assert!(!rig.activate(&scene).unwrap());

        for cable in rig.cables() {
            let baseline = cable.baseline().unwrap();
            assert_relative_eq!(baseline.chain_length, 1.0, epsilon = 1e-12);
            assert_relative_eq!(baseline.anchor_load_length, 20.0_f64.sqrt(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_steady_state_holds_load() {
        let (mut rig, scene) = two_cable_rig();
        rig.activate(&scene).unwrap();

        let report = rig.tick(&scene, &mut ()).unwrap();
        assert_eq!(report.outcome, CycleOutcome::Exact);
        assert_relative_eq!(report.load, Point3::new(2.0, 0.0, 1.0), epsilon = 1e-9);
        assert_relative_eq!(report.error, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pulling_one_handle_shifts_load() {
        let (mut rig, mut scene) = two_cable_rig();
        rig.activate(&scene).unwrap();

        scene.translate(LEFT, Vector3::new(-1.0, 0.0, 0.0));
        let report = rig.tick(&scene, &mut ()).unwrap();

        let left = rig.cables()[0].target_distance();
        assert_relative_eq!(left, 20.0_f64.sqrt() - 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            (report.load - Point3::new(0.0, 0.0, 5.0)).norm(),
            left,
            epsilon = 1e-9
        );
        assert!(report.load.x < 2.0);
    }

    #[test]
    fn test_infeasible_holds_position() {
        let (mut rig, mut scene) = two_cable_rig();
        rig.activate(&scene).unwrap();

        // Pull both cables far enough that the spheres separate.
        scene.translate(LEFT, Vector3::new(-3.0, 0.0, 0.0));
        scene.translate(RIGHT, Vector3::new(3.0, 0.0, 0.0));

        let report = rig.tick(&scene, &mut ()).unwrap();
        assert_eq!(report.outcome, CycleOutcome::Infeasible);
        assert!(!report.outcome.moved_load());
        assert_eq!(report.load, Point3::new(2.0, 0.0, 1.0));
        assert!(report.error > 0.0);
    }

    #[test]
    fn test_suspended_tick_leaves_load() {
        let (mut rig, mut scene) = two_cable_rig();
        scene.translate(LEFT, Vector3::new(-1.0, 0.0, 0.0));

        let mut sink = Recorder::default();
        let report = rig.tick(&scene, &mut sink).unwrap();

        assert_eq!(report.outcome, CycleOutcome::Suspended);
        assert_eq!(report.load, Point3::new(2.0, 0.0, 1.0));
        assert!(sink.loads.is_empty());
        assert_eq!(sink.wires.len(), 2);
    }

    #[test]
    fn test_single_cable_is_underdetermined() {
        let scene = StaticScene::new().with_node(LEFT, Point3::new(-1.0, 0.0, 5.0));
        let mut rig = PulleyRig::with_defaults(Point3::new(0.0, 0.0, 2.0))
            .with_cable(CableConstraint::direct("solo", LEFT, Point3::new(0.0, 0.0, 5.0)).unwrap());
        rig.activate(&scene).unwrap();

        let mut moved = scene.clone();
        moved.translate(LEFT, Vector3::new(-1.0, 0.0, 0.0));
        let report = rig.tick(&moved, &mut ()).unwrap();

        assert_eq!(report.outcome, CycleOutcome::Underdetermined);
        assert_eq!(report.load, Point3::new(0.0, 0.0, 2.0));
        assert_relative_eq!(report.error, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_no_cables_is_underdetermined() {
        let mut rig = PulleyRig::with_defaults(Point3::new(1.0, 2.0, 3.0));
        let scene = StaticScene::new();
        rig.activate(&scene).unwrap();

        let report = rig.tick(&scene, &mut ()).unwrap();
        assert_eq!(report.outcome, CycleOutcome::Underdetermined);
        assert_eq!(report.load, Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(report.error, 0.0);
    }

    #[test]
    fn test_reconfiguration_requires_suspension() {
        let (mut rig, scene) = two_cable_rig();
        rig.activate(&scene).unwrap();

        let extra = CableConstraint::direct("extra", LEFT, Point3::origin()).unwrap();
        assert_eq!(rig.add_cable(extra.clone()), Err(HoistError::RigActive));
        assert_eq!(rig.clear_cables(), Err(HoistError::RigActive));
        assert_eq!(rig.set_load(Point3::origin()), Err(HoistError::RigActive));

        rig.suspend(&scene).unwrap();
        assert_eq!(rig.add_cable(extra), Ok(2));
    }

    #[test]
    fn test_missing_node_keeps_mode() {
        let (mut rig, _) = two_cable_rig();
        let err = rig.activate(&StaticScene::new()).unwrap_err();

        assert_eq!(err, HoistError::NodeNotFound(LEFT));
        assert_eq!(rig.mode(), SolverMode::Suspended);
        assert!(rig.cables().iter().all(|c| c.baseline().is_none()));
    }

    #[test]
    fn test_toggle_recaptures() {
        let (mut rig, mut scene) = two_cable_rig();
        assert_eq!(rig.toggle(&scene).unwrap(), SolverMode::Active);

        // Edit while suspended: the new handle position becomes the baseline.
        assert_eq!(rig.toggle(&scene).unwrap(), SolverMode::Suspended);
        scene.translate(LEFT, Vector3::new(-2.0, 0.0, 0.0));
        assert_eq!(rig.toggle(&scene).unwrap(), SolverMode::Active);

        let report = rig.tick(&scene, &mut ()).unwrap();
        assert_relative_eq!(report.load, Point3::new(2.0, 0.0, 1.0), epsilon = 1e-9);
        assert_relative_eq!(rig.cables()[0].baseline().unwrap().chain_length, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_load_node_read_while_suspended() {
        let load_node = NodeId::new(9);
        let (rig, scene) = two_cable_rig();
        let mut rig = rig.with_load_node(load_node);
        let mut scene = scene.with_node(load_node, Point3::new(3.0, 0.0, 2.0));

        let mut sink = Recorder::default();
        rig.tick(&scene, &mut sink).unwrap();
        assert_eq!(rig.load(), Point3::new(3.0, 0.0, 2.0));
        assert_eq!(sink.wires[0].1.last(), Some(&Point3::new(3.0, 0.0, 2.0)));

        scene.set(load_node, Point3::new(2.0, 0.0, 0.0));
        rig.activate(&scene).unwrap();
        let baseline = rig.cables()[1].baseline().unwrap();
        assert_relative_eq!(baseline.anchor_load_length, 29.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_publishes_load_and_wires() {
        let (mut rig, mut scene) = two_cable_rig();
        rig.activate(&scene).unwrap();
        scene.translate(RIGHT, Vector3::new(0.5, 0.0, 0.0));

        let mut sink = Recorder::default();
        let report = rig.tick(&scene, &mut sink).unwrap();

        assert_eq!(sink.loads, vec![report.load]);
        assert_eq!(sink.wires.len(), 2);
        let (index, vertices) = &sink.wires[1];
        assert_eq!(*index, 1);
        assert_eq!(
            vertices,
            &vec![Point3::new(5.5, 0.0, 5.0), Point3::new(4.0, 0.0, 5.0), report.load]
        );
    }

    #[test]
    fn test_three_cables_use_descent() {
        let handles = [NodeId::new(0), NodeId::new(1), NodeId::new(2)];
        let anchors = [
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(6.0, 0.0, 10.0),
            Point3::new(0.0, 6.0, 10.0),
        ];
        let mut scene = StaticScene::new();
        let mut rig = PulleyRig::new(Point3::new(2.0, 2.0, 7.0), SolverConfig::default()).unwrap();
        for (i, (handle, anchor)) in handles.iter().zip(anchors).enumerate() {
            scene.set(*handle, anchor + Vector3::new(0.0, 0.0, 1.0));
            rig.add_cable(
                CableConstraint::new(format!("c{i}"), *handle, vec![PulleyMount::fixed(anchor)])
                    .unwrap(),
            )
            .unwrap();
        }
        rig.activate(&scene).unwrap();

        let report = rig.tick(&scene, &mut ()).unwrap();
        assert!(matches!(
            report.outcome,
            CycleOutcome::Iterative { converged: true, .. }
        ));
        assert!((report.load - Point3::new(2.0, 2.0, 7.0)).norm() < 1e-2);
        assert!(report.error < rig.config().convergence_threshold);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SolverConfig::default().max_iterations(0);
        assert!(matches!(
            PulleyRig::new(Point3::origin(), config.clone()),
            Err(HoistError::InvalidConfig(_))
        ));

        let mut rig = PulleyRig::with_defaults(Point3::origin());
        assert!(rig.set_config(config).is_err());
        assert!(rig.set_config(SolverConfig::default().gravity(Gravity::y_down())).is_ok());
        assert_eq!(rig.config().gravity, Gravity::y_down());
    }
}
