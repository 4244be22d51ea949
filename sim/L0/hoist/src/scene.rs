//! Boundary between the rig and the host scene graph.
//!
//! The rig never owns scene nodes. Each cycle it reads world positions
//! through [`SceneGraph`] and writes its results through [`RigSink`]:
//! the load position and one wire polyline per cable.
//!
//! # Example
//!
//! ```
//! use sim_hoist::scene::{NodeId, SceneGraph, StaticScene};
//! use nalgebra::Point3;
//!
//! let scene = StaticScene::new()
//!     .with_node(NodeId::new(0), Point3::new(0.0, 0.0, 3.0))
//!     .with_node(NodeId::new(1), Point3::new(1.0, 0.0, 3.0));
//!
//! assert_eq!(scene.position(NodeId::new(1)), Some(Point3::new(1.0, 0.0, 3.0)));
//! assert_eq!(scene.position(NodeId::new(9)), None);
//! ```

use hashbrown::HashMap;
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of a node in the host scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new node ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Read-only access to live world positions.
///
/// Handles, guide pulleys, and anchors can all move between cycles, so
/// the rig queries them every tick instead of caching positions.
pub trait SceneGraph {
    /// World position of `node`, or `None` if the scene does not know it.
    fn position(&self, node: NodeId) -> Option<Point3<f64>>;
}

impl<F> SceneGraph for F
where
    F: Fn(NodeId) -> Option<Point3<f64>>,
{
    fn position(&self, node: NodeId) -> Option<Point3<f64>> {
        self(node)
    }
}

/// Output slot for rig results.
pub trait RigSink {
    /// Receive the load's position for this cycle.
    fn publish_load(&mut self, position: Point3<f64>);

    /// Receive the ordered `[origin, pulleys…, load]` vertices of one cable.
    fn publish_wire(&mut self, cable: usize, vertices: &[Point3<f64>]);
}

/// Discards all output.
impl RigSink for () {
    fn publish_load(&mut self, _position: Point3<f64>) {}

    fn publish_wire(&mut self, _cable: usize, _vertices: &[Point3<f64>]) {}
}

/// A scene graph backed by a plain position table.
///
/// Useful for headless hosts and tests: positions are set explicitly and
/// stay where they are put.
#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    positions: HashMap<NodeId, Point3<f64>>,
}

impl StaticScene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node (builder style).
    #[must_use]
    pub fn with_node(mut self, node: NodeId, position: Point3<f64>) -> Self {
        self.positions.insert(node, position);
        self
    }

    /// Insert or move a node, returning its previous position.
    pub fn set(&mut self, node: NodeId, position: Point3<f64>) -> Option<Point3<f64>> {
        self.positions.insert(node, position)
    }

    /// Remove a node from the scene.
    pub fn remove(&mut self, node: NodeId) -> Option<Point3<f64>> {
        self.positions.remove(&node)
    }

    /// Translate a node by `offset`. Returns `false` if the node is unknown.
    pub fn translate(&mut self, node: NodeId, offset: nalgebra::Vector3<f64>) -> bool {
        match self.positions.get_mut(&node) {
            Some(position) => {
                *position += offset;
                true
            }
            None => false,
        }
    }

    /// Number of nodes in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the scene has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl SceneGraph for StaticScene {
    fn position(&self, node: NodeId) -> Option<Point3<f64>> {
        self.positions.get(&node).copied()
    }
}
