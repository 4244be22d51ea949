//! Cable waypoints: handles, guide pulleys, and anchor pulleys.
//!
//! A waypoint is either fixed in the world or mounted on a scene node that
//! the host may move between cycles. Positions are resolved against the
//! scene every time they are needed.
//!
//! # Example
//!
//! ```
//! use sim_hoist::pulley::PulleyMount;
//! use sim_hoist::scene::{NodeId, StaticScene};
//! use nalgebra::Point3;
//!
//! let scene = StaticScene::new().with_node(NodeId::new(1), Point3::new(0.0, 0.0, 4.0));
//!
//! let guide = PulleyMount::fixed(Point3::new(1.0, 0.0, 4.0));
//! let handle = PulleyMount::node(NodeId::new(1));
//!
//! assert_eq!(guide.world_position(&scene).unwrap(), Point3::new(1.0, 0.0, 4.0));
//! assert_eq!(handle.world_position(&scene).unwrap(), Point3::new(0.0, 0.0, 4.0));
//! ```

use nalgebra::Point3;

use crate::error::{HoistError, Result};
use crate::scene::{NodeId, SceneGraph};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where a cable waypoint sits.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PulleyMount {
    /// Fixed to the world at this position.
    Fixed(Point3<f64>),

    /// Follows a scene node.
    Node(NodeId),
}

impl PulleyMount {
    /// Create a world-fixed mount.
    #[must_use]
    pub fn fixed(position: Point3<f64>) -> Self {
        Self::Fixed(position)
    }

    /// Create a mount that follows a scene node.
    #[must_use]
    pub fn node(node: NodeId) -> Self {
        Self::Node(node)
    }

    /// Resolve the world position of this waypoint.
    pub fn world_position<S>(&self, scene: &S) -> Result<Point3<f64>>
    where
        S: SceneGraph + ?Sized,
    {
        match *self {
            Self::Fixed(position) => Ok(position),
            Self::Node(node) => scene.position(node).ok_or(HoistError::NodeNotFound(node)),
        }
    }

    /// Get the node this waypoint follows (None if fixed).
    #[must_use]
    pub fn attached_node(&self) -> Option<NodeId> {
        match self {
            Self::Fixed(_) => None,
            Self::Node(node) => Some(*node),
        }
    }

    /// Check if this waypoint is fixed to the world.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

impl From<Point3<f64>> for PulleyMount {
    fn from(position: Point3<f64>) -> Self {
        Self::Fixed(position)
    }
}

impl From<NodeId> for PulleyMount {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

/// Sum of straight segment lengths along `points`.
///
/// Zero or one point has no length.
#[must_use]
pub fn path_length(points: &[Point3<f64>]) -> f64 {
    points.windows(2).map(|pair| (pair[1] - pair[0]).norm()).sum()
}
