//! Error types for rig configuration and scene access.
//!
//! Geometric failures (disjoint spheres, unreachable targets, slow
//! convergence) are not errors; they are reported through solver outcomes.
//! Only misconfiguration and missing scene data end up here.

use thiserror::Error;

use crate::scene::NodeId;

/// Errors that can occur while configuring or driving a pulley rig.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HoistError {
    /// The scene graph has no position for the requested node.
    #[error("scene node not found: {0}")]
    NodeNotFound(NodeId),

    /// A cable was built without any pulley to anchor the load to.
    #[error("cable '{0}' has an empty pulley chain")]
    EmptyChain(String),

    /// A solver tunable is outside its legal range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The rig cannot be reconfigured while it is solving.
    #[error("rig is active; suspend it before changing cables")]
    RigActive,

    /// A cable target was read before its baseline was captured.
    #[error("cable '{0}' has no baseline; activate the rig first")]
    BaselineMissing(String),
}

impl HoistError {
    /// Create an empty chain error.
    pub fn empty_chain(cable: impl Into<String>) -> Self {
        Self::EmptyChain(cable.into())
    }

    /// Create an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a missing baseline error.
    pub fn baseline_missing(cable: impl Into<String>) -> Self {
        Self::BaselineMissing(cable.into())
    }
}

/// Result type for rig operations.
pub type Result<T> = std::result::Result<T, HoistError>;
