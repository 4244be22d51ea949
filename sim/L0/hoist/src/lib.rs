//! Conserved-length pulley rigs: positioning a load hung from cables.
//!
//! A rig suspends a single free point (the load) from several cables. Each
//! cable starts at a handle, runs over a chain of pulleys, and drops from
//! its last pulley (the anchor) to the load:
//!
//! ```text
//!   handle ●──────● guide ─────● anchor        anchor ●────● handle
//!                                 ╲                  ╱
//!                                  ╲                ╱
//!                                   ╲              ╱
//!                                    ╲            ╱
//!                                     ╲          ╱
//!                                      ●  load  ●
//! ```
//!
//! Cables do not stretch. Pulling a handle lengthens the handle-to-anchor
//! path and shortens the anchor-to-load drop by the same amount. The rig
//! turns those drops into distance targets and places the load where all
//! of them hold at once.
//!
//! # Solvers
//!
//! - **Two cables**: two spheres meet in a circle; the load takes the
//!   circle's lowest point ([`two_point`]).
//! - **Three or more**: gradient-descent multilateration started below the
//!   anchors, keeping the best and, on ties, lowest candidate
//!   ([`multilateration`]).
//! - **Fewer than two**: under-determined; the load stays put.
//!
//! "Lowest" is measured along a configurable [`Gravity`] direction.
//!
//! # Quick Start
//!
//! ```
//! use sim_hoist::{CableConstraint, CycleOutcome, PulleyMount, PulleyRig};
//! use sim_hoist::scene::{NodeId, StaticScene};
//! use nalgebra::{Point3, Vector3};
//!
//! let handle = NodeId::new(0);
//! let mut scene = StaticScene::new().with_node(handle, Point3::new(-2.0, 0.0, 0.0));
//!
//! // One cable routed over a guide pulley, one tied off directly.
//! let routed = CableConstraint::new(
//!     "routed",
//!     handle,
//!     vec![
//!         PulleyMount::fixed(Point3::new(-2.0, 0.0, 5.0)),
//!         PulleyMount::fixed(Point3::new(0.0, 0.0, 5.0)),
//!     ],
//! )
//! .unwrap();
//! let tied = CableConstraint::direct(
//!     "tied",
//!     Point3::new(4.0, 0.0, 6.0),
//!     Point3::new(4.0, 0.0, 5.0),
//! )
//! .unwrap();
//!
//! let mut rig = PulleyRig::with_defaults(Point3::new(2.0, 0.0, 1.0))
//!     .with_cable(routed)
//!     .with_cable(tied);
//! rig.activate(&scene).unwrap();
//!
//! // Haul in half a metre of cable.
//! scene.translate(handle, Vector3::new(0.0, 0.0, -0.5));
//! let report = rig.tick(&scene, &mut ()).unwrap();
//!
//! assert_eq!(report.outcome, CycleOutcome::Exact);
//! assert!(report.load.x < 2.0);
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. The host scene
//! graph is reached only through [`SceneGraph`] and [`RigSink`], so the
//! rig can run inside an engine, an editor tool, or a headless test.

#![doc(html_root_url = "https://docs.rs/sim-hoist/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::doc_markdown,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::many_single_char_names
)]
#![cfg_attr(
    test,
    allow(
        clippy::float_cmp,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic
    )
)]

pub mod cable;
pub mod config;
pub mod error;
pub mod gravity;
pub mod multilateration;
pub mod pulley;
pub mod rig;
pub mod scene;
pub mod two_point;

// Re-export main types at crate root
pub use cable::{CableBaseline, CableConstraint};
pub use config::SolverConfig;
pub use error::{HoistError, Result};
pub use gravity::Gravity;
pub use multilateration::{
    BestCandidate, MultilaterationResult, MultilaterationSolver, SphereTarget, mean_residual,
};
pub use pulley::{PulleyMount, path_length};
pub use rig::{CycleOutcome, CycleReport, PulleyRig, SolverMode};
pub use scene::{NodeId, RigSink, SceneGraph, StaticScene};
pub use two_point::{IntersectionCircle, solve_two_point, sphere_intersection};
