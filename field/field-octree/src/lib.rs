//! Immutable spatial snapshot octrees with lock-free concurrent queries.
//!
//! This crate provides the snapshot half of the force-field engine:
//!
//! - [`SpatialSample`] - immutable per-body capture (position, velocity,
//!   mass, radius, derived AABB)
//! - [`Aabb`] - axis-aligned bounding box with the overlap/containment
//!   method family
//! - [`OctreeNode`] - generic octree node shared with the force tree
//! - [`SnapshotTree`] - immutable octree over a sample batch, with the
//!   concurrent query family (`all_items`, `items_in_radius`,
//!   `items_in_box`, `leaf_at`)
//!
//! # Layer 0 Crate
//!
//! No engine or framework dependencies: usable from servers, CLI tools,
//! tests, and other engines.
//!
//! # Concurrency Contract
//!
//! A built tree is fully immutable. Publication is expected to happen via a
//! single atomic reference swap (see `field-engine`), after which any
//! number of threads may query the same tree without synchronization.
//! Queries return freshly materialized sample lists, never references into
//! shared mutable state, because no mutable state exists.
//!
//! # Example
//!
//! ```
//! use field_octree::{SampleToken, SnapshotConfig, SnapshotTree, SpatialSample};
//! use nalgebra::{Point3, Vector3};
//!
//! let samples: Vec<_> = (0..32)
//!     .map(|i| {
//!         SpatialSample::new(
//!             SampleToken(i),
//!             Point3::new(i as f64, 0.0, 0.0),
//!             Vector3::zeros(),
//!             1.0,
//!             0.25,
//!         )
//!     })
//!     .collect();
//!
//! let tree = SnapshotTree::build(samples, &SnapshotConfig::default());
//! assert_eq!(tree.all_items().len(), 32);
//!
//! let near_origin = tree.items_in_radius(&Point3::origin(), 1.5);
//! assert_eq!(near_origin.len(), 2); // samples at x = 0 and x = 1
//! ```

pub mod aabb;
pub mod error;
pub mod octree;
pub mod sample;
pub mod snapshot;

pub use aabb::Aabb;
pub use error::OctreeError;
pub use octree::{octant_bounds, octant_for_aabb, octant_for_point, NodeId, OctreeNode, OCTANT_COUNT};
pub use sample::{SampleToken, SpatialSample};
pub use snapshot::{SnapshotConfig, SnapshotNode, SnapshotTree};
