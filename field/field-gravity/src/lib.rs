//! Approximate gravity force field derived from spatial snapshot octrees.
//!
//! This crate provides the force half of the field engine:
//!
//! - [`ForceTree`] - a dense octree of gravity cells, congruent with the
//!   [`SnapshotTree`](field_octree::SnapshotTree) it was derived from
//! - [`GravityCell`] / [`CellSlot`] - the per-leaf payload and its
//!   atomically-swappable handle, the only mutable facet of the tree
//! - [`pairwise_forces`] - the O(n²) leaf-pair synthesis (n bounded by
//!   partition granularity, not body count)
//! - [`SwirlField`] / [`BoundaryField`] / [`CompositeField`] - stateless
//!   analytic contributions independent of the trees
//!
//! # Approximation
//!
//! This is deliberately not an exact N-body solver: each leaf aggregates
//! all mass in its cell (including a volume-proportional share of samples
//! that straddle coarser split planes) into a single point at the cell
//! center, and the pair magnitude divides by distance rather than distance
//! squared. Both are load-bearing behavioral choices, not oversights.
//!
//! # Example
//!
//! ```
//! use field_gravity::ForceTree;
//! use field_octree::{SampleToken, SnapshotConfig, SnapshotTree, SpatialSample};
//! use nalgebra::{Point3, Vector3};
//!
//! let samples = vec![
//!     SpatialSample::new(SampleToken(0), Point3::new(-5.0, 0.0, 0.0), Vector3::zeros(), 100.0, 0.0),
//!     SpatialSample::new(SampleToken(1), Point3::new(5.0, 0.0, 0.0), Vector3::zeros(), 100.0, 0.0),
//! ];
//! let config = SnapshotConfig { max_items_per_node: 1, jitter_centers: false };
//! let snapshot = SnapshotTree::build(samples, &config);
//!
//! let field = ForceTree::build(&snapshot, 1.0);
//! let total_mass: f64 = field.leaf_cells().iter().map(|c| c.mass).sum();
//! assert!((total_mass - 200.0).abs() < 1e-9);
//! ```

pub mod analytic;
pub mod cell;
pub mod error;
pub mod tree;

pub use analytic::{BoundaryField, CompositeField, SwirlField};
pub use cell::{CellSlot, GravityCell};
pub use error::FieldError;
pub use tree::{pairwise_forces, ForceNode, ForceTree};
