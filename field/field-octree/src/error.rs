//! Error types for octree operations.

use nalgebra::Point3;

/// Errors that can occur during octree queries.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OctreeError {
    /// A point-location query was issued for a point outside the tree's
    /// root bounding box. Callers are expected to bounds-check first; this
    /// is a contract violation, not an expected runtime condition.
    #[error("point {point:?} lies outside the tree bounds [{min:?}, {max:?}]")]
    OutOfBounds {
        /// The offending query point.
        point: Point3<f64>,
        /// Minimum corner of the root bounding box.
        min: Point3<f64>,
        /// Maximum corner of the root bounding box.
        max: Point3<f64>,
    },
}
