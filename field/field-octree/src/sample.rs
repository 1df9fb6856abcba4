//! Per-body spatial samples.
//!
//! A [`SpatialSample`] is an immutable record of one simulated body's
//! kinematic state, captured on the owning thread at rebuild time. Samples
//! are the only data that crosses from the live (mutable) simulation into
//! the immutable snapshot tree.

use nalgebra::{Point3, Vector3};

use crate::aabb::Aabb;

/// Stable identifier for the body a sample was captured from.
///
/// Unique for the lifetime of the sample batch it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleToken(pub u64);

/// An immutable capture of one body's position, velocity, mass, and extent.
///
/// The bounding box is derived at construction as `position ± radius` on
/// each axis and never recomputed.
///
/// # Example
///
/// ```
/// use field_octree::{SampleToken, SpatialSample};
/// use nalgebra::{Point3, Vector3};
///
/// let sample = SpatialSample::new(
///     SampleToken(7),
///     Point3::new(1.0, 2.0, 3.0),
///     Vector3::zeros(),
///     100.0,
///     0.5,
/// );
/// assert_eq!(sample.aabb.min, Point3::new(0.5, 1.5, 2.5));
/// assert_eq!(sample.aabb.max, Point3::new(1.5, 2.5, 3.5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialSample {
    /// Identifier of the body this sample was captured from.
    pub token: SampleToken,
    /// World-space position at capture time.
    pub position: Point3<f64>,
    /// World-space velocity at capture time.
    pub velocity: Vector3<f64>,
    /// Mass of the body. Non-negative.
    pub mass: f64,
    /// Bounding radius of the body. Non-negative.
    pub radius: f64,
    /// Bounding box, `position ± radius` per axis.
    pub aabb: Aabb,
}

impl SpatialSample {
    /// Creates a sample, deriving the bounding box from position and radius.
    ///
    /// Negative `mass` or `radius` are clamped to zero.
    #[must_use]
    pub fn new(
        token: SampleToken,
        position: Point3<f64>,
        velocity: Vector3<f64>,
        mass: f64,
        radius: f64,
    ) -> Self {
        let mass = mass.max(0.0);
        let radius = radius.max(0.0);
        let half = Vector3::new(radius, radius, radius);
        Self {
            token,
            position,
            velocity,
            mass,
            radius,
            aabb: Aabb::from_center(position, half),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_derived_from_radius() {
        let s = SpatialSample::new(
            SampleToken(0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::zeros(),
            1.0,
            2.0,
        );
        assert_eq!(s.aabb.min, Point3::new(-2.0, -2.0, -2.0));
        assert_eq!(s.aabb.max, Point3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_zero_radius_gives_degenerate_aabb() {
        let s = SpatialSample::new(
            SampleToken(1),
            Point3::new(3.0, 3.0, 3.0),
            Vector3::zeros(),
            1.0,
            0.0,
        );
        assert_eq!(s.aabb.min, s.aabb.max);
    }

    #[test]
    fn test_negative_mass_and_radius_clamped() {
        let s = SpatialSample::new(
            SampleToken(2),
            Point3::origin(),
            Vector3::zeros(),
            -5.0,
            -1.0,
        );
        assert_eq!(s.mass, 0.0);
        assert_eq!(s.radius, 0.0);
    }
}
