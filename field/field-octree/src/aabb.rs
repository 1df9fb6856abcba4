//! Axis-aligned bounding boxes in world coordinates.
//!
//! The snapshot tree partitions space by comparing sample bounds against
//! split planes, so the AABB carries the full method family the builder and
//! the query layer need: containment, overlap tests against boxes and
//! spheres, overlap volume (used for straddling-mass redistribution), and
//! padding (used to keep sample bounds off the root boundary).

use nalgebra::{Point3, Vector3};

/// An axis-aligned bounding box in world coordinates.
///
/// # Example
///
/// ```
/// use field_octree::Aabb;
/// use nalgebra::Point3;
///
/// let aabb = Aabb::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(10.0, 10.0, 10.0),
/// );
///
/// assert!(aabb.contains(&Point3::new(5.0, 5.0, 5.0)));
/// assert!(!aabb.contains(&Point3::new(15.0, 5.0, 5.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3<f64>,
    /// Maximum corner of the bounding box.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Creates a new AABB from two corner points.
    ///
    /// The corners are automatically reordered so `min ≤ max` on each axis.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Creates an AABB centered at a point with the given half-extents.
    ///
    /// # Example
    ///
    /// ```
    /// use field_octree::Aabb;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let aabb = Aabb::from_center(
    ///     Point3::new(5.0, 5.0, 5.0),
    ///     Vector3::new(2.0, 2.0, 2.0),
    /// );
    /// assert_eq!(aabb.min, Point3::new(3.0, 3.0, 3.0));
    /// assert_eq!(aabb.max, Point3::new(7.0, 7.0, 7.0));
    /// ```
    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Returns the center point of the AABB.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Returns the extent (size) along each axis.
    #[must_use]
    pub fn extents(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Returns the volume of the AABB. Zero for degenerate boxes.
    #[must_use]
    pub fn volume(&self) -> f64 {
        let e = self.extents();
        e.x * e.y * e.z
    }

    /// Checks whether a point lies inside the AABB (boundary inclusive).
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Checks whether this AABB fully contains another.
    #[must_use]
    pub fn contains_aabb(&self, other: &Self) -> bool {
        self.contains(&other.min) && self.contains(&other.max)
    }

    /// Checks whether this AABB intersects another (boundary touching counts).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x < other.min.x
            || other.max.x < self.min.x
            || self.max.y < other.min.y
            || other.max.y < self.min.y
            || self.max.z < other.min.z
            || other.max.z < self.min.z)
    }

    /// Checks whether this AABB intersects a sphere.
    ///
    /// Uses the closest-point test: the sphere overlaps the box iff the
    /// distance from its center to the nearest point of the box is at most
    /// the radius.
    #[must_use]
    pub fn intersects_sphere(&self, center: &Point3<f64>, radius: f64) -> bool {
        let nearest = Point3::new(
            center.x.clamp(self.min.x, self.max.x),
            center.y.clamp(self.min.y, self.max.y),
            center.z.clamp(self.min.z, self.max.z),
        );
        (nearest - center).norm_squared() <= radius * radius
    }

    /// Returns the volume of the intersection of this AABB with another.
    ///
    /// Zero when the boxes are disjoint or only touch on a face, edge, or
    /// corner.
    ///
    /// # Example
    ///
    /// ```
    /// use field_octree::Aabb;
    /// use nalgebra::Point3;
    ///
    /// let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
    /// let b = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(3.0, 2.0, 2.0));
    /// assert_eq!(a.overlap_volume(&b), 4.0);
    /// ```
    #[must_use]
    pub fn overlap_volume(&self, other: &Self) -> f64 {
        let dx = self.max.x.min(other.max.x) - self.min.x.max(other.min.x);
        let dy = self.max.y.min(other.max.y) - self.min.y.max(other.min.y);
        let dz = self.max.z.min(other.max.z) - self.min.z.max(other.min.z);
        if dx <= 0.0 || dy <= 0.0 || dz <= 0.0 {
            0.0
        } else {
            dx * dy * dz
        }
    }

    /// Returns the smallest AABB containing both this one and another.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Returns this AABB grown symmetrically by `fraction` of its extent on
    /// each axis.
    ///
    /// Degenerate axes (zero extent) are still grown by an absolute minimum
    /// so the result has positive volume.
    #[must_use]
    pub fn padded(&self, fraction: f64) -> Self {
        const MIN_PAD: f64 = 1e-9;
        let e = self.extents();
        let pad = Vector3::new(
            (e.x * fraction).max(MIN_PAD),
            (e.y * fraction).max(MIN_PAD),
            (e.z * fraction).max(MIN_PAD),
        );
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reorders_corners() {
        let aabb = Aabb::new(Point3::new(10.0, 10.0, 10.0), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Point3::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn test_contains_boundary_inclusive() {
        let aabb = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 10.0));
        assert!(aabb.contains(&Point3::new(0.0, 0.0, 0.0)));
        assert!(aabb.contains(&Point3::new(10.0, 10.0, 10.0)));
        assert!(!aabb.contains(&Point3::new(10.0, 10.0, 10.1)));
    }

    #[test]
    fn test_intersects_sphere() {
        let aabb = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
        assert!(aabb.intersects_sphere(&Point3::new(1.0, 1.0, 1.0), 0.1));
        assert!(aabb.intersects_sphere(&Point3::new(3.0, 1.0, 1.0), 1.0));
        assert!(!aabb.intersects_sphere(&Point3::new(4.0, 1.0, 1.0), 1.0));
    }

    #[test]
    fn test_overlap_volume_disjoint_is_zero() {
        let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0));
        assert_eq!(a.overlap_volume(&b), 0.0);
        // Face contact has zero overlap volume.
        let c = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert_eq!(a.overlap_volume(&c), 0.0);
    }

    #[test]
    fn test_overlap_volume_partial() {
        let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 4.0, 4.0));
        let b = Aabb::new(Point3::new(2.0, 2.0, 2.0), Point3::new(6.0, 6.0, 6.0));
        assert!((a.overlap_volume(&b) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_padded_grows_every_axis() {
        let aabb = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 10.0));
        let padded = aabb.padded(0.05);
        assert_eq!(padded.min, Point3::new(-0.5, -0.5, -0.5));
        assert_eq!(padded.max, Point3::new(10.5, 10.5, 10.5));
    }

    #[test]
    fn test_padded_degenerate_axis_gets_positive_extent() {
        let aabb = Aabb::new(Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 1.0));
        let padded = aabb.padded(0.05);
        assert!(padded.volume() > 0.0);
        assert!(padded.contains(&Point3::new(1.0, 1.0, 1.0)));
    }
}
