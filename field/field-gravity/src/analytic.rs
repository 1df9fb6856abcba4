//! Stateless analytic force fields.
//!
//! Two closed-form contributions independent of any mass distribution:
//!
//! - [`SwirlField`] - an approximately orbit-inducing rotational field;
//! - [`BoundaryField`] - a soft inward repulsion that ramps up near the
//!   map edge and is zero (and continuous) at its start radius.
//!
//! [`CompositeField`] sums whichever of the two are configured; the tree
//! term is added on top by the engine facade.

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

use crate::error::FieldError;

/// Rotational "swirl" field.
///
/// `force(p) = rotate(−normalize(p), axis, angle) · strength`: the inward
/// unit direction tilted by a fixed rotation, scaled by a constant
/// strength. Zero at the origin, where the direction is undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwirlField {
    strength: f64,
    rotation: UnitQuaternion<f64>,
}

impl SwirlField {
    /// Creates a swirl field rotating the inward direction by `angle`
    /// radians around `axis`.
    #[must_use]
    pub fn new(strength: f64, axis: Unit<Vector3<f64>>, angle: f64) -> Self {
        Self {
            strength,
            rotation: UnitQuaternion::from_axis_angle(&axis, angle),
        }
    }

    /// Force contribution at `point`.
    #[must_use]
    pub fn force(&self, point: &Point3<f64>) -> Vector3<f64> {
        let inward = -point.coords;
        let Some(direction) = Unit::try_new(inward, 0.0) else {
            return Vector3::zeros();
        };
        self.rotation * direction.into_inner() * self.strength
    }
}

/// Soft inward repulsion near the map boundary.
///
/// Space is scaled per axis so the (possibly elliptical) map boundary acts
/// as a sphere of radius equal to the largest half-extent. Inside the
/// configured start radius the force is zero; outside it the magnitude is
/// `c · (d − r_start)^exponent`, with `c` solved so the magnitude is
/// exactly `strength_half` at the midpoint between the start radius and
/// the map edge. Direction is toward the map center. The field is
/// continuous at the start radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryField {
    center: Point3<f64>,
    /// Per-axis ellipse-to-sphere scale; degenerate axes scale by 1.
    scale: Vector3<f64>,
    start_radius: f64,
    exponent: f64,
    coefficient: f64,
}

impl BoundaryField {
    /// Creates a boundary field for the map spanning `map_min..map_max`.
    ///
    /// `start_percent` is the fraction of the map half-extent at which the
    /// field begins; `strength_half` is the magnitude exactly halfway
    /// between the start radius and the map edge.
    ///
    /// # Errors
    ///
    /// [`FieldError::InvalidBoundary`] when the parameters leave no room
    /// between the start radius and the map edge (the midpoint calibration
    /// constant would be undefined), or when the map has no extent at all.
    pub fn new(
        start_percent: f64,
        strength_half: f64,
        exponent: f64,
        map_min: Point3<f64>,
        map_max: Point3<f64>,
    ) -> Result<Self, FieldError> {
        if !(0.0..1.0).contains(&start_percent) || strength_half < 0.0 || exponent <= 0.0 {
            return Err(FieldError::InvalidBoundary {
                reason: "start_percent must be in [0, 1), strength_half >= 0, exponent > 0",
            });
        }

        let center = Point3::from((map_min.coords + map_max.coords) * 0.5);
        let half_extents = (map_max - map_min) * 0.5;
        let edge_radius = half_extents.x.max(half_extents.y).max(half_extents.z);
        if edge_radius <= 0.0 {
            return Err(FieldError::InvalidBoundary {
                reason: "map must have positive extent on at least one axis",
            });
        }

        let scale = Vector3::new(
            axis_scale(edge_radius, half_extents.x),
            axis_scale(edge_radius, half_extents.y),
            axis_scale(edge_radius, half_extents.z),
        );

        let start_radius = start_percent * edge_radius;
        let midpoint_distance = (edge_radius - start_radius) * 0.5;
        let coefficient = strength_half / midpoint_distance.powf(exponent);

        Ok(Self {
            center,
            scale,
            start_radius,
            exponent,
            coefficient,
        })
    }

    /// Distance of `point` from the map center in scaled (spherical) space.
    #[must_use]
    pub fn scaled_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.center).component_mul(&self.scale).norm()
    }

    /// Force contribution at `point`. Zero at or inside the start radius.
    #[must_use]
    pub fn force(&self, point: &Point3<f64>) -> Vector3<f64> {
        let distance = self.scaled_distance(point);
        if distance <= self.start_radius {
            return Vector3::zeros();
        }
        let magnitude = self.coefficient * (distance - self.start_radius).powf(self.exponent);
        let Some(inward) = Unit::try_new(self.center - point, 0.0) else {
            return Vector3::zeros();
        };
        inward.into_inner() * magnitude
    }
}

/// Scale factor mapping one ellipse axis onto the reference sphere.
/// Degenerate (zero-extent) axes fall back to a ratio of 1.
fn axis_scale(edge_radius: f64, half_extent: f64) -> f64 {
    if half_extent > 0.0 {
        edge_radius / half_extent
    } else {
        1.0
    }
}

/// The configured analytic fields, summed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeField {
    /// Optional swirl contribution.
    pub swirl: Option<SwirlField>,
    /// Optional boundary contribution.
    pub boundary: Option<BoundaryField>,
}

impl CompositeField {
    /// Sum of the configured analytic contributions at `point`.
    ///
    /// Never fails; with nothing configured this is the zero vector.
    #[must_use]
    pub fn force(&self, point: &Point3<f64>) -> Vector3<f64> {
        let mut total = Vector3::zeros();
        if let Some(swirl) = &self.swirl {
            total += swirl.force(point);
        }
        if let Some(boundary) = &self.boundary {
            total += boundary.force(point);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn symmetric_boundary() -> BoundaryField {
        // Map [-100, 100]^3: edge radius 100, start radius 50.
        BoundaryField::new(
            0.5,
            8.0,
            2.0,
            Point3::new(-100.0, -100.0, -100.0),
            Point3::new(100.0, 100.0, 100.0),
        )
        .unwrap()
    }

    #[test]
    fn test_swirl_perpendicular_for_quarter_turn() {
        // Quarter turn around Z maps the inward -X direction onto -Y.
        let swirl = SwirlField::new(3.0, Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        let force = swirl.force(&Point3::new(10.0, 0.0, 0.0));
        assert_relative_eq!(force.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(force.y, -3.0, epsilon = 1e-12);
        assert_relative_eq!(force.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_swirl_magnitude_independent_of_distance() {
        let swirl = SwirlField::new(2.5, Vector3::z_axis(), 0.7);
        let near = swirl.force(&Point3::new(1.0, 2.0, 0.5));
        let far = swirl.force(&Point3::new(100.0, 200.0, 50.0));
        assert_relative_eq!(near.norm(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(near, far, epsilon = 1e-12);
    }

    #[test]
    fn test_swirl_zero_at_origin() {
        let swirl = SwirlField::new(5.0, Vector3::y_axis(), 1.0);
        assert_eq!(swirl.force(&Point3::origin()), Vector3::zeros());
    }

    #[test]
    fn test_boundary_zero_inside_and_at_start_radius() {
        let boundary = symmetric_boundary();
        assert_eq!(boundary.force(&Point3::origin()), Vector3::zeros());
        // Exactly at the start radius: magnitude 0 (continuity).
        assert_eq!(
            boundary.force(&Point3::new(50.0, 0.0, 0.0)),
            Vector3::zeros()
        );
    }

    #[test]
    fn test_boundary_strength_half_at_midpoint() {
        let boundary = symmetric_boundary();
        // Midpoint between start radius (50) and edge (100).
        let force = boundary.force(&Point3::new(75.0, 0.0, 0.0));
        assert_relative_eq!(force.norm(), 8.0, epsilon = 1e-9);
        // Directed toward the map center.
        assert!(force.x < 0.0);
        assert_relative_eq!(force.y, 0.0);
        assert_relative_eq!(force.z, 0.0);
    }

    #[test]
    fn test_boundary_continuous_just_past_start() {
        let boundary = symmetric_boundary();
        let force = boundary.force(&Point3::new(50.0 + 1e-6, 0.0, 0.0));
        assert!(force.norm() < 1e-6);
    }

    #[test]
    fn test_boundary_elliptical_map_scales_axes() {
        // Map stretched 2:1 on X; the boundary starts at the same fraction
        // of each axis's own half-extent.
        let boundary = BoundaryField::new(
            0.5,
            8.0,
            2.0,
            Point3::new(-200.0, -100.0, -100.0),
            Point3::new(200.0, 100.0, 100.0),
        )
        .unwrap();
        // (100, 0, 0) is halfway out along X: scaled distance 100 equals
        // the start radius, so no force yet.
        assert_eq!(
            boundary.force(&Point3::new(100.0, 0.0, 0.0)),
            Vector3::zeros()
        );
        // Same fraction along Y also sits exactly at the start radius.
        assert_eq!(
            boundary.force(&Point3::new(0.0, 50.0, 0.0)),
            Vector3::zeros()
        );
        // Three quarters out along X is past the start radius.
        assert!(boundary.force(&Point3::new(150.0, 0.0, 0.0)).norm() > 0.0);
    }

    #[test]
    fn test_boundary_rejects_degenerate_configs() {
        assert!(BoundaryField::new(
            1.0, // start at the edge: no room for midpoint calibration
            8.0,
            2.0,
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
        )
        .is_err());
        assert!(BoundaryField::new(
            0.5,
            8.0,
            2.0,
            Point3::origin(),
            Point3::origin(), // zero-extent map
        )
        .is_err());
    }

    #[test]
    fn test_composite_sums_configured_fields() {
        let composite = CompositeField {
            swirl: Some(SwirlField::new(2.0, Vector3::z_axis(), 0.0)),
            boundary: Some(symmetric_boundary()),
        };
        let p = Point3::new(75.0, 0.0, 0.0);
        let expected = composite.swirl.unwrap().force(&p) + composite.boundary.unwrap().force(&p);
        assert_relative_eq!(composite.force(&p), expected, epsilon = 1e-12);

        assert_eq!(CompositeField::default().force(&p), Vector3::zeros());
    }
}
