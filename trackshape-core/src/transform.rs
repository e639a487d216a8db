/// Heading rotations used to place track sections in world space
use nalgebra::{Rotation3, Vector3};

use crate::geometry::Point;

/// Position and heading at a point along a track path
///
/// The heading is in degrees around the y axis, zero pointing along +z and
/// positive angles turning towards +x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Point,
    pub heading: f64,
}

impl Placement {
    pub fn new(position: Point, heading: f64) -> Self {
        Self { position, heading }
    }

    pub fn origin() -> Self {
        Self::new(Point::default(), 0.0)
    }

    /// Map a point given in section-local coordinates to world space
    pub fn place(&self, local: Vector3<f64>) -> Point {
        let world = Transform::heading_rotation(self.heading) * local + self.position.to_vector();
        Point::from(world)
    }

    /// Placement after advancing to `local` and turning by `turn` degrees
    pub fn advance(&self, local: Vector3<f64>, turn: f64) -> Placement {
        Placement::new(self.place(local), self.heading + turn)
    }

    /// Unit direction of travel
    pub fn direction(&self) -> Vector3<f64> {
        Transform::heading_rotation(self.heading) * Vector3::z()
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::origin()
    }
}

/// Transform builder for track placement
pub struct Transform;

impl Transform {
    /// Rotation about the y axis that turns +z towards +x for positive angles
    pub fn heading_rotation(heading_degrees: f64) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::y_axis(), heading_degrees.to_radians())
    }

    /// Local offset of a straight section after `length` meters
    pub fn straight_offset(length: f64) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, length)
    }

    /// Local offset after travelling `angle` degrees along a circular arc;
    /// negative angles bend towards -x
    pub fn curve_offset(radius: f64, angle_degrees: f64) -> Vector3<f64> {
        let theta = angle_degrees.abs().to_radians();
        let lateral = radius * (1.0 - theta.cos());
        Vector3::new(
            lateral.copysign(angle_degrees),
            0.0,
            radius * theta.sin(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_heading() {
        let rotation = Transform::heading_rotation(0.0);
        assert!((rotation.matrix() - nalgebra::Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_positive_heading_turns_towards_x() {
        let direction = Placement::new(Point::default(), 90.0).direction();
        assert_relative_eq!(direction, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_curve_offset() {
        let right = Transform::curve_offset(100.0, 90.0);
        assert_relative_eq!(right, Vector3::new(100.0, 0.0, 100.0), epsilon = 1e-9);
        let left = Transform::curve_offset(100.0, -90.0);
        assert_relative_eq!(left, Vector3::new(-100.0, 0.0, 100.0), epsilon = 1e-9);
    }

    #[test]
    fn test_advance_accumulates_heading() {
        let start = Placement::new(Point::new(1.0, 2.0, 3.0), 90.0);
        let next = start.advance(Transform::straight_offset(10.0), -45.0);
        assert_relative_eq!(next.position.x, 11.0, epsilon = 1e-9);
        assert_relative_eq!(next.position.y, 2.0);
        assert_relative_eq!(next.position.z, 3.0, epsilon = 1e-9);
        assert_relative_eq!(next.heading, 45.0);
    }
}
