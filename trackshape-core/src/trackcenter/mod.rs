/// Track centerlines as ordered sample sequences
///
/// A [`Trackcenter`] is immutable once built. The fitted spline and the
/// neighbour graph used by the queries are derived from its samples on first
/// use and cached on the value.

mod query;
mod reposition;
mod spline;

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::ops::Add;

use crate::geometry::Point;
use crate::transform::{Placement, Transform};

pub use query::{closest_trackcenter, distance_along_nearest_trackcenter, signed_lateral_distance};

use query::NeighborGraph;
use spline::SampledSpline;

/// Samples taken from the fitted spline unless configured otherwise
pub const DEFAULT_SPLINE_SAMPLES: usize = 1000;

#[derive(Clone)]
pub struct Trackcenter {
    points: Vec<Point>,
    spline_samples: usize,
    spline: OnceCell<Option<SampledSpline>>,
    graph: RefCell<Option<NeighborGraph>>,
}

impl Trackcenter {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            spline_samples: DEFAULT_SPLINE_SAMPLES,
            spline: OnceCell::new(),
            graph: RefCell::new(None),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Use `samples` spline samples for repositioning, dropping any cached fit
    pub fn with_spline_samples(mut self, samples: usize) -> Self {
        self.spline_samples = samples.max(2);
        self.spline = OnceCell::new();
        self
    }

    /// `num_points` evenly spaced samples along a straight line of `length`
    /// meters, heading `start_angle` degrees from +z towards +x
    pub fn straight(length: f64, num_points: usize, start_angle: f64, start_point: Point) -> Self {
        let points = fractions(num_points)
            .map(|f| straight_point_from_length(length * f, start_angle, start_point))
            .collect();
        Self::new(points)
    }

    /// `num_points` evenly spaced samples along a circular arc. Positive
    /// angles bend towards +x.
    pub fn curve(
        radius: f64,
        angle: f64,
        num_points: usize,
        start_angle: f64,
        start_point: Point,
    ) -> Self {
        let points = fractions(num_points)
            .map(|f| curve_point_from_angle(radius, angle * f, start_angle, start_point))
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }
}

/// `n` fractions spread evenly over [0, 1]
fn fractions(n: usize) -> impl Iterator<Item = f64> {
    let denominator = n.saturating_sub(1).max(1) as f64;
    (0..n).map(move |i| i as f64 / denominator)
}

/// Point `length` meters along a straight line from `start_point`
pub fn straight_point_from_length(length: f64, start_angle: f64, start_point: Point) -> Point {
    Placement::new(start_point, start_angle).place(Transform::straight_offset(length))
}

/// Point after travelling `angle` degrees along an arc of `radius` meters
pub fn curve_point_from_angle(radius: f64, angle: f64, start_angle: f64, start_point: Point) -> Point {
    Placement::new(start_point, start_angle).place(Transform::curve_offset(radius, angle))
}

impl Add for Trackcenter {
    type Output = Trackcenter;

    fn add(self, other: Trackcenter) -> Trackcenter {
        let mut points = self.points;
        points.extend(other.points);
        Trackcenter::new(points).with_spline_samples(self.spline_samples)
    }
}

impl PartialEq for Trackcenter {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

impl fmt::Debug for Trackcenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trackcenter")
            .field("len", &self.points.len())
            .field("first", &self.first())
            .field("last", &self.last())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight() {
        let tc = Trackcenter::straight(10.0, 10, 0.0, Point::default());
        assert_eq!(tc.len(), 10);
        assert_eq!(tc.first(), Some(Point::new(0.0, 0.0, 0.0)));
        let last = tc.last().unwrap();
        assert_relative_eq!(last.x, 0.0);
        assert_relative_eq!(last.z, 10.0);
        assert!(tc.points().windows(2).all(|w| w[1].z > w[0].z));
    }

    #[test]
    fn test_curve_bends_towards_positive_x() {
        let tc = Trackcenter::curve(500.0, 20.0, 10, 0.0, Point::default());
        assert_eq!(tc.len(), 10);
        assert_eq!(tc.first(), Some(Point::new(0.0, 0.0, 0.0)));
        assert!(tc.points().windows(2).all(|w| w[1].x > w[0].x));

        let last = tc.last().unwrap();
        let theta = 20f64.to_radians();
        assert_relative_eq!(last.x, 500.0 * (1.0 - theta.cos()), epsilon = 1e-9);
        assert_relative_eq!(last.z, 500.0 * theta.sin(), epsilon = 1e-9);

        let left = Trackcenter::curve(500.0, -20.0, 10, 0.0, Point::default());
        assert!(left.points().windows(2).all(|w| w[1].x < w[0].x));
    }

    #[test]
    fn test_start_angle_rotates() {
        let tc = Trackcenter::straight(4.0, 3, 90.0, Point::new(1.0, 2.0, 3.0));
        let last = tc.last().unwrap();
        assert_relative_eq!(last.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(last.y, 2.0);
        assert_relative_eq!(last.z, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_add_concatenates() {
        let a = Trackcenter::straight(10.0, 5, 0.0, Point::default());
        let b = Trackcenter::straight(10.0, 5, 0.0, Point::new(0.0, 0.0, 10.0));
        let joined = a + b;
        assert_eq!(joined.len(), 10);
        assert_relative_eq!(joined.last().unwrap().z, 20.0);
        assert!((Trackcenter::empty() + Trackcenter::empty()).is_empty());
    }

    #[test]
    fn test_degenerate_counts() {
        assert!(Trackcenter::straight(10.0, 0, 0.0, Point::default()).is_empty());
        let single = Trackcenter::curve(100.0, 10.0, 1, 0.0, Point::new(1.0, 0.0, 0.0));
        assert_eq!(single.points(), &[Point::new(1.0, 0.0, 0.0)]);
    }
}
