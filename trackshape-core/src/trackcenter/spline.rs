/// Natural cubic spline through centerline samples, parametrized by chord
/// length and resampled evenly
use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::geometry::Point;

/// Consecutive samples closer than this are treated as one
const DUPLICATE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub(crate) struct SampledSpline {
    pub samples: Vec<Point>,
    /// Arc length from the first sample to each sample
    pub cumulative: Vec<f64>,
}

impl SampledSpline {
    pub fn fit(points: &[Point], num_samples: usize) -> Result<Self> {
        let knots = distinct_points(points);
        if knots.len() < 2 {
            return Err(Error::DegenerateTrackcenter);
        }

        let mut params = Vec::with_capacity(knots.len());
        params.push(0.0);
        for pair in knots.windows(2) {
            let last = params.last().copied().unwrap_or(0.0);
            params.push(last + (pair[1] - pair[0]).norm());
        }
        let moments = second_derivatives(&knots, &params);

        let total = params.last().copied().unwrap_or(0.0);
        let num_samples = num_samples.max(2);
        let mut segment = 0;
        let samples: Vec<Point> = (0..num_samples)
            .map(|k| {
                let s = total * k as f64 / (num_samples - 1) as f64;
                while segment + 2 < params.len() && s > params[segment + 1] {
                    segment += 1;
                }
                Point::from(evaluate(&knots, &params, &moments, segment, s))
            })
            .collect();

        let mut cumulative = Vec::with_capacity(samples.len());
        cumulative.push(0.0);
        for pair in samples.windows(2) {
            let last = cumulative.last().copied().unwrap_or(0.0);
            cumulative.push(last + pair[0].distance_to(&pair[1]));
        }

        tracing::debug!(knots = knots.len(), samples = samples.len(), length = total, "Fitted centerline spline");
        Ok(Self {
            samples,
            cumulative,
        })
    }

    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }
}

fn distinct_points(points: &[Point]) -> Vec<Vector3<f64>> {
    let mut knots: Vec<Vector3<f64>> = Vec::with_capacity(points.len());
    for point in points {
        let v = point.to_vector();
        if knots
            .last()
            .map_or(true, |last| (v - last).norm() > DUPLICATE_TOLERANCE)
        {
            knots.push(v);
        }
    }
    knots
}

/// Second derivatives at the knots with zero curvature at both ends,
/// solving the tridiagonal system with the Thomas algorithm
fn second_derivatives(knots: &[Vector3<f64>], params: &[f64]) -> Vec<Vector3<f64>> {
    let n = knots.len();
    let mut moments = vec![Vector3::zeros(); n];
    if n < 3 {
        return moments;
    }

    let h: Vec<f64> = params.windows(2).map(|w| w[1] - w[0]).collect();
    let interior = n - 2;
    let mut diagonal = vec![0.0; interior];
    let mut upper = vec![0.0; interior];
    let mut rhs = vec![Vector3::zeros(); interior];
    for i in 1..n - 1 {
        let row = i - 1;
        diagonal[row] = 2.0 * (h[i - 1] + h[i]);
        upper[row] = h[i];
        rhs[row] = ((knots[i + 1] - knots[i]) / h[i] - (knots[i] - knots[i - 1]) / h[i - 1]) * 6.0;
    }

    for row in 1..interior {
        let factor = h[row] / diagonal[row - 1];
        diagonal[row] -= factor * upper[row - 1];
        let carried = rhs[row - 1] * factor;
        rhs[row] -= carried;
    }
    moments[interior] = rhs[interior - 1] / diagonal[interior - 1];
    for row in (0..interior - 1).rev() {
        moments[row + 1] = (rhs[row] - moments[row + 2] * upper[row]) / diagonal[row];
    }
    moments
}

fn evaluate(
    knots: &[Vector3<f64>],
    params: &[f64],
    moments: &[Vector3<f64>],
    segment: usize,
    s: f64,
) -> Vector3<f64> {
    let h = params[segment + 1] - params[segment];
    let a = (params[segment + 1] - s) / h;
    let b = (s - params[segment]) / h;
    knots[segment] * a
        + knots[segment + 1] * b
        + (moments[segment] * (a * a * a - a) + moments[segment + 1] * (b * b * b - b)) * (h * h / 6.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trackcenter::Trackcenter;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_line_is_linear() {
        let tc = Trackcenter::straight(10.0, 5, 0.0, Point::default());
        let spline = SampledSpline::fit(tc.points(), 11).unwrap();
        assert_eq!(spline.samples.len(), 11);
        for (k, sample) in spline.samples.iter().enumerate() {
            assert_relative_eq!(sample.z, k as f64, epsilon = 1e-9);
            assert_relative_eq!(sample.x, 0.0, epsilon = 1e-9);
        }
        assert_relative_eq!(spline.length(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_passes_through_arc() {
        let tc = Trackcenter::curve(100.0, 30.0, 31, 0.0, Point::default());
        let spline = SampledSpline::fit(tc.points(), 301).unwrap();
        let centre = Vector3::new(100.0, 0.0, 0.0);
        for sample in &spline.samples {
            assert_relative_eq!((sample.to_vector() - centre).norm(), 100.0, epsilon = 1e-2);
        }
        assert_relative_eq!(spline.length(), 100.0 * 30f64.to_radians(), epsilon = 1e-2);
    }

    #[test]
    fn test_duplicates_and_degenerate_input() {
        let joined = Trackcenter::straight(5.0, 6, 0.0, Point::default())
            + Trackcenter::straight(5.0, 6, 0.0, Point::new(0.0, 0.0, 5.0));
        let spline = SampledSpline::fit(joined.points(), 3).unwrap();
        assert_relative_eq!(spline.samples[1].z, 5.0, epsilon = 1e-9);

        let single = [Point::new(1.0, 1.0, 1.0), Point::new(1.0, 1.0, 1.0)];
        assert!(matches!(
            SampledSpline::fit(&single, 10),
            Err(Error::DegenerateTrackcenter)
        ));
    }
}
