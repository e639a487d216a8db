/// Moving points relative to a fitted centerline
use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::trackcenter::spline::SampledSpline;
use crate::trackcenter::Trackcenter;

/// Spline sample with its horizontal unit lateral direction
struct Frame {
    base: Vector3<f64>,
    lateral: Vector3<f64>,
}

impl Trackcenter {
    fn spline(&self) -> Result<&SampledSpline> {
        if self.is_empty() {
            return Err(Error::EmptyTrackcenter);
        }
        self.spline
            .get_or_init(|| match SampledSpline::fit(&self.points, self.spline_samples) {
                Ok(spline) => Some(spline),
                Err(e) => {
                    tracing::warn!(error = %e, samples = self.points.len(), "Cannot fit centerline");
                    None
                }
            })
            .as_ref()
            .ok_or(Error::DegenerateTrackcenter)
    }

    fn nearest_spline_sample(spline: &SampledSpline, point: &Point) -> usize {
        spline
            .samples
            .iter()
            .enumerate()
            .map(|(idx, s)| (idx, (s.x - point.x).hypot(s.z - point.z)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0, |(idx, _)| idx)
    }

    /// Lateral direction at a spline sample from the forward difference, or
    /// the backward one at the last sample. Positive offsets point to -x for
    /// a centerline heading +z.
    fn frame(spline: &SampledSpline, idx: usize) -> Result<Frame> {
        let samples = &spline.samples;
        let (from, to) = if idx + 1 < samples.len() {
            (idx, idx + 1)
        } else {
            (idx.saturating_sub(1), idx)
        };
        let mut tangent = samples[to].to_vector() - samples[from].to_vector();
        tangent.y = 0.0;
        let tangent = tangent
            .try_normalize(f64::EPSILON)
            .ok_or(Error::DegenerateTrackcenter)?;
        Ok(Frame {
            base: samples[idx].to_vector(),
            lateral: Vector3::new(-tangent.z, 0.0, tangent.x),
        })
    }

    /// Move `point` to `new_signed_distance` from the centerline along the
    /// local lateral direction, keeping its height
    pub fn reposition_by_lateral_offset(&self, new_signed_distance: f64, point: &Point) -> Result<Point> {
        let spline = self.spline()?;
        let frame = Self::frame(spline, Self::nearest_spline_sample(spline, point))?;
        let moved = frame.base + frame.lateral * new_signed_distance;
        Ok(Point::new(moved.x, point.y, moved.z))
    }

    /// Arc length along the fitted centerline to the sample nearest `point`
    pub fn arc_length_at(&self, point: &Point) -> Result<f64> {
        let spline = self.spline()?;
        Ok(spline.cumulative[Self::nearest_spline_sample(spline, point)])
    }

    /// Length of the fitted centerline
    pub fn arc_length(&self) -> Result<f64> {
        Ok(self.spline()?.length())
    }

    /// Move `point` to `new_distance_along_track` along the centerline,
    /// clamped to its ends, keeping its lateral offset and height
    pub fn reposition_by_arc_length(&self, new_distance_along_track: f64, point: &Point) -> Result<Point> {
        let spline = self.spline()?;
        let current = Self::frame(spline, Self::nearest_spline_sample(spline, point))?;
        let offset = (point.to_vector() - current.base).dot(&current.lateral);

        let target = new_distance_along_track.clamp(0.0, spline.length());
        let after = spline.cumulative.partition_point(|&s| s < target);
        let idx = match after {
            0 => 0,
            n if n >= spline.cumulative.len() => spline.cumulative.len() - 1,
            n if target - spline.cumulative[n - 1] < spline.cumulative[n] - target => n - 1,
            n => n,
        };
        let frame = Self::frame(spline, idx)?;
        let moved = frame.base + frame.lateral * offset;
        Ok(Point::new(moved.x, point.y, moved.z))
    }
}
