/// Nearest-sample, lateral distance and along-track queries
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::projection::Plane;
use crate::trackcenter::Trackcenter;

/// Samples within `radius` of each other, as adjacency lists
#[derive(Debug, Clone)]
pub(crate) struct NeighborGraph {
    radius: f64,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl NeighborGraph {
    fn build(points: &[Point], radius: f64) -> Self {
        let mut adjacency = vec![Vec::new(); points.len()];
        for i in 0..points.len() {
            for j in i + 1..points.len() {
                let distance = points[i].distance_to(&points[j]);
                if distance <= radius {
                    adjacency[i].push((j, distance));
                    adjacency[j].push((i, distance));
                }
            }
        }
        tracing::debug!(samples = points.len(), radius, "Built neighbour graph");
        Self { radius, adjacency }
    }
}

/// Search frontier entry ordered so the heap pops the lowest priority first
#[derive(Debug, PartialEq)]
struct Frontier {
    priority: f64,
    path: f64,
    node: usize,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Trackcenter {
    /// Index of the sample nearest to `point` in the `xz` or `xy` plane
    pub fn closest_index(&self, point: &Point, plane: Plane) -> Result<usize> {
        let target = plane
            .coordinates_2d(&point.to_vector())
            .ok_or_else(|| Error::InvalidPlane(plane.to_string()))?;
        self.points
            .iter()
            .enumerate()
            .filter_map(|(idx, sample)| {
                plane
                    .coordinates_2d(&sample.to_vector())
                    .map(|p| (idx, (p - target).norm()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(idx, _)| idx)
            .ok_or(Error::EmptyTrackcenter)
    }

    /// Sample nearest to `point` in the `xz` or `xy` plane
    pub fn closest_point(&self, point: &Point, plane: Plane) -> Result<Point> {
        let idx = self.closest_index(point, plane)?;
        Ok(self.points[idx])
    }

    /// Distance from the first sample to the sample nearest `point`,
    /// following samples no further than `max_neighbor_distance` apart
    ///
    /// The search expands from the nearest sample towards the first one
    /// and stops at the first sample that is at least as close to the
    /// start as all its neighbours. The straight distance from there to the
    /// first sample is added, which is zero when the walk reaches it.
    ///
    /// Samples are expanded A*-style: lowest walked path plus straight
    /// distance to the first sample goes first. The straight distance never
    /// overestimates the remaining walk, so paths are still shortest.
    pub fn distance_along_track(&self, point: &Point, max_neighbor_distance: f64) -> Result<f64> {
        let start = self.closest_index(point, Plane::Xz)?;
        let reference = self.points[0];
        let to_reference: Vec<f64> = self
            .points
            .iter()
            .map(|p| p.distance_to(&reference))
            .collect();

        let mut cache = self.graph.borrow_mut();
        if cache
            .as_ref()
            .map_or(true, |graph| graph.radius != max_neighbor_distance)
        {
            *cache = Some(NeighborGraph::build(&self.points, max_neighbor_distance));
        }
        let Some(graph) = cache.as_ref() else {
            return Err(Error::EmptyTrackcenter);
        };

        let is_local_minimum = |node: usize| {
            graph.adjacency[node]
                .iter()
                .all(|&(neighbor, _)| to_reference[node] <= to_reference[neighbor])
        };

        let mut best = vec![f64::INFINITY; self.points.len()];
        let mut heap = BinaryHeap::new();
        best[start] = 0.0;
        heap.push(Frontier {
            priority: to_reference[start],
            path: 0.0,
            node: start,
        });

        while let Some(Frontier { path, node, .. }) = heap.pop() {
            if path > best[node] {
                continue;
            }
            if is_local_minimum(node) {
                tracing::debug!(start, end = node, path, "Walked along track");
                return Ok(path + to_reference[node]);
            }
            for &(neighbor, step) in &graph.adjacency[node] {
                let candidate = path + step;
                if candidate < best[neighbor] {
                    best[neighbor] = candidate;
                    heap.push(Frontier {
                        priority: candidate + to_reference[neighbor],
                        path: candidate,
                        node: neighbor,
                    });
                }
            }
        }
        Ok(to_reference[start])
    }
}

/// Candidate whose nearest sample is closest to `point`
pub fn closest_trackcenter<'a>(
    point: &Point,
    candidates: &'a [Trackcenter],
    plane: Plane,
) -> Result<&'a Trackcenter> {
    let target = plane
        .coordinates_2d(&point.to_vector())
        .ok_or_else(|| Error::InvalidPlane(plane.to_string()))?;
    let mut best: Option<(&Trackcenter, f64)> = None;
    for candidate in candidates.iter().filter(|tc| !tc.is_empty()) {
        let closest = candidate.closest_point(point, plane)?;
        let distance = plane
            .coordinates_2d(&closest.to_vector())
            .map_or(f64::INFINITY, |p| (p - target).norm());
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }
    best.map(|(tc, _)| tc).ok_or(Error::EmptyTrackcenter)
}

/// Signed distance from `centerline_point` to `point` in a plane, see
/// [`Plane::signed_length`] for the sign convention
pub fn signed_lateral_distance(point: &Point, centerline_point: &Point, plane: Plane) -> f64 {
    plane.signed_length(&(point.to_vector() - centerline_point.to_vector()))
}

/// [`Trackcenter::distance_along_track`] on the candidate closest to `point`
/// in the `xz` plane
pub fn distance_along_nearest_trackcenter(
    point: &Point,
    candidates: &[Trackcenter],
    plane: Plane,
    max_neighbor_distance: f64,
) -> Result<f64> {
    closest_trackcenter(point, candidates, plane)?.distance_along_track(point, max_neighbor_distance)
}
