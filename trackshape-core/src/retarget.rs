/// Moving the points of a prim_state relative to track centerlines
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::Vertex;
use crate::projection::Plane;
use crate::shape::Shape;
use crate::trackcenter::{closest_trackcenter, signed_lateral_distance, Trackcenter};

/// Points whose signed lateral distance lies in `min..=max` move to
/// `new_offset`, optionally also to a new `height`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LateralRule {
    pub min: f64,
    pub max: f64,
    #[serde(rename = "offset")]
    pub new_offset: f64,
    #[serde(default)]
    pub height: Option<f64>,
}

impl LateralRule {
    pub fn new(min: f64, max: f64, new_offset: f64) -> Self {
        Self {
            min,
            max,
            new_offset,
            height: None,
        }
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn matches(&self, distance: f64) -> bool {
        self.min <= distance && distance <= self.max
    }
}

/// Apply the first matching rule to every point used by the prim_states
/// named `prim_state_name` in a LOD level. Each point index is written
/// once. Returns the number of points moved.
pub fn retarget_prim_state(
    shape: &mut Shape,
    lod_dlevel: u32,
    prim_state_name: &str,
    trackcenters: &[Trackcenter],
    rules: &[LateralRule],
) -> Result<usize> {
    let mut moved = 0;
    for vertex in unique_points(shape, lod_dlevel, prim_state_name) {
        let point = vertex.point;
        let trackcenter = closest_trackcenter(&point, trackcenters, Plane::Xz)?;
        let closest = trackcenter.closest_point(&point, Plane::Xz)?;
        let distance = signed_lateral_distance(&point, &closest, Plane::Xz);

        let Some(rule) = rules.iter().find(|rule| rule.matches(distance)) else {
            continue;
        };
        let mut new_point = trackcenter.reposition_by_lateral_offset(rule.new_offset, &point)?;
        if let Some(height) = rule.height {
            new_point.y = height;
        }
        shape.set_point_value(vertex.point_idx, new_point);
        moved += 1;
    }
    tracing::info!(prim_state = prim_state_name, lod_dlevel, moved, "Retargeted prim_state");
    Ok(moved)
}

/// Shift every point used by the named prim_states by `shift` meters along
/// `trackcenter`, keeping lateral offsets. Returns the number of points moved.
pub fn reposition_along_track(
    shape: &mut Shape,
    lod_dlevel: u32,
    prim_state_name: &str,
    trackcenter: &Trackcenter,
    shift: f64,
) -> Result<usize> {
    let mut moved = 0;
    for vertex in unique_points(shape, lod_dlevel, prim_state_name) {
        let along = trackcenter.arc_length_at(&vertex.point)?;
        let new_point = trackcenter.reposition_by_arc_length(along + shift, &vertex.point)?;
        shape.set_point_value(vertex.point_idx, new_point);
        moved += 1;
    }
    tracing::info!(prim_state = prim_state_name, lod_dlevel, moved, shift, "Moved prim_state along track");
    Ok(moved)
}

/// Vertices of the named prim_states, one per distinct point index
fn unique_points(shape: &Shape, lod_dlevel: u32, prim_state_name: &str) -> Vec<Vertex> {
    let mut seen = HashSet::new();
    shape
        .prim_states_by_name(prim_state_name)
        .iter()
        .flat_map(|prim_state| shape.vertices_by_prim_state(lod_dlevel, prim_state))
        .filter(|vertex| seen.insert(vertex.point_idx))
        .collect()
}
