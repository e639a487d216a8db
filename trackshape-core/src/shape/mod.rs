/// Parsed shape document with index-addressed collections.
///
/// A [`Shape`] is parsed once into arenas (prim_states, points, uv points,
/// normals and one vertex arena per LOD distance level and sub-object).
/// Queries and edits work on the arenas; [`Shape::render`] regenerates the
/// blocks backed by arenas and copies every other source line verbatim.

mod edit;
mod parse;
mod render;
mod vertex_sets;

use crate::block::Block;
use crate::error::{Error, Result};
use crate::geometry::{IndexedTrilist, Normal, Point, PrimState, UVPoint, Vertex};

pub use vertex_sets::VertexSet;

/// Index values per line used when none is configured
pub const DEFAULT_VALUES_PER_LINE: usize = 192;

/// Lines occupied by a block in the source, and the indentation of its
/// first line
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Span {
    pub first_line: usize,
    pub last_line: usize,
    pub indent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PrimStateRecord {
    pub name: String,
    pub vtx_state: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VertexRecord {
    pub flags: u32,
    pub point_idx: usize,
    pub normal_idx: usize,
    pub colour1: u32,
    pub colour2: u32,
    pub uv_idxs: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrilistRecord {
    pub prim_state_idx: usize,
    pub vertex_idxs: Vec<usize>,
    pub normal_idxs: Vec<usize>,
    pub flags: Vec<u32>,
}

/// Entries of a `primitives` block in source order
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PrimitiveItem {
    PrimStateIdx(usize),
    Trilist(TrilistRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubObject {
    pub geometry_info: Option<(Block, Span)>,
    pub vertices: Vec<VertexRecord>,
    pub vertices_span: Span,
    pub vertex_sets: Vec<VertexSet>,
    pub vertex_sets_span: Span,
    pub primitives: Vec<PrimitiveItem>,
    pub primitives_span: Span,
}

impl SubObject {
    pub fn trilists(&self) -> impl Iterator<Item = &TrilistRecord> {
        self.primitives.iter().filter_map(|item| match item {
            PrimitiveItem::Trilist(trilist) => Some(trilist),
            PrimitiveItem::PrimStateIdx(_) => None,
        })
    }

    pub fn trilists_mut(&mut self) -> impl Iterator<Item = &mut TrilistRecord> {
        self.primitives.iter_mut().filter_map(|item| match item {
            PrimitiveItem::Trilist(trilist) => Some(trilist),
            PrimitiveItem::PrimStateIdx(_) => None,
        })
    }

    /// Position in `primitives` of the `occurrence`-th trilist of a prim_state
    pub fn trilist_position(&self, prim_state_idx: usize, occurrence: usize) -> Option<usize> {
        self.primitives
            .iter()
            .enumerate()
            .filter_map(|(pos, item)| match item {
                PrimitiveItem::Trilist(t) if t.prim_state_idx == prim_state_idx => Some(pos),
                _ => None,
            })
            .nth(occurrence)
    }

    pub fn trilist_at(&self, pos: usize) -> Option<&TrilistRecord> {
        match self.primitives.get(pos) {
            Some(PrimitiveItem::Trilist(trilist)) => Some(trilist),
            _ => None,
        }
    }

    pub fn trilist_at_mut(&mut self, pos: usize) -> Option<&mut TrilistRecord> {
        match self.primitives.get_mut(pos) {
            Some(PrimitiveItem::Trilist(trilist)) => Some(trilist),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DistanceLevel {
    pub dlevel: u32,
    pub sub_objects: Vec<SubObject>,
}

/// A parsed shape document
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    source: Vec<String>,
    line_ending: &'static str,
    prim_states: Vec<PrimStateRecord>,
    points: Vec<Point>,
    points_span: Span,
    uv_points: Vec<UVPoint>,
    uv_points_span: Span,
    normals: Vec<Normal>,
    normals_span: Span,
    distance_levels: Vec<DistanceLevel>,
    values_per_line: usize,
}

impl Shape {
    /// Index values per line when rendering `vertex_idxs`, `normal_idxs`
    /// and `flags`
    pub fn set_values_per_line(&mut self, values_per_line: usize) {
        self.values_per_line = values_per_line.max(1);
    }

    pub fn values_per_line(&self) -> usize {
        self.values_per_line
    }

    /// Distances of all LOD levels, ascending
    pub fn lod_dlevels(&self) -> Vec<u32> {
        let mut dlevels: Vec<u32> = self.distance_levels.iter().map(|dl| dl.dlevel).collect();
        dlevels.sort_unstable();
        dlevels
    }

    pub fn prim_states(&self) -> Vec<PrimState> {
        self.prim_states
            .iter()
            .enumerate()
            .map(|(idx, record)| PrimState::new(idx, record.name.clone()))
            .collect()
    }

    /// First prim_state with the given name
    pub fn prim_state_by_name(&self, name: &str) -> Option<PrimState> {
        self.prim_states_by_name(name).into_iter().next()
    }

    /// All prim_states with the given name, several may share one
    pub fn prim_states_by_name(&self, name: &str) -> Vec<PrimState> {
        self.prim_states()
            .into_iter()
            .filter(|prim_state| prim_state.name == name)
            .collect()
    }

    pub fn prim_state_by_idx(&self, idx: usize) -> Option<PrimState> {
        self.prim_states
            .get(idx)
            .map(|record| PrimState::new(idx, record.name.clone()))
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point(&self, idx: usize) -> Option<Point> {
        self.points.get(idx).copied()
    }

    pub fn uv_points(&self) -> &[UVPoint] {
        &self.uv_points
    }

    pub fn uv_point(&self, idx: usize) -> Option<UVPoint> {
        self.uv_points.get(idx).copied()
    }

    pub fn normals(&self) -> &[Normal] {
        &self.normals
    }

    pub fn normal(&self, idx: usize) -> Option<Normal> {
        self.normals.get(idx).copied()
    }

    pub fn set_point_value(&mut self, idx: usize, point: Point) -> bool {
        match self.points.get_mut(idx) {
            Some(slot) => {
                *slot = point;
                true
            }
            None => false,
        }
    }

    pub fn set_uvpoint_value(&mut self, idx: usize, uv_point: UVPoint) -> bool {
        match self.uv_points.get_mut(idx) {
            Some(slot) => {
                *slot = uv_point;
                true
            }
            None => false,
        }
    }

    pub fn set_normal_value(&mut self, idx: usize, normal: Normal) -> bool {
        match self.normals.get_mut(idx) {
            Some(slot) => {
                *slot = normal;
                true
            }
            None => false,
        }
    }

    /// Append a point, returning its index
    pub fn add_point(&mut self, point: Point) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    pub fn add_uvpoint(&mut self, uv_point: UVPoint) -> usize {
        self.uv_points.push(uv_point);
        self.uv_points.len() - 1
    }

    pub fn add_normal(&mut self, normal: Normal) -> usize {
        self.normals.push(normal);
        self.normals.len() - 1
    }

    /// Write a vertex's point, uv point and normal values back to their
    /// indices. False if any of the indices is absent.
    pub fn update_vertex(&mut self, vertex: &Vertex) -> bool {
        let uv_ok = match (vertex.uv_point_idx, vertex.uv_point) {
            (Some(idx), Some(_)) => idx < self.uv_points.len(),
            _ => true,
        };
        if vertex.point_idx >= self.points.len() || vertex.normal_idx >= self.normals.len() || !uv_ok
        {
            return false;
        }
        self.points[vertex.point_idx] = vertex.point;
        self.normals[vertex.normal_idx] = vertex.normal;
        if let (Some(idx), Some(uv_point)) = (vertex.uv_point_idx, vertex.uv_point) {
            self.uv_points[idx] = uv_point;
        }
        true
    }

    /// Sub-object indices within a LOD level
    pub fn subobject_idxs_in_lod_dlevel(&self, lod_dlevel: u32) -> Vec<usize> {
        self.distance_level(lod_dlevel)
            .map(|dl| (0..dl.sub_objects.len()).collect())
            .unwrap_or_default()
    }

    pub fn indexed_trilists_in_subobject(
        &self,
        lod_dlevel: u32,
        subobject_idx: usize,
    ) -> Vec<IndexedTrilist> {
        let Some(sub) = self.sub_object(lod_dlevel, subobject_idx) else {
            return Vec::new();
        };
        let mut occurrences = vec![0usize; self.prim_states.len()];
        sub.trilists()
            .map(|record| {
                let idx = match occurrences.get_mut(record.prim_state_idx) {
                    Some(count) => {
                        *count += 1;
                        *count - 1
                    }
                    None => 0,
                };
                self.trilist_view(lod_dlevel, subobject_idx, idx, record)
            })
            .collect()
    }

    pub fn indexed_trilists_in_subobject_by_prim_state(
        &self,
        lod_dlevel: u32,
        subobject_idx: usize,
        prim_state: &PrimState,
    ) -> Vec<IndexedTrilist> {
        self.indexed_trilists_in_subobject(lod_dlevel, subobject_idx)
            .into_iter()
            .filter(|trilist| trilist.prim_state.idx == prim_state.idx)
            .collect()
    }

    pub fn vertices_in_subobject(&self, lod_dlevel: u32, subobject_idx: usize) -> Vec<Vertex> {
        let Some(sub) = self.sub_object(lod_dlevel, subobject_idx) else {
            return Vec::new();
        };
        (0..sub.vertices.len())
            .filter_map(|idx| self.vertex_view(lod_dlevel, subobject_idx, sub, idx))
            .collect()
    }

    /// Vertices referenced by the trilists of a prim_state in every
    /// sub-object of a LOD level, in order of first reference
    pub fn vertices_by_prim_state(&self, lod_dlevel: u32, prim_state: &PrimState) -> Vec<Vertex> {
        let Some(dl) = self.distance_level(lod_dlevel) else {
            return Vec::new();
        };
        let mut vertices = Vec::new();
        for (subobject_idx, sub) in dl.sub_objects.iter().enumerate() {
            let mut seen = vec![false; sub.vertices.len()];
            for trilist in sub.trilists().filter(|t| t.prim_state_idx == prim_state.idx) {
                for &idx in &trilist.vertex_idxs {
                    if seen.get(idx).copied().unwrap_or(true) {
                        continue;
                    }
                    seen[idx] = true;
                    vertices.extend(self.vertex_view(lod_dlevel, subobject_idx, sub, idx));
                }
            }
        }
        vertices
    }

    pub fn vertex_in_subobject_by_idx(
        &self,
        lod_dlevel: u32,
        subobject_idx: usize,
        vertex_idx: usize,
    ) -> Option<Vertex> {
        let sub = self.sub_object(lod_dlevel, subobject_idx)?;
        self.vertex_view(lod_dlevel, subobject_idx, sub, vertex_idx)
    }

    /// Vertex indices sharing a triangle with `vertex` in `trilist`
    pub fn connected_vertex_idxs(
        &self,
        trilist: &IndexedTrilist,
        vertex: &Vertex,
    ) -> Result<Vec<usize>> {
        check_scope(trilist, &[vertex])?;
        let (dl, so, pos) = self.locate_trilist(trilist)?;
        let record = self.distance_levels[dl].sub_objects[so]
            .trilist_at(pos)
            .ok_or(Error::IndexNotFound {
                kind: "indexed trilist",
                index: trilist.idx,
            })?;
        let current = self.trilist_view(trilist.lod_dlevel, trilist.subobject_idx, trilist.idx, record);
        Ok(current.connected_vertex_idxs(vertex.vertex_idx))
    }

    pub(crate) fn distance_level(&self, lod_dlevel: u32) -> Option<&DistanceLevel> {
        self.distance_levels.iter().find(|dl| dl.dlevel == lod_dlevel)
    }

    pub(crate) fn sub_object(&self, lod_dlevel: u32, subobject_idx: usize) -> Option<&SubObject> {
        self.distance_level(lod_dlevel)?.sub_objects.get(subobject_idx)
    }

    /// Positions of a trilist as (distance level, sub-object, primitive)
    pub(crate) fn locate_trilist(&self, trilist: &IndexedTrilist) -> Result<(usize, usize, usize)> {
        let not_found = || Error::IndexNotFound {
            kind: "indexed trilist",
            index: trilist.idx,
        };
        let dl = self
            .distance_levels
            .iter()
            .position(|dl| dl.dlevel == trilist.lod_dlevel)
            .ok_or_else(not_found)?;
        let sub = self.distance_levels[dl]
            .sub_objects
            .get(trilist.subobject_idx)
            .ok_or_else(not_found)?;
        let pos = sub
            .trilist_position(trilist.prim_state.idx, trilist.idx)
            .ok_or_else(not_found)?;
        Ok((dl, trilist.subobject_idx, pos))
    }

    pub(crate) fn trilist_view(
        &self,
        lod_dlevel: u32,
        subobject_idx: usize,
        idx: usize,
        record: &TrilistRecord,
    ) -> IndexedTrilist {
        IndexedTrilist {
            idx,
            lod_dlevel,
            subobject_idx,
            prim_state: self
                .prim_state_by_idx(record.prim_state_idx)
                .unwrap_or_else(|| PrimState::new(record.prim_state_idx, "")),
            vertex_idxs: record.vertex_idxs.clone(),
            normal_idxs: record.normal_idxs.clone(),
            flags: record.flags.clone(),
        }
    }

    pub(crate) fn vertex_view(
        &self,
        lod_dlevel: u32,
        subobject_idx: usize,
        sub: &SubObject,
        vertex_idx: usize,
    ) -> Option<Vertex> {
        let record = sub.vertices.get(vertex_idx)?;
        let uv_point_idx = record.uv_idxs.first().copied();
        Some(Vertex {
            vertex_idx,
            point_idx: record.point_idx,
            uv_point_idx,
            normal_idx: record.normal_idx,
            point: self.point(record.point_idx).unwrap_or_default(),
            uv_point: uv_point_idx.and_then(|idx| self.uv_point(idx)),
            normal: self.normal(record.normal_idx).unwrap_or_default(),
            lod_dlevel,
            subobject_idx,
        })
    }
}

/// Fail unless every vertex lives in the trilist's LOD level and sub-object
pub(crate) fn check_scope(trilist: &IndexedTrilist, vertices: &[&Vertex]) -> Result<()> {
    for vertex in vertices {
        if !trilist.same_scope(vertex) {
            return Err(Error::mismatch(format!(
                "vertex {} of LOD {} sub-object {} used with trilist of LOD {} sub-object {}",
                vertex.vertex_idx,
                vertex.lod_dlevel,
                vertex.subobject_idx,
                trilist.lod_dlevel,
                trilist.subobject_idx
            )));
        }
    }
    Ok(())
}
