/// Topology edits on trilists and vertex arenas
use crate::error::{Error, Result};
use crate::geometry::{
    face_cross, face_normal, IndexedTrilist, Normal, Point, UVPoint, Vertex, FACE_NORMAL_MARKER,
};
use crate::shape::vertex_sets::{binding_set, grow, shift_indices};
use crate::shape::{check_scope, Shape, SubObject, TrilistRecord, VertexRecord};

const DEFAULT_VERTEX_FLAGS: u32 = 0x0000_0000;
const DEFAULT_COLOUR1: u32 = 0xff96_9696;
const DEFAULT_COLOUR2: u32 = 0xff80_8080;

impl Shape {
    /// Add a vertex to a sub-object, growing the vertex set `trilist` draws
    /// from. Every vertex index at or past the new slot is renumbered in all
    /// trilists of the sub-object, and `trilist` is refreshed.
    pub fn add_vertex_to_subobject(
        &mut self,
        lod_dlevel: u32,
        subobject_idx: usize,
        trilist: &mut IndexedTrilist,
        point: Point,
        uv_point: UVPoint,
        normal: Normal,
    ) -> Result<Vertex> {
        if trilist.lod_dlevel != lod_dlevel || trilist.subobject_idx != subobject_idx {
            return Err(Error::mismatch(format!(
                "trilist of LOD {} sub-object {} used to add a vertex to LOD {} sub-object {}",
                trilist.lod_dlevel, trilist.subobject_idx, lod_dlevel, subobject_idx
            )));
        }
        let (dl, so, pos) = self.locate_trilist(trilist)?;
        let vtx_state = self
            .prim_states
            .get(trilist.prim_state.idx)
            .and_then(|record| record.vtx_state);

        let point_idx = self.add_point(point);
        let uv_idx = self.add_uvpoint(uv_point);
        let normal_idx = self.add_normal(normal);

        let sub = &mut self.distance_levels[dl].sub_objects[so];
        let bound = sub
            .trilist_at(pos)
            .and_then(|record| binding_set(&sub.vertex_sets, record, vtx_state));
        let slot = match bound {
            Some(bound) => grow(&mut sub.vertex_sets, bound),
            None => sub.vertices.len(),
        };

        let template = slot
            .checked_sub(1)
            .filter(|&prev| bound.map_or(true, |b| sub.vertex_sets[b].contains(prev)))
            .and_then(|prev| sub.vertices.get(prev));
        let record = VertexRecord {
            flags: template.map_or(DEFAULT_VERTEX_FLAGS, |t| t.flags),
            point_idx,
            normal_idx,
            colour1: template.map_or(DEFAULT_COLOUR1, |t| t.colour1),
            colour2: template.map_or(DEFAULT_COLOUR2, |t| t.colour2),
            uv_idxs: vec![uv_idx],
        };
        sub.vertices.insert(slot, record);
        let shifted = shift_indices(sub.trilists_mut(), slot);

        tracing::debug!(
            lod_dlevel,
            subobject_idx,
            slot,
            shifted,
            "Added vertex to sub-object"
        );

        self.refresh_trilist(trilist, dl, so, pos);
        let sub = &self.distance_levels[dl].sub_objects[so];
        self.vertex_view(lod_dlevel, subobject_idx, sub, slot)
            .ok_or(Error::IndexNotFound {
                kind: "vertex",
                index: slot,
            })
    }

    /// Split the edge between `v1` and `v2` at its midpoint
    ///
    /// Each triangle of `trilist` using the edge is replaced by two triangles
    /// with the original winding, new face normals and the original flag.
    /// The new vertex gets the normalized sum of its adjacent face normals.
    pub fn insert_vertex_between(
        &mut self,
        trilist: &mut IndexedTrilist,
        v1: &Vertex,
        v2: &Vertex,
    ) -> Result<Vertex> {
        check_scope(trilist, &[v1, v2])?;
        let uv_point = match (v1.uv_point, v2.uv_point) {
            (Some(a), Some(b)) => a.midpoint(&b),
            (a, b) => a.or(b).unwrap_or_default(),
        };
        let new_vertex = self.add_vertex_to_subobject(
            trilist.lod_dlevel,
            trilist.subobject_idx,
            trilist,
            v1.point.midpoint(&v2.point),
            uv_point,
            Normal::zero(),
        )?;
        let new_idx = new_vertex.vertex_idx;
        let renumber = |idx: usize| if idx >= new_idx { idx + 1 } else { idx };
        let (a, b) = (renumber(v1.vertex_idx), renumber(v2.vertex_idx));

        let (dl, so, pos) = self.locate_trilist(trilist)?;
        let sub = &self.distance_levels[dl].sub_objects[so];
        let record = sub.trilist_at(pos).ok_or(Error::IndexNotFound {
            kind: "indexed trilist",
            index: trilist.idx,
        })?;

        // (triangle, existing face normal, flag); new faces carry no normal yet
        let mut triangles: Vec<([usize; 3], Option<usize>, u32)> = Vec::new();
        let mut split = 0;
        for (t, tri) in record.vertex_idxs.chunks_exact(3).enumerate() {
            let tri = [tri[0], tri[1], tri[2]];
            let flag = record.flags[t];
            match edge_position(&tri, a, b) {
                Some(p) if a != b => {
                    let (first, second, other) = (tri[p], tri[(p + 1) % 3], tri[(p + 2) % 3]);
                    triangles.push(([first, new_idx, other], None, flag));
                    triangles.push(([new_idx, second, other], None, flag));
                    split += 1;
                }
                _ => triangles.push((tri, Some(record.normal_idxs[2 * t]), flag)),
            }
        }

        let points: Vec<Vec<Point>> = triangles
            .iter()
            .map(|(tri, _, _)| tri.iter().map(|&v| vertex_point(self, sub, v)).collect())
            .collect();
        let mut vertex_normal = nalgebra::Vector3::zeros();
        for ((tri, _, _), p) in triangles.iter().zip(&points) {
            if tri.contains(&new_idx) {
                vertex_normal += face_cross(&p[0], &p[1], &p[2]);
            }
        }

        let mut updated = TrilistRecord {
            prim_state_idx: record.prim_state_idx,
            vertex_idxs: Vec::with_capacity(triangles.len() * 3),
            normal_idxs: Vec::with_capacity(triangles.len() * 2),
            flags: Vec::with_capacity(triangles.len()),
        };
        for ((tri, existing, flag), p) in triangles.into_iter().zip(&points) {
            let normal_idx = match existing {
                Some(idx) => idx,
                None => self.add_normal(face_normal(&p[0], &p[1], &p[2])),
            };
            updated.vertex_idxs.extend(tri);
            updated.normal_idxs.extend([normal_idx, FACE_NORMAL_MARKER]);
            updated.flags.push(flag);
        }

        let normal = vertex_normal
            .try_normalize(f64::EPSILON)
            .map(Normal::from)
            .unwrap_or_default();
        self.set_normal_value(new_vertex.normal_idx, normal);
        self.store_trilist(dl, so, pos, updated);

        tracing::debug!(
            new_vertex = new_idx,
            split_triangles = split,
            "Inserted vertex between {} and {}",
            a,
            b
        );

        self.refresh_trilist(trilist, dl, so, pos);
        Ok(Vertex {
            normal,
            ..new_vertex
        })
    }

    /// Append the triangle (v1, v2, v3) with a new face normal and flag 0
    pub fn insert_triangle_between(
        &mut self,
        trilist: &mut IndexedTrilist,
        v1: &Vertex,
        v2: &Vertex,
        v3: &Vertex,
    ) -> Result<()> {
        check_scope(trilist, &[v1, v2, v3])?;
        let (dl, so, pos) = self.locate_trilist(trilist)?;
        let sub = &self.distance_levels[dl].sub_objects[so];
        let tri = [v1.vertex_idx, v2.vertex_idx, v3.vertex_idx];
        if let Some(&bad) = tri.iter().find(|&&v| v >= sub.vertices.len()) {
            return Err(Error::IndexNotFound {
                kind: "vertex",
                index: bad,
            });
        }
        let p: Vec<Point> = tri.iter().map(|&v| vertex_point(self, sub, v)).collect();
        let normal_idx = self.add_normal(face_normal(&p[0], &p[1], &p[2]));

        let mut updated = self.distance_levels[dl].sub_objects[so]
            .trilist_at(pos)
            .cloned()
            .ok_or(Error::IndexNotFound {
                kind: "indexed trilist",
                index: trilist.idx,
            })?;
        updated.vertex_idxs.extend(tri);
        updated.normal_idxs.extend([normal_idx, FACE_NORMAL_MARKER]);
        updated.flags.push(0);
        self.store_trilist(dl, so, pos, updated);

        tracing::debug!(?tri, normal_idx, "Inserted triangle");
        self.refresh_trilist(trilist, dl, so, pos);
        Ok(())
    }

    /// Remove the triangles made of exactly v1, v2 and v3, in any order.
    /// Returns how many were removed.
    pub fn remove_triangle_between(
        &mut self,
        trilist: &mut IndexedTrilist,
        v1: &Vertex,
        v2: &Vertex,
        v3: &Vertex,
    ) -> Result<usize> {
        check_scope(trilist, &[v1, v2, v3])?;
        let mut wanted = [v1.vertex_idx, v2.vertex_idx, v3.vertex_idx];
        wanted.sort_unstable();
        self.retain_triangles(trilist, |tri| {
            let mut sorted = *tri;
            sorted.sort_unstable();
            sorted != wanted
        })
    }

    /// Remove every triangle using `vertex`. Returns how many were removed.
    pub fn remove_triangles_connected_to_vertex(
        &mut self,
        trilist: &mut IndexedTrilist,
        vertex: &Vertex,
    ) -> Result<usize> {
        check_scope(trilist, &[vertex])?;
        self.retain_triangles(trilist, |tri| !tri.contains(&vertex.vertex_idx))
    }

    /// Replace the stored arrays of the trilist with the same LOD level,
    /// sub-object, prim_state and occurrence. False when there is no such
    /// trilist, the arrays break the one-triangle strides, or an index points
    /// past the sub-object's vertices or the shape's normals.
    pub fn update_indexed_trilist(&mut self, trilist: &IndexedTrilist) -> bool {
        if !trilist.is_consistent() {
            tracing::warn!(
                vertex_idxs = trilist.vertex_idxs.len(),
                normal_idxs = trilist.normal_idxs.len(),
                flags = trilist.flags.len(),
                "Refusing trilist with inconsistent arrays"
            );
            return false;
        }
        let Ok((dl, so, pos)) = self.locate_trilist(trilist) else {
            return false;
        };
        let vertex_count = self.distance_levels[dl].sub_objects[so].vertices.len();
        let bad_vertex = trilist.vertex_idxs.iter().find(|&&idx| idx >= vertex_count);
        let bad_normal = trilist
            .normal_idxs
            .iter()
            .step_by(2)
            .find(|&&idx| idx >= self.normals.len());
        if bad_vertex.is_some() || bad_normal.is_some() {
            tracing::warn!(
                vertex_idx = ?bad_vertex,
                normal_idx = ?bad_normal,
                vertices = vertex_count,
                normals = self.normals.len(),
                "Refusing trilist with out of range indices"
            );
            return false;
        }
        let updated = TrilistRecord {
            prim_state_idx: trilist.prim_state.idx,
            vertex_idxs: trilist.vertex_idxs.clone(),
            normal_idxs: trilist.normal_idxs.clone(),
            flags: trilist.flags.clone(),
        };
        self.store_trilist(dl, so, pos, updated);
        true
    }

    fn retain_triangles(
        &mut self,
        trilist: &mut IndexedTrilist,
        keep: impl Fn(&[usize; 3]) -> bool,
    ) -> Result<usize> {
        let (dl, so, pos) = self.locate_trilist(trilist)?;
        let record = self.distance_levels[dl].sub_objects[so]
            .trilist_at(pos)
            .ok_or(Error::IndexNotFound {
                kind: "indexed trilist",
                index: trilist.idx,
            })?;

        let mut updated = TrilistRecord {
            prim_state_idx: record.prim_state_idx,
            vertex_idxs: Vec::new(),
            normal_idxs: Vec::new(),
            flags: Vec::new(),
        };
        let mut removed = 0;
        for (t, tri) in record.vertex_idxs.chunks_exact(3).enumerate() {
            let tri = [tri[0], tri[1], tri[2]];
            if keep(&tri) {
                updated.vertex_idxs.extend(tri);
                updated
                    .normal_idxs
                    .extend_from_slice(&record.normal_idxs[2 * t..2 * t + 2]);
                updated.flags.push(record.flags[t]);
            } else {
                removed += 1;
            }
        }
        self.store_trilist(dl, so, pos, updated);

        tracing::debug!(removed, "Removed triangles");
        self.refresh_trilist(trilist, dl, so, pos);
        Ok(removed)
    }

    /// Store trilist arrays and recompute the sub-object's aggregate counts
    fn store_trilist(&mut self, dl: usize, so: usize, pos: usize, updated: TrilistRecord) {
        let sub = &mut self.distance_levels[dl].sub_objects[so];
        if let Some(record) = sub.trilist_at_mut(pos) {
            *record = updated;
        }
        refresh_geometry_info(sub);
    }

    fn refresh_trilist(&self, trilist: &mut IndexedTrilist, dl: usize, so: usize, pos: usize) {
        if let Some(record) = self.distance_levels[dl].sub_objects[so].trilist_at(pos) {
            *trilist = self.trilist_view(trilist.lod_dlevel, trilist.subobject_idx, trilist.idx, record);
        }
    }
}

/// Position p such that (tri[p], tri[p + 1]) is the edge {a, b} in either
/// direction
fn edge_position(tri: &[usize; 3], a: usize, b: usize) -> Option<usize> {
    (0..3).find(|&p| {
        let (first, second) = (tri[p], tri[(p + 1) % 3]);
        (first == a && second == b) || (first == b && second == a)
    })
}

fn vertex_point(shape: &Shape, sub: &SubObject, vertex_idx: usize) -> Point {
    sub.vertices
        .get(vertex_idx)
        .and_then(|record| shape.point(record.point_idx))
        .unwrap_or_default()
}

/// Recompute face normal and index totals in `geometry_info`, and the
/// per-node `cullable_prims` sums over the node's run of trilists
fn refresh_geometry_info(sub: &mut SubObject) {
    let totals: Vec<(usize, usize)> = sub
        .trilists()
        .map(|t| (t.vertex_idxs.len() / 3, t.vertex_idxs.len()))
        .collect();
    let Some((info, _)) = sub.geometry_info.as_mut() else {
        return;
    };
    let triangles: usize = totals.iter().map(|(tris, _)| tris).sum();
    let idxs: usize = totals.iter().map(|(_, idxs)| idxs).sum();
    info.set_word(0, triangles);
    info.set_word(3, idxs);

    let Some(nodes) = info.child_mut("geometry_nodes") else {
        return;
    };
    let mut cursor = 0;
    for node in nodes.children_mut("geometry_node") {
        let Some(cullable) = node.child_mut("cullable_prims") else {
            continue;
        };
        let prims: usize = cullable
            .word(0)
            .and_then(|word| word.parse().ok())
            .unwrap_or(0);
        let end = (cursor + prims).min(totals.len());
        let run = &totals[cursor.min(end)..end];
        cullable.set_word(1, run.iter().map(|(tris, _)| tris).sum::<usize>());
        cullable.set_word(2, run.iter().map(|(_, idxs)| idxs).sum::<usize>());
        cursor = end;
    }
}
