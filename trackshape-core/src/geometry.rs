/// Geometry records addressed by index inside a shape
use nalgebra::{Point3, Vector3};

/// Face marker stored after every face normal index in `normal_idxs`
pub const FACE_NORMAL_MARKER: usize = 3;

/// A named surface/material state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimState {
    pub idx: usize,
    pub name: String,
}

impl PrimState {
    pub fn new(idx: usize, name: impl Into<String>) -> Self {
        Self {
            idx,
            name: name.into(),
        }
    }
}

/// A world-space position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_point3(self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.to_vector() - other.to_vector()).norm()
    }
}

impl From<Point3<f64>> for Point {
    fn from(p: Point3<f64>) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

impl From<Vector3<f64>> for Point {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// A texture coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UVPoint {
    pub u: f64,
    pub v: f64,
}

impl UVPoint {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    pub fn midpoint(&self, other: &UVPoint) -> UVPoint {
        UVPoint::new((self.u + other.u) / 2.0, (self.v + other.v) / 2.0)
    }
}

/// A normal vector, not necessarily of unit length
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Normal {
    pub vec_x: f64,
    pub vec_y: f64,
    pub vec_z: f64,
}

impl Normal {
    pub fn new(vec_x: f64, vec_y: f64, vec_z: f64) -> Self {
        Self {
            vec_x,
            vec_y,
            vec_z,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.vec_x, self.vec_y, self.vec_z)
    }
}

impl From<Vector3<f64>> for Normal {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// A vertex of one (LOD distance level, sub-object) vertex arena, resolved
/// against the shape's point, uv point and normal collections
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub vertex_idx: usize,
    pub point_idx: usize,
    pub uv_point_idx: Option<usize>,
    pub normal_idx: usize,
    pub point: Point,
    pub uv_point: Option<UVPoint>,
    pub normal: Normal,
    pub lod_dlevel: u32,
    pub subobject_idx: usize,
}

impl Vertex {
    /// Whether both vertices live in the same vertex arena
    pub fn same_scope(&self, lod_dlevel: u32, subobject_idx: usize) -> bool {
        self.lod_dlevel == lod_dlevel && self.subobject_idx == subobject_idx
    }
}

/// A triangle list stored as parallel flat index arrays
///
/// `vertex_idxs` holds three entries per triangle, `normal_idxs` two (the
/// face normal index followed by [`FACE_NORMAL_MARKER`]) and `flags` one.
/// `idx` is the occurrence order among the trilists of the same prim_state
/// within the sub-object.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTrilist {
    pub idx: usize,
    pub lod_dlevel: u32,
    pub subobject_idx: usize,
    pub prim_state: PrimState,
    pub vertex_idxs: Vec<usize>,
    pub normal_idxs: Vec<usize>,
    pub flags: Vec<u32>,
}

impl IndexedTrilist {
    pub fn triangle_count(&self) -> usize {
        self.vertex_idxs.len() / 3
    }

    /// Iterate over triangles as vertex index triples
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.vertex_idxs
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
    }

    /// Check the stride invariants between the three parallel arrays
    pub fn is_consistent(&self) -> bool {
        let triangles = self.vertex_idxs.len() / 3;
        self.vertex_idxs.len() % 3 == 0
            && self.normal_idxs.len() == 2 * triangles
            && self.flags.len() == triangles
    }

    pub fn same_scope(&self, vertex: &Vertex) -> bool {
        vertex.same_scope(self.lod_dlevel, self.subobject_idx)
    }

    /// Indices of all vertices sharing a triangle with `vertex_idx`
    pub fn connected_vertex_idxs(&self, vertex_idx: usize) -> Vec<usize> {
        let mut connected: Vec<usize> = self
            .triangles()
            .filter(|tri| tri.contains(&vertex_idx))
            .flat_map(|tri| tri.into_iter())
            .filter(|&idx| idx != vertex_idx)
            .collect();
        connected.sort_unstable();
        connected.dedup();
        connected
    }
}

/// Unnormalized face normal of a triangle, following its winding order
pub fn face_cross(p0: &Point, p1: &Point, p2: &Point) -> Vector3<f64> {
    let edge1 = p1.to_vector() - p0.to_vector();
    let edge2 = p2.to_vector() - p0.to_vector();
    edge1.cross(&edge2)
}

/// Unit face normal of a triangle, zero for degenerate triangles
pub fn face_normal(p0: &Point, p1: &Point, p2: &Point) -> Normal {
    face_cross(p0, p1, p2)
        .try_normalize(f64::EPSILON)
        .map(Normal::from)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trilist(vertex_idxs: Vec<usize>) -> IndexedTrilist {
        let triangles = vertex_idxs.len() / 3;
        IndexedTrilist {
            idx: 0,
            lod_dlevel: 200,
            subobject_idx: 0,
            prim_state: PrimState::new(0, "rails"),
            vertex_idxs,
            normal_idxs: (0..triangles).flat_map(|n| [n, FACE_NORMAL_MARKER]).collect(),
            flags: vec![0; triangles],
        }
    }

    #[test]
    fn test_face_normal_follows_winding() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(1.0, 0.0, 0.0);
        let c = Point::new(0.0, 1.0, 0.0);
        assert_eq!(face_normal(&a, &b, &c), Normal::new(0.0, 0.0, 1.0));
        assert_eq!(face_normal(&a, &c, &b), Normal::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_degenerate_face_normal_is_zero() {
        let a = Point::new(1.0, 2.0, 3.0);
        assert_eq!(face_normal(&a, &a, &a), Normal::zero());
    }

    #[test]
    fn test_connected_vertex_idxs() {
        let list = trilist(vec![0, 1, 2, 2, 1, 3, 4, 5, 6]);
        assert!(list.is_consistent());
        assert_eq!(list.connected_vertex_idxs(1), vec![0, 2, 3]);
        assert_eq!(list.connected_vertex_idxs(6), vec![4, 5]);
        assert!(list.connected_vertex_idxs(9).is_empty());
    }

    #[test]
    fn test_midpoints() {
        let p = Point::new(0.0, 2.0, 4.0).midpoint(&Point::new(2.0, 0.0, 0.0));
        assert_eq!(p, Point::new(1.0, 1.0, 2.0));
        let uv = UVPoint::new(0.0, 1.0).midpoint(&UVPoint::new(1.0, 0.0));
        assert_eq!(uv, UVPoint::new(0.5, 0.5));
    }
}
