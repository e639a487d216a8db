/// Integration tests for trilist editing on a two-LOD track shape

use approx::assert_relative_eq;
use trackshape_core::{Error, IndexedTrilist, Point, Shape, UVPoint, Vertex};

const TRACK: &str = include_str!("data/track.s");

fn track() -> Shape {
    Shape::parse(TRACK).expect("fixture parses")
}

fn trilist(shape: &Shape, lod: u32, prim_state: &str) -> IndexedTrilist {
    let prim_state = shape.prim_state_by_name(prim_state).unwrap();
    shape
        .indexed_trilists_in_subobject_by_prim_state(lod, 0, &prim_state)
        .remove(0)
}

fn vertex(shape: &Shape, lod: u32, idx: usize) -> Vertex {
    shape.vertex_in_subobject_by_idx(lod, 0, idx).unwrap()
}

/// Declared counts of every `keyword ( n` line in rendered text
fn declared(text: &str, keyword: &str) -> Vec<usize> {
    let prefix = format!("{} ( ", keyword);
    text.lines()
        .filter_map(|line| line.trim_start().strip_prefix(prefix.as_str()))
        .filter_map(|rest| rest.split_whitespace().next()?.parse().ok())
        .collect()
}

fn has_line(text: &str, wanted: &str) -> bool {
    text.lines().any(|line| line.trim() == wanted)
}

#[test]
fn test_render_without_edits_reproduces_document() {
    assert_eq!(track().render(), TRACK);
}

#[test]
fn test_queries() {
    let shape = track();
    assert_eq!(shape.lod_dlevels(), vec![200, 500]);
    assert_eq!(shape.prim_states().len(), 2);
    assert_eq!(shape.prim_state_by_name("sleepers").unwrap().idx, 1);
    assert!(shape.prim_state_by_name("ballast").is_none());
    assert_eq!(shape.subobject_idxs_in_lod_dlevel(500), vec![0]);
    assert!(shape.subobject_idxs_in_lod_dlevel(1000).is_empty());

    let rails = shape.prim_state_by_name("rails").unwrap();
    let idxs: Vec<usize> = shape
        .vertices_by_prim_state(200, &rails)
        .iter()
        .map(|v| v.vertex_idx)
        .collect();
    assert_eq!(idxs, vec![0, 1, 2, 3]);

    let v6 = vertex(&shape, 200, 6);
    assert_eq!(v6.point, Point::new(1.3, 0.1, 4.0));
    assert_eq!(v6.uv_point, Some(UVPoint::new(1.0, 0.0)));

    let rails_list = trilist(&shape, 200, "rails");
    let v1 = vertex(&shape, 200, 1);
    assert_eq!(shape.connected_vertex_idxs(&rails_list, &v1).unwrap(), vec![0, 2, 3]);
}

#[test]
fn test_split_single_triangle() {
    let mut shape = track();
    let mut rails = trilist(&shape, 500, "rails");
    let v0 = vertex(&shape, 500, 0);
    let v1 = vertex(&shape, 500, 1);
    let points_before = shape.points().len();

    let new_vertex = shape.insert_vertex_between(&mut rails, &v0, &v1).unwrap();

    assert_eq!(new_vertex.vertex_idx, 3);
    assert_eq!(shape.vertices_in_subobject(500, 0).len(), 4);
    assert_eq!(shape.points().len(), points_before + 1);
    assert_eq!(new_vertex.point, Point::new(0.69, 0.2, 5.0));
    assert_eq!(new_vertex.uv_point, Some(UVPoint::new(0.0, 5.0)));
    assert_relative_eq!(new_vertex.normal.vec_y, 1.0, epsilon = 1e-9);

    assert_eq!(rails.vertex_idxs, vec![0, 3, 2, 3, 1, 2]);
    assert_eq!(rails.normal_idxs.len(), 4);
    assert_eq!(rails.normal_idxs[1], 3);
    assert_eq!(rails.normal_idxs[3], 3);
    assert_eq!(rails.flags, vec![0, 0]);

    let text = shape.render();
    assert!(has_line(&text, "vertex_set ( 0 0 4 )"));
    assert!(has_line(&text, "cullable_prims ( 1 2 6 )"));
    assert!(text.lines().any(|l| l.trim_start().starts_with("geometry_info ( 2 1 0 6 ")));
    // LOD 200 is untouched
    assert!(has_line(&text, "vertex_set ( 1 4 4 )"));
}

#[test]
fn test_split_shared_edge_shifts_later_vertex_sets() {
    let mut shape = track();
    let mut rails = trilist(&shape, 200, "rails");
    let v1 = vertex(&shape, 200, 1);
    let v2 = vertex(&shape, 200, 2);

    let new_vertex = shape.insert_vertex_between(&mut rails, &v1, &v2).unwrap();

    assert_eq!(new_vertex.vertex_idx, 4);
    assert_eq!(rails.vertex_idxs, vec![1, 4, 0, 4, 2, 0, 2, 4, 3, 4, 1, 3]);
    assert_eq!(rails.flags.len(), 4);

    let sleepers = trilist(&shape, 200, "sleepers");
    assert_eq!(sleepers.vertex_idxs, vec![5, 6, 7, 7, 6, 8]);
    assert_eq!(vertex(&shape, 200, 5).point, Point::new(-1.3, 0.1, 4.0));

    let text = shape.render();
    assert!(has_line(&text, "vertex_set ( 0 0 5 )"));
    assert!(has_line(&text, "vertex_set ( 1 5 4 )"));
    assert!(has_line(&text, "cullable_prims ( 2 6 18 )"));
    assert!(text.lines().any(|l| l.trim_start().starts_with("geometry_info ( 6 2 0 18 ")));
    assert_eq!(declared(&text, "vertices"), vec![9, 3]);
}

#[test]
fn test_remove_triangles() {
    let mut shape = track();
    let mut rails = trilist(&shape, 200, "rails");
    let (v1, v2, v3) = (vertex(&shape, 200, 1), vertex(&shape, 200, 2), vertex(&shape, 200, 3));
    assert_eq!(shape.remove_triangle_between(&mut rails, &v3, &v1, &v2).unwrap(), 1);
    assert_eq!(rails.vertex_idxs, vec![0, 1, 2]);
    assert_eq!(shape.remove_triangle_between(&mut rails, &v3, &v1, &v2).unwrap(), 0);

    let mut sleepers = trilist(&shape, 200, "sleepers");
    let v5 = vertex(&shape, 200, 5);
    assert_eq!(shape.remove_triangles_connected_to_vertex(&mut sleepers, &v5).unwrap(), 2);
    assert!(sleepers.vertex_idxs.is_empty());

    let text = shape.render();
    assert!(has_line(&text, "cullable_prims ( 2 1 3 )"));
    assert!(has_line(&text, "vertex_idxs ( 0 )"));
    assert!(has_line(&text, "flags ( 0 )"));
    // arenas keep unreferenced vertices
    assert_eq!(declared(&text, "vertices"), vec![8, 3]);
}

#[test]
fn test_insert_triangle_appends_face_normal() {
    let mut shape = track();
    let mut sleepers = trilist(&shape, 200, "sleepers");
    let (v4, v5, v7) = (vertex(&shape, 200, 4), vertex(&shape, 200, 5), vertex(&shape, 200, 7));
    let normals_before = shape.normals().len();

    shape.insert_triangle_between(&mut sleepers, &v4, &v5, &v7).unwrap();

    assert_eq!(sleepers.triangle_count(), 3);
    assert_eq!(&sleepers.vertex_idxs[6..], &[4, 5, 7]);
    assert_eq!(&sleepers.normal_idxs[4..], &[normals_before, 3]);
    assert_eq!(sleepers.flags[2], 0);
    let normal = shape.normal(normals_before).unwrap();
    assert_relative_eq!(normal.vec_y, 1.0, epsilon = 1e-9);
}

#[test]
fn test_cross_scope_edits_are_rejected() {
    let mut shape = track();
    let mut rails = trilist(&shape, 200, "rails");
    let near = vertex(&shape, 200, 0);
    let far = vertex(&shape, 500, 1);
    let before = shape.render();

    assert!(matches!(
        shape.insert_vertex_between(&mut rails, &near, &far),
        Err(Error::CrossScopeMismatch(_))
    ));
    assert!(matches!(
        shape.connected_vertex_idxs(&rails, &far),
        Err(Error::CrossScopeMismatch(_))
    ));
    assert_eq!(shape.render(), before);
}

#[test]
fn test_update_indexed_trilist() {
    let mut shape = track();
    let mut rails = trilist(&shape, 200, "rails");
    rails.flags = vec![0, 1];
    assert!(shape.update_indexed_trilist(&rails));
    assert_eq!(trilist(&shape, 200, "rails").flags, vec![0, 1]);

    rails.flags.push(0);
    assert!(!shape.update_indexed_trilist(&rails));

    let mut missing = trilist(&shape, 200, "rails");
    missing.idx = 3;
    assert!(!shape.update_indexed_trilist(&missing));
}

#[test]
fn test_update_indexed_trilist_rejects_out_of_range_indices() {
    let mut shape = track();
    let before = shape.render();

    let mut far = trilist(&shape, 500, "rails");
    far.vertex_idxs = vec![0, 1, 99];
    assert!(!shape.update_indexed_trilist(&far));

    let mut far = trilist(&shape, 500, "rails");
    far.normal_idxs = vec![1, 3];
    assert!(!shape.update_indexed_trilist(&far));

    assert_eq!(shape.render(), before);
    assert!(Shape::parse(&shape.render()).is_ok());
}

#[test]
fn test_counts_survive_render_and_reparse() {
    let mut shape = track();
    let mut rails = trilist(&shape, 200, "rails");
    let (v0, v1, v2) = (vertex(&shape, 200, 0), vertex(&shape, 200, 1), vertex(&shape, 200, 2));
    let new_vertex = shape.insert_vertex_between(&mut rails, &v0, &v1).unwrap();
    shape.insert_triangle_between(&mut rails, &v0, &new_vertex, &v2).unwrap();
    let mut far = trilist(&shape, 500, "rails");
    let (f1, f2) = (vertex(&shape, 500, 1), vertex(&shape, 500, 2));
    shape.insert_vertex_between(&mut far, &f1, &f2).unwrap();

    let text = shape.render();
    let reparsed = Shape::parse(&text).unwrap();

    assert_eq!(declared(&text, "points"), vec![reparsed.points().len()]);
    assert_eq!(declared(&text, "uv_points"), vec![reparsed.uv_points().len()]);
    assert_eq!(declared(&text, "normals"), vec![reparsed.normals().len()]);
    assert_eq!(
        declared(&text, "vertices"),
        vec![
            reparsed.vertices_in_subobject(200, 0).len(),
            reparsed.vertices_in_subobject(500, 0).len()
        ]
    );

    let lists: Vec<IndexedTrilist> = [200, 500]
        .into_iter()
        .flat_map(|lod| reparsed.indexed_trilists_in_subobject(lod, 0))
        .collect();
    let idx_counts: Vec<usize> = lists.iter().map(|t| t.vertex_idxs.len()).collect();
    let pair_counts: Vec<usize> = lists.iter().map(|t| t.normal_idxs.len() / 2).collect();
    let flag_counts: Vec<usize> = lists.iter().map(|t| t.flags.len()).collect();
    assert_eq!(declared(&text, "vertex_idxs"), idx_counts);
    assert_eq!(declared(&text, "normal_idxs"), pair_counts);
    assert_eq!(declared(&text, "flags"), flag_counts);
    assert!(lists.iter().all(IndexedTrilist::is_consistent));
    assert_eq!(reparsed.render(), text);
}

#[test]
fn test_values_per_line_wraps_index_lists() {
    let mut shape = track();
    shape.set_values_per_line(4);
    let text = shape.render();
    assert!(has_line(&text, "vertex_idxs ( 6 0 1 2 2"));
    assert!(has_line(&text, "1 3 )"));
    assert_eq!(Shape::parse(&text).unwrap().render(), text);
}

#[test]
fn test_precise_values_survive_unrelated_edits() {
    let precise = TRACK
        .replace("point ( 0.75 0.2 10 )", "point ( 0.7512345 0.2000001 10 )")
        .replace("uv_point ( 1 10 )", "uv_point ( 0.99999991 10 )");
    let mut shape = Shape::parse(&precise).unwrap();
    assert_eq!(shape.render(), precise);

    assert!(shape.set_point_value(4, Point::new(-1.25, 0.1, 4.0)));
    let text = shape.render();
    assert!(has_line(&text, "point ( 0.7512345 0.2000001 10 )"));
    assert!(has_line(&text, "uv_point ( 0.99999991 10 )"));
    assert!(has_line(&text, "point ( -1.25 0.1 4 )"));
    assert_eq!(text, precise.replace("point ( -1.3 0.1 4 )", "point ( -1.25 0.1 4 )"));
}

#[test]
fn test_crlf_documents_keep_line_endings() {
    let crlf = TRACK.replace('\n', "\r\n");
    let shape = Shape::parse(&crlf).unwrap();
    assert_eq!(shape.render(), crlf);
}
