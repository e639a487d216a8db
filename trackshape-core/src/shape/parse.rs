/// Build the shape arenas from the block tree
use crate::block::{parse_blocks, parse_hex, Block};
use crate::error::{Error, Result};
use crate::geometry::{Normal, Point, UVPoint};
use crate::lexer::tokenize;
use crate::shape::{
    DistanceLevel, PrimStateRecord, PrimitiveItem, Shape, Span, SubObject, TrilistRecord,
    VertexRecord, VertexSet, DEFAULT_VALUES_PER_LINE,
};

impl Shape {
    /// Parse shape text. Line endings are kept for rendering.
    pub fn parse(text: &str) -> Result<Self> {
        let line_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let source: Vec<String> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();

        let tokens = tokenize(&source)?;
        let blocks = parse_blocks(&tokens)?;
        let shape = blocks
            .iter()
            .find(|block| block.is("shape"))
            .ok_or_else(|| Error::malformed(1, "missing 'shape' block"))?;

        let prim_states = shape
            .require("prim_states")?
            .children("prim_state")
            .map(|block| PrimStateRecord {
                name: block.label.clone().unwrap_or_default(),
                vtx_state: block.word(3).and_then(|word| word.parse().ok()),
            })
            .collect();

        let points_block = shape.require("points")?;
        let points = collect_checked(points_block, "point", |block| {
            Ok(Point::new(
                block.parse_word(0)?,
                block.parse_word(1)?,
                block.parse_word(2)?,
            ))
        })?;

        let uv_points_block = shape.require("uv_points")?;
        let uv_points = collect_checked(uv_points_block, "uv_point", |block| {
            Ok(UVPoint::new(block.parse_word(0)?, block.parse_word(1)?))
        })?;

        let normals_block = shape.require("normals")?;
        let normals = collect_checked(normals_block, "vector", |block| {
            Ok(Normal::new(
                block.parse_word(0)?,
                block.parse_word(1)?,
                block.parse_word(2)?,
            ))
        })?;

        let mut distance_levels = Vec::new();
        for lod_control in shape.require("lod_controls")?.children("lod_control") {
            for level in lod_control
                .require("distance_levels")?
                .children("distance_level")
            {
                distance_levels.push(parse_distance_level(level, &source)?);
            }
        }

        let parsed = Shape {
            points_span: span(points_block, &source)?,
            uv_points_span: span(uv_points_block, &source)?,
            normals_span: span(normals_block, &source)?,
            source,
            line_ending,
            prim_states,
            points,
            uv_points,
            normals,
            distance_levels,
            values_per_line: DEFAULT_VALUES_PER_LINE,
        };
        parsed.validate()?;

        tracing::debug!(
            prim_states = parsed.prim_states.len(),
            points = parsed.points.len(),
            normals = parsed.normals.len(),
            lod_dlevels = parsed.distance_levels.len(),
            "Parsed shape"
        );
        Ok(parsed)
    }

    /// Check every index stored in the vertex arenas and trilists
    fn validate(&self) -> Result<()> {
        for level in &self.distance_levels {
            for sub in &level.sub_objects {
                let line = sub.vertices_span.first_line + 1;
                for (idx, vertex) in sub.vertices.iter().enumerate() {
                    let uv_ok = vertex.uv_idxs.iter().all(|&uv| uv < self.uv_points.len());
                    if vertex.point_idx >= self.points.len()
                        || vertex.normal_idx >= self.normals.len()
                        || !uv_ok
                    {
                        return Err(Error::malformed(
                            line,
                            format!("vertex {} references a missing point, uv point or normal", idx),
                        ));
                    }
                }
                let line = sub.primitives_span.first_line + 1;
                for trilist in sub.trilists() {
                    if trilist.prim_state_idx >= self.prim_states.len() {
                        return Err(Error::malformed(
                            line,
                            format!("unknown prim_state index {}", trilist.prim_state_idx),
                        ));
                    }
                    if let Some(&bad) = trilist
                        .vertex_idxs
                        .iter()
                        .find(|&&idx| idx >= sub.vertices.len())
                    {
                        return Err(Error::malformed(
                            line,
                            format!("vertex index {} out of range", bad),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Parse the children of a counted collection, warning when the declared
/// count disagrees with the entries found
fn collect_checked<T>(
    block: &Block,
    keyword: &str,
    parse: impl Fn(&Block) -> Result<T>,
) -> Result<Vec<T>> {
    let declared = block.parse_word::<usize>(0)?;
    let values = block
        .children(keyword)
        .map(parse)
        .collect::<Result<Vec<T>>>()?;
    if declared != values.len() {
        tracing::warn!(
            block = %block.keyword,
            declared,
            found = values.len(),
            line = block.first_line + 1,
            "Declared count differs from entries"
        );
    }
    Ok(values)
}

/// Source span of a block rendered from an arena. The block must start and
/// end on lines of its own.
fn span(block: &Block, source: &[String]) -> Result<Span> {
    let first = source.get(block.first_line).map(String::as_str).unwrap_or("");
    let last = source.get(block.last_line).map(String::as_str).unwrap_or("");
    let trimmed = first.trim_start();
    let starts_line = trimmed
        .get(..block.keyword.len())
        .is_some_and(|word| word.eq_ignore_ascii_case(&block.keyword));
    if !starts_line || !last.trim_end().ends_with(')') {
        return Err(Error::malformed(
            block.first_line + 1,
            format!("'{}' must start and end on its own lines", block.keyword),
        ));
    }
    Ok(Span {
        first_line: block.first_line,
        last_line: block.last_line,
        indent: first[..first.len() - trimmed.len()].to_string(),
    })
}

fn parse_distance_level(level: &Block, source: &[String]) -> Result<DistanceLevel> {
    let selection: f64 = level
        .require("distance_level_header")?
        .require("dlevel_selection")?
        .parse_word(0)?;
    let sub_objects = level
        .require("sub_objects")?
        .children("sub_object")
        .map(|block| parse_sub_object(block, source))
        .collect::<Result<Vec<_>>>()?;
    Ok(DistanceLevel {
        dlevel: selection.round() as u32,
        sub_objects,
    })
}

fn parse_sub_object(block: &Block, source: &[String]) -> Result<SubObject> {
    let geometry_info = match block
        .require("sub_object_header")?
        .child("geometry_info")
    {
        Some(info) => Some((info.clone(), span(info, source)?)),
        None => None,
    };

    let vertices_block = block.require("vertices")?;
    let vertices = collect_checked(vertices_block, "vertex", parse_vertex)?;

    let vertex_sets_block = block.require("vertex_sets")?;
    let vertex_sets = collect_checked(vertex_sets_block, "vertex_set", |set| {
        Ok(VertexSet::new(
            set.parse_word(0)?,
            set.parse_word(1)?,
            set.parse_word(2)?,
        ))
    })?;

    let primitives_block = block.require("primitives")?;
    let primitives = parse_primitives(primitives_block)?;

    Ok(SubObject {
        geometry_info,
        vertices,
        vertices_span: span(vertices_block, source)?,
        vertex_sets,
        vertex_sets_span: span(vertex_sets_block, source)?,
        primitives,
        primitives_span: span(primitives_block, source)?,
    })
}

fn parse_vertex(block: &Block) -> Result<VertexRecord> {
    let hex = |n: usize| -> Result<u32> {
        let word = block.word(n).ok_or_else(|| {
            Error::malformed(block.first_line + 1, format!("vertex is missing value {}", n))
        })?;
        parse_hex(word, block.first_line)
    };
    let uv_idxs = match block.child("vertex_uvs") {
        Some(uvs) => uvs.counted_values::<usize>()?.1,
        None => Vec::new(),
    };
    Ok(VertexRecord {
        flags: hex(0)?,
        point_idx: block.parse_word(1)?,
        normal_idx: block.parse_word(2)?,
        colour1: hex(3)?,
        colour2: hex(4)?,
        uv_idxs,
    })
}

fn parse_primitives(block: &Block) -> Result<Vec<PrimitiveItem>> {
    let mut items = Vec::new();
    let mut current_state = 0;
    for child in block.blocks() {
        if child.is("prim_state_idx") {
            current_state = child.parse_word(0)?;
            items.push(PrimitiveItem::PrimStateIdx(current_state));
        } else if child.is("indexed_trilist") {
            items.push(PrimitiveItem::Trilist(parse_trilist(child, current_state)?));
        } else {
            return Err(Error::malformed(
                child.first_line + 1,
                format!("unsupported primitive '{}'", child.keyword),
            ));
        }
    }
    Ok(items)
}

fn parse_trilist(block: &Block, prim_state_idx: usize) -> Result<TrilistRecord> {
    let line = block.first_line + 1;
    let (_, vertex_idxs) = block.require("vertex_idxs")?.counted_values::<usize>()?;
    let (_, normal_idxs) = block.require("normal_idxs")?.counted_values::<usize>()?;
    let flags_block = block.require("flags")?;
    let flags = flags_block
        .words()
        .skip(1)
        .map(|word| parse_hex(word, flags_block.first_line))
        .collect::<Result<Vec<u32>>>()?;

    let triangles = vertex_idxs.len() / 3;
    if vertex_idxs.len() % 3 != 0 {
        return Err(Error::malformed(line, "vertex_idxs is not a multiple of three"));
    }
    if normal_idxs.len() != 2 * triangles || flags.len() != triangles {
        return Err(Error::malformed(
            line,
            format!(
                "{} triangles with {} normal_idxs and {} flags",
                triangles,
                normal_idxs.len(),
                flags.len()
            ),
        ));
    }
    Ok(TrilistRecord {
        prim_state_idx,
        vertex_idxs,
        normal_idxs,
        flags,
    })
}
