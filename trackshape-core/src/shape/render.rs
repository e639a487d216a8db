/// Serialize a shape back to text
use crate::block::{Block, Item};
use crate::shape::{PrimitiveItem, Shape, Span, SubObject, TrilistRecord};

impl Shape {
    /// Render the document. Blocks backed by arenas are regenerated with
    /// declared counts taken from the data; all other lines are copied.
    pub fn render(&self) -> String {
        let mut replacements: Vec<(&Span, Vec<String>)> = vec![
            (&self.points_span, self.render_points()),
            (&self.uv_points_span, self.render_uv_points()),
            (&self.normals_span, self.render_normals()),
        ];
        for level in &self.distance_levels {
            for sub in &level.sub_objects {
                replacements.extend(self.render_sub_object(sub));
            }
        }
        replacements.sort_by_key(|(span, _)| span.first_line);

        let mut out: Vec<String> = Vec::with_capacity(self.source.len());
        let mut line = 0;
        for (span, lines) in replacements {
            while line < span.first_line {
                out.push(self.source[line].clone());
                line += 1;
            }
            out.extend(lines);
            line = span.last_line + 1;
        }
        out.extend(self.source.iter().skip(line).cloned());
        out.join(self.line_ending)
    }

    fn render_points(&self) -> Vec<String> {
        let span = &self.points_span;
        counted_block(span, "points", self.points.len(), |out, inner| {
            for p in &self.points {
                out.push(format!(
                    "{}point ( {} {} {} )",
                    inner,
                    format_number(p.x),
                    format_number(p.y),
                    format_number(p.z)
                ));
            }
        })
    }

    fn render_uv_points(&self) -> Vec<String> {
        let span = &self.uv_points_span;
        counted_block(span, "uv_points", self.uv_points.len(), |out, inner| {
            for uv in &self.uv_points {
                out.push(format!(
                    "{}uv_point ( {} {} )",
                    inner,
                    format_number(uv.u),
                    format_number(uv.v)
                ));
            }
        })
    }

    fn render_normals(&self) -> Vec<String> {
        let span = &self.normals_span;
        counted_block(span, "normals", self.normals.len(), |out, inner| {
            for n in &self.normals {
                out.push(format!(
                    "{}vector ( {} {} {} )",
                    inner,
                    format_number(n.vec_x),
                    format_number(n.vec_y),
                    format_number(n.vec_z)
                ));
            }
        })
    }

    fn render_sub_object<'a>(&self, sub: &'a SubObject) -> Vec<(&'a Span, Vec<String>)> {
        let mut blocks = Vec::with_capacity(4);
        if let Some((info, span)) = &sub.geometry_info {
            blocks.push((span, render_block(info, &span.indent)));
        }

        let span = &sub.vertices_span;
        let vertices = counted_block(span, "vertices", sub.vertices.len(), |out, inner| {
            for v in &sub.vertices {
                out.push(format!(
                    "{}vertex ( {:08x} {} {} {:08x} {:08x}",
                    inner, v.flags, v.point_idx, v.normal_idx, v.colour1, v.colour2
                ));
                let uvs: Vec<String> = v.uv_idxs.iter().map(usize::to_string).collect();
                out.push(format!(
                    "{}\tvertex_uvs ( {} )",
                    inner,
                    join_counted(uvs.len(), &uvs)
                ));
                out.push(format!("{})", inner));
            }
        });
        blocks.push((span, vertices));

        let span = &sub.vertex_sets_span;
        let sets = counted_block(span, "vertex_sets", sub.vertex_sets.len(), |out, inner| {
            for set in &sub.vertex_sets {
                out.push(format!(
                    "{}vertex_set ( {} {} {} )",
                    inner, set.vtx_state, set.start, set.count
                ));
            }
        });
        blocks.push((span, sets));

        let span = &sub.primitives_span;
        let primitives = counted_block(span, "primitives", sub.primitives.len(), |out, inner| {
            for item in &sub.primitives {
                match item {
                    PrimitiveItem::PrimStateIdx(idx) => {
                        out.push(format!("{}prim_state_idx ( {} )", inner, idx));
                    }
                    PrimitiveItem::Trilist(trilist) => {
                        self.render_trilist(out, trilist, inner);
                    }
                }
            }
        });
        blocks.push((span, primitives));
        blocks
    }

    fn render_trilist(&self, out: &mut Vec<String>, trilist: &TrilistRecord, indent: &str) {
        let inner = format!("{}\t", indent);
        let per_line = self.values_per_line;
        out.push(format!("{}indexed_trilist (", indent));

        let vertex_idxs: Vec<String> = trilist.vertex_idxs.iter().map(usize::to_string).collect();
        out.extend(index_list(&inner, "vertex_idxs", vertex_idxs.len(), &vertex_idxs, per_line));

        let normal_idxs: Vec<String> = trilist.normal_idxs.iter().map(usize::to_string).collect();
        out.extend(index_list(
            &inner,
            "normal_idxs",
            normal_idxs.len() / 2,
            &normal_idxs,
            per_line,
        ));

        let flags: Vec<String> = trilist.flags.iter().map(|f| format!("{:08x}", f)).collect();
        out.extend(index_list(&inner, "flags", flags.len(), &flags, per_line));

        out.push(format!("{})", indent));
    }
}

/// `keyword ( count` followed by children one level deeper, then `)`
fn counted_block(
    span: &Span,
    keyword: &str,
    count: usize,
    children: impl FnOnce(&mut Vec<String>, &str),
) -> Vec<String> {
    let indent = &span.indent;
    if count == 0 {
        return vec![format!("{}{} ( 0 )", indent, keyword)];
    }
    let mut out = vec![format!("{}{} ( {}", indent, keyword, count)];
    children(&mut out, &format!("{}\t", indent));
    out.push(format!("{})", indent));
    out
}

fn join_counted(count: usize, values: &[String]) -> String {
    if values.is_empty() {
        count.to_string()
    } else {
        format!("{} {}", count, values.join(" "))
    }
}

/// A counted index list wrapped at `per_line` values per line
fn index_list(
    indent: &str,
    keyword: &str,
    count: usize,
    values: &[String],
    per_line: usize,
) -> Vec<String> {
    let mut chunks = values.chunks(per_line.max(1));
    let Some(first) = chunks.next() else {
        return vec![format!("{}{} ( {} )", indent, keyword, count)];
    };
    let mut lines = vec![format!("{}{} ( {}", indent, keyword, join_counted(count, first))];
    lines.extend(chunks.map(|chunk| format!("{}{}", indent, chunk.join(" "))));
    if let Some(last) = lines.last_mut() {
        last.push_str(" )");
    }
    lines
}

/// Render any block: words on the keyword line, nested blocks one per line
pub(crate) fn render_block(block: &Block, indent: &str) -> Vec<String> {
    let mut head = format!("{}{}", indent, block.keyword);
    if let Some(label) = &block.label {
        head.push(' ');
        head.push_str(label);
    }
    head.push_str(" (");

    let leading = block
        .items
        .iter()
        .take_while(|item| matches!(item, Item::Word(_)))
        .count();
    for item in &block.items[..leading] {
        if let Item::Word(word) = item {
            head.push(' ');
            head.push_str(word);
        }
    }
    if leading == block.items.len() {
        head.push_str(" )");
        return vec![head];
    }

    let inner = format!("{}\t", indent);
    let mut out = vec![head];
    for item in &block.items[leading..] {
        match item {
            Item::Block(child) => out.extend(render_block(child, &inner)),
            Item::Word(word) => out.push(format!("{}{}", inner, word)),
        }
    }
    out.push(format!("{})", indent));
    out
}

/// Decimals kept from the shortest form before rounding kicks in
const MAX_DECIMALS: usize = 10;

/// Shortest decimal form that parses back to `value`. Only arithmetic noise
/// beyond [`MAX_DECIMALS`] is rounded, so parsed tokens render unchanged.
pub(crate) fn format_number(value: f64) -> String {
    let shortest = value.to_string();
    let decimals = shortest.split_once('.').map_or(0, |(_, frac)| frac.len());
    let text = if decimals <= MAX_DECIMALS {
        shortest
    } else {
        let fixed = format!("{:.*}", MAX_DECIMALS, value);
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text
    }
}
