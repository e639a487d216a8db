/// Coloured terminal reports
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use std::fmt::Display;
use std::io::{self, Write};
use trackshape_core::{Shape, ShapeFile, Trackcenter};

/// Width of the label column
const LABEL_WIDTH: usize = 14;

/// Line-oriented report writer that colours labels and status lines
pub struct Report<W: Write> {
    out: W,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn coloured(&mut self, color: Color, text: &str) -> io::Result<()> {
        self.out
            .queue(SetForegroundColor(color))?
            .queue(Print(text))?
            .queue(ResetColor)?;
        Ok(())
    }

    pub fn heading(&mut self, text: &str) -> io::Result<()> {
        self.coloured(Color::Yellow, text)?;
        self.out.queue(Print("\n"))?;
        Ok(())
    }

    pub fn field(&mut self, label: &str, value: impl Display) -> io::Result<()> {
        self.coloured(Color::Cyan, &format!("  {:<width$}", label, width = LABEL_WIDTH))?;
        self.out.queue(Print(format!("{}\n", value)))?;
        Ok(())
    }

    pub fn line(&mut self, text: impl Display) -> io::Result<()> {
        self.out.queue(Print(format!("{}\n", text)))?;
        Ok(())
    }

    pub fn success(&mut self, text: &str) -> io::Result<()> {
        self.coloured(Color::Green, text)?;
        self.out.queue(Print("\n"))?;
        Ok(())
    }

    pub fn warning(&mut self, text: &str) -> io::Result<()> {
        self.coloured(Color::Red, text)?;
        self.out.queue(Print("\n"))?;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// State, collections and per-LOD trilists of a shape file
pub fn shape_info<W: Write>(report: &mut Report<W>, file: &ShapeFile) -> io::Result<()> {
    report.heading(&file.filepath().display().to_string())?;
    report.field("state", format!("{:?}", file.state()))?;
    report.field("encoding", format!("{:?}", file.encoding()))?;

    let Ok(shape) = file.shape() else {
        return report.warning("  shape is not readable in this state");
    };
    shape_contents(report, shape)
}

fn shape_contents<W: Write>(report: &mut Report<W>, shape: &Shape) -> io::Result<()> {
    report.field("points", shape.points().len())?;
    report.field("uv_points", shape.uv_points().len())?;
    report.field("normals", shape.normals().len())?;

    report.heading("prim_states")?;
    for prim_state in shape.prim_states() {
        report.field(&prim_state.idx.to_string(), &prim_state.name)?;
    }

    for lod_dlevel in shape.lod_dlevels() {
        report.heading(&format!("lod {}", lod_dlevel))?;
        for subobject_idx in shape.subobject_idxs_in_lod_dlevel(lod_dlevel) {
            let vertices = shape.vertices_in_subobject(lod_dlevel, subobject_idx).len();
            report.field(
                &format!("sub_object {}", subobject_idx),
                format!("{} vertices", vertices),
            )?;
            for trilist in shape.indexed_trilists_in_subobject(lod_dlevel, subobject_idx) {
                report.line(format!(
                    "    {} #{}: {} triangles",
                    trilist.prim_state.name,
                    trilist.idx,
                    trilist.triangle_count()
                ))?;
            }
        }
    }
    Ok(())
}

/// Sample count and end samples of each route
pub fn trackcenters<W: Write>(
    report: &mut Report<W>,
    shape_name: &str,
    routes: &[Trackcenter],
) -> io::Result<()> {
    report.heading(&format!("{} ({} routes)", shape_name, routes.len()))?;
    for (idx, route) in routes.iter().enumerate() {
        let (Some(first), Some(last)) = (route.first(), route.last()) else {
            report.field(&format!("route {}", idx), "empty")?;
            continue;
        };
        report.field(
            &format!("route {}", idx),
            format!(
                "{} samples, ({:.4}, {:.4}, {:.4}) -> ({:.4}, {:.4}, {:.4})",
                route.len(),
                first.x,
                first.y,
                first.z,
                last.x,
                last.y,
                last.z
            ),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackshape_core::Point;

    fn text(report: Report<Vec<u8>>) -> String {
        String::from_utf8(report.into_inner()).unwrap()
    }

    #[test]
    fn test_field_is_coloured_and_padded() {
        let mut report = Report::new(Vec::new());
        report.field("points", 12).unwrap();
        let out = text(report);
        assert!(out.contains("  points        "));
        assert!(out.ends_with("12\n"));
        assert!(out.contains('\u{1b}'));
    }

    #[test]
    fn test_trackcenter_report() {
        let routes = [
            Trackcenter::straight(50.0, 500, 0.0, Point::new(-2.4925, 0.0, 0.0)),
            Trackcenter::empty(),
        ];
        let mut report = Report::new(Vec::new());
        trackcenters(&mut report, "A2t50mStrt.s", &routes).unwrap();
        let out = text(report);
        assert!(out.contains("A2t50mStrt.s (2 routes)"));
        assert!(out.contains("500 samples, (-2.4925, 0.0000, 0.0000) -> (-2.4925, 0.0000, 50.0000)"));
        assert!(out.contains("empty"));
    }
}
