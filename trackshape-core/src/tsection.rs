/// Global track section database (`tsection.dat`)
use std::collections::HashMap;
use std::path::Path;

use crate::block::{parse_blocks, Block};
use crate::error::{Error, Result};
use crate::file::TextFile;
use crate::geometry::Point;
use crate::lexer::tokenize;
use crate::trackcenter::Trackcenter;
use crate::transform::{Placement, Transform};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionCurve {
    pub radius: f64,
    /// Degrees, negative bends towards -x
    pub angle: f64,
}

/// `TrackSection ( id SectionSize ( gauge length ) [SectionCurve ( radius angle )] )`
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSection {
    pub id: u32,
    pub gauge: f64,
    pub size_length: f64,
    pub curve: Option<SectionCurve>,
}

impl TrackSection {
    /// Length along the track, the arc length for curves
    pub fn length(&self) -> f64 {
        match self.curve {
            Some(curve) => curve.radius * curve.angle.abs().to_radians(),
            None => self.size_length,
        }
    }

    pub fn sample_count(&self, num_points_per_meter: f64) -> usize {
        ((self.length() * num_points_per_meter).round() as usize).max(2)
    }

    /// Samples of this section placed at `start`, and the placement at its end
    pub fn trackcenter(&self, start: Placement, num_points_per_meter: f64) -> (Trackcenter, Placement) {
        let n = self.sample_count(num_points_per_meter);
        match self.curve {
            Some(curve) => (
                Trackcenter::curve(curve.radius, curve.angle, n, start.heading, start.position),
                start.advance(Transform::curve_offset(curve.radius, curve.angle), curve.angle),
            ),
            None => (
                Trackcenter::straight(self.size_length, n, start.heading, start.position),
                start.advance(Transform::straight_offset(self.size_length), 0.0),
            ),
        }
    }
}

/// One route through a track shape
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPath {
    pub start: Point,
    pub start_angle: f64,
    pub sections: Vec<u32>,
}

/// `TrackShape ( id FileName ( name ) NumPaths ( n ) SectionIdx ( ... )... )`
#[derive(Debug, Clone, PartialEq)]
pub struct TrackShape {
    pub id: u32,
    pub filename: String,
    pub paths: Vec<TrackPath>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackSectionDatabase {
    sections: HashMap<u32, TrackSection>,
    shapes: Vec<TrackShape>,
}

impl TrackSectionDatabase {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = TextFile::load(path.as_ref())?;
        Self::parse_lines(file.lines())
    }

    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        Self::parse_lines(&lines)
    }

    fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let tokens = tokenize(lines)?;
        let blocks = parse_blocks(&tokens)?;

        if let Some(local) = blocks
            .iter()
            .find(|block| block.is("include") || block.is("TrackPaths"))
        {
            return Err(Error::InvalidTrackDatabase(format!(
                "'{}' on line {} marks a route database",
                local.keyword,
                local.first_line + 1
            )));
        }

        let shapes_block = blocks
            .iter()
            .find(|block| block.is("TrackShapes"))
            .ok_or_else(|| Error::InvalidTrackDatabase("no TrackShapes block".into()))?;

        let mut sections = HashMap::new();
        for block in blocks.iter().filter(|block| block.is("TrackSections")) {
            for section in block.children("TrackSection") {
                let section = parse_section(section)?;
                sections.insert(section.id, section);
            }
        }
        let shapes = shapes_block
            .children("TrackShape")
            .map(parse_shape)
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(sections = sections.len(), shapes = shapes.len(), "Loaded track section database");
        Ok(Self { sections, shapes })
    }

    pub fn section(&self, id: u32) -> Option<&TrackSection> {
        self.sections.get(&id)
    }

    pub fn shapes(&self) -> &[TrackShape] {
        &self.shapes
    }

    /// Track shape by file name, ignoring case
    pub fn shape(&self, name: &str) -> Option<&TrackShape> {
        self.shapes
            .iter()
            .find(|shape| shape.filename.eq_ignore_ascii_case(name))
    }

    /// One trackcenter per route of the named shape, chaining its sections
    pub fn trackcenters(&self, shape_name: &str, num_points_per_meter: f64) -> Result<Vec<Trackcenter>> {
        let shape = self
            .shape(shape_name)
            .ok_or_else(|| Error::UnknownTrackShape(shape_name.to_string()))?;

        shape
            .paths
            .iter()
            .map(|path| {
                let mut placement = Placement::new(path.start, path.start_angle);
                let mut trackcenter = Trackcenter::empty();
                for id in &path.sections {
                    let section = self.section(*id).ok_or_else(|| {
                        Error::InvalidTrackDatabase(format!(
                            "{} references unknown track section {}",
                            shape.filename, id
                        ))
                    })?;
                    let (samples, end) = section.trackcenter(placement, num_points_per_meter);
                    trackcenter = trackcenter + samples;
                    placement = end;
                }
                tracing::debug!(shape = %shape.filename, samples = trackcenter.len(), "Generated route");
                Ok(trackcenter)
            })
            .collect()
    }
}

impl Trackcenter {
    /// Trackcenters of every route of a shape in the database
    pub fn from_track_database(
        database: &TrackSectionDatabase,
        shape_name: &str,
        num_points_per_meter: f64,
    ) -> Result<Vec<Trackcenter>> {
        database.trackcenters(shape_name, num_points_per_meter)
    }
}

fn parse_section(block: &Block) -> Result<TrackSection> {
    let size = block.require("SectionSize")?;
    let curve = match block.child("SectionCurve") {
        Some(curve) => Some(SectionCurve {
            radius: curve.parse_word(0)?,
            angle: curve.parse_word(1)?,
        }),
        None => None,
    };
    Ok(TrackSection {
        id: block.parse_word(0)?,
        gauge: size.parse_word(0)?,
        size_length: size.parse_word(1)?,
        curve,
    })
}

fn parse_shape(block: &Block) -> Result<TrackShape> {
    let filename = block
        .require("FileName")?
        .word(0)
        .ok_or_else(|| Error::malformed(block.first_line + 1, "TrackShape without file name"))?
        .to_string();

    let paths = block
        .children("SectionIdx")
        .map(|idx| {
            let line = idx.first_line + 1;
            let values: Vec<f64> = idx.parse_words()?;
            let declared = values.first().copied().unwrap_or(0.0);
            let end = whole_number(declared)
                .and_then(|count| usize::try_from(count).ok())
                .and_then(|count| count.checked_add(5))
                .ok_or_else(|| Error::malformed(line, format!("invalid SectionIdx count {}", declared)))?;
            if values.len() < end {
                return Err(Error::malformed(
                    line,
                    format!("SectionIdx declares {} sections but has {} values", end - 5, values.len()),
                ));
            }
            let sections = values[5..end]
                .iter()
                .map(|&id| {
                    whole_number(id)
                        .and_then(|id| u32::try_from(id).ok())
                        .ok_or_else(|| Error::malformed(line, format!("invalid track section id {}", id)))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TrackPath {
                start: Point::new(values[1], values[2], values[3]),
                start_angle: values[4],
                sections,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if let Some(declared) = block.child("NumPaths").and_then(|n| n.word(0)?.parse::<usize>().ok()) {
        if declared != paths.len() {
            tracing::warn!(shape = %filename, declared, found = paths.len(), "NumPaths differs from SectionIdx entries");
        }
    }

    Ok(TrackShape {
        id: block.parse_word(0)?,
        filename,
        paths,
    })
}

/// Finite, non-negative integral values that fit in a `u32`
fn whole_number(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX))
        .then(|| value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DATABASE: &str = r#"SIMISA@@@@@@@@@@JINX0T0t______

TrackSections ( 3
	_SKIP ( "straights" )
	TrackSection ( 1
		SectionSize ( 1.5 10 )
	)
	TrackSection ( 2
		SectionSize ( 1.5 0 )
		SectionCurve ( 100 -10 )
	)
)
TrackShapes ( 2
	TrackShape ( 1
		FileName ( A1t10mStrt.s )
		NumPaths ( 1 )
		SectionIdx ( 1 0 0 0 0 1 )
	)
	TrackShape ( 2
		FileName ( Bend.s )
		NumPaths ( 1 )
		SectionIdx ( 2 0 0 0 0 1 2 )
	)
)
"#;

    #[test]
    fn test_parse_sections() {
        let db = TrackSectionDatabase::parse(DATABASE).unwrap();
        let curve = db.section(2).unwrap();
        assert_relative_eq!(curve.length(), 100.0 * 10f64.to_radians());
        assert_eq!(curve.sample_count(10.0), 175);
        assert_eq!(db.section(1).unwrap().sample_count(0.01), 2);
        assert!(db.shape("a1t10mstrt.S").is_some());
    }

    #[test]
    fn test_chains_sections() {
        let db = TrackSectionDatabase::parse(DATABASE).unwrap();
        let routes = Trackcenter::from_track_database(&db, "Bend.s", 10.0).unwrap();
        assert_eq!(routes.len(), 1);
        let route = &routes[0];
        assert_eq!(route.len(), 100 + 175);
        assert_relative_eq!(route.points()[99].z, 10.0);
        assert_eq!(route.points()[100], route.points()[99]);
        let end = route.last().unwrap();
        let theta = 10f64.to_radians();
        assert_relative_eq!(end.x, -100.0 * (1.0 - theta.cos()), epsilon = 1e-9);
        assert_relative_eq!(end.z, 10.0 + 100.0 * theta.sin(), epsilon = 1e-9);
    }

    #[test]
    fn test_unknown_shape_and_local_database() {
        let db = TrackSectionDatabase::parse(DATABASE).unwrap();
        assert!(matches!(
            db.trackcenters("missing.s", 10.0),
            Err(Error::UnknownTrackShape(name)) if name == "missing.s"
        ));

        let local = "SIMISA@@@@@@@@@@JINX0T0t______\n\ninclude ( \"../../../Global/tsection.dat\" )\nTrackSections ( 0 )\n";
        assert!(matches!(
            TrackSectionDatabase::parse(local),
            Err(Error::InvalidTrackDatabase(_))
        ));
    }

    #[test]
    fn test_garbage_section_idx_is_malformed() {
        for idx in [
            "1e30 0 0 0 0 1",
            "-1 0 0 0 0 1",
            "1.5 0 0 0 0 1",
            "nan 0 0 0 0 1",
            "3 0 0 0 0 1",
            "1 0 0 0 0 -2",
            "1 0 0 0 0 1e12",
        ] {
            let text = DATABASE.replace("SectionIdx ( 1 0 0 0 0 1 )", &format!("SectionIdx ( {} )", idx));
            assert!(
                matches!(TrackSectionDatabase::parse(&text), Err(Error::MalformedDocument { .. })),
                "SectionIdx ( {} )",
                idx
            );
        }
    }
}
