/// Command line front end for shape inspection and track retargeting
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::io::{stdout, Write};
use std::path::{Path, PathBuf};
use trackshape_core::trackcenter::distance_along_nearest_trackcenter;
use trackshape_core::{
    find_directory_files, load_shape, retarget_prim_state, Config, LateralRule, Plane, Point,
    TrackSectionDatabase,
};

pub mod report;

pub use report::Report;

#[derive(Debug, Parser)]
#[command(name = "trackshape", version, about = "Inspect and edit MSTS track shapes")]
pub struct Cli {
    /// Log debug events
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file, defaults to ./trackshape.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show compression state, collections and trilists of a shape
    Info { shape: PathBuf },

    /// Compress shapes with the external tool
    Compress {
        #[arg(required = true)]
        shapes: Vec<PathBuf>,
        #[arg(long)]
        ffeditc: Option<PathBuf>,
    },

    /// Decompress shapes with the external tool
    Decompress {
        #[arg(required = true)]
        shapes: Vec<PathBuf>,
        #[arg(long)]
        ffeditc: Option<PathBuf>,
    },

    /// Print the routes generated for a track shape
    Trackcenters {
        shape_name: String,
        #[arg(long)]
        tsection: Option<PathBuf>,
        #[arg(long)]
        points_per_meter: Option<f64>,
        /// Also print the distance along the nearest route to this point
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        probe: Option<Vec<f64>>,
    },

    /// Move prim_state points to new lateral offsets from the track
    Retarget {
        shape: PathBuf,
        #[arg(long)]
        rules: PathBuf,
        #[arg(long)]
        lod: u32,
        /// Write to this file instead of overwriting the shape
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        tsection: Option<PathBuf>,
        /// Track shape to take routes from, defaults to the shape's file name
        #[arg(long)]
        track_shape: Option<String>,
    },

    /// List files in a directory by glob patterns
    Find {
        directory: PathBuf,
        #[arg(long, required = true)]
        include: Vec<String>,
        #[arg(long)]
        exclude: Vec<String>,
    },
}

/// A lateral rule bound to the prim_state it applies to
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrimStateRule {
    pub prim_state: String,
    #[serde(flatten)]
    pub rule: LateralRule,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleFile {
    #[serde(rename = "rule", default)]
    pub rules: Vec<PrimStateRule>,
}

impl RuleFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid rules in {}", path.display()))
    }

    /// Rules grouped by prim_state name in first-seen order
    pub fn by_prim_state(&self) -> Vec<(&str, Vec<LateralRule>)> {
        let mut groups: Vec<(&str, Vec<LateralRule>)> = Vec::new();
        for entry in &self.rules {
            match groups.iter_mut().find(|(name, _)| *name == entry.prim_state) {
                Some((_, rules)) => rules.push(entry.rule),
                None => groups.push((&entry.prim_state, vec![entry.rule])),
            }
        }
        groups
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Config::load().context("Failed to load configuration"),
    }
}

fn required(flag: Option<PathBuf>, configured: Option<PathBuf>, what: &str) -> Result<PathBuf> {
    match flag.or(configured) {
        Some(path) => Ok(path),
        None => bail!("No {} given, pass it as a flag or set it in trackshape.toml", what),
    }
}

/// Run a parsed command line, writing reports to stdout
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let mut report = Report::new(stdout());
    execute(cli.command, &config, &mut report)?;
    report.flush()?;
    Ok(())
}

pub fn execute<W: Write>(command: Command, config: &Config, report: &mut Report<W>) -> Result<()> {
    match command {
        Command::Info { shape } => {
            let mut file = load_shape(&shape)
                .with_context(|| format!("Failed to load shape {}", shape.display()))?;
            if let Ok(parsed) = file.shape_mut() {
                parsed.set_values_per_line(config.values_per_line);
            }
            report::shape_info(report, &file)?;
        }
        Command::Compress { shapes, ffeditc } => {
            let tool = required(ffeditc, config.ffeditc_path.clone(), "ffeditc path")?;
            for path in shapes {
                let mut file = load_shape(&path)
                    .with_context(|| format!("Failed to load shape {}", path.display()))?;
                file.compress(&tool)
                    .with_context(|| format!("Failed to compress {}", path.display()))?;
                report.success(&format!("compressed {}", path.display()))?;
            }
        }
        Command::Decompress { shapes, ffeditc } => {
            let tool = required(ffeditc, config.ffeditc_path.clone(), "ffeditc path")?;
            for path in shapes {
                let mut file = load_shape(&path)
                    .with_context(|| format!("Failed to load shape {}", path.display()))?;
                file.decompress(&tool)
                    .with_context(|| format!("Failed to decompress {}", path.display()))?;
                report.success(&format!("decompressed {}", path.display()))?;
            }
        }
        Command::Trackcenters {
            shape_name,
            tsection,
            points_per_meter,
            probe,
        } => {
            let database = load_database(tsection, config)?;
            let ppm = points_per_meter.unwrap_or(config.num_points_per_meter);
            let routes = database.trackcenters(&shape_name, ppm)?;
            report::trackcenters(report, &shape_name, &routes)?;
            if let Some(&[x, y, z]) = probe.as_deref() {
                let along = distance_along_nearest_trackcenter(
                    &Point::new(x, y, z),
                    &routes,
                    Plane::Xz,
                    config.max_neighbor_distance,
                )?;
                report.field("along track", format!("{:.3} m", along))?;
            }
        }
        Command::Retarget {
            shape,
            rules,
            lod,
            output,
            tsection,
            track_shape,
        } => {
            let rule_file = RuleFile::from_file(&rules)?;
            let database = load_database(tsection, config)?;

            let mut file = load_shape(&shape)
                .with_context(|| format!("Failed to load shape {}", shape.display()))?;
            let track_shape = match track_shape {
                Some(name) => name,
                None => file.filename().to_string(),
            };
            let routes: Vec<_> = database
                .trackcenters(&track_shape, config.num_points_per_meter)?
                .into_iter()
                .map(|route| route.with_spline_samples(config.spline_samples))
                .collect();

            let parsed = file.shape_mut()?;
            parsed.set_values_per_line(config.values_per_line);
            for (prim_state, rules) in rule_file.by_prim_state() {
                if parsed.prim_state_by_name(prim_state).is_none() {
                    report.warning(&format!("no prim_state named {}", prim_state))?;
                    continue;
                }
                let moved = retarget_prim_state(parsed, lod, prim_state, &routes, &rules)?;
                report.field(prim_state, format!("{} points moved", moved))?;
            }

            let target = match output {
                Some(output) => {
                    let name = output
                        .file_name()
                        .and_then(|name| name.to_str())
                        .context("Output path has no file name")?;
                    file.copy(name, output.parent())?
                }
                None => file,
            };
            target.save()?;
            report.success(&format!("saved {}", target.filepath().display()))?;
        }
        Command::Find {
            directory,
            include,
            exclude,
        } => {
            let include: Vec<&str> = include.iter().map(String::as_str).collect();
            let exclude: Vec<&str> = exclude.iter().map(String::as_str).collect();
            for name in find_directory_files(&directory, &include, &exclude)? {
                report.line(name)?;
            }
        }
    }
    Ok(())
}

fn load_database(flag: Option<PathBuf>, config: &Config) -> Result<TrackSectionDatabase> {
    let path = required(flag, config.tsection_path.clone(), "tsection.dat path")?;
    TrackSectionDatabase::load(&path)
        .with_context(|| format!("Failed to load track sections from {}", path.display()))
}
