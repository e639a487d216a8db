/// Configuration for shape editing and trackcenter generation
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Config file looked up in the working directory by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "trackshape.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool converting between compressed and text shapes
    pub ffeditc_path: Option<PathBuf>,
    /// Global track section database
    pub tsection_path: Option<PathBuf>,
    /// Index values per line when rendering index lists
    pub values_per_line: usize,
    /// Samples taken from the fitted centerline spline
    pub spline_samples: usize,
    /// Neighbour radius for the distance-along-track graph
    pub max_neighbor_distance: f64,
    /// Trackcenter density when generating from the database
    pub num_points_per_meter: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ffeditc_path: None,
            tsection_path: None,
            values_per_line: 192,
            spline_samples: 1000,
            max_neighbor_distance: 1.0,
            num_points_per_meter: 10.0,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `trackshape.toml` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };

        if let Ok(ffeditc) = std::env::var("TRACKSHAPE_FFEDITC") {
            config.ffeditc_path = Some(PathBuf::from(ffeditc));
        }

        if let Ok(tsection) = std::env::var("TRACKSHAPE_TSECTION") {
            config.tsection_path = Some(PathBuf::from(tsection));
        }

        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("values_per_line = 99\n").unwrap();
        assert_eq!(config.values_per_line, 99);
        assert_eq!(config.spline_samples, 1000);
        assert!(config.ffeditc_path.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trackshape.toml");
        let config = Config {
            tsection_path: Some(PathBuf::from("global/tsection.dat")),
            num_points_per_meter: 12.0,
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }
}
