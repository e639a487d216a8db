use std::path::PathBuf;

use thiserror::Error;

/// Result type for shape and trackcenter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, editing or measuring track shapes
#[derive(Error, Debug)]
pub enum Error {
    /// A line does not match the grammar expected in its context.
    #[error("Malformed document at line {line}: {message}")]
    MalformedDocument {
        /// Line number (1-indexed).
        line: usize,
        message: String,
    },

    #[error("No {kind} with index {index}")]
    IndexNotFound { kind: &'static str, index: usize },

    #[error("Cannot access lines while the shape file is compressed, decompress it first")]
    AccessDeniedWhileCompressed,

    #[error("Invalid plane '{0}'")]
    InvalidPlane(String),

    /// Vertices or trilists handed to one operation live in different
    /// LOD levels or sub-objects.
    #[error("Cross scope mismatch: {0}")]
    CrossScopeMismatch(String),

    #[error("Track shape '{0}' not found in track section database")]
    UnknownTrackShape(String),

    #[error("Invalid track section database: {0}")]
    InvalidTrackDatabase(String),

    #[error("Trackcenter has no points")]
    EmptyTrackcenter,

    #[error("Trackcenter needs at least two distinct points")]
    DegenerateTrackcenter,

    #[error("Wrong file kind: {0}")]
    WrongFileKind(String),

    #[error("External tool {tool:?} failed on {file:?} (exit status {status:?})")]
    ExternalTool {
        tool: PathBuf,
        file: PathBuf,
        status: Option<i32>,
    },

    #[error("Unsupported text encoding: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            line,
            message: message.into(),
        }
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::CrossScopeMismatch(message.into())
    }
}
