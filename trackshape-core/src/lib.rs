/// Trackshape Core Library - MSTS track shape editing and centerline geometry
///
/// This library parses text shape files into indexed collections, edits
/// their triangle lists while keeping every cross-reference consistent, and
/// generates and queries track centerlines for moving shape geometry
/// relative to the track.

pub mod block;
pub mod config;
pub mod error;
pub mod file;
pub mod geometry;
pub mod lexer;
pub mod projection;
pub mod retarget;
pub mod shape;
pub mod shapefile;
pub mod trackcenter;
pub mod transform;
pub mod tsection;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use file::{find_directory_files, load_file, Encoding, TextFile};
pub use geometry::{IndexedTrilist, Normal, Point, PrimState, UVPoint, Vertex};
pub use projection::Plane;
pub use retarget::{reposition_along_track, retarget_prim_state, LateralRule};
pub use shape::Shape;
pub use shapefile::{load_shape, CompressionState, ShapeFile};
pub use trackcenter::Trackcenter;
pub use transform::{Placement, Transform};
pub use tsection::TrackSectionDatabase;
