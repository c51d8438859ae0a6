#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map use cases built on the adaptive density grid.
//!
//! Every map follows the same shape: load the inputs it needs, build a
//! grid sized from a reference polygon layer, join a merged point layer
//! into it, and color the resulting counts. [`engine::DensityEngine`] is
//! that shared core; [`maps`] wires it to the five concrete maps and
//! [`output`] writes their layers to disk.

pub mod amenities;
pub mod config;
pub mod engine;
pub mod inputs;
pub mod maps;
pub mod output;

pub use config::PipelineConfig;
pub use engine::{DensityEngine, DensityGrid, count_points, points_within};
pub use inputs::{DataDir, InputSource};
pub use maps::{MapKind, MapOutput, MapRequest, available_periods, run_map};
pub use output::write_map;

use parish_map_geometry::GeometryError;
use parish_map_grid::GridError;
use parish_map_source::SourceError;
use parish_map_spatial::SpatialError;
use thiserror::Error;

/// Errors that can occur while running a map.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reprojection or geometry IO failed.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Grid construction or clipping failed.
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// A spatial join failed.
    #[error("Spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// An input file could not be loaded.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The configuration is invalid.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Output could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The student data lists no academic period.
    #[error("No academic periods found in student data")]
    NoPeriods,
}
