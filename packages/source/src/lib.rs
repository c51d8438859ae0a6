#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input loaders for the parish density pipeline.
//!
//! Tabular sources (students, universities, schools, businesses,
//! population, careers) are read from CSV exports into typed records.
//! Rows whose coordinates cannot be parsed are dropped, never fatal.
//! Parish boundaries and feeder reference data are read from `GeoJSON` and
//! JSON.

pub mod parishes;
pub mod parsing;
pub mod records;
pub mod reference;
pub mod tabular;

pub use parishes::{ParishFields, ParishKind, load_parishes, merge_parishes};
pub use records::{
    Business, CareerRow, Located, PopulationRow, Record, School, Student, University, load,
    to_points,
};
pub use reference::ReferenceData;

use parish_map_geometry::GeometryError;

/// Errors that can occur while loading input data.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A boundary layer could not be read or reprojected.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// A required column is absent from a table.
    #[error("Missing column {column} in {table}")]
    MissingColumn {
        /// Table (file) being read.
        table: String,
        /// The absent column header.
        column: String,
    },
}
