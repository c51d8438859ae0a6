#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry utilities for the parish density pipeline.
//!
//! Reprojects feature collections between WGS84 degrees and UTM meters,
//! reads and writes `GeoJSON`, reduces polygon layers to point layers, and
//! computes areas. Area math is only allowed on projected collections;
//! degree-space areas are meaningless and are rejected with
//! [`GeometryError::NotProjected`].

pub mod io;
pub mod projection;
pub mod reduce;

pub use parish_map_geometry_models::{
    Attributes, Crs, Feature, FeatureCollection, InvalidCrsError,
};
pub use projection::{reproject, transform_coord, transform_geometry, transform_point};
pub use reduce::{merge_collections, reduce_to_points};

use geo::Area;
use thiserror::Error;

/// Errors that can occur during geometry operations.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// A collection without CRS metadata was reprojected.
    #[error("Unknown CRS: collection has no CRS assigned")]
    UnknownCrs,

    /// A CRS name or code is not supported.
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(#[from] InvalidCrsError),

    /// Area math was requested on a collection that is not in meters.
    #[error("Area requires a projected CRS, collection is in {crs}")]
    NotProjected {
        /// The offending CRS, formatted for display.
        crs: String,
    },

    /// File could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returns the unsigned area of every feature, in square meters.
///
/// Non-polygonal geometries have zero area.
///
/// # Errors
///
/// Returns [`GeometryError::UnknownCrs`] if the collection has no CRS, or
/// [`GeometryError::NotProjected`] if its CRS is geographic.
pub fn projected_areas(collection: &FeatureCollection) -> Result<Vec<f64>, GeometryError> {
    let crs = collection.crs.ok_or(GeometryError::UnknownCrs)?;
    if !crs.is_projected() {
        return Err(GeometryError::NotProjected {
            crs: crs.to_string(),
        });
    }

    Ok(collection
        .iter()
        .map(|f| f.geometry.unsigned_area())
        .collect())
}
