#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Adaptive density grids.
//!
//! A grid is sized from the regions it will be compared against: the cell
//! side is the square root of the median region area, so a typical cell
//! covers about one typical region. Cells can then be clipped against the
//! regions to produce per-region grid fragments.

pub mod builder;
pub mod fragments;

pub use builder::{EdgePolicy, Grid, GridOptions, build_grid};
pub use fragments::{FragmentOptions, Fragments, GridFragment, intersect_grid};

use parish_map_geometry::GeometryError;
use thiserror::Error;

/// Errors that can occur while building or clipping a grid.
#[derive(Debug, Error)]
pub enum GridError {
    /// Reprojection or area computation failed.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// The reference regions cannot size a grid.
    #[error("Degenerate grid input: {message}")]
    DegenerateInput {
        /// Description of what went wrong.
        message: String,
    },
}
