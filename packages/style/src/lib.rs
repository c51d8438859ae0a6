#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Presentation data for map layers.
//!
//! Nothing here draws anything. The registry maps a layer category to a
//! style descriptor the renderer applies, and the color scales turn
//! density counts and population values into fill colors.

pub mod color;
pub mod registry;
pub mod scale;

pub use color::Rgb;
pub use registry::{LayerKind, StyleDescriptor, StyleRegistry, all_styles, category_key};
pub use scale::{
    BandedScale, ColorScale, POPULATION_GRADIENTS, TERTILE_GRADIENTS, categorical_color,
};

use thiserror::Error;

/// Errors that can occur while handling style values.
#[derive(Debug, Error)]
pub enum StyleError {
    /// A color string is not `#rgb` or `#rrggbb` hex.
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}
