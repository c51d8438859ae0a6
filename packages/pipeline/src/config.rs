//! Pipeline configuration.
//!
//! Defaults are embedded from `config/default.toml`. A user file is
//! merged over them table by table, so it only needs the keys it changes.

use std::path::{Path, PathBuf};

use parish_map_catalog::PeriodRules;
use parish_map_geometry::Crs;
use parish_map_grid::{EdgePolicy, FragmentOptions, GridOptions};
use parish_map_source::ParishFields;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Grid layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSettings {
    /// Treatment of cells crossing the far edge of the bounding box.
    pub edge_policy: EdgePolicy,
}

/// Fragment filtering settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FragmentSettings {
    /// Fragments at or below this area (m²) are slivers.
    pub min_area_m2: f64,
    /// Require each fragment's representative point to lie inside it.
    pub resolve_representative_points: bool,
}

impl FragmentSettings {
    /// Fragment options keyed on `key_attribute`.
    #[must_use]
    pub fn options(&self, key_attribute: &str) -> FragmentOptions {
        FragmentOptions {
            key_attribute: key_attribute.to_string(),
            min_area_m2: self.min_area_m2,
            resolve_representative_points: self.resolve_representative_points,
        }
    }
}

/// Attribute names of the feeder layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeederFields {
    /// Feeder code attribute.
    pub code: String,
    /// Attribute the resolved feeder name is written to.
    pub name: String,
}

/// Attribute names of the amenity layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmenityFields {
    /// Park type attribute.
    pub park_category: String,
    /// Park name attribute.
    pub park_name: String,
    /// Plaza type attribute.
    pub plaza_category: String,
    /// Plaza name attribute.
    pub plaza_name: String,
    /// Cultural space type attribute.
    pub cultural_category: String,
    /// Cultural space name attribute.
    pub cultural_name: String,
    /// Shopping centre name attribute.
    pub shopping_name: String,
}

/// University drawn apart from the rest on the students map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversitySettings {
    /// Name of the highlighted university, compared normalized.
    pub highlighted: String,
    /// Fill color of the highlighted university.
    pub highlight_color: String,
}

/// Input file names, relative to the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFiles {
    /// Student locations (`;`-delimited CSV).
    pub students: PathBuf,
    /// University campuses (CSV).
    pub universities: PathBuf,
    /// Schools (CSV).
    pub schools: PathBuf,
    /// Business locations (CSV).
    pub businesses: PathBuf,
    /// Population by parish (CSV).
    pub population: PathBuf,
    /// Career offerings (CSV).
    pub careers: PathBuf,
    /// Rural parish boundaries (`GeoJSON`).
    pub rural_parishes: PathBuf,
    /// Urban parish boundaries (`GeoJSON`).
    pub urban_parishes: PathBuf,
    /// Bus stations (`GeoJSON`, polygons or points).
    pub bus_stations: PathBuf,
    /// Metro stations (`GeoJSON`, polygons or points).
    pub metro_stations: PathBuf,
    /// Bus stops (`GeoJSON` points).
    pub bus_stops: PathBuf,
    /// Feeder zones (`GeoJSON`).
    pub feeders: PathBuf,
    /// Feeder code → name table (JSON).
    pub feeder_names: PathBuf,
    /// Parks (`GeoJSON` polygons).
    pub parks: PathBuf,
    /// Plazas (`GeoJSON` polygons).
    pub plazas: PathBuf,
    /// Cultural spaces (`GeoJSON` points).
    pub cultural_spaces: PathBuf,
    /// Shopping centres (`GeoJSON` polygons).
    pub shopping_centres: PathBuf,
}

/// Everything the pipeline can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// CRS outputs are written in.
    pub geographic_crs: Crs,
    /// Metric CRS for areas and grid layout.
    pub projected_crs: Crs,
    /// School category counted on the schools map.
    pub school_category: String,
    /// Grid layout.
    pub grid: GridSettings,
    /// Fragment filtering.
    pub fragments: FragmentSettings,
    /// Period → baseline rules for career catalogs.
    pub periods: PeriodRules,
    /// Parish layer attribute names.
    pub parish_fields: ParishFields,
    /// Feeder layer attribute names.
    pub feeder_fields: FeederFields,
    /// Amenity layer attribute names.
    pub amenity_fields: AmenityFields,
    /// University highlight on the students map.
    pub universities: UniversitySettings,
    /// Input file names.
    pub files: DataFiles,
}

/// Recursively overlays `overlay` onto `base`.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

impl PipelineConfig {
    /// The built-in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the embedded defaults do not
    /// parse.
    pub fn embedded() -> Result<Self, PipelineError> {
        Ok(toml::de::from_str(DEFAULT_CONFIG)?)
    }

    /// The built-in configuration with `overrides` (TOML text) merged
    /// over it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if either document does not parse
    /// or the merged result is invalid.
    pub fn with_overrides(overrides: &str) -> Result<Self, PipelineError> {
        let mut base: toml::Table = DEFAULT_CONFIG.parse()?;
        let overlay: toml::Table = overrides.parse()?;
        merge_tables(&mut base, overlay);
        Ok(toml::Value::Table(base).try_into()?)
    }

    /// Loads the configuration, applying the file at `path` if given.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let Some(path) = path else {
            return Self::embedded();
        };
        let text = std::fs::read_to_string(path)?;
        let config = Self::with_overrides(&text)?;
        log::info!("Loaded configuration overrides from {}", path.display());
        Ok(config)
    }

    /// Grid options for the configured CRS and edge policy.
    #[must_use]
    pub const fn grid_options(&self) -> GridOptions {
        GridOptions {
            projected_crs: self.projected_crs,
            edge_policy: self.grid.edge_policy,
        }
    }
}
