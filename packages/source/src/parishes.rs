//! Parish boundary layers.
//!
//! Rural and urban parishes come as two `GeoJSON` files whose name columns
//! differ only in case. They are merged into one WGS84 region collection
//! with a common `nombre` field and a `tipo` tag.

use std::path::Path;

use parish_map_geometry::io::read_feature_collection;
use parish_map_geometry::{Crs, Feature, FeatureCollection, reproject};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::SourceError;

/// Whether a parish is rural or urban.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParishKind {
    /// Rural parish.
    Rural,
    /// Urban parish.
    Urbana,
}

/// Attribute names used when merging parish layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParishFields {
    /// Name attribute in the rural layer.
    pub rural_name: String,
    /// Name attribute in the urban layer.
    pub urban_name: String,
    /// Name attribute in the merged collection.
    pub name: String,
    /// Kind attribute in the merged collection.
    pub kind: String,
}

impl Default for ParishFields {
    fn default() -> Self {
        Self {
            rural_name: "DPA_DESPAR".to_string(),
            urban_name: "dpa_despar".to_string(),
            name: "nombre".to_string(),
            kind: "tipo".to_string(),
        }
    }
}

fn relabel(
    layer: &FeatureCollection,
    source_field: &str,
    kind: ParishKind,
    fields: &ParishFields,
) -> Result<Vec<Feature>, SourceError> {
    // Boundary files without a CRS member are plain RFC 7946 WGS84.
    let layer = match layer.crs {
        Some(_) => reproject(layer, Crs::Wgs84)?,
        None => layer.clone().with_crs(Crs::Wgs84),
    };

    let mut unnamed = 0usize;
    let features = layer
        .features
        .into_iter()
        .filter(Feature::is_polygonal)
        .map(|f| {
            let name = f.attribute(source_field).cloned().unwrap_or_else(|| {
                unnamed += 1;
                Value::Null
            });
            Feature::from_geometry(f.geometry)
                .with_attribute(&fields.name, name)
                .with_attribute(&fields.kind, kind.to_string())
        })
        .collect();

    if unnamed > 0 {
        log::warn!("{unnamed} {kind} parishes have no {source_field} attribute");
    }

    Ok(features)
}

/// Merges the rural and urban parish layers into one WGS84 collection.
///
/// Every output feature has exactly two attributes: the parish name
/// (renamed to `fields.name`) and its kind under `fields.kind`. Rural
/// parishes come first. Non-polygonal features are dropped.
///
/// # Errors
///
/// Returns [`SourceError::Geometry`] if a layer cannot be reprojected.
pub fn merge_parishes(
    rural: &FeatureCollection,
    urban: &FeatureCollection,
    fields: &ParishFields,
) -> Result<FeatureCollection, SourceError> {
    let mut features = relabel(rural, &fields.rural_name, ParishKind::Rural, fields)?;
    let rural_count = features.len();
    features.extend(relabel(urban, &fields.urban_name, ParishKind::Urbana, fields)?);

    log::info!(
        "Merged {rural_count} rural and {} urban parishes",
        features.len() - rural_count
    );

    Ok(FeatureCollection::new(Crs::Wgs84, features))
}

/// Reads both parish files and merges them.
///
/// # Errors
///
/// Returns [`SourceError`] if either file cannot be read.
pub fn load_parishes(
    rural_path: &Path,
    urban_path: &Path,
    fields: &ParishFields,
) -> Result<FeatureCollection, SourceError> {
    let rural = read_feature_collection(rural_path, None)?;
    let urban = read_feature_collection(urban_path, None)?;
    merge_parishes(&rural, &urban, fields)
}
