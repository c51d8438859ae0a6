//! `GeoJSON` reading and writing.
//!
//! RFC 7946 `GeoJSON` is always WGS84, but older exports still carry a
//! `crs` member naming a projected CRS. When present it wins; otherwise
//! the caller's default CRS is assigned (or none, in which case any later
//! reprojection fails with [`GeometryError::UnknownCrs`]).

use std::path::Path;

use geojson::{GeoJson, JsonObject};
use parish_map_geometry_models::{Attributes, Crs, Feature, FeatureCollection};

use crate::GeometryError;

/// Reads a `GeoJSON` file into a [`FeatureCollection`].
///
/// # Errors
///
/// Returns [`GeometryError`] if the file cannot be read, is not valid
/// `GeoJSON`, or names an unsupported CRS.
pub fn read_feature_collection(
    path: &Path,
    default_crs: Option<Crs>,
) -> Result<FeatureCollection, GeometryError> {
    let text = std::fs::read_to_string(path)?;
    let collection = parse_feature_collection(&text, default_crs)?;
    log::info!(
        "Loaded {} features from {}",
        collection.len(),
        path.display()
    );
    Ok(collection)
}

/// Parses `GeoJSON` text into a [`FeatureCollection`].
///
/// Accepts a `FeatureCollection`, a single `Feature`, or a bare geometry.
/// Features with a null geometry, or a geometry that cannot be converted,
/// are skipped.
///
/// # Errors
///
/// Returns [`GeometryError`] if the text is not valid `GeoJSON` or names an
/// unsupported CRS.
pub fn parse_feature_collection(
    text: &str,
    default_crs: Option<Crs>,
) -> Result<FeatureCollection, GeometryError> {
    let geojson: GeoJson = text.parse()?;

    let (raw_features, foreign_members) = match geojson {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(f) => (vec![f], None),
        GeoJson::Geometry(g) => (vec![geojson::Feature::from(g)], None),
    };

    let crs = match foreign_members.as_ref().and_then(declared_crs_name) {
        Some(name) => Some(name.parse::<Crs>()?),
        None => default_crs,
    };

    let mut features = Vec::with_capacity(raw_features.len());
    let mut skipped = 0usize;

    for raw in raw_features {
        let Some(geometry) = raw.geometry else {
            skipped += 1;
            continue;
        };

        match geo::Geometry::<f64>::try_from(geometry) {
            Ok(geometry) => features.push(Feature::new(
                geometry,
                raw.properties.unwrap_or_default(),
            )),
            Err(e) => {
                log::debug!("Skipping feature with unconvertible geometry: {e}");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} features without a usable geometry");
    }

    Ok(FeatureCollection { crs, features })
}

/// Extracts `crs.properties.name` from a collection's foreign members.
fn declared_crs_name(members: &JsonObject) -> Option<&str> {
    members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
}

/// Converts a collection into a `GeoJSON` `FeatureCollection`.
///
/// Non-WGS84 collections get a legacy `crs` member so they read back with
/// the same CRS.
#[must_use]
pub fn to_geojson(collection: &FeatureCollection) -> geojson::FeatureCollection {
    let features = collection
        .iter()
        .map(|f| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
            id: None,
            properties: Some(f.attributes.clone()),
            foreign_members: None,
        })
        .collect();

    let foreign_members = collection
        .crs
        .filter(|crs| *crs != Crs::Wgs84)
        .map(|crs| {
            let mut members = JsonObject::new();
            members.insert(
                "crs".to_string(),
                serde_json::json!({
                    "type": "name",
                    "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.epsg()) },
                }),
            );
            members
        });

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

/// Writes a collection as a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`GeometryError`] if serialization or the write fails.
pub fn write_feature_collection(
    path: &Path,
    collection: &FeatureCollection,
) -> Result<(), GeometryError> {
    let text = serde_json::to_string(&to_geojson(collection))?;
    std::fs::write(path, text)?;
    log::info!(
        "Wrote {} features to {}",
        collection.len(),
        path.display()
    );
    Ok(())
}

/// Builds an attribute map from `(key, value)` pairs.
#[must_use]
pub fn attributes<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARISHES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "DPA_DESPAR": "CENTRO" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-78.52, -0.23], [-78.50, -0.23], [-78.50, -0.21], [-78.52, -0.21], [-78.52, -0.23]]]
                }
            },
            { "type": "Feature", "properties": { "DPA_DESPAR": "VACIA" }, "geometry": null }
        ]
    }"#;

    #[test]
    fn parses_feature_collection_with_default_crs() {
        let collection = parse_feature_collection(PARISHES, Some(Crs::Wgs84)).unwrap();
        assert_eq!(collection.crs, Some(Crs::Wgs84));
        assert_eq!(collection.len(), 1);
        assert_eq!(
            collection.features[0].attribute_text("DPA_DESPAR").as_deref(),
            Some("CENTRO")
        );
        assert!(collection.features[0].is_polygonal());
    }

    #[test]
    fn leaves_crs_unset_without_default() {
        let collection = parse_feature_collection(PARISHES, None).unwrap();
        assert_eq!(collection.crs, None);
    }

    #[test]
    fn honours_legacy_crs_member() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32717" } },
            "features": [
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [778000.0, 9977000.0] } }
            ]
        }"#;
        let collection = parse_feature_collection(text, Some(Crs::Wgs84)).unwrap();
        assert_eq!(collection.crs, Some(Crs::UTM_17S));
    }

    #[test]
    fn rejects_unsupported_legacy_crs() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:3857" } },
            "features": []
        }"#;
        assert!(matches!(
            parse_feature_collection(text, None),
            Err(GeometryError::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn projected_collections_round_trip_their_crs() {
        let collection = FeatureCollection::new(
            Crs::UTM_17S,
            vec![Feature::from_geometry(geo::point! { x: 778_000.0, y: 9_977_000.0 })
                .with_attribute("count", 3)],
        );
        let text = serde_json::to_string(&to_geojson(&collection)).unwrap();
        let back = parse_feature_collection(&text, Some(Crs::Wgs84)).unwrap();
        assert_eq!(back, collection);
    }

    #[test]
    fn builds_attributes_from_pairs() {
        let attrs = attributes([("nombre", "CENTRO"), ("tipo", "urbana")]);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["tipo"], "urbana");
    }
}
