//! Turning heterogeneous layers into one point layer.
//!
//! Transit stations arrive as polygons while stops and geocoded records
//! are points. Density counting needs a single point per feature, all in
//! one CRS.

use geo::{Centroid, Geometry};
use parish_map_geometry_models::{Crs, Feature, FeatureCollection};

use crate::GeometryError;
use crate::projection::reproject;

/// Reduces every feature to a single point.
///
/// Points are kept as-is; any other geometry is replaced by its centroid,
/// computed in `projected_crs` so the result is not skewed by degree
/// distortion. The returned collection is in the input's CRS. Features
/// whose centroid is undefined (empty geometries) are dropped.
///
/// # Errors
///
/// Returns [`GeometryError::UnknownCrs`] if `collection` has no CRS.
pub fn reduce_to_points(
    collection: &FeatureCollection,
    projected_crs: Crs,
) -> Result<FeatureCollection, GeometryError> {
    let source = collection.crs.ok_or(GeometryError::UnknownCrs)?;

    if collection
        .iter()
        .all(|f| matches!(f.geometry, Geometry::Point(_)))
    {
        return Ok(collection.clone());
    }

    let projected = reproject(collection, projected_crs)?;

    let features: Vec<Feature> = projected
        .features
        .into_iter()
        .filter_map(|f| {
            let point = match f.geometry {
                Geometry::Point(p) => p,
                ref other => other.centroid()?,
            };
            Some(Feature::new(point, f.attributes))
        })
        .collect();

    let dropped = collection.len() - features.len();
    if dropped > 0 {
        log::warn!("Dropped {dropped} features with no centroid");
    }

    reproject(&FeatureCollection::new(projected_crs, features), source)
}

/// Concatenates several collections into one, reprojecting each into
/// `target` first.
///
/// # Errors
///
/// Returns [`GeometryError::UnknownCrs`] if any input has no CRS.
pub fn merge_collections(
    collections: &[&FeatureCollection],
    target: Crs,
) -> Result<FeatureCollection, GeometryError> {
    let mut features = Vec::with_capacity(collections.iter().map(|c| c.len()).sum());

    for collection in collections {
        features.extend(reproject(collection, target)?.features);
    }

    Ok(FeatureCollection::new(target, features))
}
