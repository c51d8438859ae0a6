//! Amenity layers of the students map.
//!
//! Parks, plazas and cultural spaces are split into one layer per type,
//! named `<family>_<type>` so each type can carry its own style while
//! unknown types fall back to the family style.

use std::collections::BTreeMap;

use parish_map_geometry::{FeatureCollection, reduce_to_points};
use parish_map_source::{School, to_points};
use parish_map_style::category_key;

use crate::engine::FILL_FIELD;
use crate::maps::{MapOutput, layer};
use crate::{InputSource, PipelineConfig, PipelineError};

/// Name given to amenities without one.
pub const UNNAMED: &str = "Sin nombre";

/// Type given to amenities without one.
pub const UNCATEGORIZED: &str = "Desconocido";

/// Fills alternated across school types, in type order.
pub const SCHOOL_TYPE_COLORS: [&str; 2] = ["#ffa500", "#5f9ea0"];

/// Attribute holding a school's type.
const SCHOOL_TYPE_FIELD: &str = "tipo";

/// Writes `fallback` into `field` wherever it is missing, null or blank.
#[must_use]
pub fn fill_missing(
    collection: &FeatureCollection,
    field: &str,
    fallback: &str,
) -> FeatureCollection {
    let features = collection
        .iter()
        .map(|f| {
            let present = f.attribute_text(field).is_some_and(|v| !v.trim().is_empty());
            if present {
                f.clone()
            } else {
                f.clone().with_attribute(field, fallback)
            }
        })
        .collect();

    FeatureCollection {
        crs: collection.crs,
        features,
    }
}

/// Groups features by the text of `field` into layers named after
/// [`category_key`] of `family` and the value. Features without a value
/// go to the [`UNCATEGORIZED`] layer. Layers come back sorted by name.
#[must_use]
pub fn split_by_category(
    collection: &FeatureCollection,
    field: &str,
    family: &str,
) -> BTreeMap<String, FeatureCollection> {
    let mut layers: BTreeMap<String, FeatureCollection> = BTreeMap::new();

    for feature in collection.iter() {
        let value = feature
            .attribute_text(field)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        layers
            .entry(category_key(family, &value))
            .or_insert_with(|| FeatureCollection {
                crs: collection.crs,
                features: Vec::new(),
            })
            .features
            .push(feature.clone());
    }

    layers
}

fn labelled(collection: &FeatureCollection, name: &str, category: &str) -> FeatureCollection {
    fill_missing(&fill_missing(collection, name, UNNAMED), category, UNCATEGORIZED)
}

fn insert_all(output: &mut MapOutput, layers: BTreeMap<String, FeatureCollection>) {
    for (name, collection) in layers {
        output.insert(&name, collection);
    }
}

/// Adds parks, plazas, cultural spaces and shopping centres.
///
/// Polygon layers also get a layer of their centroids, computed in the
/// projected CRS. Cultural spaces are drawn as points only; any other
/// geometry is dropped.
///
/// # Errors
///
/// Returns [`PipelineError`] if a layer cannot be loaded or has no CRS.
pub(crate) fn add_amenities(
    output: &mut MapOutput,
    inputs: &impl InputSource,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    let fields = &config.amenity_fields;
    let projected = config.projected_crs;

    let parks = labelled(&inputs.parks()?, &fields.park_name, &fields.park_category);
    output.insert(layer::PARK_CENTROIDS, reduce_to_points(&parks, projected)?);
    insert_all(
        output,
        split_by_category(&parks, &fields.park_category, layer::PARKS),
    );

    let plazas = labelled(&inputs.plazas()?, &fields.plaza_name, &fields.plaza_category);
    output.insert(layer::PLAZA_CENTROIDS, reduce_to_points(&plazas, projected)?);
    insert_all(
        output,
        split_by_category(&plazas, &fields.plaza_category, layer::PLAZAS),
    );

    let cultural = inputs.cultural_spaces()?;
    let points = cultural.filtered(|f| f.as_point().is_some());
    if points.len() < cultural.len() {
        log::warn!(
            "Dropped {} cultural spaces that are not points",
            cultural.len() - points.len()
        );
    }
    let points = labelled(&points, &fields.cultural_name, &fields.cultural_category);
    insert_all(
        output,
        split_by_category(&points, &fields.cultural_category, layer::CULTURAL_SPACES),
    );

    let shopping = fill_missing(&inputs.shopping_centres()?, &fields.shopping_name, UNNAMED);
    output.insert(
        layer::SHOPPING_CENTRE_CENTROIDS,
        reduce_to_points(&shopping, projected)?,
    );
    output.insert(layer::SHOPPING_CENTRES, shopping);

    log::info!(
        "Amenities: {} parks, {} plazas, {} cultural spaces",
        parks.len(),
        plazas.len(),
        points.len()
    );
    Ok(())
}

/// Adds one layer per school type, filled with [`SCHOOL_TYPE_COLORS`] in
/// turn.
pub(crate) fn add_schools_by_type(output: &mut MapOutput, schools: &[School]) {
    let points = to_points(schools);
    let layers = split_by_category(&points, SCHOOL_TYPE_FIELD, layer::SCHOOLS_BY_TYPE);
    let colors = SCHOOL_TYPE_COLORS.iter().cycle();

    for ((name, collection), color) in layers.into_iter().zip(colors) {
        let features = collection
            .features
            .into_iter()
            .map(|f| f.with_attribute(FILL_FIELD, *color))
            .collect();
        output.insert(
            &name,
            FeatureCollection {
                crs: collection.crs,
                features,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;
    use parish_map_geometry::{Crs, Feature};
    use serde_json::{Value, json};

    fn places(values: &[Option<Value>]) -> FeatureCollection {
        FeatureCollection::new(
            Crs::Wgs84,
            values
                .iter()
                .map(|value| {
                    let feature = Feature::from_geometry(point! { x: -78.5, y: -0.2 });
                    match value {
                        Some(v) => feature.with_attribute("tipo", v.clone()),
                        None => feature,
                    }
                })
                .collect(),
        )
    }

    #[test]
    fn fills_missing_and_blank_values() {
        let filled = fill_missing(
            &places(&[Some(json!("Plaza")), None, Some(Value::Null), Some(json!("  "))]),
            "tipo",
            UNCATEGORIZED,
        );
        let values: Vec<String> = filled
            .iter()
            .filter_map(|f| f.attribute_text("tipo"))
            .collect();
        assert_eq!(values, vec!["Plaza", "Desconocido", "Desconocido", "Desconocido"]);
        assert_eq!(filled.crs, Some(Crs::Wgs84));
    }

    #[test]
    fn splits_into_sorted_family_layers() {
        let layers = split_by_category(
            &places(&[
                Some(json!("Zonal")),
                Some(json!("Barrial")),
                None,
                Some(json!("Menor a 300 m2")),
                Some(json!("barrial")),
            ]),
            "tipo",
            "parques",
        );

        let names: Vec<&str> = layers.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "parques_barrial",
                "parques_desconocido",
                "parques_menor_a_300_m2",
                "parques_zonal",
            ]
        );
        assert_eq!(layers["parques_barrial"].len(), 2);
        assert!(layers.values().all(|l| l.crs == Some(Crs::Wgs84)));
    }

    #[test]
    fn empty_layer_splits_into_nothing() {
        assert!(split_by_category(&places(&[]), "tipo", "plazas").is_empty());
    }
}
