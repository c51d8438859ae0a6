//! Left joins from region attributes to keyed tables.

use std::collections::BTreeMap;

use parish_map_geometry::{Feature, FeatureCollection};
use serde_json::Value;

use crate::normalize_key;

/// Re-keys `table` by normalized key. When two keys normalize alike the
/// first in key order is kept.
fn normalized<V>(table: &BTreeMap<String, V>) -> BTreeMap<String, &V> {
    let mut lookup = BTreeMap::new();
    for (key, value) in table {
        let normalized = normalize_key(key);
        if lookup.contains_key(&normalized) {
            log::warn!("Ignoring {key:?}: another entry already normalizes to {normalized:?}");
            continue;
        }
        lookup.insert(normalized, value);
    }
    lookup
}

fn left_join<V>(
    regions: &FeatureCollection,
    region_key: &str,
    table: &BTreeMap<String, V>,
    field: &str,
    to_value: impl Fn(Option<&V>) -> Value,
) -> FeatureCollection {
    let lookup = normalized(table);
    let mut misses = 0usize;

    let features: Vec<Feature> = regions
        .iter()
        .map(|f| {
            let hit = f
                .attribute_text(region_key)
                .and_then(|k| lookup.get(&normalize_key(&k)).copied());
            if hit.is_none() {
                misses += 1;
            }
            f.clone().with_attribute(field, to_value(hit))
        })
        .collect();

    log::debug!(
        "Joined {field} onto {} regions by {region_key}: {misses} without a match",
        features.len()
    );

    FeatureCollection {
        crs: regions.crs,
        features,
    }
}

/// Adds `field` to every region from `table`, matched on the normalized
/// text of `region_key`. Regions without a match get 0.
#[must_use]
pub fn join_numeric(
    regions: &FeatureCollection,
    region_key: &str,
    table: &BTreeMap<String, f64>,
    field: &str,
) -> FeatureCollection {
    left_join(regions, region_key, table, field, |hit| {
        Value::from(hit.copied().unwrap_or(0.0))
    })
}

/// Adds a list attribute `field` to every feature from `table`, matched
/// on the normalized text of `key`. Features without a match get `[]`.
#[must_use]
pub fn join_lists(
    features: &FeatureCollection,
    key: &str,
    table: &BTreeMap<String, Vec<String>>,
    field: &str,
) -> FeatureCollection {
    left_join(features, key, table, field, |hit| {
        Value::from(hit.cloned().unwrap_or_default())
    })
}
