//! Parish population table.

use std::collections::BTreeMap;

use parish_map_geometry::FeatureCollection;
use parish_map_source::PopulationRow;
use parish_map_source::parsing::parse_thousands;

use crate::{join_numeric, normalize_key};

/// Population by normalized parish name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationTable {
    by_parish: BTreeMap<String, f64>,
}

impl PopulationTable {
    /// Builds the table from raw rows. Rows whose population cannot be
    /// parsed are dropped; a repeated parish keeps its last value.
    #[must_use]
    pub fn from_rows(rows: &[PopulationRow]) -> Self {
        let mut by_parish = BTreeMap::new();
        for row in rows {
            let Some(population) = parse_thousands(&row.population) else {
                log::debug!(
                    "Dropping population row for {}: unparseable value {:?}",
                    row.parish,
                    row.population
                );
                continue;
            };
            by_parish.insert(normalize_key(&row.parish), population);
        }
        Self { by_parish }
    }

    /// Population of `parish`, if listed.
    #[must_use]
    pub fn get(&self, parish: &str) -> Option<f64> {
        self.by_parish.get(&normalize_key(parish)).copied()
    }

    /// Number of parishes listed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_parish.len()
    }

    /// Whether no parish is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_parish.is_empty()
    }

    /// Adds `field` to every parish; unlisted parishes get 0.
    #[must_use]
    pub fn join_onto(
        &self,
        parishes: &FeatureCollection,
        name_key: &str,
        field: &str,
    ) -> FeatureCollection {
        join_numeric(parishes, name_key, &self.by_parish, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Rect, coord};
    use parish_map_geometry::{Crs, Feature};
    use serde_json::Value;

    fn row(parish: &str, population: &str) -> PopulationRow {
        PopulationRow {
            parish: parish.to_string(),
            population: population.to_string(),
        }
    }

    #[test]
    fn parses_separated_numbers_and_normalizes_names() {
        let table = PopulationTable::from_rows(&[
            row(" La Mariscal", "12,345"),
            row("Iñaquito", "n/d"),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("LA MARISCAL"), Some(12_345.0));
        assert_eq!(table.get("la mariscal "), Some(12_345.0));
        assert_eq!(table.get("Iñaquito"), None);
    }

    #[test]
    fn missing_parish_joins_as_zero() {
        let parishes = FeatureCollection::new(
            Crs::Wgs84,
            ["CENTRO", "LA MARISCAL"]
                .into_iter()
                .map(|name| {
                    Feature::from_geometry(
                        Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 })
                            .to_polygon(),
                    )
                    .with_attribute("nombre", name)
                })
                .collect(),
        );
        let table = PopulationTable::from_rows(&[row("La Mariscal", "12,345")]);
        let joined = table.join_onto(&parishes, "nombre", "Poblacion");

        let centro = &joined.features[0];
        assert_eq!(centro.attribute_text("nombre").as_deref(), Some("CENTRO"));
        assert_eq!(centro.attribute("Poblacion").and_then(Value::as_f64), Some(0.0));
        assert_eq!(
            joined.features[1].attribute("Poblacion").and_then(Value::as_f64),
            Some(12_345.0)
        );
    }
}
