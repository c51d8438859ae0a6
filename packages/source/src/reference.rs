//! Coded-value lookup tables.
//!
//! Feeder zones are identified by numeric or text codes; their display
//! names live in a separate `{"codedValues": [{"code", "name"}]}` export.
//! The lookup is an explicit value handed to whoever needs it.

use std::collections::BTreeMap;
use std::path::Path;

use parish_map_geometry::{Feature, FeatureCollection};
use serde::Deserialize;
use serde_json::Value;

use crate::SourceError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodedValues {
    coded_values: Vec<CodedValue>,
}

#[derive(Debug, Deserialize)]
struct CodedValue {
    code: Value,
    name: String,
}

/// Renders a code as a lookup key: strings as-is, numbers formatted.
fn code_key(code: &Value) -> Option<String> {
    match code {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Feeder code → display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceData {
    feeders: BTreeMap<String, String>,
}

impl ReferenceData {
    /// Parses a coded-values JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Json`] if the document does not have the
    /// `codedValues` shape.
    pub fn from_json(text: &str) -> Result<Self, SourceError> {
        let parsed: CodedValues = serde_json::from_str(text)?;
        let feeders = parsed
            .coded_values
            .into_iter()
            .filter_map(|cv| code_key(&cv.code).map(|code| (code, cv.name)))
            .collect();
        Ok(Self { feeders })
    }

    /// Reads a coded-values JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let data = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded {} feeder names from {}", data.len(), path.display());
        Ok(data)
    }

    /// Number of known codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.feeders.len()
    }

    /// Whether no code is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.feeders.is_empty()
    }

    /// Display name for `code`, if known.
    #[must_use]
    pub fn feeder_name(&self, code: &Value) -> Option<&str> {
        self.feeders.get(&code_key(code)?).map(String::as_str)
    }

    /// Display name for `code`, falling back to the code itself.
    #[must_use]
    pub fn name_or_code(&self, code: &Value) -> Value {
        self.feeder_name(code)
            .map_or_else(|| code.clone(), Value::from)
    }

    /// Copies every feature, adding `name_attribute` resolved from the
    /// code in `code_attribute`.
    #[must_use]
    pub fn annotate(
        &self,
        collection: &FeatureCollection,
        code_attribute: &str,
        name_attribute: &str,
    ) -> FeatureCollection {
        let features: Vec<Feature> = collection
            .iter()
            .map(|f| {
                let code = f.attribute(code_attribute).cloned().unwrap_or(Value::Null);
                f.clone().with_attribute(name_attribute, self.name_or_code(&code))
            })
            .collect();

        FeatureCollection {
            crs: collection.crs,
            features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;
    use parish_map_geometry::Crs;

    const FEEDERS: &str = r#"{
        "codedValues": [
            {"code": 101, "name": "Alimentador Norte"},
            {"code": "A7", "name": "Alimentador Sur"}
        ]
    }"#;

    #[test]
    fn resolves_numeric_and_text_codes() {
        let data = ReferenceData::from_json(FEEDERS).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.feeder_name(&Value::from(101)), Some("Alimentador Norte"));
        assert_eq!(data.feeder_name(&Value::from("101")), Some("Alimentador Norte"));
        assert_eq!(data.feeder_name(&Value::from("A7")), Some("Alimentador Sur"));
        assert_eq!(data.feeder_name(&Value::from(5)), None);
    }

    #[test]
    fn unknown_codes_fall_back_to_the_code() {
        let data = ReferenceData::from_json(FEEDERS).unwrap();
        assert_eq!(data.name_or_code(&Value::from(5)), Value::from(5));
    }

    #[test]
    fn annotates_features() {
        let data = ReferenceData::from_json(FEEDERS).unwrap();
        let collection = FeatureCollection::new(
            Crs::Wgs84,
            vec![
                Feature::from_geometry(point! { x: 0.0, y: 0.0 }).with_attribute("alimentadorid", 101),
                Feature::from_geometry(point! { x: 0.0, y: 0.0 }),
            ],
        );
        let annotated = data.annotate(&collection, "alimentadorid", "nombre");
        assert_eq!(
            annotated.features[0].attribute_text("nombre").as_deref(),
            Some("Alimentador Norte")
        );
        assert_eq!(annotated.features[1].attribute("nombre"), Some(&Value::Null));
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(ReferenceData::from_json(r#"{"values": []}"#).is_err());
    }
}
