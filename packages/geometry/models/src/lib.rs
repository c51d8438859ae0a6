#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate reference system, feature, and feature collection types.
//!
//! Every geometric stage of the density pipeline exchanges
//! [`FeatureCollection`] values. A collection owns its CRS tag so that
//! reprojection and area math can refuse input whose CRS is unknown.

use std::fmt;
use std::str::FromStr;

use geo::{BoundingRect, Geometry, Point, Rect, coord};
use serde::{Deserialize, Serialize};

/// Named feature attributes, kept in the same shape as `GeoJSON`
/// `properties` so features round-trip without conversion.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// EPSG code of the WGS84 geographic CRS.
pub const EPSG_WGS84: u32 = 4326;

/// A coordinate reference system supported by the pipeline.
///
/// Only two families are needed: WGS84 degrees for storage and display,
/// and UTM meters for area and distance math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Crs {
    /// WGS84 longitude/latitude in degrees (EPSG:4326).
    Wgs84,
    /// WGS84 / UTM in meters (EPSG:326zz north, EPSG:327zz south).
    Utm {
        /// UTM zone number, 1-60.
        zone: u8,
        /// Whether the zone uses the southern hemisphere false northing.
        south: bool,
    },
}

impl Crs {
    /// WGS84 / UTM zone 17S, the metric CRS covering Quito.
    pub const UTM_17S: Self = Self::Utm {
        zone: 17,
        south: true,
    };

    /// Returns the EPSG code for this CRS.
    #[must_use]
    pub const fn epsg(self) -> u32 {
        match self {
            Self::Wgs84 => EPSG_WGS84,
            Self::Utm { zone, south } => {
                let base = if south { 32700 } else { 32600 };
                base + zone as u32
            }
        }
    }

    /// Creates a CRS from an EPSG code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is neither WGS84 nor a WGS84 UTM zone.
    pub fn from_epsg(code: u32) -> Result<Self, InvalidCrsError> {
        match code {
            EPSG_WGS84 => Ok(Self::Wgs84),
            32601..=32660 => Ok(Self::Utm {
                zone: u8::try_from(code - 32600).map_err(|_| InvalidCrsError::code(code))?,
                south: false,
            }),
            32701..=32760 => Ok(Self::Utm {
                zone: u8::try_from(code - 32700).map_err(|_| InvalidCrsError::code(code))?,
                south: true,
            }),
            _ => Err(InvalidCrsError::code(code)),
        }
    }

    /// Whether coordinates are linear (meters) rather than angular.
    #[must_use]
    pub const fn is_projected(self) -> bool {
        matches!(self, Self::Utm { .. })
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = InvalidCrsError;

    /// Accepts `EPSG:4326`, `EPSG:32717`, `CRS84`, and the OGC URN forms
    /// used by legacy `GeoJSON` `crs` members.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();

        if upper == "WGS84" || upper.ends_with("CRS84") {
            return Ok(Self::Wgs84);
        }

        if !upper.contains("EPSG") {
            return Err(InvalidCrsError::name(s));
        }

        // URNs look like urn:ogc:def:crs:EPSG::32717; the code is last.
        let code = upper
            .rsplit(':')
            .next()
            .and_then(|c| c.trim().parse::<u32>().ok())
            .ok_or_else(|| InvalidCrsError::name(s))?;

        Self::from_epsg(code).map_err(|_| InvalidCrsError::name(s))
    }
}

impl TryFrom<String> for Crs {
    type Error = InvalidCrsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(value: Crs) -> Self {
        value.to_string()
    }
}

/// Error returned when a CRS name or EPSG code is not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCrsError {
    /// The rejected CRS name or code.
    pub value: String,
}

impl InvalidCrsError {
    fn code(code: u32) -> Self {
        Self {
            value: format!("EPSG:{code}"),
        }
    }

    fn name(name: &str) -> Self {
        Self {
            value: name.to_string(),
        }
    }
}

impl fmt::Display for InvalidCrsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported CRS {}: expected EPSG:4326 or a WGS84 UTM zone",
            self.value
        )
    }
}

impl std::error::Error for InvalidCrsError {}

/// A geometry plus its named attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// The feature geometry, in the CRS of the owning collection.
    pub geometry: Geometry<f64>,
    /// Named attributes (strings, numbers, lists).
    pub attributes: Attributes,
}

impl Feature {
    /// Creates a feature from a geometry and attributes.
    #[must_use]
    pub fn new(geometry: impl Into<Geometry<f64>>, attributes: Attributes) -> Self {
        Self {
            geometry: geometry.into(),
            attributes,
        }
    }

    /// Creates a feature with no attributes.
    #[must_use]
    pub fn from_geometry(geometry: impl Into<Geometry<f64>>) -> Self {
        Self::new(geometry, Attributes::new())
    }

    /// Sets an attribute, replacing any previous value.
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Returns the raw attribute value for `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Returns an attribute rendered as text.
    ///
    /// Strings are returned as-is and numbers/booleans are formatted, so
    /// numeric identifiers can be used as join keys. Null, arrays and
    /// objects yield `None`.
    #[must_use]
    pub fn attribute_text(&self, key: &str) -> Option<String> {
        match self.attributes.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Returns the geometry as a point if it is one.
    #[must_use]
    pub const fn as_point(&self) -> Option<Point<f64>> {
        match &self.geometry {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Whether the geometry is a `Polygon` or `MultiPolygon`.
    #[must_use]
    pub const fn is_polygonal(&self) -> bool {
        matches!(
            self.geometry,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_)
        )
    }
}

/// An ordered sequence of features sharing one CRS.
///
/// The CRS is optional so that collections loaded from sources without
/// CRS metadata can be represented; reprojection and area math reject
/// them until a CRS is assigned with [`FeatureCollection::with_crs`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    /// The CRS of every geometry in the collection, if known.
    pub crs: Option<Crs>,
    /// The features, in source order.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Creates a collection tagged with `crs`.
    #[must_use]
    pub const fn new(crs: Crs, features: Vec<Feature>) -> Self {
        Self {
            crs: Some(crs),
            features,
        }
    }

    /// Creates a collection with no CRS assigned.
    #[must_use]
    pub const fn without_crs(features: Vec<Feature>) -> Self {
        Self {
            crs: None,
            features,
        }
    }

    /// Assigns a CRS without transforming any coordinate.
    #[must_use]
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterates over the features in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Keeps only the features matching `predicate`.
    #[must_use]
    pub fn filtered(&self, predicate: impl Fn(&Feature) -> bool) -> Self {
        Self {
            crs: self.crs,
            features: self
                .features
                .iter()
                .filter(|f| predicate(f))
                .cloned()
                .collect(),
        }
    }

    /// Combined bounding rectangle of every geometry, or `None` when the
    /// collection is empty or holds only empty geometries.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .reduce(|acc, r| {
                Rect::new(
                    coord! { x: acc.min().x.min(r.min().x), y: acc.min().y.min(r.min().y) },
                    coord! { x: acc.max().x.max(r.max().x), y: acc.max().y.max(r.max().y) },
                )
            })
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
