//! Typed records for every tabular input.
//!
//! Each record type knows which columns it needs and how to build itself
//! from a [`Row`]. Rows that fail (missing text, bad coordinates) are
//! skipped and counted; a missing required column fails the whole table.

use std::path::Path;

use geo::point;
use parish_map_geometry::{Attributes, Crs, Feature, FeatureCollection};
use serde::Serialize;
use serde_json::Value;

use crate::SourceError;
use crate::parsing::{parse_lat_lng_pair, parse_lat_lng_str};
use crate::tabular::{Row, Table, read_table};

/// A record type that can be read from a CSV table.
pub trait Record: Sized {
    /// Label used in log messages.
    const KIND: &'static str;
    /// Columns that must be present in the header.
    const REQUIRED: &'static [&'static str];
    /// Field separator of the exported file.
    const DELIMITER: u8 = b',';

    /// Builds a record from one row, or `None` if the row is unusable.
    fn from_row(row: &Row) -> Option<Self>;
}

/// A record with a WGS84 position.
pub trait Located {
    /// `(latitude, longitude)` in degrees.
    fn lat_lng(&self) -> (f64, f64);

    /// Attributes carried onto the point feature.
    fn attributes(&self) -> Attributes {
        Attributes::new()
    }
}

/// Converts records from `table`, skipping unusable rows.
///
/// # Errors
///
/// Returns [`SourceError::MissingColumn`] if a required column is absent.
pub fn from_table<R: Record>(table: &Table) -> Result<Vec<R>, SourceError> {
    table.require(R::REQUIRED)?;

    let records: Vec<R> = table.rows.iter().filter_map(R::from_row).collect();

    let skipped = table.len() - records.len();
    if skipped > 0 {
        log::warn!(
            "Skipped {skipped} of {} {} rows in {} with missing or invalid values",
            table.len(),
            R::KIND,
            table.name
        );
    }

    Ok(records)
}

/// Reads a CSV export and converts it into records.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or lacks a required
/// column.
pub fn load<R: Record>(path: &Path) -> Result<Vec<R>, SourceError> {
    let table = read_table(path, R::DELIMITER)?;
    let records = from_table(&table)?;
    log::info!("Loaded {} {} records", records.len(), R::KIND);
    Ok(records)
}

/// Builds a WGS84 point collection from located records.
#[must_use]
pub fn to_points<T: Located>(records: &[T]) -> FeatureCollection {
    let features = records
        .iter()
        .map(|r| {
            let (lat, lng) = r.lat_lng();
            Feature::new(point! { x: lng, y: lat }, r.attributes())
        })
        .collect();
    FeatureCollection::new(Crs::Wgs84, features)
}

fn text(row: &Row, column: &str) -> Option<String> {
    row.get(column).filter(|s| !s.is_empty()).cloned()
}

/// A geocoded student enrollment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    /// Academic period tag (e.g. `"202410"`).
    pub period: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Record for Student {
    const KIND: &'static str = "student";
    const REQUIRED: &'static [&'static str] = &["Semestre", "Latitud", "Longitud"];
    const DELIMITER: u8 = b';';

    fn from_row(row: &Row) -> Option<Self> {
        let period = text(row, "Semestre")?;
        let (latitude, longitude) = parse_lat_lng_str(row.get("Latitud"), row.get("Longitud"))?;
        Some(Self {
            period,
            latitude,
            longitude,
        })
    }
}

impl Located for Student {
    fn lat_lng(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("periodo".to_string(), Value::from(self.period.clone()));
        attributes
    }
}

/// A university campus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct University {
    /// Institution name.
    pub name: String,
    /// Campus name, if given.
    pub campus: Option<String>,
    /// Funding type (`PUBLICA` / `PRIVADA`), uppercased.
    pub financing: Option<String>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Record for University {
    const KIND: &'static str = "university";
    const REQUIRED: &'static [&'static str] = &["UNIVERSIDAD", "LATITUD", "LONGITUD"];

    fn from_row(row: &Row) -> Option<Self> {
        let name = text(row, "UNIVERSIDAD")?;
        let (latitude, longitude) = parse_lat_lng_str(row.get("LATITUD"), row.get("LONGITUD"))?;
        Some(Self {
            name,
            campus: text(row, "CAMPUS"),
            financing: text(row, "FINANCIAMIENTO").map(|f| f.to_uppercase()),
            latitude,
            longitude,
        })
    }
}

impl Located for University {
    fn lat_lng(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("universidad".to_string(), Value::from(self.name.clone()));
        if let Some(campus) = &self.campus {
            attributes.insert("campus".to_string(), Value::from(campus.clone()));
        }
        if let Some(financing) = &self.financing {
            attributes.insert("financiamiento".to_string(), Value::from(financing.clone()));
        }
        attributes
    }
}

/// A school with its rating category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct School {
    /// School name.
    pub name: String,
    /// Rating category (e.g. `AAA`), uppercased.
    pub kind: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl School {
    /// Whether the school is in `category`, ignoring case.
    #[must_use]
    pub fn is_kind(&self, category: &str) -> bool {
        self.kind.eq_ignore_ascii_case(category.trim())
    }
}

impl Record for School {
    const KIND: &'static str = "school";
    const REQUIRED: &'static [&'static str] = &["COLEGIO", "TIPO", "LATITUD", "LONGITUD"];

    fn from_row(row: &Row) -> Option<Self> {
        let name = text(row, "COLEGIO")?;
        let kind = text(row, "TIPO")?.to_uppercase();
        let (latitude, longitude) = parse_lat_lng_str(row.get("LATITUD"), row.get("LONGITUD"))?;
        Some(Self {
            name,
            kind,
            latitude,
            longitude,
        })
    }
}

impl Located for School {
    fn lat_lng(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("colegio".to_string(), Value::from(self.name.clone()));
        attributes.insert("tipo".to_string(), Value::from(self.kind.clone()));
        attributes
    }
}

/// A business location. Every column besides the coordinates is kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Business {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Remaining non-empty columns.
    pub columns: Attributes,
}

impl Record for Business {
    const KIND: &'static str = "business";
    const REQUIRED: &'static [&'static str] = &["COORDENADAS"];

    fn from_row(row: &Row) -> Option<Self> {
        let (latitude, longitude) = parse_lat_lng_pair(row.get("COORDENADAS")?)?;
        let columns = row
            .iter()
            .filter(|(k, v)| k.as_str() != "COORDENADAS" && !v.is_empty())
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect();
        Some(Self {
            latitude,
            longitude,
            columns,
        })
    }
}

impl Located for Business {
    fn lat_lng(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    fn attributes(&self) -> Attributes {
        self.columns.clone()
    }
}

/// One row of the parish population table, unparsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulationRow {
    /// Parish name as written in the table.
    pub parish: String,
    /// Population as written, possibly with thousands separators.
    pub population: String,
}

impl Record for PopulationRow {
    const KIND: &'static str = "population";
    const REQUIRED: &'static [&'static str] = &["Parroquia", "Poblacion"];

    fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            parish: text(row, "Parroquia")?,
            population: text(row, "Poblacion")?,
        })
    }
}

/// One career offered by an institution in a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CareerRow {
    /// Period tag the offering applies to.
    pub period: String,
    /// Institution name.
    pub institution: String,
    /// Career (degree program) name.
    pub career: String,
    /// Academic level (e.g. `GRADO`), if given.
    pub level: Option<String>,
    /// Faculty, if given.
    pub faculty: Option<String>,
}

impl Record for CareerRow {
    const KIND: &'static str = "career";
    const REQUIRED: &'static [&'static str] = &["PERIODO", "UNIVERSIDAD", "CARRERA"];

    fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            period: text(row, "PERIODO")?,
            institution: text(row, "UNIVERSIDAD")?,
            career: text(row, "CARRERA")?,
            level: text(row, "NIVEL"),
            faculty: text(row, "FACULTAD"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::parse_table;

    fn table(csv: &str, delimiter: u8) -> Table {
        parse_table("test.csv", csv.as_bytes(), delimiter).unwrap()
    }

    #[test]
    fn loads_students_and_drops_bad_rows() {
        let t = table(
            "Semestre;Latitud;Longitud\n202410;-0.2;-78.5\n202410;;-78.5\n202420;-0,21;-78,49\n",
            b';',
        );
        let students: Vec<Student> = from_table(&t).unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[1].period, "202420");
        assert!((students[1].latitude - -0.21).abs() < 1e-12);
    }

    #[test]
    fn loads_universities_with_optional_columns() {
        let t = table(
            "UNIVERSIDAD,CAMPUS,FINANCIAMIENTO,LATITUD,LONGITUD\nUDLA,Granados,privada,-0.17,-78.47\nEPN,,,-0.21,-78.49\n",
            b',',
        );
        let universities: Vec<University> = from_table(&t).unwrap();
        assert_eq!(universities.len(), 2);
        assert_eq!(universities[0].financing.as_deref(), Some("PRIVADA"));
        assert_eq!(universities[1].campus, None);

        let points = to_points(&universities);
        assert_eq!(points.crs, Some(Crs::Wgs84));
        let p = points.features[0].as_point().unwrap();
        assert!((p.x() - -78.47).abs() < 1e-12);
        assert!((p.y() - -0.17).abs() < 1e-12);
        assert_eq!(
            points.features[0].attribute_text("universidad").as_deref(),
            Some("UDLA")
        );
    }

    #[test]
    fn school_kind_matches_case_insensitively() {
        let t = table(
            "COLEGIO,TIPO,LATITUD,LONGITUD\nColegio A,aaa,-0.1,-78.4\nColegio B,B,-0.1,-78.4\n",
            b',',
        );
        let schools: Vec<School> = from_table(&t).unwrap();
        assert!(schools[0].is_kind("AAA"));
        assert!(!schools[1].is_kind("AAA"));
    }

    #[test]
    fn businesses_parse_combined_coordinates() {
        let t = table(
            "NOMBRE,COORDENADAS\nTienda,\"-0.18, -78.48\"\nSin ubicacion,\n",
            b',',
        );
        let businesses: Vec<Business> = from_table(&t).unwrap();
        assert_eq!(businesses.len(), 1);
        assert_eq!(businesses[0].lat_lng(), (-0.18, -78.48));
        assert_eq!(
            businesses[0].attributes().get("NOMBRE"),
            Some(&Value::from("Tienda"))
        );
    }

    #[test]
    fn careers_keep_optional_level_and_faculty() {
        let t = table(
            "PERIODO,UNIVERSIDAD,CARRERA,NIVEL,FACULTAD\n202410,UDLA,Medicina,grado,Salud\n202400,UDLA,Derecho,,\n",
            b',',
        );
        let careers: Vec<CareerRow> = from_table(&t).unwrap();
        assert_eq!(careers.len(), 2);
        assert_eq!(careers[0].level.as_deref(), Some("grado"));
        assert_eq!(careers[1].faculty, None);
    }

    #[test]
    fn missing_required_column_fails() {
        let t = table("Parroquia\nCENTRO\n", b',');
        assert!(matches!(
            from_table::<PopulationRow>(&t),
            Err(SourceError::MissingColumn { .. })
        ));
    }
}
