//! Career offerings for one academic period.

use std::collections::{BTreeMap, BTreeSet};

use parish_map_geometry::FeatureCollection;
use parish_map_source::CareerRow;

use crate::{PeriodRules, join_lists, normalize_key};

/// Faculty placeholder used by the source data for unknown faculties.
const UNREGISTERED_FACULTY: &str = "SIN REGISTRO";

/// Level (uppercased) → faculty → sorted unique careers.
pub type FacultyTree = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// The career rows that apply to one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareerCatalog {
    period: String,
    rows: Vec<CareerRow>,
}

impl CareerCatalog {
    /// Keeps the rows tagged with `period` or with its baseline.
    #[must_use]
    pub fn for_period(rows: &[CareerRow], rules: &PeriodRules, period: &str) -> Self {
        let rows: Vec<CareerRow> = rows
            .iter()
            .filter(|r| rules.accepts(period, &r.period))
            .cloned()
            .collect();

        log::debug!(
            "Career catalog for {period} (baseline {}): {} rows",
            rules.baseline_for(period),
            rows.len()
        );

        Self {
            period: period.to_string(),
            rows,
        }
    }

    /// The period this catalog was built for.
    #[must_use]
    pub fn period(&self) -> &str {
        &self.period
    }

    /// The rows in the catalog, in source order.
    #[must_use]
    pub fn rows(&self) -> &[CareerRow] {
        &self.rows
    }

    /// Careers grouped by normalized institution name, in first-seen order.
    /// Spellings that differ only in case or padding share one list, and a
    /// career listed under both the period and its baseline appears once.
    #[must_use]
    pub fn careers_by_institution(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in &self.rows {
            let careers = grouped
                .entry(normalize_key(&row.institution))
                .or_default();
            let career = row.career.trim();
            if !careers.iter().any(|c| c == career) {
                careers.push(career.to_string());
            }
        }
        grouped
    }

    /// Adds a `field` list of careers to every institution feature,
    /// matched on the normalized `name_key`. Unmatched institutions get
    /// an empty list.
    #[must_use]
    pub fn join_careers(
        &self,
        institutions: &FeatureCollection,
        name_key: &str,
        field: &str,
    ) -> FeatureCollection {
        join_lists(institutions, name_key, &self.careers_by_institution(), field)
    }

    /// Builds the level → faculty → careers tree.
    ///
    /// Rows without a level or faculty, and rows whose faculty is the
    /// "SIN REGISTRO" placeholder, are left out.
    #[must_use]
    pub fn faculties_by_level(&self) -> FacultyTree {
        let mut tree: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();

        for row in &self.rows {
            let (Some(level), Some(faculty)) = (&row.level, &row.faculty) else {
                continue;
            };
            let faculty = faculty.trim();
            if faculty.eq_ignore_ascii_case(UNREGISTERED_FACULTY) {
                continue;
            }
            tree.entry(level.trim().to_uppercase())
                .or_default()
                .entry(faculty.to_string())
                .or_default()
                .insert(row.career.trim().to_string());
        }

        tree.into_iter()
            .map(|(level, faculties)| {
                let faculties = faculties
                    .into_iter()
                    .map(|(faculty, careers)| (faculty, careers.into_iter().collect()))
                    .collect();
                (level, faculties)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;
    use parish_map_geometry::{Crs, Feature};
    use serde_json::json;

    fn row(period: &str, institution: &str, career: &str) -> CareerRow {
        CareerRow {
            period: period.to_string(),
            institution: institution.to_string(),
            career: career.to_string(),
            level: Some("grado".to_string()),
            faculty: Some("Salud".to_string()),
        }
    }

    fn rows() -> Vec<CareerRow> {
        vec![
            row("202410", "UDLA", "Medicina"),
            row("202400", "UDLA", "Derecho"),
            row("202520", "UDLA", "Arquitectura"),
            row("202599", "EPN", "Sistemas"),
            row("202420", "EPN", "Electrica"),
        ]
    }

    #[test]
    fn recent_period_includes_its_baseline() {
        let catalog = CareerCatalog::for_period(&rows(), &PeriodRules::default(), "202410");
        let tags: Vec<&str> = catalog.rows().iter().map(|r| r.period.as_str()).collect();
        assert_eq!(tags, vec!["202410", "202400"]);
    }

    #[test]
    fn other_period_includes_default_baseline() {
        let catalog = CareerCatalog::for_period(&rows(), &PeriodRules::default(), "202599");
        let tags: Vec<&str> = catalog.rows().iter().map(|r| r.period.as_str()).collect();
        assert_eq!(tags, vec!["202520", "202599"]);
    }

    #[test]
    fn groups_careers_by_institution() {
        let mut all = rows();
        all.push(row("202400", " UDLA ", "Medicina"));
        let catalog = CareerCatalog::for_period(&all, &PeriodRules::default(), "202410");
        let grouped = catalog.careers_by_institution();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["UDLA"], vec!["Medicina", "Derecho"]);
    }

    #[test]
    fn institution_spellings_share_one_list() {
        let all = vec![
            row("202520", "UDLA", "MEDICINA"),
            row("202520", "Udla", "DERECHO"),
        ];
        let catalog = CareerCatalog::for_period(&all, &PeriodRules::default(), "202520");
        assert_eq!(catalog.careers_by_institution().len(), 1);

        let institutions = FeatureCollection::new(
            Crs::Wgs84,
            vec![
                Feature::from_geometry(point! { x: -78.47, y: -0.17 })
                    .with_attribute("universidad", "UDLA"),
            ],
        );
        let joined = catalog.join_careers(&institutions, "universidad", "careers");
        assert_eq!(
            joined.features[0].attribute("careers"),
            Some(&json!(["MEDICINA", "DERECHO"]))
        );
    }

    #[test]
    fn unmatched_institutions_get_empty_lists() {
        let catalog = CareerCatalog::for_period(&rows(), &PeriodRules::default(), "202410");
        let institutions = FeatureCollection::new(
            Crs::Wgs84,
            vec![
                Feature::from_geometry(point! { x: -78.47, y: -0.17 })
                    .with_attribute("universidad", "udla"),
                Feature::from_geometry(point! { x: -78.49, y: -0.21 })
                    .with_attribute("universidad", "EPN"),
            ],
        );
        let joined = catalog.join_careers(&institutions, "universidad", "careers");
        assert_eq!(
            joined.features[0].attribute("careers"),
            Some(&json!(["Medicina", "Derecho"]))
        );
        assert_eq!(joined.features[1].attribute("careers"), Some(&json!([])));
    }

    #[test]
    fn builds_faculty_tree() {
        let mut all = vec![
            row("202410", "UDLA", "Medicina"),
            row("202410", "UDLA", "Enfermeria"),
            row("202410", "UDLA", "Medicina"),
        ];
        let mut unregistered = row("202410", "UDLA", "Turismo");
        unregistered.faculty = Some("Sin Registro".to_string());
        all.push(unregistered);
        let mut no_level = row("202410", "UDLA", "Musica");
        no_level.level = None;
        all.push(no_level);
        let mut posgrado = row("202410", "UDLA", "MBA");
        posgrado.level = Some(" posgrado ".to_string());
        posgrado.faculty = Some("Negocios".to_string());
        all.push(posgrado);

        let catalog = CareerCatalog::for_period(&all, &PeriodRules::default(), "202410");
        let tree = catalog.faculties_by_level();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree["GRADO"]["Salud"], vec!["Enfermeria", "Medicina"]);
        assert!(!tree["GRADO"].contains_key("Sin Registro"));
        assert_eq!(tree["POSGRADO"]["Negocios"], vec!["MBA"]);
    }
}
