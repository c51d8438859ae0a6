//! The five map use cases.
//!
//! Each map is the density engine applied to a different reference layer
//! and point mix, plus whatever attribute joins the map shows. Every
//! output layer is named after its style category so a renderer can look
//! its style up directly.

use std::collections::BTreeMap;

use parish_map_catalog::{
    CareerCatalog, FacultyTree, PopulationTable, known_periods, normalize_key, select_period,
};
use parish_map_geometry::{Crs, FeatureCollection, reproject};
use parish_map_source::{Student, University, to_points};
use parish_map_spatial::CountRange;
use parish_map_style::{
    BandedScale, POPULATION_GRADIENTS, Rgb, StyleDescriptor, StyleRegistry, TERTILE_GRADIENTS,
    categorical_color,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::amenities::{add_amenities, add_schools_by_type};
use crate::config::UniversitySettings;
use crate::engine::{DensityGrid, FILL_FIELD, count_points, points_within};
use crate::inputs::TransitLayers;
use crate::{DensityEngine, InputSource, PipelineConfig, PipelineError};

/// Career list attribute on university features.
pub const CAREERS_FIELD: &str = "carreras";

/// Student count attribute on parish features.
pub const STUDENTS_FIELD: &str = "n_estudiantes";

/// Population attribute on parish features.
pub const POPULATION_FIELD: &str = "Poblacion";

/// Whether a university feature is the highlighted one.
pub const HIGHLIGHT_FIELD: &str = "destacada";

/// Output layer names. Each one is also a style category.
pub mod layer {
    /// Parish boundaries.
    pub const PARISHES: &str = "parroquias";
    /// Grid cells with point counts.
    pub const DENSITY_GRID: &str = "grilla_densidad";
    /// Parish grid fragments.
    pub const PARISH_GRID: &str = "grilla_parroquias";
    /// Representative points of parish grid fragments.
    pub const PARISH_CENTROIDS: &str = "centroides_parroquias";
    /// Feeder grid fragments.
    pub const FEEDER_GRID: &str = "grilla_alimentadores";
    /// Representative points of feeder grid fragments.
    pub const FEEDER_CENTROIDS: &str = "centroides_alimentadores";
    /// Feeder zones.
    pub const FEEDERS: &str = "alimentadores";
    /// Bus stations.
    pub const BUS_STATIONS: &str = "estaciones_buses";
    /// Metro stations.
    pub const METRO_STATIONS: &str = "estaciones_metro";
    /// Bus stops.
    pub const BUS_STOPS: &str = "paradas_buses";
    /// Publicly funded universities.
    pub const PUBLIC_UNIVERSITIES: &str = "universidades_publicas";
    /// Privately funded universities.
    pub const PRIVATE_UNIVERSITIES: &str = "universidades_privadas";
    /// Schools of the configured category.
    pub const SCHOOLS: &str = "colegios_aaa";
    /// Businesses.
    pub const BUSINESSES: &str = "empresas";
    /// Parishes colored by student count.
    pub const PARISH_STUDENTS: &str = "parroquias_estudiantes";
    /// Parishes colored by population.
    pub const PARISH_POPULATION: &str = "parroquias_poblacion";
    /// Family of the per-type park layers.
    pub const PARKS: &str = "parques";
    /// Park centroids.
    pub const PARK_CENTROIDS: &str = "parques_centroides";
    /// Family of the per-type plaza layers.
    pub const PLAZAS: &str = "plazas";
    /// Plaza centroids.
    pub const PLAZA_CENTROIDS: &str = "plazas_centroides";
    /// Family of the per-type cultural space layers.
    pub const CULTURAL_SPACES: &str = "espacios_culturales";
    /// Shopping centres.
    pub const SHOPPING_CENTRES: &str = "centros_comerciales";
    /// Shopping centre centroids.
    pub const SHOPPING_CENTRE_CENTROIDS: &str = "centros_comerciales_centroides";
    /// Family of the per-type school layers.
    pub const SCHOOLS_BY_TYPE: &str = "colegios";
}

/// Which map to build.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MapKind {
    /// Universities and transit counted over a parish-sized grid.
    Universities,
    /// Schools of one category and transit over a parish-sized grid.
    Schools,
    /// Businesses and transit over a parish-sized grid.
    Businesses,
    /// Students per parish for one period, with population.
    Students,
    /// Feeder and parish grid fragments.
    Feeders,
}

impl MapKind {
    /// Whether the map cannot be built without an academic period.
    #[must_use]
    pub const fn needs_period(self) -> bool {
        matches!(self, Self::Universities | Self::Students)
    }
}

/// A map to build and the period to build it for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRequest {
    /// Which map.
    pub kind: MapKind,
    /// Requested period; unknown or absent periods fall back to the first
    /// known one.
    pub period: Option<String>,
}

impl MapRequest {
    /// A request for `kind` with no period preference.
    #[must_use]
    pub const fn new(kind: MapKind) -> Self {
        Self { kind, period: None }
    }

    /// Same request for `period`.
    #[must_use]
    pub fn for_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }
}

/// Everything a map produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOutput {
    /// Which map this is.
    pub kind: MapKind,
    /// Every period found in the student data, sorted.
    pub periods: Vec<String>,
    /// The period the map was built for.
    pub selected_period: Option<String>,
    /// Output layers by name.
    pub layers: BTreeMap<String, FeatureCollection>,
    /// Count range of the map's choropleth, if it has one.
    pub range: Option<CountRange>,
    /// Side of the map's grid cells in meters, if it has a grid.
    pub cell_size_m: Option<f64>,
    /// Level → faculty → careers for the selected period.
    pub faculties: Option<FacultyTree>,
}

/// The non-geometric part of a [`MapOutput`], for serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSummary {
    /// Which map this is.
    pub kind: MapKind,
    /// Every known period.
    pub periods: Vec<String>,
    /// The period the map was built for.
    pub selected_period: Option<String>,
    /// Count range of the choropleth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<CountRange>,
    /// Grid cell side in meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_size_m: Option<f64>,
    /// Faculty tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculties: Option<FacultyTree>,
    /// Feature count of every layer.
    pub layers: BTreeMap<String, usize>,
    /// Resolved style of every layer.
    pub styles: BTreeMap<String, StyleDescriptor>,
}

impl MapOutput {
    fn new(kind: MapKind, periods: Vec<String>, selected_period: Option<String>) -> Self {
        Self {
            kind,
            periods,
            selected_period,
            layers: BTreeMap::new(),
            range: None,
            cell_size_m: None,
            faculties: None,
        }
    }

    /// Layer `name`, if the map produced it.
    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&FeatureCollection> {
        self.layers.get(name)
    }

    pub(crate) fn insert(&mut self, name: &str, collection: FeatureCollection) {
        log::debug!("Layer {name}: {} features", collection.len());
        self.layers.insert(name.to_string(), collection);
    }

    fn reproject_layers(&mut self, target: Crs) -> Result<(), PipelineError> {
        for collection in self.layers.values_mut() {
            *collection = reproject(collection, target)?;
        }
        Ok(())
    }

    /// Summary with the styles of every layer resolved from `styles`.
    #[must_use]
    pub fn summary(&self, styles: &StyleRegistry) -> MapSummary {
        MapSummary {
            kind: self.kind,
            periods: self.periods.clone(),
            selected_period: self.selected_period.clone(),
            range: self.range,
            cell_size_m: self.cell_size_m,
            faculties: self.faculties.clone(),
            layers: self
                .layers
                .iter()
                .map(|(name, collection)| (name.clone(), collection.len()))
                .collect(),
            styles: styles.subset(self.layers.keys().map(String::as_str)),
        }
    }
}

/// Every period found in the student data, sorted.
///
/// # Errors
///
/// Returns [`PipelineError`] if the student data cannot be loaded.
pub fn available_periods(inputs: &impl InputSource) -> Result<Vec<String>, PipelineError> {
    Ok(periods_of(&inputs.students()?))
}

fn periods_of(students: &[Student]) -> Vec<String> {
    known_periods(students.iter().map(|s| s.period.as_str()))
}

/// Builds the map described by `request`.
///
/// All layers are returned in `config.geographic_crs`.
///
/// # Errors
///
/// Returns [`PipelineError::NoPeriods`] if the map needs a period and the
/// student data has none, or any load, grid or join error.
pub fn run_map(
    inputs: &impl InputSource,
    config: &PipelineConfig,
    request: &MapRequest,
) -> Result<MapOutput, PipelineError> {
    let students = inputs.students()?;
    let periods = periods_of(&students);
    let selected = select_period(request.period.as_deref(), &periods);

    if selected.is_none() && request.kind.needs_period() {
        return Err(PipelineError::NoPeriods);
    }

    log::info!(
        "Building {} map for period {}",
        request.kind,
        selected.as_deref().unwrap_or("-")
    );

    let mut output = MapOutput::new(request.kind, periods, selected.clone());
    let engine = DensityEngine::from_config(config);
    let parishes = inputs.parishes()?;

    match request.kind {
        MapKind::Universities => {
            let period = selected.as_deref().ok_or(PipelineError::NoPeriods)?;
            let universities = inputs.universities()?;
            let transit = TransitLayers::load(inputs)?;
            let points = [
                to_points(&universities),
                transit.points(config.projected_crs)?,
            ];
            add_density(&mut output, &engine, &parishes, &[&points[0], &points[1]])?;
            add_transit(&mut output, transit);

            let catalog = career_catalog(inputs, config, period)?;
            add_universities(&mut output, &universities, Some(&catalog), &config.universities);
            output.faculties = Some(catalog.faculties_by_level());
        }
        MapKind::Schools => {
            let schools: Vec<_> = inputs
                .schools()?
                .into_iter()
                .filter(|s| s.is_kind(&config.school_category))
                .collect();
            log::info!("{} schools in category {}", schools.len(), config.school_category);

            let transit = TransitLayers::load(inputs)?;
            let points = [to_points(&schools), transit.points(config.projected_crs)?];
            add_density(&mut output, &engine, &parishes, &[&points[0], &points[1]])?;
            add_transit(&mut output, transit);
            output.insert(layer::SCHOOLS, points[0].clone());
        }
        MapKind::Businesses => {
            let transit = TransitLayers::load(inputs)?;
            let points = [
                to_points(&inputs.businesses()?),
                transit.points(config.projected_crs)?,
            ];
            let density =
                add_density(&mut output, &engine, &parishes, &[&points[0], &points[1]])?;
            add_transit(&mut output, transit);

            // Only businesses in cells that counted something are drawn.
            let businesses = points_within(&density.active_cells(), &points[0])?;
            log::info!(
                "{} of {} businesses lie in active cells",
                businesses.len(),
                points[0].len()
            );
            output.insert(layer::BUSINESSES, businesses);
        }
        MapKind::Students => {
            let period = selected.as_deref().ok_or(PipelineError::NoPeriods)?;
            add_students(&mut output, inputs, config, &parishes, &students, period)?;

            let catalog = career_catalog(inputs, config, period)?;
            add_universities(
                &mut output,
                &inputs.universities()?,
                Some(&catalog),
                &config.universities,
            );
            output.faculties = Some(catalog.faculties_by_level());

            add_amenities(&mut output, inputs, config)?;
            add_schools_by_type(&mut output, &inputs.schools()?);
        }
        MapKind::Feeders => {
            add_feeders(&mut output, inputs, config, &engine)?;

            let (grid, fragments) = engine.fragments(&parishes, &config.parish_fields.name)?;
            log::debug!("Parish grid cells are {:.1} m", grid.cell_size);
            output.insert(layer::PARISH_GRID, fragments.to_collection());
            output.insert(layer::PARISH_CENTROIDS, fragments.points());

            add_transit(&mut output, TransitLayers::load(inputs)?);
            add_universities(&mut output, &inputs.universities()?, None, &config.universities);
        }
    }

    output.insert(layer::PARISHES, parishes);
    output.reproject_layers(config.geographic_crs)?;

    Ok(output)
}

fn career_catalog(
    inputs: &impl InputSource,
    config: &PipelineConfig,
    period: &str,
) -> Result<CareerCatalog, PipelineError> {
    Ok(CareerCatalog::for_period(
        &inputs.careers()?,
        &config.periods,
        period,
    ))
}

fn add_density(
    output: &mut MapOutput,
    engine: &DensityEngine,
    reference: &FeatureCollection,
    point_layers: &[&FeatureCollection],
) -> Result<DensityGrid, PipelineError> {
    let density = engine.density_grid(reference, point_layers)?;
    output.range = Some(density.layer.range);
    output.cell_size_m = Some(density.grid.cell_size);
    output.insert(layer::DENSITY_GRID, density.layer.regions.clone());
    Ok(density)
}

fn add_transit(output: &mut MapOutput, transit: TransitLayers) {
    output.insert(layer::BUS_STATIONS, transit.bus_stations);
    output.insert(layer::METRO_STATIONS, transit.metro_stations);
    output.insert(layer::BUS_STOPS, transit.bus_stops);
}

/// Adds public and private universities, with careers when a catalog is
/// given. Universities with any other funding are not shown. The
/// university named in `settings` is flagged and filled apart.
fn add_universities(
    output: &mut MapOutput,
    universities: &[University],
    catalog: Option<&CareerCatalog>,
    settings: &UniversitySettings,
) {
    let mut points = to_points(universities);
    if let Some(catalog) = catalog {
        points = catalog.join_careers(&points, "universidad", CAREERS_FIELD);
    }
    let points = highlight(&points, settings);

    let funded = |kind: &'static str| {
        points.filtered(|f| f.attribute_text("financiamiento").as_deref() == Some(kind))
    };
    let public = funded("PUBLICA");
    let private = funded("PRIVADA");

    let unfunded = points.len() - public.len() - private.len();
    if unfunded > 0 {
        log::debug!("{unfunded} universities have no public/private funding type");
    }

    output.insert(layer::PUBLIC_UNIVERSITIES, public);
    output.insert(layer::PRIVATE_UNIVERSITIES, private);
}

fn highlight(
    universities: &FeatureCollection,
    settings: &UniversitySettings,
) -> FeatureCollection {
    let target = normalize_key(&settings.highlighted);
    let features = universities
        .iter()
        .map(|f| {
            let chosen = f
                .attribute_text("universidad")
                .is_some_and(|name| normalize_key(&name) == target);
            let feature = f.clone().with_attribute(HIGHLIGHT_FIELD, chosen);
            if chosen {
                feature.with_attribute(FILL_FIELD, settings.highlight_color.as_str())
            } else {
                feature
            }
        })
        .collect();

    FeatureCollection {
        crs: universities.crs,
        features,
    }
}

fn add_students(
    output: &mut MapOutput,
    inputs: &impl InputSource,
    config: &PipelineConfig,
    parishes: &FeatureCollection,
    students: &[Student],
    period: &str,
) -> Result<(), PipelineError> {
    let enrolled: Vec<Student> = students
        .iter()
        .filter(|s| s.period.trim() == period)
        .cloned()
        .collect();
    log::info!("{} of {} students enrolled in {period}", enrolled.len(), students.len());

    let density = count_points(parishes, &to_points(&enrolled), STUDENTS_FIELD)?;
    output.range = Some(density.range);

    let population = PopulationTable::from_rows(&inputs.population()?);
    let parishes = population.join_onto(
        &density.regions,
        &config.parish_fields.name,
        POPULATION_FIELD,
    );

    output.insert(
        layer::PARISH_STUDENTS,
        paint_bands(&parishes, STUDENTS_FIELD, &TERTILE_GRADIENTS),
    );
    output.insert(
        layer::PARISH_POPULATION,
        paint_bands(&parishes, POPULATION_FIELD, &POPULATION_GRADIENTS),
    );
    Ok(())
}

fn add_feeders(
    output: &mut MapOutput,
    inputs: &impl InputSource,
    config: &PipelineConfig,
    engine: &DensityEngine,
) -> Result<(), PipelineError> {
    let fields = &config.feeder_fields;
    let reference = inputs.reference_data()?;
    let feeders = inputs.feeders()?;

    let (grid, fragments) = engine.fragments(&feeders, &fields.code)?;
    output.cell_size_m = Some(grid.cell_size);

    let zones = reference.annotate(&feeders, &fields.code, &fields.name);
    output.insert(layer::FEEDERS, paint_categories(&zones, &fields.name));
    output.insert(
        layer::FEEDER_GRID,
        reference.annotate(&fragments.to_collection(), &fields.code, &fields.name),
    );
    output.insert(
        layer::FEEDER_CENTROIDS,
        reference.annotate(&fragments.points(), &fields.code, &fields.name),
    );
    Ok(())
}

/// Colors every feature by tertile of its numeric `field`. Missing values
/// count as 0.
fn paint_bands(
    collection: &FeatureCollection,
    field: &str,
    gradients: &[[Rgb; 3]; 3],
) -> FeatureCollection {
    let values: Vec<f64> = collection
        .iter()
        .map(|f| f.attribute(field).and_then(Value::as_f64).unwrap_or(0.0))
        .collect();

    let Some(scale) = BandedScale::tertiles_with(&values, gradients) else {
        return collection.clone();
    };

    let features = collection
        .iter()
        .zip(&values)
        .map(|(f, value)| match scale.color_for(*value) {
            Some(color) => f.clone().with_attribute(FILL_FIELD, color),
            None => f.clone(),
        })
        .collect();

    FeatureCollection {
        crs: collection.crs,
        features,
    }
}

/// Gives every distinct value of `field` its own stable fill color.
fn paint_categories(collection: &FeatureCollection, field: &str) -> FeatureCollection {
    let features = collection
        .iter()
        .map(|f| {
            let key = f.attribute_text(field).unwrap_or_default();
            f.clone().with_attribute(FILL_FIELD, categorical_color(&key))
        })
        .collect();

    FeatureCollection {
        crs: collection.crs,
        features,
    }
}


#[cfg(test)]
mod tests {
    use super::fixture::{self, Fixture};
    use super::*;
    use serde_json::json;

    fn config() -> PipelineConfig {
        PipelineConfig::embedded().unwrap()
    }

    fn run(kind: MapKind) -> MapOutput {
        run_map(&Fixture::default(), &config(), &MapRequest::new(kind)).unwrap()
    }

    fn numbers(collection: &FeatureCollection, field: &str) -> Vec<f64> {
        collection
            .iter()
            .map(|f| f.attribute(field).and_then(Value::as_f64).unwrap())
            .collect()
    }

    fn layer_names(output: &MapOutput) -> Vec<&str> {
        output.layers.keys().map(String::as_str).collect()
    }

    #[test]
    fn universities_map_counts_universities_and_transit() {
        let output = run(MapKind::Universities);

        assert_eq!(output.periods, vec!["202410", "202420"]);
        assert_eq!(output.selected_period.as_deref(), Some("202410"));

        // West: UCE, UDLA, metro station. East: IAEN, bus station, stop.
        let grid = output.layer(layer::DENSITY_GRID).unwrap();
        assert_eq!(numbers(grid, "count"), vec![3.0, 3.0]);
        assert_eq!(output.range, Some(CountRange { min: 0, max: 3 }));
        assert!((output.cell_size_m.unwrap() - 1_000.0).abs() < 1e-6);

        assert_eq!(
            layer_names(&output),
            vec![
                layer::BUS_STATIONS,
                layer::METRO_STATIONS,
                layer::DENSITY_GRID,
                layer::BUS_STOPS,
                layer::PARISHES,
                layer::PRIVATE_UNIVERSITIES,
                layer::PUBLIC_UNIVERSITIES,
            ]
        );
    }

    #[test]
    fn universities_carry_careers_of_period_and_baseline() {
        let output = run(MapKind::Universities);

        let public = output.layer(layer::PUBLIC_UNIVERSITIES).unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(
            public.features[0].attribute(CAREERS_FIELD),
            Some(&json!(["Medicina", "Derecho"]))
        );

        let private = output.layer(layer::PRIVATE_UNIVERSITIES).unwrap();
        assert_eq!(private.features[0].attribute(CAREERS_FIELD), Some(&json!([])));

        let faculties = output.faculties.unwrap();
        assert_eq!(faculties["GRADO"]["Salud"], vec!["Derecho", "Medicina"]);
    }

    #[test]
    fn requested_period_is_honoured_and_unknown_falls_back() {
        let fixture = Fixture::default();
        let request = MapRequest::new(MapKind::Universities).for_period("202420");
        let output = run_map(&fixture, &config(), &request).unwrap();
        assert_eq!(output.selected_period.as_deref(), Some("202420"));

        // 202420 uses the 202400 baseline.
        let public = output.layer(layer::PUBLIC_UNIVERSITIES).unwrap();
        assert_eq!(public.features[0].attribute(CAREERS_FIELD), Some(&json!(["Derecho"])));

        let request = MapRequest::new(MapKind::Universities).for_period("209999");
        let output = run_map(&fixture, &config(), &request).unwrap();
        assert_eq!(output.selected_period.as_deref(), Some("202410"));
    }

    #[test]
    fn schools_map_counts_only_configured_category() {
        let output = run(MapKind::Schools);
        let grid = output.layer(layer::DENSITY_GRID).unwrap();
        // West: metro station. East: AAA school, bus station, stop.
        assert_eq!(numbers(grid, "count"), vec![1.0, 3.0]);
        assert_eq!(output.layer(layer::SCHOOLS).unwrap().len(), 1);
        assert!(output.faculties.is_none());
    }

    #[test]
    fn businesses_map_counts_businesses_and_transit() {
        let output = run(MapKind::Businesses);
        let grid = output.layer(layer::DENSITY_GRID).unwrap();
        // The business far outside both parishes is neither counted nor drawn.
        assert_eq!(numbers(grid, "count"), vec![2.0, 2.0]);

        let businesses = output.layer(layer::BUSINESSES).unwrap();
        assert_eq!(businesses.len(), 1);
        let (lat, lng) = fixture::lat_lng(400.0, 400.0);
        let point = businesses.features[0].as_point().unwrap();
        assert!((point.y() - lat).abs() < 1e-9);
        assert!((point.x() - lng).abs() < 1e-9);
    }

    #[test]
    fn configured_university_is_highlighted() {
        let config = PipelineConfig::with_overrides("[universities]\nhighlighted = \" udla \"")
            .unwrap();
        let output =
            run_map(&Fixture::default(), &config, &MapRequest::new(MapKind::Students)).unwrap();

        let private = output.layer(layer::PRIVATE_UNIVERSITIES).unwrap();
        assert_eq!(private.features[0].attribute(HIGHLIGHT_FIELD), Some(&json!(true)));
        assert_eq!(private.features[0].attribute(FILL_FIELD), Some(&json!("#ff0000")));

        let public = output.layer(layer::PUBLIC_UNIVERSITIES).unwrap();
        assert_eq!(public.features[0].attribute(HIGHLIGHT_FIELD), Some(&json!(false)));
        assert!(public.features[0].attribute(FILL_FIELD).is_none());

        // The default names a university the fixture does not have.
        let output = run(MapKind::Feeders);
        let private = output.layer(layer::PRIVATE_UNIVERSITIES).unwrap();
        assert_eq!(private.features[0].attribute(HIGHLIGHT_FIELD), Some(&json!(false)));
    }

    #[test]
    fn students_map_joins_counts_and_population() {
        let output = run(MapKind::Students);

        let parishes = output.layer(layer::PARISH_STUDENTS).unwrap();
        assert_eq!(numbers(parishes, STUDENTS_FIELD), vec![3.0, 1.0]);
        assert_eq!(numbers(parishes, POPULATION_FIELD), vec![12_345.0, 0.0]);
        assert!(parishes.iter().all(|f| f.attribute(FILL_FIELD).is_some()));
        assert_eq!(output.range, Some(CountRange { min: 0, max: 3 }));

        let population = output.layer(layer::PARISH_POPULATION).unwrap();
        assert_eq!(
            population.features[0].attribute(FILL_FIELD),
            Some(&json!("#fb6a4a"))
        );
        assert!(output.layer(layer::DENSITY_GRID).is_none());
    }

    #[test]
    fn students_map_shows_amenities_by_type() {
        let output = run(MapKind::Students);
        let len = |name: &str| output.layer(name).map_or(0, FeatureCollection::len);

        assert_eq!(len("parques_barrial"), 1);
        assert_eq!(len("parques_zonal"), 1);
        assert_eq!(len(layer::PARK_CENTROIDS), 2);
        let zonal = output.layer("parques_zonal").unwrap();
        assert_eq!(zonal.features[0].attribute_text("PRK").as_deref(), Some("Sin nombre"));

        assert_eq!(len("plazas_plaza"), 1);
        assert_eq!(len("plazas_desconocido"), 1);
        assert_eq!(len(layer::PLAZA_CENTROIDS), 2);

        // The polygon museum is not a point and is dropped.
        assert_eq!(len("espacios_culturales_teatro"), 1);
        assert_eq!(len("espacios_culturales_museo"), 0);

        assert_eq!(len(layer::SHOPPING_CENTRES), 1);
        let centroids = output.layer(layer::SHOPPING_CENTRE_CENTROIDS).unwrap();
        assert!(centroids.iter().all(|f| f.as_point().is_some()));

        let schools = output.layer("colegios_a").unwrap();
        assert_eq!(schools.features[0].attribute(FILL_FIELD), Some(&json!("#ffa500")));
        let schools = output.layer("colegios_aaa").unwrap();
        assert_eq!(schools.features[0].attribute(FILL_FIELD), Some(&json!("#5f9ea0")));
    }

    #[test]
    fn students_outside_parishes_are_not_counted() {
        let fixture = Fixture::default();
        let request = MapRequest::new(MapKind::Students).for_period("202420");
        let output = run_map(&fixture, &config(), &request).unwrap();

        let parishes = output.layer(layer::PARISH_STUDENTS).unwrap();
        assert_eq!(numbers(parishes, STUDENTS_FIELD), vec![0.0, 2.0]);
    }

    #[test]
    fn feeders_map_clips_both_grids() {
        let output = run(MapKind::Feeders);

        let zones = output.layer(layer::FEEDERS).unwrap();
        assert_eq!(
            zones.features[0].attribute_text("nombre").as_deref(),
            Some("Alimentador Norte")
        );
        // Unknown codes fall back to the code itself.
        assert_eq!(zones.features[1].attribute("nombre"), Some(&json!(102)));
        assert_ne!(
            zones.features[0].attribute(FILL_FIELD),
            zones.features[1].attribute(FILL_FIELD)
        );

        let feeder_grid = output.layer(layer::FEEDER_GRID).unwrap();
        assert_eq!(feeder_grid.len(), 2);
        assert_eq!(feeder_grid.features[0].attribute("alimentadorid"), Some(&json!(101)));
        assert_eq!(output.layer(layer::FEEDER_CENTROIDS).unwrap().len(), 2);

        let parish_grid = output.layer(layer::PARISH_GRID).unwrap();
        let names: Vec<String> = parish_grid
            .iter()
            .filter_map(|f| f.attribute_text("nombre"))
            .collect();
        assert_eq!(names, vec!["LA MARISCAL", "IÑAQUITO"]);
        assert_eq!(output.layer(layer::PARISH_CENTROIDS).unwrap().len(), 2);
    }

    #[test]
    fn every_layer_is_geographic_and_styled() {
        let styles = StyleRegistry::embedded();
        for kind in [
            MapKind::Universities,
            MapKind::Schools,
            MapKind::Businesses,
            MapKind::Students,
            MapKind::Feeders,
        ] {
            let output = run(kind);
            for (name, collection) in &output.layers {
                assert_eq!(collection.crs, Some(Crs::Wgs84), "{kind} layer {name}");
                assert!(styles.lookup(name).is_some(), "{kind} layer {name} has no style");
            }
        }
    }

    #[test]
    fn missing_periods_only_fail_maps_that_need_one() {
        let fixture = Fixture { students: vec![] };
        assert!(matches!(
            run_map(&fixture, &config(), &MapRequest::new(MapKind::Students)),
            Err(PipelineError::NoPeriods)
        ));

        let output =
            run_map(&fixture, &config(), &MapRequest::new(MapKind::Businesses)).unwrap();
        assert!(output.periods.is_empty());
        assert!(output.selected_period.is_none());
    }

    #[test]
    fn summary_lists_layers_and_styles() {
        let output = run(MapKind::Schools);
        let summary = output.summary(&StyleRegistry::embedded());
        assert_eq!(summary.layers[layer::SCHOOLS], 1);
        assert_eq!(summary.styles.len(), output.layers.len());

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["kind"], json!("schools"));
        assert_eq!(value["range"]["max"], json!(3));
        assert!(value.get("faculties").is_none());
    }

    #[test]
    fn map_kinds_parse_from_names() {
        use strum::IntoEnumIterator;

        for kind in MapKind::iter() {
            assert_eq!(kind.to_string().parse::<MapKind>().unwrap(), kind);
        }
        assert_eq!("feeders".parse::<MapKind>().unwrap(), MapKind::Feeders);
        assert!("heatmap".parse::<MapKind>().is_err());
    }
}
