//! Where map inputs come from.
//!
//! Maps ask an [`InputSource`] for each layer they need, so the same map
//! code runs against files on disk ([`DataDir`]) or data built in memory.

use std::path::{Path, PathBuf};

use parish_map_geometry::io::read_feature_collection;
use parish_map_geometry::{Crs, FeatureCollection, merge_collections, reduce_to_points};
use parish_map_source::{
    Business, CareerRow, PopulationRow, ReferenceData, School, Student, University, load,
    load_parishes,
};

use crate::{PipelineConfig, PipelineError};

/// Supplier of every input a map may need.
///
/// Boundary layers are returned with a CRS assigned (WGS84 when read from
/// files). Tabular layers are returned as typed records, already stripped
/// of unusable rows.
pub trait InputSource {
    /// Merged rural and urban parishes, each with a name and a kind.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the layer cannot be loaded.
    fn parishes(&self) -> Result<FeatureCollection, PipelineError>;

    /// Bus stations, as polygons or points.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the layer cannot be loaded.
    fn bus_stations(&self) -> Result<FeatureCollection, PipelineError>;

    /// Metro stations, as polygons or points.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the layer cannot be loaded.
    fn metro_stations(&self) -> Result<FeatureCollection, PipelineError>;

    /// Bus stops.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the layer cannot be loaded.
    fn bus_stops(&self) -> Result<FeatureCollection, PipelineError>;

    /// Feeder zones.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the layer cannot be loaded.
    fn feeders(&self) -> Result<FeatureCollection, PipelineError>;

    /// Feeder code → name table.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the table cannot be loaded.
    fn reference_data(&self) -> Result<ReferenceData, PipelineError>;

    /// Geocoded students, all periods.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the table cannot be loaded.
    fn students(&self) -> Result<Vec<Student>, PipelineError>;

    /// University campuses.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the table cannot be loaded.
    fn universities(&self) -> Result<Vec<University>, PipelineError>;

    /// Schools of every category.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the table cannot be loaded.
    fn schools(&self) -> Result<Vec<School>, PipelineError>;

    /// Business locations.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the table cannot be loaded.
    fn businesses(&self) -> Result<Vec<Business>, PipelineError>;

    /// Population by parish.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the table cannot be loaded.
    fn population(&self) -> Result<Vec<PopulationRow>, PipelineError>;

    /// Career offerings, all periods.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the table cannot be loaded.
    fn careers(&self) -> Result<Vec<CareerRow>, PipelineError>;

    /// Parks.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the layer cannot be loaded.
    fn parks(&self) -> Result<FeatureCollection, PipelineError>;

    /// Plazas.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the layer cannot be loaded.
    fn plazas(&self) -> Result<FeatureCollection, PipelineError>;

    /// Cultural spaces.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the layer cannot be loaded.
    fn cultural_spaces(&self) -> Result<FeatureCollection, PipelineError>;

    /// Shopping centres.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the layer cannot be loaded.
    fn shopping_centres(&self) -> Result<FeatureCollection, PipelineError>;
}

/// The three transit layers, as loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitLayers {
    /// Bus stations.
    pub bus_stations: FeatureCollection,
    /// Metro stations.
    pub metro_stations: FeatureCollection,
    /// Bus stops.
    pub bus_stops: FeatureCollection,
}

impl TransitLayers {
    /// Loads all three layers from `inputs`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a layer cannot be loaded.
    pub fn load(inputs: &impl InputSource) -> Result<Self, PipelineError> {
        Ok(Self {
            bus_stations: inputs.bus_stations()?,
            metro_stations: inputs.metro_stations()?,
            bus_stops: inputs.bus_stops()?,
        })
    }

    /// Transit points in WGS84: bus and metro stations reduced to
    /// centroids (computed in `projected_crs`), followed by bus stops.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Geometry`] if a layer has no CRS.
    pub fn points(&self, projected_crs: Crs) -> Result<FeatureCollection, PipelineError> {
        let bus = reduce_to_points(&self.bus_stations, projected_crs)?;
        let metro = reduce_to_points(&self.metro_stations, projected_crs)?;

        let merged = merge_collections(&[&bus, &metro, &self.bus_stops], Crs::Wgs84)?;
        log::info!(
            "Transit points: {} bus stations, {} metro stations, {} stops",
            bus.len(),
            metro.len(),
            self.bus_stops.len()
        );
        Ok(merged)
    }
}

/// Inputs read from a directory, with file names from the configuration.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    config: PipelineConfig,
}

impl DataDir {
    /// Inputs under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: PipelineConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// The data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, file: &Path) -> PathBuf {
        self.root.join(file)
    }

    /// Boundary files without a CRS member are RFC 7946 WGS84.
    fn layer(&self, file: &Path) -> Result<FeatureCollection, PipelineError> {
        Ok(read_feature_collection(&self.path(file), Some(Crs::Wgs84))?)
    }
}

impl InputSource for DataDir {
    fn parishes(&self) -> Result<FeatureCollection, PipelineError> {
        let files = &self.config.files;
        Ok(load_parishes(
            &self.path(&files.rural_parishes),
            &self.path(&files.urban_parishes),
            &self.config.parish_fields,
        )?)
    }

    fn bus_stations(&self) -> Result<FeatureCollection, PipelineError> {
        self.layer(&self.config.files.bus_stations)
    }

    fn metro_stations(&self) -> Result<FeatureCollection, PipelineError> {
        self.layer(&self.config.files.metro_stations)
    }

    fn bus_stops(&self) -> Result<FeatureCollection, PipelineError> {
        self.layer(&self.config.files.bus_stops)
    }

    fn feeders(&self) -> Result<FeatureCollection, PipelineError> {
        self.layer(&self.config.files.feeders)
    }

    fn reference_data(&self) -> Result<ReferenceData, PipelineError> {
        Ok(ReferenceData::load(&self.path(&self.config.files.feeder_names))?)
    }

    fn students(&self) -> Result<Vec<Student>, PipelineError> {
        Ok(load(&self.path(&self.config.files.students))?)
    }

    fn universities(&self) -> Result<Vec<University>, PipelineError> {
        Ok(load(&self.path(&self.config.files.universities))?)
    }

    fn schools(&self) -> Result<Vec<School>, PipelineError> {
        Ok(load(&self.path(&self.config.files.schools))?)
    }

    fn businesses(&self) -> Result<Vec<Business>, PipelineError> {
        Ok(load(&self.path(&self.config.files.businesses))?)
    }

    fn population(&self) -> Result<Vec<PopulationRow>, PipelineError> {
        Ok(load(&self.path(&self.config.files.population))?)
    }

    fn careers(&self) -> Result<Vec<CareerRow>, PipelineError> {
        Ok(load(&self.path(&self.config.files.careers))?)
    }

    fn parks(&self) -> Result<FeatureCollection, PipelineError> {
        self.layer(&self.config.files.parks)
    }

    fn plazas(&self) -> Result<FeatureCollection, PipelineError> {
        self.layer(&self.config.files.plazas)
    }

    fn cultural_spaces(&self) -> Result<FeatureCollection, PipelineError> {
        self.layer(&self.config.files.cultural_spaces)
    }

    fn shopping_centres(&self) -> Result<FeatureCollection, PipelineError> {
        self.layer(&self.config.files.shopping_centres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::fixture::{Fixture, X0, Y0};
    use parish_map_geometry::reproject;

    const RURAL: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"DPA_DESPAR": "NAYON", "AREA": 1},
            "geometry": {"type": "Polygon", "coordinates": [[[-78.45, -0.17], [-78.44, -0.17], [-78.44, -0.16], [-78.45, -0.16], [-78.45, -0.17]]]}
        }]
    }"#;

    const URBAN: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"dpa_despar": "IÑAQUITO"},
            "geometry": {"type": "Polygon", "coordinates": [[[-78.49, -0.18], [-78.48, -0.18], [-78.48, -0.17], [-78.49, -0.17], [-78.49, -0.18]]]}
        }]
    }"#;

    const STUDENTS: &str = "Semestre;Latitud;Longitud\n\
                            202410;-0,175;-78,485\n\
                            202420;;\n";

    fn data_dir(name: &str) -> DataDir {
        let root = std::env::temp_dir().join(format!("parish_map_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        let config = PipelineConfig::embedded().unwrap();
        std::fs::write(root.join(&config.files.rural_parishes), RURAL).unwrap();
        std::fs::write(root.join(&config.files.urban_parishes), URBAN).unwrap();
        std::fs::write(root.join(&config.files.students), STUDENTS).unwrap();
        DataDir::new(root, config)
    }

    #[test]
    fn reads_inputs_from_configured_files() {
        let dir = data_dir("data_dir");

        let parishes = dir.parishes().unwrap();
        assert_eq!(parishes.crs, Some(Crs::Wgs84));
        let names: Vec<String> = parishes
            .iter()
            .filter_map(|f| f.attribute_text("nombre"))
            .collect();
        assert_eq!(names, vec!["NAYON", "IÑAQUITO"]);
        assert_eq!(
            parishes.features[1].attribute_text("tipo").as_deref(),
            Some("urbana")
        );

        let students = dir.students().unwrap();
        assert_eq!(students.len(), 1);
        assert!((students[0].latitude - -0.175).abs() < 1e-12);

        assert!(matches!(dir.careers(), Err(PipelineError::Source(_))));

        std::fs::remove_dir_all(dir.root()).unwrap();
    }

    #[test]
    fn transit_stations_become_centroids() {
        let transit = TransitLayers::load(&Fixture::default()).unwrap();
        let points = transit.points(Crs::UTM_17S).unwrap();

        assert_eq!(points.crs, Some(Crs::Wgs84));
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|f| f.as_point().is_some()));

        let bus = reproject(&points, Crs::UTM_17S).unwrap().features[0]
            .as_point()
            .unwrap();
        assert!((bus.x() - (X0 + 1_500.0)).abs() < 1e-3);
        assert!((bus.y() - (Y0 + 500.0)).abs() < 1e-3);
        assert_eq!(
            points.features[0].attribute_text("nam").as_deref(),
            Some("La Y")
        );
    }
}
