//! Clipping grid cells against regions.
//!
//! Each cell is intersected with every region it overlaps. Multi-part
//! results are split into single polygons, slivers are dropped, and every
//! surviving piece remembers which region it came from.

use geo::{Area, BooleanOps, Contains, InteriorPoint, MapCoords, MultiPolygon, Point, Polygon};
use parish_map_geometry::io::attributes;
use parish_map_geometry::{
    Attributes, Crs, Feature, FeatureCollection, GeometryError, reproject, transform_coord,
    transform_point,
};
use parish_map_spatial::RegionIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Grid, GridError};

/// Default sliver threshold in square meters.
pub const DEFAULT_MIN_AREA_M2: f64 = 25.0;

/// Fragment filtering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentOptions {
    /// Region attribute copied onto every fragment as its `source_key`.
    pub key_attribute: String,
    /// Fragments with an area at or below this many square meters are dropped.
    pub min_area_m2: f64,
    /// Compute a representative point for each fragment and drop the
    /// fragment if the point is not inside it.
    pub resolve_representative_points: bool,
}

impl Default for FragmentOptions {
    fn default() -> Self {
        Self {
            key_attribute: "nombre".to_string(),
            min_area_m2: DEFAULT_MIN_AREA_M2,
            resolve_representative_points: true,
        }
    }
}

impl FragmentOptions {
    /// Default options keyed on `key_attribute`.
    #[must_use]
    pub fn keyed_on(key_attribute: impl Into<String>) -> Self {
        Self {
            key_attribute: key_attribute.into(),
            ..Self::default()
        }
    }
}

/// One single-part piece of a grid cell inside one region.
#[derive(Debug, Clone, PartialEq)]
pub struct GridFragment {
    /// Id of the cell the fragment was cut from.
    pub cell_id: usize,
    /// Index of the region the fragment lies in.
    pub region: usize,
    /// The region's key attribute, or null when the region lacks it.
    pub source_key: Value,
    /// Fragment outline, in the output CRS.
    pub geometry: Polygon<f64>,
    /// A point guaranteed to lie inside the fragment, in the output CRS.
    pub representative_point: Option<Point<f64>>,
    /// Area in square meters, measured in the projected CRS.
    pub area_m2: f64,
}

/// The surviving fragments of a grid/region intersection.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragments {
    /// CRS of every fragment geometry and representative point.
    pub crs: Crs,
    /// Region attribute the `source_key`s were read from.
    pub key_attribute: String,
    /// Fragments ordered by cell id, then region index, then part.
    pub items: Vec<GridFragment>,
}

impl Fragments {
    /// Number of fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no fragment survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn attributes_of(&self, fragment: &GridFragment) -> Attributes {
        attributes([
            ("cell_id".to_string(), Value::from(fragment.cell_id)),
            (self.key_attribute.clone(), fragment.source_key.clone()),
            ("area_m2".to_string(), Value::from(fragment.area_m2)),
        ])
    }

    /// Fragments as polygon features carrying `cell_id`, the key
    /// attribute and `area_m2`.
    #[must_use]
    pub fn to_collection(&self) -> FeatureCollection {
        let features = self
            .items
            .iter()
            .map(|f| Feature::new(f.geometry.clone(), self.attributes_of(f)))
            .collect();
        FeatureCollection::new(self.crs, features)
    }

    /// Representative points as point features with the same attributes.
    /// Fragments without one are left out.
    #[must_use]
    pub fn points(&self) -> FeatureCollection {
        let features = self
            .items
            .iter()
            .filter_map(|f| {
                f.representative_point
                    .map(|p| Feature::new(p, self.attributes_of(f)))
            })
            .collect();
        FeatureCollection::new(self.crs, features)
    }
}

/// Intersects every cell of `grid` with every region of `regions`.
///
/// The work happens in the grid's projected CRS; `regions` may be in any
/// CRS. Each multi-part intersection is split into its polygons, and each
/// polygon inherits the region's `options.key_attribute` value. Pieces
/// with an area at or below `options.min_area_m2` are dropped. With
/// `options.resolve_representative_points` set, every piece also gets an
/// interior point and is dropped if that point is not inside it, in the
/// projected CRS or after reprojection to the output CRS.
/// Results are returned in the CRS of `grid.cells`.
///
/// # Errors
///
/// Returns [`GridError::Geometry`] if `regions` has no CRS.
pub fn intersect_grid(
    grid: &Grid,
    regions: &FeatureCollection,
    options: &FragmentOptions,
) -> Result<Fragments, GridError> {
    let projected_crs = grid.projected_crs;
    let output_crs = grid.cells.crs.unwrap_or(projected_crs);

    if regions.crs.is_none() {
        return Err(GeometryError::UnknownCrs.into());
    }

    let projected = reproject(regions, projected_crs)?;
    let index = RegionIndex::build(&projected);

    let mut items = Vec::new();
    let mut slivers = 0usize;
    let mut unresolved = 0usize;

    for (cell_id, cell) in grid.projected_cells().enumerate() {
        let cell_polygon = MultiPolygon::new(vec![cell.to_polygon()]);

        let mut candidates: Vec<_> = index.overlapping(cell).collect();
        candidates.sort_by_key(|entry| entry.region);

        for entry in candidates {
            let clipped = cell_polygon.intersection(&entry.polygon);

            for part in clipped.0 {
                let area_m2 = part.unsigned_area();
                if area_m2 <= options.min_area_m2 {
                    slivers += 1;
                    continue;
                }

                let geometry = part.map_coords(|c| transform_coord(c, projected_crs, output_crs));

                // Reprojected edges are not straight lines in the projected
                // CRS, so containment is checked on both sides.
                let representative_point = if options.resolve_representative_points {
                    let point = part
                        .interior_point()
                        .filter(|p| part.contains(p))
                        .map(|p| transform_point(p, projected_crs, output_crs))
                        .filter(|p| geometry.contains(p));
                    if point.is_none() {
                        unresolved += 1;
                        continue;
                    }
                    point
                } else {
                    None
                };

                let source_key = projected.features[entry.region]
                    .attribute(&options.key_attribute)
                    .cloned()
                    .unwrap_or(Value::Null);

                items.push(GridFragment {
                    cell_id,
                    region: entry.region,
                    source_key,
                    geometry,
                    representative_point,
                    area_m2,
                });
            }
        }
    }

    if slivers > 0 {
        log::debug!(
            "Dropped {slivers} fragments at or below {} m²",
            options.min_area_m2
        );
    }
    if unresolved > 0 {
        log::warn!("Dropped {unresolved} fragments without a contained representative point");
    }

    log::info!(
        "Cut {} cells against {} regions into {} fragments keyed by {}",
        grid.len(),
        regions.len(),
        items.len(),
        options.key_attribute
    );

    Ok(Fragments {
        crs: output_crs,
        key_attribute: options.key_attribute.clone(),
        items,
    })
}
