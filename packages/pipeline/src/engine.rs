//! The shared density core behind every map.

use parish_map_geometry::{FeatureCollection, GeometryError, merge_collections};
use parish_map_grid::{Fragments, Grid, GridOptions, build_grid, intersect_grid};
use parish_map_spatial::{DensityLayer, aggregate, join_points};
use parish_map_style::ColorScale;

use crate::config::FragmentSettings;
use crate::{PipelineConfig, PipelineError};

/// Attribute holding the number of points in a grid cell.
pub const COUNT_FIELD: &str = "count";

/// Attribute holding a precomputed fill color.
pub const FILL_FIELD: &str = "fill_color";

/// A grid with per-cell point counts.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    /// The grid the points were counted into.
    pub grid: Grid,
    /// Grid cells carrying [`COUNT_FIELD`] and [`FILL_FIELD`].
    pub layer: DensityLayer,
    /// The merged point layer that was counted.
    pub points: FeatureCollection,
}

impl DensityGrid {
    /// Cells holding at least one counted point.
    #[must_use]
    pub fn active_cells(&self) -> FeatureCollection {
        let features = self
            .layer
            .regions
            .iter()
            .zip(self.layer.counts())
            .filter(|(_, count)| *count > 0)
            .map(|(cell, _)| cell.clone())
            .collect();

        FeatureCollection {
            crs: self.layer.regions.crs,
            features,
        }
    }
}

/// Builds density grids and grid fragments with one set of options.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityEngine {
    grid_options: GridOptions,
    fragment_settings: FragmentSettings,
}

impl DensityEngine {
    /// Engine using the grid and fragment settings of `config`.
    #[must_use]
    pub const fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.grid_options(), config.fragments)
    }

    /// Engine with explicit options.
    #[must_use]
    pub const fn new(grid_options: GridOptions, fragment_settings: FragmentSettings) -> Self {
        Self {
            grid_options,
            fragment_settings,
        }
    }

    /// Grid options used for every grid.
    #[must_use]
    pub const fn grid_options(&self) -> &GridOptions {
        &self.grid_options
    }

    /// Builds a grid sized from `reference` and counts `point_layers` into
    /// it. Layers are merged first, so a point present in two layers is
    /// counted twice. Cells are colored on a `YlOrRd` scale over
    /// `(0, max count)`; empty cells get the neutral color.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the grid cannot be built or a point
    /// layer cannot be reprojected.
    pub fn density_grid(
        &self,
        reference: &FeatureCollection,
        point_layers: &[&FeatureCollection],
    ) -> Result<DensityGrid, PipelineError> {
        let grid = build_grid(reference, &self.grid_options)?;
        let cell_crs = grid.cells.crs.ok_or(GeometryError::UnknownCrs)?;
        let points = merge_collections(point_layers, cell_crs)?;

        let mut layer = count_points(&grid.cells, &points, COUNT_FIELD)?;
        paint_counts(&mut layer);

        log::info!(
            "Density grid: {} cells of {:.1} m, {} of {} points counted, max {}",
            grid.len(),
            grid.cell_size,
            layer.total(),
            points.len(),
            layer.range.max
        );

        Ok(DensityGrid {
            grid,
            layer,
            points,
        })
    }

    /// Builds a grid sized from `regions` and clips it against them, keying
    /// each fragment on `key_attribute`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Grid`] if the grid cannot be built or
    /// clipped.
    pub fn fragments(
        &self,
        regions: &FeatureCollection,
        key_attribute: &str,
    ) -> Result<(Grid, Fragments), PipelineError> {
        let grid = build_grid(regions, &self.grid_options)?;
        let fragments = intersect_grid(
            &grid,
            regions,
            &self.fragment_settings.options(key_attribute),
        )?;

        log::info!(
            "Clipped {} cells against {} regions into {} fragments keyed on {key_attribute}",
            grid.len(),
            regions.len(),
            fragments.len()
        );

        Ok((grid, fragments))
    }
}

/// Counts `points` into `regions` under `field`, zeros included.
///
/// # Errors
///
/// Returns [`PipelineError::Spatial`] if the layers cannot be brought into
/// the same CRS.
pub fn count_points(
    regions: &FeatureCollection,
    points: &FeatureCollection,
    field: &str,
) -> Result<DensityLayer, PipelineError> {
    let join = join_points(regions, points)?;
    Ok(aggregate(regions, &join, field))
}

/// The features of `points` lying inside any of `regions`, in the CRS of
/// `points`.
///
/// # Errors
///
/// Returns [`PipelineError::Spatial`] if the layers cannot be brought into
/// the same CRS.
pub fn points_within(
    regions: &FeatureCollection,
    points: &FeatureCollection,
) -> Result<FeatureCollection, PipelineError> {
    let join = join_points(regions, points)?;
    let features = points
        .iter()
        .enumerate()
        .filter(|(i, _)| join.region_of(*i).is_some())
        .map(|(_, f)| f.clone())
        .collect();

    Ok(FeatureCollection {
        crs: points.crs,
        features,
    })
}

/// Writes a fill color for every cell's count.
fn paint_counts(layer: &mut DensityLayer) {
    let scale = ColorScale::from_range(layer.range);
    let counts = layer.counts();
    for (feature, count) in layer.regions.features.iter_mut().zip(counts) {
        feature
            .attributes
            .insert(FILL_FIELD.to_string(), scale.color_for(count).into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Rect, coord, point};
    use parish_map_geometry::{Crs, Feature, reproject};
    use parish_map_grid::EdgePolicy;
    use serde_json::Value;

    fn square(x: f64, y: f64, side: f64) -> Feature {
        Feature::from_geometry(
            Rect::new(coord! { x: x, y: y }, coord! { x: x + side, y: y + side }).to_polygon(),
        )
    }

    fn engine(edge_policy: EdgePolicy) -> DensityEngine {
        let config = PipelineConfig::embedded().unwrap();
        DensityEngine::new(
            GridOptions {
                projected_crs: Crs::UTM_17S,
                edge_policy,
            },
            config.fragments,
        )
    }

    const X0: f64 = 780_000.0;
    const Y0: f64 = 9_970_000.0;

    /// Two 1 km parishes side by side, in projected meters.
    fn reference() -> FeatureCollection {
        FeatureCollection::new(
            Crs::UTM_17S,
            vec![
                square(X0, Y0, 1_000.0).with_attribute("nombre", "A"),
                square(X0 + 1_000.0, Y0, 1_000.0).with_attribute("nombre", "B"),
            ],
        )
    }

    fn points(coords: &[(f64, f64)]) -> FeatureCollection {
        FeatureCollection::new(
            Crs::UTM_17S,
            coords
                .iter()
                .map(|(x, y)| Feature::from_geometry(point! { x: X0 + x, y: Y0 + y }))
                .collect(),
        )
    }

    fn counts(grid: &DensityGrid) -> Vec<u64> {
        grid.layer.counts()
    }

    #[test]
    fn counts_merged_layers_into_cells() {
        let universities = points(&[(100.0, 100.0), (200.0, 300.0)]);
        let stops = points(&[(1_500.0, 500.0), (5_000.0, 5_000.0)]);

        let density = engine(EdgePolicy::OmitPartial)
            .density_grid(&reference(), &[&universities, &stops])
            .unwrap();

        assert_eq!(density.grid.len(), 2);
        assert_eq!(density.points.len(), 4);
        assert_eq!(counts(&density), vec![2, 1]);
        assert_eq!(density.layer.range.max, 2);
        assert_eq!(density.layer.total(), 3);
    }

    #[test]
    fn empty_cells_are_painted_neutral() {
        let universities = points(&[(100.0, 100.0)]);
        let density = engine(EdgePolicy::OmitPartial)
            .density_grid(&reference(), &[&universities])
            .unwrap();

        let fills: Vec<&str> = density
            .layer
            .regions
            .iter()
            .map(|f| f.attribute(FILL_FIELD).and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(fills, vec!["#800026", "#ffffff"]);
    }

    #[test]
    fn no_points_yields_all_zero_counts() {
        let density = engine(EdgePolicy::OmitPartial)
            .density_grid(&reference(), &[])
            .unwrap();
        assert_eq!(counts(&density), vec![0, 0]);
        assert_eq!(density.layer.range.max, 0);
    }

    #[test]
    fn geographic_points_are_reprojected_before_counting() {
        let geographic = reproject(&points(&[(100.0, 100.0), (1_100.0, 900.0)]), Crs::Wgs84)
            .unwrap();
        let density = engine(EdgePolicy::OmitPartial)
            .density_grid(&reference(), &[&geographic])
            .unwrap();
        assert_eq!(counts(&density), vec![1, 1]);
    }

    #[test]
    fn density_is_deterministic() {
        let pts = points(&[(10.0, 10.0), (999.0, 999.0), (1_001.0, 1.0)]);
        let a = engine(EdgePolicy::IncludePartial)
            .density_grid(&reference(), &[&pts])
            .unwrap();
        let b = engine(EdgePolicy::IncludePartial)
            .density_grid(&reference(), &[&pts])
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn clips_grid_against_regions() {
        let (grid, fragments) = engine(EdgePolicy::OmitPartial)
            .fragments(&reference(), "nombre")
            .unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(fragments.len(), 2);
        let keys: Vec<&Value> = fragments.items.iter().map(|f| &f.source_key).collect();
        assert_eq!(keys, vec![&Value::from("A"), &Value::from("B")]);
    }

    #[test]
    fn active_cells_skip_empty_ones() {
        let universities = points(&[(100.0, 100.0), (200.0, 200.0)]);
        let density = engine(EdgePolicy::OmitPartial)
            .density_grid(&reference(), &[&universities])
            .unwrap();

        let active = density.active_cells();
        assert_eq!(active.crs, density.layer.regions.crs);
        assert_eq!(active.len(), 1);
        assert_eq!(active.features[0].attribute(COUNT_FIELD), Some(&Value::from(2)));
    }

    #[test]
    fn keeps_only_points_inside_regions() {
        let geographic = reproject(
            &points(&[(100.0, 100.0), (5_000.0, 5_000.0), (1_500.0, 500.0)]),
            Crs::Wgs84,
        )
        .unwrap();
        let cells = reference().filtered(|f| f.attribute_text("nombre").as_deref() == Some("A"));

        let inside = points_within(&cells, &geographic).unwrap();
        assert_eq!(inside.crs, Some(Crs::Wgs84));
        assert_eq!(inside.len(), 1);
        assert_eq!(inside.features[0], geographic.features[0]);

        let none = points_within(&FeatureCollection::new(Crs::UTM_17S, vec![]), &geographic);
        assert!(none.unwrap().is_empty());
    }

    #[test]
    fn degenerate_reference_is_an_error() {
        let empty = FeatureCollection::new(Crs::UTM_17S, vec![]);
        assert!(matches!(
            engine(EdgePolicy::OmitPartial).density_grid(&empty, &[]),
            Err(PipelineError::Grid(_))
        ));
    }
}
