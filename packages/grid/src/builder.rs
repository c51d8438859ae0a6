//! Median-area square grid construction.

use geo::{Coord, Rect, coord};
use parish_map_geometry::{
    Crs, Feature, FeatureCollection, GeometryError, projected_areas, reproject,
};
use serde::{Deserialize, Serialize};

use crate::GridError;

/// Relative slack when deciding whether a cell reaches the bounding box
/// edge, so `40 / 20` is two cells and not one.
const EDGE_TOLERANCE: f64 = 1e-9;

/// How cells that would stick out past the far edge of the bounding box
/// are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Only whole cells inside the box. The far strip narrower than one
    /// cell is left uncovered. At least one cell per axis is always kept.
    #[default]
    OmitPartial,
    /// Keep stepping while the cell origin is below the max, so the last
    /// row/column extends past the box.
    IncludePartial,
}

impl EdgePolicy {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::suboptimal_flops
    )]
    fn steps(self, extent: f64, cell_size: f64) -> usize {
        let ratio = extent / cell_size;
        let steps = match self {
            Self::OmitPartial => (ratio * (1.0 + EDGE_TOLERANCE)).floor(),
            Self::IncludePartial => (ratio * (1.0 - EDGE_TOLERANCE)).ceil(),
        };
        (steps.max(0.0) as usize).max(1)
    }
}

/// Grid construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridOptions {
    /// Metric CRS in which areas are measured and cells are laid out.
    pub projected_crs: Crs,
    /// Treatment of the far edge of the bounding box.
    #[serde(default)]
    pub edge_policy: EdgePolicy,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            projected_crs: Crs::UTM_17S,
            edge_policy: EdgePolicy::default(),
        }
    }
}

/// A uniform square tiling of a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Cell side length in meters.
    pub cell_size: f64,
    /// Lower-left corner of cell `(0, 0)` in the projected CRS.
    pub origin: Coord<f64>,
    /// Number of cells along x.
    pub columns: usize,
    /// Number of cells along y.
    pub rows: usize,
    /// CRS the cells were laid out in.
    pub projected_crs: Crs,
    /// The cells, column-major, in the reference collection's CRS. Each
    /// carries `cell_id`, `col` and `row` attributes.
    pub cells: FeatureCollection,
}

impl Grid {
    /// Number of cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns * self.rows
    }

    /// Whether the grid has no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell `(col, row)` as a rectangle in the projected CRS.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn projected_cell(&self, col: usize, row: usize) -> Rect<f64> {
        let min = coord! {
            x: self.origin.x + col as f64 * self.cell_size,
            y: self.origin.y + row as f64 * self.cell_size,
        };
        Rect::new(
            min,
            coord! { x: min.x + self.cell_size, y: min.y + self.cell_size },
        )
    }

    /// Every cell in the projected CRS, in `cell_id` order.
    pub fn projected_cells(&self) -> impl Iterator<Item = Rect<f64>> + '_ {
        (0..self.columns)
            .flat_map(move |col| (0..self.rows).map(move |row| self.projected_cell(col, row)))
    }

    fn cell_features(&self) -> FeatureCollection {
        let features = (0..self.columns)
            .flat_map(|col| (0..self.rows).map(move |row| (col, row)))
            .enumerate()
            .map(|(cell_id, (col, row))| {
                Feature::from_geometry(self.projected_cell(col, row).to_polygon())
                    .with_attribute("cell_id", cell_id)
                    .with_attribute("col", col)
                    .with_attribute("row", row)
            })
            .collect();

        FeatureCollection::new(self.projected_crs, features)
    }
}

/// Median of `values`; the mean of the two middle values for even counts.
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(f64::midpoint(values[mid - 1], values[mid]))
    } else {
        Some(values[mid])
    }
}

/// Builds a square grid sized from the median area of `reference`.
///
/// The reference polygons are reprojected into `options.projected_crs`,
/// the cell side is `sqrt(median(area))`, and cells are laid out from the
/// lower-left corner of the polygons' combined bounding box. Cell `(c, r)`
/// starts at `(minx + c·L, miny + r·L)`, so the layout depends only on
/// the box and `L`. The cells are returned in `reference`'s own CRS.
///
/// Non-polygonal reference features are ignored.
///
/// # Errors
///
/// Returns [`GridError::Geometry`] if `reference` has no CRS, or
/// [`GridError::DegenerateInput`] if there are no polygons or the median
/// area is zero or not finite.
pub fn build_grid(reference: &FeatureCollection, options: &GridOptions) -> Result<Grid, GridError> {
    let source_crs = reference.crs.ok_or(GeometryError::UnknownCrs)?;

    let projected = reproject(reference, options.projected_crs)?;
    let polygons = projected.filtered(Feature::is_polygonal);

    if polygons.len() < reference.len() {
        log::debug!(
            "Ignoring {} non-polygonal reference features",
            reference.len() - polygons.len()
        );
    }

    let mut areas = projected_areas(&polygons)?;
    let median_area = median(&mut areas).ok_or_else(|| GridError::DegenerateInput {
        message: "no reference polygons".to_string(),
    })?;

    if !median_area.is_finite() || median_area <= 0.0 {
        return Err(GridError::DegenerateInput {
            message: format!("median reference area is {median_area} m²"),
        });
    }

    let cell_size = median_area.sqrt();

    let bounds = polygons
        .bounding_rect()
        .ok_or_else(|| GridError::DegenerateInput {
            message: "reference polygons have no extent".to_string(),
        })?;

    let mut grid = Grid {
        cell_size,
        origin: bounds.min(),
        columns: options.edge_policy.steps(bounds.width(), cell_size),
        rows: options.edge_policy.steps(bounds.height(), cell_size),
        projected_crs: options.projected_crs,
        cells: FeatureCollection::default(),
    };

    grid.cells = reproject(&grid.cell_features(), source_crs)?;

    log::info!(
        "Built {}x{} grid ({} cells) with {cell_size:.1} m cells from {} reference polygons",
        grid.columns,
        grid.rows,
        grid.len(),
        polygons.len()
    );

    Ok(grid)
}
