//! Point-in-region spatial join.
//!
//! Assigns every point of a (possibly merged) point layer to the region
//! whose interior contains it. Points outside every region stay
//! unassigned; they are never an error and never counted.

use std::collections::BTreeMap;

use parish_map_geometry::{FeatureCollection, GeometryError, reproject};

use crate::{RegionIndex, SpatialError};

/// Result of joining a point layer against a region collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointJoin {
    /// For each input point, the index of its containing region.
    assignments: Vec<Option<usize>>,
    region_count: usize,
}

impl PointJoin {
    /// A join in which no point matched.
    #[must_use]
    pub fn empty(point_count: usize, region_count: usize) -> Self {
        Self {
            assignments: vec![None; point_count],
            region_count,
        }
    }

    /// Region containing point `point`, if any.
    #[must_use]
    pub fn region_of(&self, point: usize) -> Option<usize> {
        self.assignments.get(point).copied().flatten()
    }

    /// Per-point region assignment, in point order.
    #[must_use]
    pub fn assignments(&self) -> &[Option<usize>] {
        &self.assignments
    }

    /// Number of input points.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.assignments.len()
    }

    /// Number of regions the points were joined against.
    #[must_use]
    pub const fn region_count(&self) -> usize {
        self.region_count
    }

    /// Number of points that fell inside some region.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_some()).count()
    }

    /// Number of points outside every region.
    #[must_use]
    pub fn unmatched(&self) -> usize {
        self.point_count() - self.matched()
    }

    /// Point indices grouped by region. Regions with no points are absent.
    #[must_use]
    pub fn by_region(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut grouped: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (point, region) in self.assignments.iter().enumerate() {
            if let Some(region) = region {
                grouped.entry(*region).or_default().push(point);
            }
        }
        grouped
    }

    /// Number of points per region, for every region (zeros included).
    #[must_use]
    pub fn counts(&self) -> Vec<u64> {
        let mut counts = vec![0u64; self.region_count];
        for region in self.assignments.iter().flatten() {
            counts[*region] += 1;
        }
        counts
    }
}

/// Joins `points` against `regions` by strict interior containment.
///
/// The point layer is reprojected into the regions' CRS first. Only
/// `Point` geometries can match; anything else is left unassigned.
/// An empty region collection yields an empty join.
///
/// # Errors
///
/// Returns [`SpatialError::Geometry`] if either collection lacks a CRS
/// while both are non-empty.
pub fn join_points(
    regions: &FeatureCollection,
    points: &FeatureCollection,
) -> Result<PointJoin, SpatialError> {
    if regions.is_empty() || points.is_empty() {
        return Ok(PointJoin::empty(points.len(), regions.len()));
    }

    let target = regions.crs.ok_or(GeometryError::UnknownCrs)?;
    let points = reproject(points, target)?;

    let index = RegionIndex::build(regions);
    let join = join_with_index(&index, &points);

    log::info!(
        "Joined {} points against {} regions: {} matched, {} outside",
        join.point_count(),
        join.region_count(),
        join.matched(),
        join.unmatched()
    );

    Ok(join)
}

/// Joins `points` against a prebuilt index. The caller guarantees both
/// are in the same CRS.
#[must_use]
pub fn join_with_index(index: &RegionIndex, points: &FeatureCollection) -> PointJoin {
    let assignments = points
        .iter()
        .map(|feature| feature.as_point().and_then(|p| index.locate(p)))
        .collect();

    PointJoin {
        assignments,
        region_count: index.region_count(),
    }
}
