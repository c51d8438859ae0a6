#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index over region polygons.
//!
//! Builds an R-tree over the envelopes of a region collection (grid cells
//! or parish boundaries) and answers point-in-region and
//! envelope-overlap queries. Used by the point join, the density
//! aggregator, and the grid/region intersection step.

pub mod density;
pub mod join;

pub use density::{CountRange, DensityLayer, aggregate};
pub use join::{PointJoin, join_points};

use geo::{BoundingRect, Contains, Geometry, MultiPolygon, Point, Rect};
use parish_map_geometry::{FeatureCollection, GeometryError};
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

/// Errors that can occur during spatial joins.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Reprojection of the point layer failed.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

/// A region polygon stored in the R-tree with its position in the source
/// collection.
pub struct RegionEntry {
    /// Index of the region in the collection the index was built from.
    pub region: usize,
    envelope: AABB<[f64; 2]>,
    /// The region geometry.
    pub polygon: MultiPolygon<f64>,
}

impl RTreeObject for RegionEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over the polygonal features of a region collection.
///
/// Non-polygonal features are not indexed and therefore never match.
pub struct RegionIndex {
    regions: RTree<RegionEntry>,
    region_count: usize,
}

impl RegionIndex {
    /// Builds the index from every polygonal feature of `regions`.
    #[must_use]
    pub fn build(regions: &FeatureCollection) -> Self {
        let mut entries = Vec::with_capacity(regions.len());

        for (region, feature) in regions.iter().enumerate() {
            let Some(polygon) = to_multipolygon(&feature.geometry) else {
                log::debug!("Region {region} is not polygonal, leaving it out of the index");
                continue;
            };

            let Some(envelope) = compute_envelope(&polygon) else {
                continue;
            };

            entries.push(RegionEntry {
                region,
                envelope,
                polygon,
            });
        }

        log::debug!(
            "Indexed {} of {} regions",
            entries.len(),
            regions.len()
        );

        Self {
            regions: RTree::bulk_load(entries),
            region_count: regions.len(),
        }
    }

    /// Number of regions in the source collection (indexed or not).
    #[must_use]
    pub const fn region_count(&self) -> usize {
        self.region_count
    }

    /// Number of regions that made it into the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.size()
    }

    /// Whether no region was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.size() == 0
    }

    /// Looks up the region whose interior contains `point`.
    ///
    /// Points on a region boundary are not contained. Regions are expected
    /// not to overlap; if they do, the lowest region index wins so results
    /// do not depend on R-tree traversal order.
    #[must_use]
    pub fn locate(&self, point: Point<f64>) -> Option<usize> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        self.regions
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.region)
            .min()
    }

    /// Returns every indexed region whose envelope overlaps `rect`.
    pub fn overlapping(&self, rect: Rect<f64>) -> impl Iterator<Item = &RegionEntry> {
        let query_env =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        self.regions.locate_in_envelope_intersecting(&query_env)
    }
}

/// Normalizes a polygonal geometry into a [`MultiPolygon`].
#[must_use]
pub fn to_multipolygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
