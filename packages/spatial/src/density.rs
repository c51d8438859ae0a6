//! Per-region density counts.
//!
//! Turns a [`PointJoin`] into an integer attribute on every region. Zero
//! counts are written explicitly so consumers can tell "no points" apart
//! from "not computed".

use parish_map_geometry::{Feature, FeatureCollection};
use serde::Serialize;

use crate::PointJoin;

/// Count range used to calibrate a color scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountRange {
    /// Always zero; the scale starts at "no points".
    pub min: u64,
    /// Largest count of any region.
    pub max: u64,
}

/// A region collection annotated with per-region counts.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityLayer {
    /// The regions, each carrying an integer `field` attribute.
    pub regions: FeatureCollection,
    /// Name of the count attribute.
    pub field: String,
    /// Range of the count attribute.
    pub range: CountRange,
}

impl DensityLayer {
    /// Count of every region, in region order.
    #[must_use]
    pub fn counts(&self) -> Vec<u64> {
        self.regions
            .iter()
            .map(|f| {
                f.attribute(&self.field)
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Sum of all region counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts().iter().sum()
    }
}

/// Writes the number of joined points of each region into `field`.
///
/// Every region of `regions` appears in the output, with 0 when no point
/// matched it. `join` must have been computed against `regions`.
#[must_use]
pub fn aggregate(regions: &FeatureCollection, join: &PointJoin, field: &str) -> DensityLayer {
    if join.region_count() != regions.len() {
        log::warn!(
            "Join was computed against {} regions but {} were supplied",
            join.region_count(),
            regions.len()
        );
    }

    let counts = join.counts();

    let features: Vec<Feature> = regions
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let count = counts.get(i).copied().unwrap_or(0);
            f.clone().with_attribute(field, count)
        })
        .collect();

    let max = counts.iter().copied().max().unwrap_or(0);

    log::debug!(
        "Aggregated {} points into {} regions (max {max})",
        counts.iter().sum::<u64>(),
        features.len()
    );

    DensityLayer {
        regions: FeatureCollection {
            crs: regions.crs,
            features,
        },
        field: field.to_string(),
        range: CountRange { min: 0, max },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join_points;
    use geo::{Rect, coord, point};
    use parish_map_geometry::Crs;

    fn square(x: f64, y: f64, side: f64) -> Feature {
        Feature::from_geometry(
            Rect::new(coord! { x: x, y: y }, coord! { x: x + side, y: y + side }).to_polygon(),
        )
        .with_attribute("nombre", format!("R{x}"))
    }

    #[test]
    fn every_region_gets_a_count() {
        let regions = FeatureCollection::new(
            Crs::UTM_17S,
            vec![square(0.0, 0.0, 10.0), square(10.0, 0.0, 10.0)],
        );
        let points = FeatureCollection::new(
            Crs::UTM_17S,
            vec![
                Feature::from_geometry(point! { x: 1.0, y: 1.0 }),
                Feature::from_geometry(point! { x: 2.0, y: 2.0 }),
            ],
        );

        let join = join_points(&regions, &points).unwrap();
        let layer = aggregate(&regions, &join, "count");

        assert_eq!(layer.counts(), vec![2, 0]);
        assert_eq!(layer.range, CountRange { min: 0, max: 2 });
        assert_eq!(layer.total(), 2);
        // Zero is written, not omitted.
        assert_eq!(layer.regions.features[1].attribute("count"), Some(&0.into()));
        // Existing attributes survive.
        assert_eq!(
            layer.regions.features[1].attribute_text("nombre").as_deref(),
            Some("R10")
        );
    }

    #[test]
    fn empty_join_gives_all_zero_counts() {
        let regions = FeatureCollection::new(Crs::UTM_17S, vec![square(0.0, 0.0, 10.0)]);
        let join = PointJoin::empty(0, regions.len());
        let layer = aggregate(&regions, &join, "n_estudiantes");
        assert_eq!(layer.counts(), vec![0]);
        assert_eq!(layer.range.max, 0);
    }
}
