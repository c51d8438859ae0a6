//! WGS84 <-> UTM reprojection.
//!
//! Uses the Krüger series form of the transverse Mercator projection on
//! the WGS84 ellipsoid, accurate to about a millimeter within a UTM zone.
//! UTM to UTM conversions go through geographic coordinates.

use std::sync::LazyLock;

use geo::{Coord, Geometry, MapCoords, Point, coord};
use parish_map_geometry_models::{Crs, Feature, FeatureCollection};

use crate::GeometryError;

/// WGS84 semi-major axis in meters.
const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// UTM scale factor on the central meridian.
const UTM_K0: f64 = 0.9996;

const UTM_FALSE_EASTING: f64 = 500_000.0;

const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Series coefficients derived from the ellipsoid's third flattening.
struct KrugerSeries {
    /// Eccentricity expressed through `n` (`2√n / (1 + n)`).
    eccentricity: f64,
    /// Rectifying radius.
    rectifying_radius: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

static SERIES: LazyLock<KrugerSeries> = LazyLock::new(|| {
    let n = WGS84_F / (2.0 - WGS84_F);
    let n2 = n * n;
    let n3 = n2 * n;

    KrugerSeries {
        eccentricity: 2.0 * n.sqrt() / (1.0 + n),
        rectifying_radius: WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
        alpha: [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
            61.0 * n3 / 240.0,
        ],
        beta: [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
            n2 / 48.0 + n3 / 15.0,
            17.0 * n3 / 480.0,
        ],
        delta: [
            2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
            7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
            56.0 * n3 / 15.0,
        ],
    }
});

/// Longitude of the central meridian of a UTM zone, in degrees.
fn central_meridian(zone: u8) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

const fn false_northing(south: bool) -> f64 {
    if south { UTM_FALSE_NORTHING_SOUTH } else { 0.0 }
}

/// Projects a longitude/latitude coordinate (degrees) into a UTM zone.
fn wgs84_to_utm(c: Coord<f64>, zone: u8, south: bool) -> Coord<f64> {
    let s = &*SERIES;
    let lat = c.y.to_radians();
    let dlon = (c.x - central_meridian(zone)).to_radians();

    let t = (lat.sin().atanh() - s.eccentricity * (s.eccentricity * lat.sin()).atanh()).sinh();
    let xi = t.atan2(dlon.cos());
    let eta = (dlon.sin() / t.mul_add(t, 1.0).sqrt()).atanh();

    let mut easting = eta;
    let mut northing = xi;
    for (j, alpha) in (1..=3_u8).zip(s.alpha) {
        let k = 2.0 * f64::from(j);
        easting += alpha * (k * xi).cos() * (k * eta).sinh();
        northing += alpha * (k * xi).sin() * (k * eta).cosh();
    }

    let scale = UTM_K0 * s.rectifying_radius;
    coord! {
        x: scale.mul_add(easting, UTM_FALSE_EASTING),
        y: scale.mul_add(northing, false_northing(south)),
    }
}

/// Inverse of [`wgs84_to_utm`].
fn utm_to_wgs84(c: Coord<f64>, zone: u8, south: bool) -> Coord<f64> {
    let s = &*SERIES;
    let scale = UTM_K0 * s.rectifying_radius;
    let xi = (c.y - false_northing(south)) / scale;
    let eta = (c.x - UTM_FALSE_EASTING) / scale;

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, beta) in (1..=3_u8).zip(s.beta) {
        let k = 2.0 * f64::from(j);
        xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
        eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut lat = chi;
    for (j, delta) in (1..=3_u8).zip(s.delta) {
        lat += delta * (2.0 * f64::from(j) * chi).sin();
    }

    let dlon = eta_p.sinh().atan2(xi_p.cos());

    coord! {
        x: central_meridian(zone) + dlon.to_degrees(),
        y: lat.to_degrees(),
    }
}

/// Transforms a single coordinate from `from` to `to`.
#[must_use]
pub fn transform_coord(c: Coord<f64>, from: Crs, to: Crs) -> Coord<f64> {
    match (from, to) {
        _ if from == to => c,
        (Crs::Wgs84, Crs::Utm { zone, south }) => wgs84_to_utm(c, zone, south),
        (Crs::Utm { zone, south }, Crs::Wgs84) => utm_to_wgs84(c, zone, south),
        (
            Crs::Utm { zone, south },
            Crs::Utm {
                zone: to_zone,
                south: to_south,
            },
        ) => wgs84_to_utm(utm_to_wgs84(c, zone, south), to_zone, to_south),
        (Crs::Wgs84, Crs::Wgs84) => c,
    }
}

/// Transforms a point from `from` to `to`.
#[must_use]
pub fn transform_point(p: Point<f64>, from: Crs, to: Crs) -> Point<f64> {
    Point(transform_coord(p.0, from, to))
}

/// Transforms every coordinate of a geometry from `from` to `to`.
#[must_use]
pub fn transform_geometry(geometry: &Geometry<f64>, from: Crs, to: Crs) -> Geometry<f64> {
    if from == to {
        return geometry.clone();
    }
    geometry.map_coords(move |c| transform_coord(c, from, to))
}

/// Reprojects every geometry of `collection` into `target`.
///
/// Attributes are carried over unchanged and the returned collection is
/// tagged with `target`. The input is never modified.
///
/// # Errors
///
/// Returns [`GeometryError::UnknownCrs`] if `collection` has no CRS.
pub fn reproject(
    collection: &FeatureCollection,
    target: Crs,
) -> Result<FeatureCollection, GeometryError> {
    let source = collection.crs.ok_or(GeometryError::UnknownCrs)?;

    if source == target {
        return Ok(collection.clone());
    }

    log::trace!(
        "Reprojecting {} features from {source} to {target}",
        collection.len()
    );

    let features = collection
        .iter()
        .map(|f| Feature {
            geometry: transform_geometry(&f.geometry, source, target),
            attributes: f.attributes.clone(),
        })
        .collect();

    Ok(FeatureCollection::new(target, features))
}
