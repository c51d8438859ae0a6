//! Color scales for choropleth layers.
//!
//! [`ColorScale`] colors density counts on a continuous yellow-orange-red
//! ramp calibrated to `(0, max)`, with empty regions shown in a neutral
//! color. [`BandedScale`] splits values into tertiles and gives each
//! band its own three-color gradient.

use parish_map_spatial::CountRange;

use crate::Rgb;

/// The nine-class `YlOrRd` ramp, light to dark.
pub const YL_OR_RD: [Rgb; 9] = [
    Rgb::new(0xff, 0xff, 0xcc),
    Rgb::new(0xff, 0xed, 0xa0),
    Rgb::new(0xfe, 0xd9, 0x76),
    Rgb::new(0xfe, 0xb2, 0x4c),
    Rgb::new(0xfd, 0x8d, 0x3c),
    Rgb::new(0xfc, 0x4e, 0x2a),
    Rgb::new(0xe3, 0x1a, 0x1c),
    Rgb::new(0xbd, 0x00, 0x26),
    Rgb::new(0x80, 0x00, 0x26),
];

/// Fill for regions with no points.
pub const NEUTRAL: Rgb = Rgb::new(0xff, 0xff, 0xff);

/// Per-tertile gradients for student counts: blues, greens, oranges.
pub const TERTILE_GRADIENTS: [[Rgb; 3]; 3] = [
    [
        Rgb::new(0xde, 0xeb, 0xf7),
        Rgb::new(0x9e, 0xca, 0xe1),
        Rgb::new(0x31, 0x82, 0xbd),
    ],
    [
        Rgb::new(0xe5, 0xf5, 0xe0),
        Rgb::new(0xa1, 0xd9, 0x9b),
        Rgb::new(0x31, 0xa3, 0x54),
    ],
    [
        Rgb::new(0xff, 0xf7, 0xbc),
        Rgb::new(0xfe, 0xc4, 0x4f),
        Rgb::new(0xd9, 0x5f, 0x0e),
    ],
];

/// Per-tertile gradients for population: purples, light blues, reds.
pub const POPULATION_GRADIENTS: [[Rgb; 3]; 3] = [
    [
        Rgb::new(0xf2, 0xf0, 0xf7),
        Rgb::new(0xcb, 0xc9, 0xe2),
        Rgb::new(0x9e, 0x9a, 0xc8),
    ],
    [
        Rgb::new(0xe7, 0xf0, 0xfa),
        Rgb::new(0xc6, 0xdb, 0xef),
        Rgb::new(0x6b, 0xae, 0xd6),
    ],
    [
        Rgb::new(0xfe, 0xe5, 0xd9),
        Rgb::new(0xfc, 0xae, 0x91),
        Rgb::new(0xfb, 0x6a, 0x4a),
    ],
];

/// Color at `t` in `[0, 1]` along evenly spaced `stops`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn ramp(stops: &[Rgb], t: f64) -> Rgb {
    match stops {
        [] => NEUTRAL,
        [only] => *only,
        _ => {
            let position = t.clamp(0.0, 1.0) * (stops.len() - 1) as f64;
            let lower = (position.floor() as usize).min(stops.len() - 2);
            stops[lower].lerp(stops[lower + 1], position - lower as f64)
        }
    }
}

/// A continuous scale from `min` to `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    min: f64,
    max: f64,
    stops: Vec<Rgb>,
    neutral: Rgb,
}

impl ColorScale {
    /// `YlOrRd` scale over a density count range.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_range(range: CountRange) -> Self {
        Self::new(range.min as f64, range.max as f64, YL_OR_RD.to_vec(), NEUTRAL)
    }

    /// A scale over `(min, max)` through `stops`, with `neutral` for zero.
    #[must_use]
    pub const fn new(min: f64, max: f64, stops: Vec<Rgb>, neutral: Rgb) -> Self {
        Self {
            min,
            max,
            stops,
            neutral,
        }
    }

    /// Color for `value`, clamped to the scale range.
    #[must_use]
    pub fn color_at(&self, value: f64) -> Rgb {
        let span = self.max - self.min;
        let t = if span > 0.0 {
            (value - self.min) / span
        } else {
            1.0
        };
        ramp(&self.stops, t)
    }

    /// Fill for a count: the neutral color for 0, the ramp otherwise.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn color_for(&self, count: u64) -> String {
        if count == 0 {
            self.neutral.to_string()
        } else {
            self.color_at(count as f64).to_string()
        }
    }

    /// Lower bound of the scale.
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound of the scale.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }
}

/// Linearly interpolated quantile of sorted values.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let lo = sorted[lower];
    lo + (sorted[upper] - lo) * (position - lower as f64)
}

/// One band of a [`BandedScale`].
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    /// Inclusive lower bound.
    pub lower: f64,
    /// Inclusive upper bound.
    pub upper: f64,
    /// Gradient across the band.
    pub gradient: [Rgb; 3],
}

/// Values split into consecutive bands, each with its own gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct BandedScale {
    bands: Vec<Band>,
}

impl BandedScale {
    /// Splits `values` at the 0, ⅓, ⅔ and 1 quantiles, rounded to whole
    /// numbers, using [`TERTILE_GRADIENTS`]. Returns `None` for no finite
    /// values.
    #[must_use]
    pub fn tertiles(values: &[f64]) -> Option<Self> {
        Self::tertiles_with(values, &TERTILE_GRADIENTS)
    }

    /// Same as [`Self::tertiles`] with one gradient per band from
    /// `gradients`.
    #[must_use]
    pub fn tertiles_with(values: &[f64], gradients: &[[Rgb; 3]; 3]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let bins: Vec<f64> = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]
            .iter()
            .map(|q| quantile(&sorted, *q).round())
            .collect();

        let bands = gradients
            .iter()
            .enumerate()
            .map(|(i, gradient)| Band {
                lower: bins[i],
                upper: bins[i + 1],
                gradient: *gradient,
            })
            .collect();

        Some(Self { bands })
    }

    /// The bands, lowest first.
    #[must_use]
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Index of the band containing `value`. A value on the shared edge of
    /// two bands belongs to the higher one.
    #[must_use]
    pub fn band_of(&self, value: f64) -> Option<usize> {
        self.bands
            .iter()
            .rposition(|b| b.lower <= value && value <= b.upper)
    }

    /// Fill for `value`, or `None` if it lies outside every band.
    #[must_use]
    pub fn color_for(&self, value: f64) -> Option<String> {
        let band = &self.bands[self.band_of(value)?];
        let span = band.upper - band.lower;
        let t = if span > 0.0 {
            (value - band.lower) / span
        } else {
            0.0
        };
        Some(ramp(&band.gradient, t).to_string())
    }
}

/// A stable color for a category name, for layers with one color per
/// category and no fixed palette.
#[must_use]
pub fn categorical_color(key: &str) -> String {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    let hash = key.bytes().fold(FNV_OFFSET, |acc, b| {
        (acc ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    });
    format!("#{:06x}", hash & 0x00ff_ffff)
}
