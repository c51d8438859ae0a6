//! Hex RGB colors.

use std::fmt;
use std::str::FromStr;

use crate::StyleError;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

impl Rgb {
    /// Creates a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scales every channel by `factor` (0 = black, 1 = unchanged).
    #[must_use]
    pub fn darken(self, factor: f64) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        Self {
            r: channel(f64::from(self.r) * factor),
            g: channel(f64::from(self.g) * factor),
            b: channel(f64::from(self.b) * factor),
        }
    }

    /// Linear interpolation from `self` (t = 0) to `other` (t = 1).
    #[must_use]
    #[allow(clippy::suboptimal_flops)]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| channel(f64::from(a) + (f64::from(b) - f64::from(a)) * t);
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

impl FromStr for Rgb {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StyleError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;

        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(invalid()),
        };

        let value = u32::from_str_radix(&expanded, 16).map_err(|_| invalid())?;
        let [_, r, g, b] = value.to_be_bytes();
        Ok(Self { r, g, b })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Darkens a hex color; used to derive border colors from fills.
///
/// # Errors
///
/// Returns [`StyleError::InvalidColor`] if `hex` is not a hex color.
pub fn darken_hex(hex: &str, factor: f64) -> Result<String, StyleError> {
    Ok(hex.parse::<Rgb>()?.darken(factor).to_string())
}
