//! Shared parsing utilities for tabular sources.
//!
//! Spreadsheet exports mix decimal separators and thousands separators,
//! so numbers are parsed leniently and anything that still fails is
//! reported as `None` for the caller to drop.

use std::sync::LazyLock;

use regex::Regex;

/// Matches a `"lat,lon"` pair, with optional whitespace and either `,` or
/// `;` between the two numbers.
static LAT_LNG_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\(?\s*(-?\d+(?:\.\d+)?)\s*[,;]\s*(-?\d+(?:\.\d+)?)\s*\)?\s*$")
        .expect("valid regex")
});

/// Parses a decimal number, accepting `,` as the decimal separator when
/// no `.` is present.
#[must_use]
pub fn parse_decimal(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let value = if s.contains('.') {
        s.parse::<f64>().ok()?
    } else {
        s.replacen(',', ".", 1).parse::<f64>().ok()?
    };
    value.is_finite().then_some(value)
}

/// Parses a count that may carry `,` thousands separators (`"12,345"`).
#[must_use]
pub fn parse_thousands(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Validates a latitude/longitude pair.
///
/// Zero is a legitimate coordinate near the equator, so only non-finite
/// or out-of-range values are rejected.
#[must_use]
pub fn valid_lat_lng(latitude: f64, longitude: f64) -> Option<(f64, f64)> {
    let ok = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);
    ok.then_some((latitude, longitude))
}

/// Parses lat/lng from optional string fields. Returns `None` if missing,
/// unparseable, or out of range.
#[must_use]
pub fn parse_lat_lng_str(lat: Option<&String>, lng: Option<&String>) -> Option<(f64, f64)> {
    let latitude = parse_decimal(lat?)?;
    let longitude = parse_decimal(lng?)?;
    valid_lat_lng(latitude, longitude)
}

/// Parses a single `"lat,lon"` text field.
#[must_use]
pub fn parse_lat_lng_pair(s: &str) -> Option<(f64, f64)> {
    let captures = LAT_LNG_PAIR_RE.captures(s)?;
    let latitude = captures.get(1)?.as_str().parse::<f64>().ok()?;
    let longitude = captures.get(2)?.as_str().parse::<f64>().ok()?;
    valid_lat_lng(latitude, longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lat_lng_strings() {
        let lat = "-0.1807".to_string();
        let lng = "-78.4678".to_string();
        let (la, lo) = parse_lat_lng_str(Some(&lat), Some(&lng)).unwrap();
        assert!((la - -0.1807).abs() < f64::EPSILON);
        assert!((lo - -78.4678).abs() < f64::EPSILON);
    }

    #[test]
    fn accepts_decimal_commas() {
        let lat = "-0,2".to_string();
        let lng = "-78,5".to_string();
        assert_eq!(parse_lat_lng_str(Some(&lat), Some(&lng)), Some((-0.2, -78.5)));
    }

    #[test]
    fn keeps_zero_coordinates() {
        let lat = "0.0".to_string();
        let lng = "-78.5".to_string();
        assert_eq!(parse_lat_lng_str(Some(&lat), Some(&lng)), Some((0.0, -78.5)));
    }

    #[test]
    fn rejects_missing_or_bad_lat_lng() {
        let lng = "-78.5".to_string();
        let bad = "n/a".to_string();
        let far = "120".to_string();
        assert!(parse_lat_lng_str(None, Some(&lng)).is_none());
        assert!(parse_lat_lng_str(Some(&bad), Some(&lng)).is_none());
        assert!(parse_lat_lng_str(Some(&far), Some(&lng)).is_none());
    }

    #[test]
    fn parses_coordinate_pairs() {
        assert_eq!(parse_lat_lng_pair("-0.2, -78.5"), Some((-0.2, -78.5)));
        assert_eq!(parse_lat_lng_pair("(-0.2;-78.5)"), Some((-0.2, -78.5)));
        assert_eq!(parse_lat_lng_pair("-0.2"), None);
        assert_eq!(parse_lat_lng_pair(""), None);
    }

    #[test]
    fn parses_thousands_separators() {
        assert_eq!(parse_thousands("12,345"), Some(12_345.0));
        assert_eq!(parse_thousands(" 1,234,567 "), Some(1_234_567.0));
        assert_eq!(parse_thousands("800"), Some(800.0));
        assert_eq!(parse_thousands("abc"), None);
        assert_eq!(parse_thousands(""), None);
    }
}
