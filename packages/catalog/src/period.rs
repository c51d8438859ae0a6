//! Academic period selection and baseline rules.
//!
//! Career offerings are tagged with the period they were published for.
//! Some offerings are only published once under a baseline tag, so a
//! period's catalog is its own rows plus the rows of its baseline.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Maps a period to the baseline tag whose rows also apply to it.
///
/// Periods listed in `recent` use `recent_baseline`; every other period
/// uses `default_baseline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodRules {
    /// Periods served by `recent_baseline`.
    pub recent: Vec<String>,
    /// Baseline tag for the `recent` periods.
    pub recent_baseline: String,
    /// Baseline tag for all other periods.
    pub default_baseline: String,
}

impl Default for PeriodRules {
    fn default() -> Self {
        Self {
            recent: vec!["202410".to_string(), "202420".to_string()],
            recent_baseline: "202400".to_string(),
            default_baseline: "202520".to_string(),
        }
    }
}

impl PeriodRules {
    /// Baseline tag for `period`.
    #[must_use]
    pub fn baseline_for(&self, period: &str) -> &str {
        let period = period.trim();
        if self.recent.iter().any(|p| p == period) {
            &self.recent_baseline
        } else {
            &self.default_baseline
        }
    }

    /// Whether a row tagged `tag` belongs to the catalog of `period`.
    #[must_use]
    pub fn accepts(&self, period: &str, tag: &str) -> bool {
        let tag = tag.trim();
        tag == period.trim() || tag == self.baseline_for(period)
    }
}

/// Distinct periods in lexicographic order.
#[must_use]
pub fn known_periods<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    tags.into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Picks the period to display.
///
/// `requested` wins when it is one of `known`; otherwise the
/// lexicographically first known period is used. Returns `None` only when
/// nothing is known.
#[must_use]
pub fn select_period(requested: Option<&str>, known: &[String]) -> Option<String> {
    if let Some(requested) = requested.map(str::trim)
        && known.iter().any(|k| k == requested)
    {
        return Some(requested.to_string());
    }

    let fallback = known.iter().min().cloned();
    if let (Some(requested), Some(fallback)) = (requested, &fallback) {
        log::debug!("Period {requested} is unknown, using {fallback}");
    }
    fallback
}
