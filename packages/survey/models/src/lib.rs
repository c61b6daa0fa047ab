#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Canonical reference types for the CHES survey pipeline.
//!
//! This crate defines the normalized country/party rows produced from the
//! codebook, the static per-question metadata, and the generic [`Frame`]
//! tabular type that every pipeline stage passes around. All three source
//! tables (survey microdata, expert microdata, codebook lookups) are
//! reconciled into these shapes before anything is joined.

pub mod frame;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use frame::{Frame, Value};

/// A country row extracted from the codebook.
///
/// `country` is the lowercase three-letter code shared with the microdata
/// files and is the identity key for joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// Lowercase three-letter country code (e.g. `"bel"`).
    pub country: String,
    /// Numeric country identifier from the codebook.
    pub country_id: i64,
    /// Human-readable country name (e.g. `"Belgium"`).
    pub country_fullname: String,
}

/// A party row extracted from the codebook.
///
/// `party_id` is the identity key; `country` references
/// [`Country::country`]. Referential integrity is a tested property, not
/// a database constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Lowercase three-letter country code this party belongs to.
    pub country: String,
    /// Numeric party identifier shared with the microdata files.
    pub party_id: i64,
    /// Party abbreviation (e.g. `"PS"`).
    pub party: String,
    /// Party name in the original language. May be empty.
    pub party_name: String,
    /// Party name in English. May be empty.
    pub party_name_english: String,
}

/// Static metadata for a single survey question.
///
/// Loaded from the question-metadata JSON file; the question key itself is
/// the (lowercased) map key and is not repeated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMeta {
    /// One-line description of what the question measures.
    pub description: String,
    /// Question grouping used by the dashboard (e.g. `"European Union"`).
    pub category: String,
    /// Map from score code to its label (e.g. `"0"` -> `"strongly opposes"`).
    pub scores: BTreeMap<String, String>,
}

impl QuestionMeta {
    /// Returns the score codes paired with their labels, ordered
    /// numerically. Codes that do not parse as numbers are skipped.
    #[must_use]
    pub fn ordered_scores(&self) -> Vec<(f64, &str)> {
        let mut scores: Vec<(f64, &str)> = self
            .scores
            .iter()
            .filter_map(|(code, label)| {
                code.parse::<f64>().ok().map(|v| (v, label.as_str()))
            })
            .collect();
        scores.sort_by(|a, b| a.0.total_cmp(&b.0));
        scores
    }

    /// Returns the `(min, max)` numeric score bounds for this question,
    /// used to bound plot axes. `None` if no score code is numeric.
    #[must_use]
    pub fn score_range(&self) -> Option<(f64, f64)> {
        let scores = self.ordered_scores();
        match (scores.first(), scores.last()) {
            (Some(&(min, _)), Some(&(max, _))) => Some((min, max)),
            _ => None,
        }
    }
}

/// Per-group summary statistics for one question column.
///
/// Computed over the non-null observations of a group; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Number of non-null observations.
    pub count: u64,
    /// Arithmetic mean. `None` when the group has no observations.
    pub mean: Option<f64>,
    /// Median. `None` when the group has no observations.
    pub median: Option<f64>,
    /// Sample standard deviation (ddof = 1). `None` below two observations.
    pub stdev: Option<f64>,
    /// Sample variance (ddof = 1). `None` below two observations.
    pub variance: Option<f64>,
}

impl SummaryStats {
    /// Computes summary statistics over the given observations.
    ///
    /// The input is every non-null value of one question column within one
    /// group; missing values must already have been filtered out.
    #[must_use]
    pub fn from_observations(values: &[f64]) -> Self {
        let count = values.len() as u64;

        if values.is_empty() {
            return Self {
                count,
                mean: None,
                median: None,
                stdev: None,
                variance: None,
            };
        }

        #[allow(clippy::cast_precision_loss)]
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            f64::midpoint(sorted[mid - 1], sorted[mid])
        } else {
            sorted[mid]
        };

        // Sample statistics: undefined for a single observation.
        let (variance, stdev) = if values.len() < 2 {
            (None, None)
        } else {
            let ss = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
            let variance = ss / (n - 1.0);
            (Some(variance), Some(variance.sqrt()))
        };

        Self {
            count,
            mean: Some(mean),
            median: Some(median),
            stdev,
            variance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_with_scores(codes: &[(&str, &str)]) -> QuestionMeta {
        QuestionMeta {
            description: "EU position".to_owned(),
            category: "European Union".to_owned(),
            scores: codes
                .iter()
                .map(|(c, l)| ((*c).to_owned(), (*l).to_owned()))
                .collect(),
        }
    }

    #[test]
    fn score_range_orders_numerically() {
        let meta = meta_with_scores(&[("1", "low"), ("10", "high"), ("2", "mid")]);
        assert_eq!(meta.score_range(), Some((1.0, 10.0)));
        let ordered: Vec<f64> = meta.ordered_scores().iter().map(|(v, _)| *v).collect();
        assert_eq!(ordered, vec![1.0, 2.0, 10.0]);
    }

    #[test]
    fn score_range_skips_non_numeric_codes() {
        let meta = meta_with_scores(&[("0", "no"), ("1", "yes"), (".", "missing")]);
        assert_eq!(meta.score_range(), Some((0.0, 1.0)));
    }

    #[test]
    fn score_range_empty_when_no_numeric_codes() {
        let meta = meta_with_scores(&[("none", "n/a")]);
        assert_eq!(meta.score_range(), None);
    }

    #[test]
    fn summary_stats_match_known_values() {
        let stats = SummaryStats::from_observations(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, Some(2.5));
        assert_eq!(stats.median, Some(2.5));
        let variance = stats.variance.unwrap();
        assert!((variance - 5.0 / 3.0).abs() < 1e-12);
        assert!((stats.stdev.unwrap() - variance.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn summary_stats_single_observation_has_no_spread() {
        let stats = SummaryStats::from_observations(&[7.0]);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, Some(7.0));
        assert_eq!(stats.median, Some(7.0));
        assert_eq!(stats.stdev, None);
        assert_eq!(stats.variance, None);
    }

    #[test]
    fn summary_stats_empty_is_all_null() {
        let stats = SummaryStats::from_observations(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.median, None);
    }
}
