//! Detection thresholds and per-class count tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Default minimum confidence percentage.
pub const DEFAULT_CONFIDENCE: f64 = 40.0;
/// Default maximum box overlap percentage before suppression.
pub const DEFAULT_OVERLAP: f64 = 30.0;

/// Threshold validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("{name} must be between 0 and 100, got {value}")]
    OutOfRange { name: &'static str, value: f64 },
}

/// Confidence/overlap percentages forwarded to the detection service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum detection score (0-100)
    pub confidence: f64,
    /// Maximum box overlap before non-max suppression (0-100)
    pub overlap: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl Thresholds {
    pub fn new(confidence: f64, overlap: f64) -> Self {
        Self { confidence, overlap }
    }

    /// Check both values lie in `[0, 100]`.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        check_percentage("confidence", self.confidence)?;
        check_percentage("overlap", self.overlap)
    }
}

fn check_percentage(name: &'static str, value: f64) -> Result<(), ThresholdError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ThresholdError::OutOfRange { name, value })
    }
}

/// A single detected object as reported by the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label (never empty)
    pub label: String,
    /// Detection score reported by the service
    pub confidence: f64,
}

/// Class label -> instance count, accumulated across frames.
///
/// Counts only ever go up. Keys are ordered so serialized output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassCounts(BTreeMap<String, u64>);

impl ClassCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one instance of `label`. Empty labels are ignored.
    pub fn record(&mut self, label: &str) {
        if label.is_empty() {
            return;
        }
        *self.0.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Fold a frame's labels into the table, one increment per occurrence.
    pub fn record_all<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            self.record(label.as_ref());
        }
    }

    /// Count for a label (0 when never seen).
    pub fn get(&self, label: &str) -> u64 {
        self.0.get(label).copied().unwrap_or(0)
    }

    /// Total objects across all classes.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct classes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: AsRef<str>> FromIterator<S> for ClassCounts {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut counts = ClassCounts::new();
        counts.record_all(iter);
        counts
    }
}
