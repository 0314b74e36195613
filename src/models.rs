//! Data models for normalized feature time series
//!
//! Defines the core data structures produced by retrieval and consumed by the
//! caller's state layer.

use serde::{Deserialize, Serialize};

/// A single clinical data point: quantitative measurements come back as
/// numbers, presence/absence facts as booleans.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// A feature's fetched history, index-aligned and ascending by timestamp.
///
/// Ordering comes from the server-side `_sort` directive; nothing re-sorts
/// locally. A `None` in either column is a hole: the resource existed but the
/// expected field (or a matching panel component) did not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub values: Vec<Option<Scalar>>,
    pub timestamps: Vec<Option<String>>,
}

impl NormalizedSeries {
    /// An allocated zero-length series, the uniform "no data" shape.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(values: Vec<Option<Scalar>>, timestamps: Vec<Option<String>>) -> Self {
        Self { values, timestamps }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The most recent value: the last element of the ascending series.
    pub fn latest(&self) -> Option<Scalar> {
        self.values.last().cloned().flatten()
    }
}

/// One feature's retrieval outcome in the shape the scoring contract expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureResult {
    pub name: String,
    pub value: Vec<Option<Scalar>>,
    pub date: Vec<Option<String>>,
    /// Snapshot of the most recent value, used as the current scoring input
    pub take: Option<Scalar>,
}

impl FeatureResult {
    pub fn from_series(name: impl Into<String>, series: NormalizedSeries) -> Self {
        let take = series.latest();
        Self {
            name: name.into(),
            value: series.values,
            date: series.timestamps,
            take,
        }
    }
}
