//! Dispersion of per-request metric values.
//!
//! Two algorithms with the same MRR can behave very differently: one may be
//! uniformly mediocre, the other excellent on some requests and useless on
//! the rest. The statistics here describe that spread for a fixed subset of
//! per-item series (see [`crate::config::STABILITY_METRICS`]).

use super::engine::PerItemSeries;
use super::metrics::MetricKey;
use super::stats::{mean, percentile_sorted, population_std, sorted_copy};
use serde::Serialize;
use std::collections::BTreeMap;

/// Dispersion statistics for one metric sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StabilityStats {
    pub q1: f64,
    pub q3: f64,
    /// Interquartile range (q3 - q1). Lower means more consistent.
    pub iqr: f64,
    pub median: f64,
    /// Population standard deviation
    pub std: f64,
    /// Coefficient of variation: std / mean, or 0.0 when the mean is 0
    pub cv: f64,
}

impl StabilityStats {
    /// Computes dispersion statistics for a sequence.
    ///
    /// Percentiles use linear interpolation between order statistics.
    /// Returns `None` for an empty sequence.
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let sorted = sorted_copy(values);
        let q1 = percentile_sorted(&sorted, 25.0);
        let q3 = percentile_sorted(&sorted, 75.0);
        let avg = mean(values);
        let std = population_std(values);

        Some(Self {
            q1,
            q3,
            iqr: q3 - q1,
            median: percentile_sorted(&sorted, 50.0),
            std,
            cv: if avg > 0.0 { std / avg } else { 0.0 },
        })
    }
}

/// Computes stability records for the given metrics.
///
/// Metrics whose series is missing or empty get no record.
pub fn analyze(series: &PerItemSeries, metrics: &[MetricKey]) -> BTreeMap<String, StabilityStats> {
    metrics
        .iter()
        .filter_map(|&key| {
            let values = series.series(key)?;
            StabilityStats::compute(values).map(|stats| (key.name(), stats))
        })
        .collect()
}
