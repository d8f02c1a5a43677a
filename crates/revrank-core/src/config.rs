//! Production evaluation configuration.
//!
//! Constants here define the evaluation protocol used for every report. They
//! are collected into [`EvaluationConfig`], whose `Default` is the production
//! configuration.
//!
//! # Usage
//!
//! ```
//! use revrank_core::config::{EvaluationConfig, K_VALUES, SIGNIFICANCE_ALPHA};
//!
//! let config = EvaluationConfig::default();
//! assert_eq!(config.k_values, K_VALUES.to_vec());
//! assert_eq!(config.alpha, SIGNIFICANCE_ALPHA);
//! ```

use crate::evaluation::metrics::MetricKey;
use serde::{Deserialize, Serialize};

// =============================================================================
// Ranking cutoffs
// =============================================================================

/// Cutoffs for precision/recall/F1/hit-rate.
pub const K_VALUES: &[usize] = &[1, 3, 5, 10];

/// Cutoff for DCG and NDCG.
pub const DCG_CUTOFF: usize = 10;

// =============================================================================
// Significance testing
// =============================================================================

/// Significance level for Friedman and pairwise signed-rank tests.
pub const SIGNIFICANCE_ALPHA: f64 = 0.05;

/// Minimum aligned per-request samples before any significance test runs.
///
/// Not part of [`EvaluationConfig`]: run files cannot lower it.
pub const MIN_SIGNIFICANCE_SAMPLES: usize = 10;

/// Largest number of non-zero differences for which the signed-rank
/// p-value is computed from the exact null distribution. Above this, or with
/// tied magnitudes, the normal approximation is used.
pub const EXACT_SIGNED_RANK_MAX_N: usize = 50;

// =============================================================================
// Stability analysis
// =============================================================================

/// Per-item series that receive dispersion statistics.
///
/// A fixed subset, not every metric, to bound report size.
pub const STABILITY_METRICS: &[MetricKey] = &[
    MetricKey::ReciprocalRank,
    MetricKey::AveragePrecision,
    MetricKey::Precision(5),
    MetricKey::Recall(5),
];

// =============================================================================
// Export
// =============================================================================

/// Directory artifacts are written to when nothing else is configured.
pub const DEFAULT_RESULTS_DIR: &str = "evaluation_results";

/// Parameters of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Cutoffs for set-based metrics
    pub k_values: Vec<usize>,
    /// Cutoff for DCG/NDCG
    pub dcg_cutoff: usize,
    /// Significance level
    pub alpha: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            k_values: K_VALUES.to_vec(),
            dcg_cutoff: DCG_CUTOFF,
            alpha: SIGNIFICANCE_ALPHA,
        }
    }
}
