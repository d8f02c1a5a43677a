//! Paired significance testing across algorithms.
//!
//! Runs the Friedman omnibus test over every algorithm's per-request
//! reciprocal-rank series, then a Wilcoxon signed-rank test for every
//! unordered pair. All series are truncated to the shortest one so that
//! position `i` is the same request everywhere.
//!
//! Nothing here fails the run: insufficient data, a missing statistics
//! backend and degenerate inputs all produce a typed "skipped" outcome.

use super::engine::EvaluationBundle;
use super::metrics::MetricKey;
use super::stats::{friedman_test, wilcoxon_signed_rank, FriedmanResult, WilcoxonResult};
use crate::config::{EvaluationConfig, MIN_SIGNIFICANCE_SAMPLES};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Metric whose per-request series is tested.
pub const TESTED_METRIC: MetricKey = MetricKey::ReciprocalRank;

/// Why a test (or the whole significance stage) did not run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Fewer than 2 algorithms with data, or too few aligned samples
    InsufficientData {
        algorithms: usize,
        aligned_samples: usize,
        required_samples: usize,
    },
    /// The statistics capability is not compiled in
    BackendUnavailable,
    /// Inputs make the test statistic undefined (e.g. identical series)
    Degenerate { detail: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientData {
                algorithms,
                aligned_samples,
                required_samples,
            } => write!(
                f,
                "insufficient data ({} algorithms, {} aligned samples, {} required)",
                algorithms, aligned_samples, required_samples
            ),
            SkipReason::BackendUnavailable => f.write_str("statistics backend unavailable"),
            SkipReason::Degenerate { detail } => write!(f, "degenerate input: {}", detail),
        }
    }
}

/// Outcome of the significance stage for a whole run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignificanceOutcome {
    Skipped { reason: SkipReason },
    Completed(SignificanceReport),
}

impl SignificanceOutcome {
    pub fn report(&self) -> Option<&SignificanceReport> {
        match self {
            SignificanceOutcome::Completed(report) => Some(report),
            SignificanceOutcome::Skipped { .. } => None,
        }
    }
}

/// Test results over aligned per-request series.
#[derive(Debug, Clone, Serialize)]
pub struct SignificanceReport {
    /// Name of the tested series
    pub metric: String,
    /// Algorithms included, in series order
    pub algorithms: Vec<String>,
    /// Length every series was truncated to
    pub aligned_samples: usize,
    /// False if some aligned position referred to different requests
    pub requests_aligned: bool,
    pub alpha: f64,
    pub friedman: FriedmanOutcome,
    pub pairwise: Vec<PairwiseComparison>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FriedmanOutcome {
    Completed {
        #[serde(flatten)]
        result: FriedmanResult,
        /// p < alpha: follow up with the pairwise tests
        significant: bool,
    },
    Skipped {
        reason: SkipReason,
    },
}

/// Signed-rank comparison of two algorithms.
#[derive(Debug, Clone, Serialize)]
pub struct PairwiseComparison {
    pub algorithm_a: String,
    pub algorithm_b: String,
    pub outcome: PairOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairOutcome {
    Completed {
        #[serde(flatten)]
        result: WilcoxonResult,
        significant: bool,
    },
    Skipped {
        reason: SkipReason,
    },
}

/// Runs the significance stage.
///
/// Backend availability is fixed when the tester is constructed; a tester
/// without a backend reports every test as skipped instead of computing a
/// subset.
#[derive(Debug, Clone)]
pub struct SignificanceTester {
    alpha: f64,
    backend_available: bool,
}

impl SignificanceTester {
    /// Creates a tester whose backend is the `significance` feature.
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            alpha: config.alpha,
            backend_available: cfg!(feature = "significance"),
        }
    }

    /// Creates a tester that skips every test.
    pub fn without_backend(config: &EvaluationConfig) -> Self {
        Self {
            backend_available: false,
            ..Self::new(config)
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend_available
    }

    /// Tests every algorithm that produced a non-empty reciprocal-rank series.
    pub fn test(&self, bundles: &BTreeMap<String, EvaluationBundle>) -> SignificanceOutcome {
        let candidates: Vec<(&String, &EvaluationBundle)> = bundles
            .iter()
            .filter(|(_, bundle)| !bundle.per_item.reciprocal_rank.is_empty())
            .collect();

        let aligned_samples = candidates
            .iter()
            .map(|(_, bundle)| bundle.per_item.reciprocal_rank.len())
            .min()
            .unwrap_or(0);

        if candidates.len() < 2 || aligned_samples < MIN_SIGNIFICANCE_SAMPLES {
            let reason = SkipReason::InsufficientData {
                algorithms: candidates.len(),
                aligned_samples,
                required_samples: MIN_SIGNIFICANCE_SAMPLES,
            };
            warn!("Significance testing skipped: {}", reason);
            return SignificanceOutcome::Skipped { reason };
        }

        let requests_aligned = check_alignment(&candidates, aligned_samples);

        let algorithms: Vec<String> = candidates.iter().map(|(name, _)| (*name).clone()).collect();
        let series: Vec<&[f64]> = candidates
            .iter()
            .map(|(_, bundle)| &bundle.per_item.reciprocal_rank[..aligned_samples])
            .collect();

        let friedman = self.run_friedman(&series);

        let mut pairwise = Vec::new();
        for i in 0..series.len() {
            for j in (i + 1)..series.len() {
                pairwise.push(PairwiseComparison {
                    algorithm_a: algorithms[i].clone(),
                    algorithm_b: algorithms[j].clone(),
                    outcome: self.run_pair(&algorithms[i], &algorithms[j], series[i], series[j]),
                });
            }
        }

        SignificanceOutcome::Completed(SignificanceReport {
            metric: TESTED_METRIC.name(),
            algorithms,
            aligned_samples,
            requests_aligned,
            alpha: self.alpha,
            friedman,
            pairwise,
        })
    }

    fn run_friedman(&self, series: &[&[f64]]) -> FriedmanOutcome {
        if !self.backend_available {
            warn!("Friedman test skipped: statistics backend unavailable");
            return FriedmanOutcome::Skipped {
                reason: SkipReason::BackendUnavailable,
            };
        }

        match friedman_test(series) {
            Ok(result) => {
                let significant = result.is_significant(self.alpha);
                info!(
                    statistic = result.statistic,
                    p_value = result.p_value,
                    significant,
                    "Friedman test"
                );
                FriedmanOutcome::Completed {
                    result,
                    significant,
                }
            }
            Err(err) => {
                warn!("Friedman test skipped: {}", err);
                FriedmanOutcome::Skipped {
                    reason: SkipReason::Degenerate {
                        detail: err.to_string(),
                    },
                }
            }
        }
    }

    fn run_pair(&self, name_a: &str, name_b: &str, a: &[f64], b: &[f64]) -> PairOutcome {
        if !self.backend_available {
            return PairOutcome::Skipped {
                reason: SkipReason::BackendUnavailable,
            };
        }

        match wilcoxon_signed_rank(a, b) {
            Ok(result) => PairOutcome::Completed {
                significant: result.is_significant(self.alpha),
                result,
            },
            Err(err) => {
                warn!("Signed-rank test {} vs {} skipped: {}", name_a, name_b, err);
                PairOutcome::Skipped {
                    reason: SkipReason::Degenerate {
                        detail: err.to_string(),
                    },
                }
            }
        }
    }
}

/// Checks that every aligned position refers to the same request.
fn check_alignment(candidates: &[(&String, &EvaluationBundle)], len: usize) -> bool {
    let Some((first_name, first)) = candidates.first() else {
        return true;
    };
    let reference = &first.per_item.request_ids[..len.min(first.per_item.request_ids.len())];

    let mut aligned = true;
    for (name, bundle) in &candidates[1..] {
        let ids = &bundle.per_item.request_ids[..len.min(bundle.per_item.request_ids.len())];
        if ids != reference {
            warn!(
                "Per-request series of {} and {} are not aligned on the same requests",
                first_name, name
            );
            aligned = false;
        }
    }
    aligned
}
