//! Cross-algorithm comparison.
//!
//! Builds summary tables, per-metric leaderboards, best performers and a
//! performance-spread diagnostic from a set of evaluation bundles.
//!
//! Algorithms whose aggregates are undefined (no valid requests) still get a
//! table row with empty cells, but are left out of leaderboards, best
//! performers and the spread.

use super::engine::EvaluationBundle;
use super::metrics::MetricKey;
use serde::Serialize;
use std::collections::BTreeMap;

/// Metrics with their own leaderboard, in report order.
pub const RANKED_METRICS: &[MetricKey] = &[
    MetricKey::ReciprocalRank,
    MetricKey::AveragePrecision,
    MetricKey::Precision(5),
    MetricKey::Recall(5),
    MetricKey::F1(5),
    MetricKey::Ndcg,
    MetricKey::Dcg,
];

/// Metrics for which a single best performer is named.
pub const BEST_PERFORMER_METRICS: &[MetricKey] = &[
    MetricKey::ReciprocalRank,
    MetricKey::AveragePrecision,
    MetricKey::F1(5),
    MetricKey::Precision(5),
];

/// Everything the comparator derives from two or more bundles.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub table: Vec<ComparisonRow>,
    /// Reciprocal-rank stability per algorithm
    pub stability: Vec<StabilityRow>,
    pub leaderboards: Vec<Leaderboard>,
    pub best_performers: Vec<BestPerformer>,
    /// Lowest reciprocal-rank IQR; absent if no algorithm has stability data
    pub most_stable: Option<MostStable>,
    /// Absent unless the best MRR is positive
    pub spread: Option<PerformanceSpread>,
}

/// One algorithm's headline metrics. Empty cells mean "undefined".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub algorithm: String,
    pub precision_at_1: Option<f64>,
    pub recall_at_1: Option<f64>,
    pub f1_at_1: Option<f64>,
    pub precision_at_3: Option<f64>,
    pub precision_at_5: Option<f64>,
    pub recall_at_5: Option<f64>,
    pub f1_at_5: Option<f64>,
    pub precision_at_10: Option<f64>,
    pub mrr: Option<f64>,
    pub map: Option<f64>,
    pub avg_dcg: Option<f64>,
    pub avg_ndcg: Option<f64>,
    pub coverage: f64,
}

impl ComparisonRow {
    fn from_bundle(algorithm: &str, bundle: &EvaluationBundle) -> Self {
        let m = |key| bundle.metric(key);
        Self {
            algorithm: algorithm.to_string(),
            precision_at_1: m(MetricKey::Precision(1)),
            recall_at_1: m(MetricKey::Recall(1)),
            f1_at_1: m(MetricKey::F1(1)),
            precision_at_3: m(MetricKey::Precision(3)),
            precision_at_5: m(MetricKey::Precision(5)),
            recall_at_5: m(MetricKey::Recall(5)),
            f1_at_5: m(MetricKey::F1(5)),
            precision_at_10: m(MetricKey::Precision(10)),
            mrr: m(MetricKey::ReciprocalRank),
            map: m(MetricKey::AveragePrecision),
            avg_dcg: m(MetricKey::Dcg),
            avg_ndcg: m(MetricKey::Ndcg),
            coverage: bundle.basic.coverage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityRow {
    pub algorithm: String,
    pub median: f64,
    pub iqr: f64,
    pub std: f64,
    pub cv: f64,
}

/// Algorithms ordered by one metric, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub metric: String,
    pub label: String,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub algorithm: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestPerformer {
    pub metric: String,
    pub label: String,
    pub algorithm: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MostStable {
    pub algorithm: String,
    pub iqr: f64,
}

/// How far apart the algorithms are on MRR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSpread {
    pub best_mrr: f64,
    pub worst_mrr: f64,
    pub range: f64,
    /// range / best_mrr, as a percentage
    pub relative_pct: f64,
}

/// Compares a set of bundles keyed by algorithm name.
///
/// Returns `None` for fewer than two algorithms. Ties in leaderboards and
/// best-performer picks go to the algorithm seen first in name order.
pub fn compare(bundles: &BTreeMap<String, EvaluationBundle>) -> Option<ComparisonReport> {
    if bundles.len() < 2 {
        return None;
    }

    let table = bundles
        .iter()
        .map(|(name, bundle)| ComparisonRow::from_bundle(name, bundle))
        .collect();

    let stability = bundles
        .iter()
        .filter_map(|(name, bundle)| {
            bundle
                .stability_of(MetricKey::ReciprocalRank)
                .map(|stats| StabilityRow {
                    algorithm: name.clone(),
                    median: stats.median,
                    iqr: stats.iqr,
                    std: stats.std,
                    cv: stats.cv,
                })
        })
        .collect();

    let leaderboards = RANKED_METRICS
        .iter()
        .map(|&key| leaderboard(bundles, key))
        .collect();

    let best_performers = BEST_PERFORMER_METRICS
        .iter()
        .filter_map(|&key| best_performer(bundles, key))
        .collect();

    Some(ComparisonReport {
        table,
        stability,
        leaderboards,
        best_performers,
        most_stable: most_stable(bundles),
        spread: spread(bundles),
    })
}

/// Ranks algorithms by one metric, descending.
///
/// The sort is stable over name order, so exact ties keep name order.
pub fn leaderboard(bundles: &BTreeMap<String, EvaluationBundle>, key: MetricKey) -> Leaderboard {
    let mut scored: Vec<(&String, f64)> = bundles
        .iter()
        .filter_map(|(name, bundle)| bundle.metric(key).map(|value| (name, value)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Leaderboard {
        metric: key.name(),
        label: key.label(),
        entries: scored
            .into_iter()
            .enumerate()
            .map(|(i, (name, value))| LeaderboardEntry {
                rank: i + 1,
                algorithm: name.clone(),
                value,
            })
            .collect(),
    }
}

fn best_performer(
    bundles: &BTreeMap<String, EvaluationBundle>,
    key: MetricKey,
) -> Option<BestPerformer> {
    let mut best: Option<(&String, f64)> = None;
    for (name, bundle) in bundles {
        if let Some(value) = bundle.metric(key) {
            if best.map_or(true, |(_, top)| value > top) {
                best = Some((name, value));
            }
        }
    }

    best.map(|(name, value)| BestPerformer {
        metric: key.name(),
        label: key.label(),
        algorithm: name.clone(),
        value,
    })
}

fn most_stable(bundles: &BTreeMap<String, EvaluationBundle>) -> Option<MostStable> {
    let mut best: Option<(&String, f64)> = None;
    for (name, bundle) in bundles {
        if let Some(stats) = bundle.stability_of(MetricKey::ReciprocalRank) {
            if best.map_or(true, |(_, iqr)| stats.iqr < iqr) {
                best = Some((name, stats.iqr));
            }
        }
    }

    best.map(|(name, iqr)| MostStable {
        algorithm: name.clone(),
        iqr,
    })
}

fn spread(bundles: &BTreeMap<String, EvaluationBundle>) -> Option<PerformanceSpread> {
    let mrrs: Vec<f64> = bundles
        .values()
        .filter_map(|bundle| bundle.metric(MetricKey::ReciprocalRank))
        .collect();

    let best = mrrs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst = mrrs.iter().copied().fold(f64::INFINITY, f64::min);

    // Also covers the empty case, where best is -inf
    if best <= 0.0 {
        return None;
    }

    let range = best - worst;
    Some(PerformanceSpread {
        best_mrr: best,
        worst_mrr: worst,
        range,
        relative_pct: range / best * 100.0,
    })
}
