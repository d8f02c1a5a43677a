//! Per-algorithm metrics engine.
//!
//! Turns one algorithm's ranked lists into an [`EvaluationBundle`]: basic
//! counts, score-distribution diagnostics, per-item metric series, their
//! aggregates and stability records.
//!
//! Only "valid" requests are scored: those present in the ground truth and in
//! the algorithm's result with a non-empty ranked list. Per-item series are
//! filled in ground-truth order, so position `i` refers to the same request
//! for every algorithm evaluated against the same ground truth.

use super::ground_truth::GroundTruth;
use super::metrics::{ItemMetrics, MetricKey};
use super::stability::{self, StabilityStats};
use super::stats::{mean, median, population_std};
use crate::config::{EvaluationConfig, STABILITY_METRICS};
use crate::error::EvaluationError;
use crate::types::{AlgorithmResult, CandidateId, RequestId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Everything computed for one algorithm.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationBundle {
    pub basic: BasicStats,
    /// `None` when the algorithm emitted no scores at all
    pub score_distribution: Option<ScoreDistribution>,
    /// `None` when no request was valid (undefined, not zero)
    pub aggregates: Option<AggregateMetrics>,
    pub success: Option<SuccessCounters>,
    /// Keyed by metric name, e.g. "reciprocal_rank"
    pub stability: BTreeMap<String, StabilityStats>,
    pub per_item: PerItemSeries,
}

impl EvaluationBundle {
    /// Aggregate value of one metric, if defined.
    pub fn metric(&self, key: MetricKey) -> Option<f64> {
        self.aggregates.as_ref().and_then(|agg| agg.get(key))
    }

    /// Stability record of one metric, if computed.
    pub fn stability_of(&self, key: MetricKey) -> Option<&StabilityStats> {
        self.stability.get(&key.name())
    }

    pub fn has_valid_requests(&self) -> bool {
        self.basic.valid_requests > 0
    }
}

/// Counts describing how much of the ground truth an algorithm covered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BasicStats {
    /// Requests present in the algorithm's result
    pub total_requests_analyzed: usize,
    /// Distinct candidates across all ranked lists
    pub candidates_recommended: usize,
    /// Requests scored (in ground truth, non-empty list)
    pub valid_requests: usize,
    /// valid_requests / |ground truth|
    pub coverage: f64,
}

/// Statistics over every raw score the algorithm emitted, valid or not.
///
/// Diagnoses score scale and calibration independently of ranking quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreDistribution {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

impl ScoreDistribution {
    /// Returns `None` for an empty slice.
    pub fn compute(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            mean: mean(scores),
            median: median(scores),
            std: population_std(scores),
            min,
            max,
            range: max - min,
        })
    }
}

/// Means of the per-item series over all valid requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateMetrics {
    pub precision_at_k: BTreeMap<usize, f64>,
    pub recall_at_k: BTreeMap<usize, f64>,
    pub f1_at_k: BTreeMap<usize, f64>,
    /// Fraction of valid requests with a hit in the top k
    pub hit_rate_at_k: BTreeMap<usize, f64>,
    pub mrr: f64,
    pub map: f64,
    pub avg_dcg: f64,
    pub avg_ndcg: f64,
}

impl AggregateMetrics {
    /// Averages every series. Returns `None` if no request was scored.
    pub fn from_series(series: &PerItemSeries) -> Option<Self> {
        if series.is_empty() {
            return None;
        }
        let means = |by_k: &BTreeMap<usize, Vec<f64>>| -> BTreeMap<usize, f64> {
            by_k.iter().map(|(&k, values)| (k, mean(values))).collect()
        };

        Some(Self {
            precision_at_k: means(&series.precision_at_k),
            recall_at_k: means(&series.recall_at_k),
            f1_at_k: means(&series.f1_at_k),
            hit_rate_at_k: means(&series.hit_at_k),
            mrr: mean(&series.reciprocal_rank),
            map: mean(&series.average_precision),
            avg_dcg: mean(&series.dcg),
            avg_ndcg: mean(&series.ndcg),
        })
    }

    pub fn get(&self, key: MetricKey) -> Option<f64> {
        match key {
            MetricKey::Precision(k) => self.precision_at_k.get(&k).copied(),
            MetricKey::Recall(k) => self.recall_at_k.get(&k).copied(),
            MetricKey::F1(k) => self.f1_at_k.get(&k).copied(),
            MetricKey::HitRate(k) => self.hit_rate_at_k.get(&k).copied(),
            MetricKey::ReciprocalRank => Some(self.mrr),
            MetricKey::AveragePrecision => Some(self.map),
            MetricKey::Dcg => Some(self.avg_dcg),
            MetricKey::Ndcg => Some(self.avg_ndcg),
        }
    }
}

/// How many valid requests had a correct candidate anywhere in the list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuccessCounters {
    pub successful_recommendations: usize,
    pub recommendation_success_rate: f64,
}

/// Parallel per-request metric sequences, one position per valid request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerItemSeries {
    pub request_ids: Vec<RequestId>,
    pub correct_at_k: BTreeMap<usize, Vec<usize>>,
    pub precision_at_k: BTreeMap<usize, Vec<f64>>,
    pub recall_at_k: BTreeMap<usize, Vec<f64>>,
    pub f1_at_k: BTreeMap<usize, Vec<f64>>,
    pub hit_at_k: BTreeMap<usize, Vec<f64>>,
    pub reciprocal_rank: Vec<f64>,
    pub average_precision: Vec<f64>,
    pub dcg: Vec<f64>,
    pub ndcg: Vec<f64>,
}

impl PerItemSeries {
    /// Empty series with one sequence per cutoff.
    pub fn new(k_values: &[usize]) -> Self {
        Self {
            correct_at_k: by_cutoff(k_values),
            precision_at_k: by_cutoff(k_values),
            recall_at_k: by_cutoff(k_values),
            f1_at_k: by_cutoff(k_values),
            hit_at_k: by_cutoff(k_values),
            ..Self::default()
        }
    }

    pub fn push(&mut self, item: &ItemMetrics) {
        self.request_ids.push(item.request);
        for (k, &value) in &item.correct_at_k {
            self.correct_at_k.entry(*k).or_default().push(value);
        }
        for (target, source) in [
            (&mut self.precision_at_k, &item.precision_at_k),
            (&mut self.recall_at_k, &item.recall_at_k),
            (&mut self.f1_at_k, &item.f1_at_k),
            (&mut self.hit_at_k, &item.hit_at_k),
        ] {
            for (k, &value) in source {
                target.entry(*k).or_default().push(value);
            }
        }
        self.reciprocal_rank.push(item.reciprocal_rank);
        self.average_precision.push(item.average_precision);
        self.dcg.push(item.dcg);
        self.ndcg.push(item.ndcg);
    }

    /// Number of scored requests.
    pub fn len(&self) -> usize {
        self.request_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.request_ids.is_empty()
    }

    /// The sequence for one metric, if that metric was computed.
    pub fn series(&self, key: MetricKey) -> Option<&[f64]> {
        match key {
            MetricKey::Precision(k) => self.precision_at_k.get(&k).map(Vec::as_slice),
            MetricKey::Recall(k) => self.recall_at_k.get(&k).map(Vec::as_slice),
            MetricKey::F1(k) => self.f1_at_k.get(&k).map(Vec::as_slice),
            MetricKey::HitRate(k) => self.hit_at_k.get(&k).map(Vec::as_slice),
            MetricKey::ReciprocalRank => Some(&self.reciprocal_rank),
            MetricKey::AveragePrecision => Some(&self.average_precision),
            MetricKey::Dcg => Some(&self.dcg),
            MetricKey::Ndcg => Some(&self.ndcg),
        }
    }
}

fn by_cutoff<T>(k_values: &[usize]) -> BTreeMap<usize, Vec<T>> {
    k_values.iter().map(|&k| (k, Vec::new())).collect()
}

/// Computes evaluation bundles for single algorithms.
///
/// Stateless apart from its cutoffs; one engine serves every algorithm of a run.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    k_values: Vec<usize>,
    dcg_cutoff: usize,
}

impl MetricsEngine {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            k_values: config.k_values.clone(),
            dcg_cutoff: config.dcg_cutoff,
        }
    }

    /// Scores one algorithm's result against the ground truth.
    ///
    /// Returns `Ok(None)` when the ground truth is empty: there is nothing to
    /// measure against, which is distinct from every metric being zero.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::NonFiniteScore`] if any ranked list carries a NaN
    /// or infinite score.
    #[instrument(skip_all, fields(algorithm = %algorithm, requests = result.len()))]
    pub fn compute(
        &self,
        algorithm: &str,
        ground_truth: &GroundTruth,
        result: &AlgorithmResult,
    ) -> Result<Option<EvaluationBundle>, EvaluationError> {
        if ground_truth.is_empty() {
            return Ok(None);
        }

        let mut scores = Vec::new();
        let mut candidates: BTreeSet<&CandidateId> = BTreeSet::new();
        for (request, ranked) in result {
            for (candidate, score) in ranked {
                if !score.is_finite() {
                    return Err(EvaluationError::NonFiniteScore {
                        request: *request,
                        candidate: candidate.clone(),
                    });
                }
                scores.push(*score);
                candidates.insert(candidate);
            }
        }

        let mut per_item = PerItemSeries::new(&self.k_values);
        for (request, relevant) in ground_truth.iter() {
            let ranked = match result.get(request) {
                Some(ranked) if !ranked.is_empty() => ranked,
                _ => continue,
            };
            let item =
                ItemMetrics::compute(*request, ranked, relevant, &self.k_values, self.dcg_cutoff);
            per_item.push(&item);
        }

        let valid = per_item.len();
        let aggregates = AggregateMetrics::from_series(&per_item);
        let success = (valid > 0).then(|| {
            let successful = per_item.reciprocal_rank.iter().filter(|rr| **rr > 0.0).count();
            SuccessCounters {
                successful_recommendations: successful,
                recommendation_success_rate: successful as f64 / valid as f64,
            }
        });

        debug!(
            valid_requests = valid,
            mrr = aggregates.as_ref().map(|a| a.mrr),
            "Computed per-item metrics"
        );

        Ok(Some(EvaluationBundle {
            basic: BasicStats {
                total_requests_analyzed: result.len(),
                candidates_recommended: candidates.len(),
                valid_requests: valid,
                coverage: valid as f64 / ground_truth.len() as f64,
            },
            score_distribution: ScoreDistribution::compute(&scores),
            aggregates,
            success,
            stability: stability::analyze(&per_item, STABILITY_METRICS),
            per_item,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::rank_candidates;

    fn ranked(names: &[(&str, f64)]) -> Vec<(CandidateId, f64)> {
        rank_candidates(
            names
                .iter()
                .map(|&(name, score)| (CandidateId::from(name), score))
                .collect(),
        )
    }

    fn engine() -> MetricsEngine {
        MetricsEngine::new(&EvaluationConfig::default())
    }

    #[test]
    fn test_empty_ground_truth_yields_no_bundle() {
        let result = AlgorithmResult::new();
        let bundle = engine()
            .compute("a", &GroundTruth::default(), &result)
            .unwrap();
        assert!(bundle.is_none());
    }

    #[test]
    fn test_empty_result_has_undefined_aggregates() {
        let gt = GroundTruth::from_pairs(vec![(1, vec!["alice"])]);
        let bundle = engine()
            .compute("a", &gt, &AlgorithmResult::new())
            .unwrap()
            .unwrap();

        assert_eq!(bundle.basic.valid_requests, 0);
        assert_eq!(bundle.basic.coverage, 0.0);
        assert!(bundle.aggregates.is_none());
        assert!(bundle.success.is_none());
        assert!(bundle.score_distribution.is_none());
        assert!(bundle.stability.is_empty());
        assert_eq!(bundle.metric(MetricKey::ReciprocalRank), None);
    }

    #[test]
    fn test_worked_example_bundle() {
        let gt = GroundTruth::from_pairs(vec![(1, vec!["alice", "bob"])]);
        let mut result = AlgorithmResult::new();
        result.insert(
            RequestId::from_u64(1),
            ranked(&[("carol", 0.9), ("alice", 0.8), ("bob", 0.7)]),
        );

        let bundle = engine().compute("a", &gt, &result).unwrap().unwrap();
        let agg = bundle.aggregates.as_ref().unwrap();

        assert_eq!(agg.precision_at_k[&1], 0.0);
        assert!((agg.precision_at_k[&3] - 2.0 / 3.0).abs() < 1e-12);
        assert!((agg.recall_at_k[&3] - 1.0).abs() < 1e-12);
        assert!((agg.mrr - 0.5).abs() < 1e-12);
        assert!((agg.map - 7.0 / 12.0).abs() < 1e-12);
        assert_eq!(agg.hit_rate_at_k[&1], 0.0);
        assert_eq!(agg.hit_rate_at_k[&3], 1.0);

        assert_eq!(bundle.basic.candidates_recommended, 3);
        assert_eq!(bundle.basic.coverage, 1.0);
        assert_eq!(bundle.success.unwrap().successful_recommendations, 1);

        let dist = bundle.score_distribution.unwrap();
        assert!((dist.mean - 0.8).abs() < 1e-12);
        assert!((dist.range - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_empty_ranked_list_is_skipped() {
        let gt = GroundTruth::from_pairs(vec![(1, vec!["alice"]), (2, vec!["bob"])]);
        let mut result = AlgorithmResult::new();
        result.insert(RequestId::from_u64(1), ranked(&[("alice", 1.0)]));
        result.insert(RequestId::from_u64(2), Vec::new());

        let bundle = engine().compute("a", &gt, &result).unwrap().unwrap();

        assert_eq!(bundle.basic.total_requests_analyzed, 2);
        assert_eq!(bundle.basic.valid_requests, 1);
        assert!((bundle.basic.coverage - 0.5).abs() < 1e-12);
        assert_eq!(bundle.metric(MetricKey::ReciprocalRank), Some(1.0));
    }

    #[test]
    fn test_score_distribution_includes_requests_outside_ground_truth() {
        let gt = GroundTruth::from_pairs(vec![(1, vec!["alice"])]);
        let mut result = AlgorithmResult::new();
        result.insert(RequestId::from_u64(1), ranked(&[("alice", 2.0)]));
        result.insert(RequestId::from_u64(99), ranked(&[("zed", 4.0)]));

        let bundle = engine().compute("a", &gt, &result).unwrap().unwrap();
        let dist = bundle.score_distribution.unwrap();

        assert_eq!(dist.max, 4.0);
        assert_eq!(dist.min, 2.0);
        assert_eq!(dist.std, 1.0);
        assert_eq!(bundle.basic.valid_requests, 1);
    }

    #[test]
    fn test_per_item_order_follows_ground_truth() {
        let gt = GroundTruth::from_pairs(vec![
            (3, vec!["alice"]),
            (1, vec!["bob"]),
            (2, vec!["carol"]),
        ]);
        let mut result = AlgorithmResult::new();
        result.insert(RequestId::from_u64(1), ranked(&[("bob", 1.0)]));
        result.insert(RequestId::from_u64(2), ranked(&[("x", 1.0), ("carol", 0.5)]));
        result.insert(RequestId::from_u64(3), ranked(&[("x", 1.0)]));

        let bundle = engine().compute("a", &gt, &result).unwrap().unwrap();

        let ids: Vec<u64> = bundle.per_item.request_ids.iter().map(|id| id.as_u64()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(bundle.per_item.reciprocal_rank, vec![0.0, 1.0, 0.5]);
        assert_eq!(bundle.per_item.correct_at_k[&1], vec![0, 1, 0]);
    }

    #[test]
    fn test_stability_subset() {
        let gt = GroundTruth::from_pairs(vec![(1, vec!["alice"])]);
        let mut result = AlgorithmResult::new();
        result.insert(RequestId::from_u64(1), ranked(&[("alice", 1.0)]));

        let bundle = engine().compute("a", &gt, &result).unwrap().unwrap();
        let names: Vec<&str> = bundle.stability.keys().map(String::as_str).collect();

        assert_eq!(
            names,
            vec!["average_precision", "precision_at_5", "recall_at_5", "reciprocal_rank"]
        );
        assert!(bundle.stability_of(MetricKey::ReciprocalRank).is_some());
    }

    #[test]
    fn test_non_finite_score_is_error() {
        let gt = GroundTruth::from_pairs(vec![(1, vec!["alice"])]);
        let mut result = AlgorithmResult::new();
        result.insert(
            RequestId::from_u64(1),
            vec![(CandidateId::from("alice"), f64::NAN)],
        );

        let err = engine().compute("a", &gt, &result).unwrap_err();
        assert!(matches!(err, EvaluationError::NonFiniteScore { .. }));
    }
}
