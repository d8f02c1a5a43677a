//! Per-request ranking-quality metrics.
//!
//! Every function here scores one ranked list against one request's
//! ground-truth reviewer set. Relevance is binary: a candidate is relevant
//! iff they actually reviewed the request.
//!
//! - Precision@k, Recall@k, F1@k, Hit@k
//! - Reciprocal Rank (averaged into MRR)
//! - Average Precision (averaged into MAP)
//! - DCG@k and NDCG@k
//!
//! # References
//!
//! - Järvelin & Kekäläinen (2002). "Cumulated gain-based evaluation of IR techniques"
//! - Voorhees & Harman (2005). "TREC: Experiment and Evaluation in Information Retrieval"

use crate::types::{CandidateId, RequestId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Names one per-item metric series.
///
/// Used to select series for stability analysis, leaderboards and export
/// columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKey {
    Precision(usize),
    Recall(usize),
    F1(usize),
    HitRate(usize),
    ReciprocalRank,
    AveragePrecision,
    Dcg,
    Ndcg,
}

impl MetricKey {
    /// Stable snake_case name used in reports and exported columns.
    pub fn name(&self) -> String {
        match self {
            MetricKey::Precision(k) => format!("precision_at_{}", k),
            MetricKey::Recall(k) => format!("recall_at_{}", k),
            MetricKey::F1(k) => format!("f1_at_{}", k),
            MetricKey::HitRate(k) => format!("hit_rate_at_{}", k),
            MetricKey::ReciprocalRank => "reciprocal_rank".to_string(),
            MetricKey::AveragePrecision => "average_precision".to_string(),
            MetricKey::Dcg => "dcg".to_string(),
            MetricKey::Ndcg => "ndcg".to_string(),
        }
    }

    /// Short label for console tables (e.g. "P@5", "MRR").
    ///
    /// DCG and NDCG carry no cutoff here; theirs is set per run.
    pub fn label(&self) -> String {
        match self {
            MetricKey::Precision(k) => format!("P@{}", k),
            MetricKey::Recall(k) => format!("R@{}", k),
            MetricKey::F1(k) => format!("F1@{}", k),
            MetricKey::HitRate(k) => format!("Hit@{}", k),
            MetricKey::ReciprocalRank => "MRR".to_string(),
            MetricKey::AveragePrecision => "MAP".to_string(),
            MetricKey::Dcg => "DCG".to_string(),
            MetricKey::Ndcg => "NDCG".to_string(),
        }
    }

    /// The k cutoff for set-based metrics.
    pub fn cutoff(&self) -> Option<usize> {
        match self {
            MetricKey::Precision(k)
            | MetricKey::Recall(k)
            | MetricKey::F1(k)
            | MetricKey::HitRate(k) => Some(*k),
            _ => None,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// All metrics for one (algorithm, request) pair.
#[derive(Debug, Clone, Serialize)]
pub struct ItemMetrics {
    pub request: RequestId,
    /// Ground-truth reviewers found in the top k
    pub correct_at_k: BTreeMap<usize, usize>,
    pub precision_at_k: BTreeMap<usize, f64>,
    pub recall_at_k: BTreeMap<usize, f64>,
    pub f1_at_k: BTreeMap<usize, f64>,
    /// 1.0 if any ground-truth reviewer is in the top k, else 0.0
    pub hit_at_k: BTreeMap<usize, f64>,
    pub reciprocal_rank: f64,
    pub average_precision: f64,
    pub dcg: f64,
    pub ndcg: f64,
}

impl ItemMetrics {
    /// Computes every metric for one ranked list.
    ///
    /// # Arguments
    ///
    /// * `request` - Request being scored
    /// * `results` - Ranked (candidate, score) pairs, highest score first
    /// * `relevant` - Ground-truth reviewers of the request (non-empty)
    /// * `k_values` - Cutoffs for the set-based metrics
    /// * `dcg_cutoff` - Cutoff for DCG/NDCG
    pub fn compute(
        request: RequestId,
        results: &[(CandidateId, f64)],
        relevant: &BTreeSet<CandidateId>,
        k_values: &[usize],
        dcg_cutoff: usize,
    ) -> Self {
        let mut metrics = Self {
            request,
            correct_at_k: BTreeMap::new(),
            precision_at_k: BTreeMap::new(),
            recall_at_k: BTreeMap::new(),
            f1_at_k: BTreeMap::new(),
            hit_at_k: BTreeMap::new(),
            reciprocal_rank: reciprocal_rank(results, relevant),
            average_precision: average_precision(results, relevant),
            dcg: dcg_at_k(results, relevant, dcg_cutoff),
            ndcg: ndcg_at_k(results, relevant, dcg_cutoff),
        };

        for &k in k_values {
            let correct = correct_at_k(results, relevant, k);
            let precision = ratio(correct, k);
            let recall = ratio(correct, relevant.len());

            metrics.correct_at_k.insert(k, correct);
            metrics.precision_at_k.insert(k, precision);
            metrics.recall_at_k.insert(k, recall);
            metrics.f1_at_k.insert(k, f1(precision, recall));
            metrics
                .hit_at_k
                .insert(k, if correct > 0 { 1.0 } else { 0.0 });
        }

        metrics
    }

    /// Value of one metric for this item, if it was computed.
    pub fn get(&self, key: MetricKey) -> Option<f64> {
        match key {
            MetricKey::Precision(k) => self.precision_at_k.get(&k).copied(),
            MetricKey::Recall(k) => self.recall_at_k.get(&k).copied(),
            MetricKey::F1(k) => self.f1_at_k.get(&k).copied(),
            MetricKey::HitRate(k) => self.hit_at_k.get(&k).copied(),
            MetricKey::ReciprocalRank => Some(self.reciprocal_rank),
            MetricKey::AveragePrecision => Some(self.average_precision),
            MetricKey::Dcg => Some(self.dcg),
            MetricKey::Ndcg => Some(self.ndcg),
        }
    }
}

#[inline]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[inline]
fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

// ============================================================================
// Set-Based Metrics: Precision, Recall, F1, Hit
// ============================================================================

/// Counts distinct ground-truth reviewers among the top k candidates.
///
/// Lists shorter than k are not padded.
pub fn correct_at_k(
    results: &[(CandidateId, f64)],
    relevant: &BTreeSet<CandidateId>,
    k: usize,
) -> usize {
    results
        .iter()
        .take(k)
        .map(|(candidate, _)| candidate)
        .filter(|candidate| relevant.contains(*candidate))
        .collect::<HashSet<_>>()
        .len()
}

/// Computes Precision@k.
///
/// # Formula
///
/// ```text
/// P@k = |relevant ∩ top_k| / k
/// ```
///
/// The denominator is always k: a list shorter than k is penalized, not
/// excused. Returns 0.0 for k = 0.
pub fn precision_at_k(
    results: &[(CandidateId, f64)],
    relevant: &BTreeSet<CandidateId>,
    k: usize,
) -> f64 {
    ratio(correct_at_k(results, relevant, k), k)
}

/// Computes Recall@k.
///
/// # Formula
///
/// ```text
/// R@k = |relevant ∩ top_k| / |relevant|
/// ```
///
/// Ground truth is never empty for an evaluated request; an empty set yields 0.0.
pub fn recall_at_k(
    results: &[(CandidateId, f64)],
    relevant: &BTreeSet<CandidateId>,
    k: usize,
) -> f64 {
    ratio(correct_at_k(results, relevant, k), relevant.len())
}

/// Computes F1@k, the harmonic mean of Precision@k and Recall@k.
///
/// Returns 0.0 if both precision and recall are 0.
pub fn f1_at_k(results: &[(CandidateId, f64)], relevant: &BTreeSet<CandidateId>, k: usize) -> f64 {
    f1(
        precision_at_k(results, relevant, k),
        recall_at_k(results, relevant, k),
    )
}

/// Returns true if any ground-truth reviewer is in the top k.
pub fn hit_at_k(results: &[(CandidateId, f64)], relevant: &BTreeSet<CandidateId>, k: usize) -> bool {
    correct_at_k(results, relevant, k) > 0
}

// ============================================================================
// MRR (Mean Reciprocal Rank)
// ============================================================================

/// Computes Reciprocal Rank for a single request.
///
/// Scans the full list: 1/rank of the first ground-truth reviewer, or 0.0 if
/// none appears anywhere.
pub fn reciprocal_rank(results: &[(CandidateId, f64)], relevant: &BTreeSet<CandidateId>) -> f64 {
    results
        .iter()
        .position(|(candidate, _)| relevant.contains(candidate))
        .map(|i| 1.0 / (i + 1) as f64)
        .unwrap_or(0.0)
}

// ============================================================================
// MAP (Mean Average Precision)
// ============================================================================

/// Computes Average Precision for a single request.
///
/// # Formula
///
/// ```text
/// AP = mean over matching ranks r of (matches seen up to r) / r
/// ```
///
/// The mean is taken over the matches actually found in the list, not over
/// the size of the ground-truth set. Returns 0.0 if nothing matches.
pub fn average_precision(results: &[(CandidateId, f64)], relevant: &BTreeSet<CandidateId>) -> f64 {
    let mut precision_sum = 0.0;
    let mut found = 0usize;

    for (i, (candidate, _)) in results.iter().enumerate() {
        if relevant.contains(candidate) {
            found += 1;
            precision_sum += found as f64 / (i + 1) as f64;
        }
    }

    if found == 0 {
        0.0
    } else {
        precision_sum / found as f64
    }
}

// ============================================================================
// DCG / NDCG
// ============================================================================

/// Computes DCG@k with binary gain.
///
/// # Formula
///
/// ```text
/// DCG@k = Σ rel(i) / log₂(i + 1)  for i in 1..=k
/// ```
pub fn dcg_at_k(results: &[(CandidateId, f64)], relevant: &BTreeSet<CandidateId>, k: usize) -> f64 {
    results
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, (candidate, _))| relevant.contains(candidate))
        .map(|(i, _)| 1.0 / discount(i + 1))
        .sum()
}

/// DCG of the best possible ordering: every one of the first
/// `min(relevant_count, k)` positions holds a reviewer.
///
/// Uses the size of the ground-truth set, not the number of reviewers the
/// algorithm actually retrieved.
pub fn ideal_dcg(relevant_count: usize, k: usize) -> f64 {
    (1..=relevant_count.min(k)).map(|rank| 1.0 / discount(rank)).sum()
}

/// Computes NDCG@k = DCG@k / IDCG@k, or 0.0 if IDCG is 0.
pub fn ndcg_at_k(results: &[(CandidateId, f64)], relevant: &BTreeSet<CandidateId>, k: usize) -> f64 {
    let idcg = ideal_dcg(relevant.len(), k);
    if idcg > 0.0 {
        dcg_at_k(results, relevant, k) / idcg
    } else {
        0.0
    }
}

/// Logarithmic discount for a 1-indexed position: log₂(position + 1).
#[inline]
fn discount(position: usize) -> f64 {
    (position as f64 + 1.0).log2()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(names: &[&str]) -> Vec<(CandidateId, f64)> {
        names
            .iter()
            .enumerate()
            .map(|(i, &name)| (CandidateId::from(name), 1.0 - i as f64 * 0.1))
            .collect()
    }

    fn reviewers(names: &[&str]) -> BTreeSet<CandidateId> {
        names.iter().map(|&name| CandidateId::from(name)).collect()
    }

    #[test]
    fn test_worked_example() {
        // Reviewers alice and bob; algorithm ranks carol, alice, bob
        let res = candidates(&["carol", "alice", "bob"]);
        let gt = reviewers(&["alice", "bob"]);

        assert!(precision_at_k(&res, &gt, 1).abs() < 1e-12);
        assert!((precision_at_k(&res, &gt, 3) - 2.0 / 3.0).abs() < 1e-12);
        assert!(recall_at_k(&res, &gt, 1).abs() < 1e-12);
        assert!((recall_at_k(&res, &gt, 3) - 1.0).abs() < 1e-12);
        assert!((reciprocal_rank(&res, &gt) - 0.5).abs() < 1e-12);
        assert!((average_precision(&res, &gt) - 7.0 / 12.0).abs() < 1e-12);

        let expected_dcg = 1.0 / 3f64.log2() + 1.0 / 4f64.log2();
        assert!((dcg_at_k(&res, &gt, 10) - expected_dcg).abs() < 1e-12);
    }

    #[test]
    fn test_precision_penalizes_short_lists() {
        let res = candidates(&["alice"]);
        let gt = reviewers(&["alice"]);

        // One correct candidate, but the denominator stays 5
        assert!((precision_at_k(&res, &gt, 5) - 0.2).abs() < 1e-12);
        assert!((recall_at_k(&res, &gt, 5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_precision_at_zero() {
        let res = candidates(&["alice"]);
        let gt = reviewers(&["alice"]);
        assert_eq!(precision_at_k(&res, &gt, 0), 0.0);
    }

    #[test]
    fn test_f1_at_k() {
        // P@5 = 2/5, R@5 = 2/3 -> F1 = 0.5
        let res = candidates(&["a", "x", "b", "y", "z"]);
        let gt = reviewers(&["a", "b", "c"]);

        assert!((f1_at_k(&res, &gt, 5) - 0.5).abs() < 1e-12);
        assert_eq!(f1_at_k(&res, &gt, 0), 0.0);
    }

    #[test]
    fn test_correct_at_k_ignores_repeated_candidates() {
        let res = vec![
            (CandidateId::from("alice"), 0.9),
            (CandidateId::from("alice"), 0.8),
        ];
        let gt = reviewers(&["alice", "bob"]);
        assert_eq!(correct_at_k(&res, &gt, 2), 1);
    }

    #[test]
    fn test_hit_at_k() {
        let res = candidates(&["x", "y", "alice"]);
        let gt = reviewers(&["alice"]);

        assert!(!hit_at_k(&res, &gt, 1));
        assert!(hit_at_k(&res, &gt, 3));
    }

    #[test]
    fn test_reciprocal_rank_scans_full_list() {
        let mut names = vec!["x"; 15];
        names.push("alice");
        let res = candidates(&names);
        let gt = reviewers(&["alice"]);

        assert!((reciprocal_rank(&res, &gt) - 1.0 / 16.0).abs() < 1e-12);
        assert_eq!(reciprocal_rank(&candidates(&["x", "y"]), &gt), 0.0);
    }

    #[test]
    fn test_average_precision_no_matches() {
        let res = candidates(&["x", "y"]);
        let gt = reviewers(&["alice"]);
        assert_eq!(average_precision(&res, &gt), 0.0);
    }

    #[test]
    fn test_ideal_dcg_caps_at_cutoff() {
        let twelve = ideal_dcg(12, 10);
        let ten = ideal_dcg(10, 10);
        assert!((twelve - ten).abs() < 1e-12);
        assert_eq!(ideal_dcg(0, 10), 0.0);
    }

    #[test]
    fn test_ndcg_perfect_ranking() {
        let res = candidates(&["alice", "bob", "x"]);
        let gt = reviewers(&["alice", "bob"]);
        assert!((ndcg_at_k(&res, &gt, 10) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ndcg_uses_ground_truth_size_for_ideal() {
        // Only one of three reviewers retrieved at rank 1: DCG = 1, IDCG > 1
        let res = candidates(&["alice"]);
        let gt = reviewers(&["alice", "bob", "carol"]);

        let ndcg = ndcg_at_k(&res, &gt, 10);
        assert!(ndcg < 1.0);
        assert!((ndcg - 1.0 / ideal_dcg(3, 10)).abs() < 1e-12);
    }

    #[test]
    fn test_item_metrics_compute() {
        let res = candidates(&["carol", "alice", "bob"]);
        let gt = reviewers(&["alice", "bob"]);

        let m = ItemMetrics::compute(RequestId::from_u64(1), &res, &gt, &[1, 3, 5, 10], 10);

        assert_eq!(m.correct_at_k[&1], 0);
        assert_eq!(m.correct_at_k[&3], 2);
        assert_eq!(m.hit_at_k[&1], 0.0);
        assert_eq!(m.hit_at_k[&3], 1.0);
        assert!((m.recall_at_k[&10] - 1.0).abs() < 1e-12);
        assert!((m.precision_at_k[&10] - 0.2).abs() < 1e-12);
        assert_eq!(m.get(MetricKey::ReciprocalRank), Some(0.5));
        assert_eq!(m.get(MetricKey::Precision(7)), None);
    }

    #[test]
    fn test_metric_key_names() {
        assert_eq!(MetricKey::Precision(5).name(), "precision_at_5");
        assert_eq!(MetricKey::ReciprocalRank.label(), "MRR");
        assert_eq!(MetricKey::Ndcg.label(), "NDCG");
        assert_eq!(MetricKey::F1(1).cutoff(), Some(1));
        assert_eq!(MetricKey::Ndcg.cutoff(), None);
    }
}
