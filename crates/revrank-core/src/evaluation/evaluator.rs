//! Evaluation run orchestration.
//!
//! Scores every algorithm against the same ground truth, isolates failures
//! per algorithm, then runs the comparator and significance tester over the
//! algorithms that succeeded.

use super::comparison::{self, ComparisonReport};
use super::engine::{EvaluationBundle, MetricsEngine};
use super::ground_truth::{GroundTruth, GroundTruthSummary};
use super::significance::{SignificanceOutcome, SignificanceTester};
use crate::config::EvaluationConfig;
use crate::error::EvaluationError;
use crate::types::AlgorithmResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{info, warn};

/// Progress of an evaluation run, reported after each algorithm.
#[derive(Debug, Clone)]
pub struct EvaluationProgress {
    /// Algorithm just processed
    pub algorithm: String,
    /// Algorithms processed so far
    pub completed: usize,
    /// Algorithms in the run
    pub total: usize,
}

impl EvaluationProgress {
    /// Returns the completion percentage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Result of one evaluation run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    /// No ground truth or no algorithms: there is nothing to evaluate
    NothingToEvaluate { reason: String },
    Completed(EvaluationReport),
}

impl EvaluationOutcome {
    pub fn report(&self) -> Option<&EvaluationReport> {
        match self {
            EvaluationOutcome::Completed(report) => Some(report),
            EvaluationOutcome::NothingToEvaluate { .. } => None,
        }
    }

    pub fn into_report(self) -> Option<EvaluationReport> {
        match self {
            EvaluationOutcome::Completed(report) => Some(report),
            EvaluationOutcome::NothingToEvaluate { .. } => None,
        }
    }
}

/// Everything produced by a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub ground_truth: GroundTruthSummary,
    pub config: EvaluationConfig,
    /// Bundles of the algorithms that were scored successfully
    pub bundles: BTreeMap<String, EvaluationBundle>,
    /// Algorithms excluded because their computation failed, with the reason
    pub failures: BTreeMap<String, String>,
    /// Present when at least two algorithms were scored
    pub comparison: Option<ComparisonReport>,
    pub significance: SignificanceOutcome,
}

/// Runs a full evaluation against one ground truth.
pub struct Evaluator {
    ground_truth: GroundTruth,
    config: EvaluationConfig,
    engine: MetricsEngine,
    tester: SignificanceTester,
}

impl Evaluator {
    pub fn new(ground_truth: GroundTruth, config: EvaluationConfig) -> Self {
        Self {
            engine: MetricsEngine::new(&config),
            tester: SignificanceTester::new(&config),
            ground_truth,
            config,
        }
    }

    /// Replaces the significance tester (e.g. one without a backend).
    pub fn with_tester(mut self, tester: SignificanceTester) -> Self {
        self.tester = tester;
        self
    }

    pub fn ground_truth(&self) -> &GroundTruth {
        &self.ground_truth
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluates every algorithm's result.
    pub fn evaluate(&self, results: &BTreeMap<String, AlgorithmResult>) -> EvaluationOutcome {
        self.evaluate_with(results, |_| {})
    }

    /// Evaluates every algorithm's result, reporting progress after each one.
    ///
    /// # Arguments
    ///
    /// * `results` - Ranked lists per algorithm, keyed by algorithm name
    /// * `on_progress` - Callback for progress updates
    pub fn evaluate_with<F>(
        &self,
        results: &BTreeMap<String, AlgorithmResult>,
        mut on_progress: F,
    ) -> EvaluationOutcome
    where
        F: FnMut(EvaluationProgress),
    {
        if self.ground_truth.is_empty() {
            warn!("No ground truth available, nothing to evaluate");
            return EvaluationOutcome::NothingToEvaluate {
                reason: "no ground truth".to_string(),
            };
        }
        if results.is_empty() {
            warn!("No algorithm results supplied, nothing to evaluate");
            return EvaluationOutcome::NothingToEvaluate {
                reason: "no algorithm results".to_string(),
            };
        }

        info!(
            algorithms = results.len(),
            requests = self.ground_truth.len(),
            "Starting evaluation"
        );

        let total = results.len();
        let mut bundles = BTreeMap::new();
        let mut failures = BTreeMap::new();

        for (i, (name, result)) in results.iter().enumerate() {
            match self.compute_isolated(name, result) {
                Ok(Some(bundle)) => {
                    if !bundle.has_valid_requests() {
                        warn!("{}: no overlap with ground truth, aggregates undefined", name);
                    }
                    bundles.insert(name.clone(), bundle);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("{}: evaluation failed, excluding from comparison: {}", name, err);
                    failures.insert(name.clone(), err.to_string());
                }
            }

            on_progress(EvaluationProgress {
                algorithm: name.clone(),
                completed: i + 1,
                total,
            });
        }

        let comparison = comparison::compare(&bundles);
        let significance = self.tester.test(&bundles);

        info!(
            evaluated = bundles.len(),
            failed = failures.len(),
            "Evaluation complete"
        );

        EvaluationOutcome::Completed(EvaluationReport {
            ground_truth: self.ground_truth.summary(),
            config: self.config.clone(),
            bundles,
            failures,
            comparison,
            significance,
        })
    }

    /// Computes one bundle, turning a panic into an error.
    fn compute_isolated(
        &self,
        name: &str,
        result: &AlgorithmResult,
    ) -> Result<Option<EvaluationBundle>, EvaluationError> {
        catch_unwind(AssertUnwindSafe(|| {
            self.engine.compute(name, &self.ground_truth, result)
        }))
        .unwrap_or_else(|payload| Err(EvaluationError::Panicked(panic_message(&payload))))
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CandidateId, RequestId};

    fn ground_truth() -> GroundTruth {
        GroundTruth::from_pairs(vec![(1, vec!["alice"]), (2, vec!["bob"])])
    }

    fn result(pairs: &[(u64, &[&str])]) -> AlgorithmResult {
        pairs
            .iter()
            .map(|(id, names)| {
                let list = names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (CandidateId::from(*name), 1.0 / (i + 1) as f64))
                    .collect();
                (RequestId::from_u64(*id), list)
            })
            .collect()
    }

    #[test]
    fn test_empty_ground_truth_is_nothing_to_evaluate() {
        let evaluator = Evaluator::new(GroundTruth::default(), EvaluationConfig::default());
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), result(&[(1, &["alice"])]));

        assert!(matches!(
            evaluator.evaluate(&results),
            EvaluationOutcome::NothingToEvaluate { .. }
        ));
    }

    #[test]
    fn test_no_algorithms_is_nothing_to_evaluate() {
        let evaluator = Evaluator::new(ground_truth(), EvaluationConfig::default());
        let outcome = evaluator.evaluate(&BTreeMap::new());
        assert!(outcome.report().is_none());
    }

    #[test]
    fn test_failing_algorithm_is_isolated() {
        let evaluator = Evaluator::new(ground_truth(), EvaluationConfig::default());
        let mut results = BTreeMap::new();
        results.insert("good".to_string(), result(&[(1, &["alice"]), (2, &["x", "bob"])]));
        results.insert("other".to_string(), result(&[(1, &["x", "alice"])]));
        let mut broken = AlgorithmResult::new();
        broken.insert(
            RequestId::from_u64(1),
            vec![(CandidateId::from("alice"), f64::INFINITY)],
        );
        results.insert("broken".to_string(), broken);

        let report = evaluator.evaluate(&results).into_report().unwrap();

        assert_eq!(report.bundles.len(), 2);
        assert!(report.failures.contains_key("broken"));
        assert!(report.comparison.is_some());
        let table = &report.comparison.unwrap().table;
        assert!(table.iter().all(|row| row.algorithm != "broken"));
    }

    #[test]
    fn test_no_overlap_is_included_with_undefined_aggregates() {
        let evaluator = Evaluator::new(ground_truth(), EvaluationConfig::default());
        let mut results = BTreeMap::new();
        results.insert("good".to_string(), result(&[(1, &["alice"])]));
        results.insert("elsewhere".to_string(), result(&[(42, &["alice"])]));

        let report = evaluator.evaluate(&results).into_report().unwrap();
        let bundle = &report.bundles["elsewhere"];

        assert_eq!(bundle.basic.valid_requests, 0);
        assert!(bundle.aggregates.is_none());
        assert_eq!(report.comparison.unwrap().table.len(), 2);
    }

    #[test]
    fn test_progress_reported_per_algorithm() {
        let evaluator = Evaluator::new(ground_truth(), EvaluationConfig::default());
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), result(&[(1, &["alice"])]));
        results.insert("b".to_string(), result(&[(2, &["bob"])]));

        let mut seen = Vec::new();
        evaluator.evaluate_with(&results, |progress| {
            seen.push((progress.algorithm.clone(), progress.completed, progress.total))
        });

        assert_eq!(
            seen,
            vec![("a".to_string(), 1, 2), ("b".to_string(), 2, 2)]
        );
    }

    #[test]
    fn test_small_run_skips_significance() {
        let evaluator = Evaluator::new(ground_truth(), EvaluationConfig::default());
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), result(&[(1, &["alice"]), (2, &["bob"])]));
        results.insert("b".to_string(), result(&[(1, &["x", "alice"]), (2, &["bob"])]));

        let report = evaluator.evaluate(&results).into_report().unwrap();
        assert!(matches!(
            report.significance,
            SignificanceOutcome::Skipped { .. }
        ));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&payload), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&payload), "unknown panic");
    }
}
