//! Ground truth: who actually reviewed each request.

use crate::types::{CandidateId, ParticipationRecord, RequestId, ReviewRequest};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Authoritative reviewer set per request, built once from historical records.
///
/// Only requests with at least one reviewer have an entry. Requests without
/// reviewers are absent rather than mapped to an empty set, so they are
/// excluded from every metric instead of being scored as failures.
///
/// Iteration follows the order of the request list given to [`GroundTruth::build`].
/// Per-item metric sequences are produced in this order, which is what makes
/// them positionally comparable across algorithms.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    reviewers: IndexMap<RequestId, BTreeSet<CandidateId>>,
    summary: GroundTruthSummary,
}

/// Diagnostics about how the ground truth was derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroundTruthSummary {
    /// Distinct requests in the input request list
    pub total_requests: usize,
    /// Requests with at least one matching reviewer
    pub requests_with_reviewers: usize,
    /// Requests with no matching reviewer (excluded from evaluation)
    pub requests_without_reviewers: usize,
    /// Participation records supplied
    pub participation_records: usize,
    /// Distinct reviewers across all ground-truth requests
    pub distinct_reviewers: usize,
}

impl GroundTruth {
    /// Builds ground truth from the request list and participation records.
    ///
    /// Records for requests missing from `requests` are ignored. Duplicate
    /// requests keep their first position.
    pub fn build(requests: &[ReviewRequest], records: &[ParticipationRecord]) -> Self {
        let mut by_request: HashMap<RequestId, BTreeSet<CandidateId>> = HashMap::new();
        for record in records {
            by_request
                .entry(record.request)
                .or_default()
                .insert(record.reviewer.clone());
        }

        let mut reviewers = IndexMap::new();
        let mut seen = BTreeSet::new();
        let mut without_reviewers = 0;

        for request in requests {
            if !seen.insert(request.id) {
                continue;
            }
            match by_request.remove(&request.id) {
                Some(set) if !set.is_empty() => {
                    reviewers.insert(request.id, set);
                }
                _ => without_reviewers += 1,
            }
        }

        let distinct_reviewers = reviewers
            .values()
            .flat_map(|set| set.iter())
            .collect::<BTreeSet<_>>()
            .len();

        let summary = GroundTruthSummary {
            total_requests: seen.len(),
            requests_with_reviewers: reviewers.len(),
            requests_without_reviewers: without_reviewers,
            participation_records: records.len(),
            distinct_reviewers,
        };

        Self { reviewers, summary }
    }

    /// Builds ground truth directly from (request, reviewers) pairs, in order.
    ///
    /// Pairs with no reviewers are dropped, as in [`GroundTruth::build`].
    pub fn from_pairs<I, R, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u64, R)>,
        R: IntoIterator<Item = C>,
        C: Into<CandidateId>,
    {
        let mut requests = Vec::new();
        let mut records = Vec::new();
        for (request, reviewers) in pairs {
            requests.push(ReviewRequest::new(request));
            records.extend(
                reviewers
                    .into_iter()
                    .map(|reviewer| ParticipationRecord::new(request, reviewer)),
            );
        }
        Self::build(&requests, &records)
    }

    /// Reviewers of `request`, if it is part of the ground truth.
    pub fn reviewers(&self, request: &RequestId) -> Option<&BTreeSet<CandidateId>> {
        self.reviewers.get(request)
    }

    /// Iterates ground-truth requests in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&RequestId, &BTreeSet<CandidateId>)> {
        self.reviewers.iter()
    }

    /// Number of requests with ground truth.
    pub fn len(&self) -> usize {
        self.reviewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviewers.is_empty()
    }

    pub fn summary(&self) -> GroundTruthSummary {
        self.summary
    }
}
