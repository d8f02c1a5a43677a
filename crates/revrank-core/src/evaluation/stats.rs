//! Statistical utilities for evaluation rigor.
//!
//! This module provides:
//! - Descriptive statistics (mean, population standard deviation, linear
//!   percentiles) used for score distributions and stability analysis
//! - The Friedman test for comparing several algorithms on the same requests
//! - The Wilcoxon signed-rank test for comparing two algorithms pairwise
//!
//! Both tests are non-parametric and paired: sample `i` of every series must
//! refer to the same request.
//!
//! # References
//!
//! - Friedman (1937). "The use of ranks to avoid the assumption of normality"
//! - Wilcoxon (1945). "Individual comparisons by ranking methods"
//! - Demšar (2006). "Statistical comparisons of classifiers over multiple data sets"

use crate::config::EXACT_SIGNED_RANK_MAX_N;
use crate::error::StatTestError;
use serde::Serialize;

// ============================================================================
// Descriptive statistics
// ============================================================================

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n). Returns NaN for an empty slice.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Percentile with linear interpolation between order statistics.
///
/// `q` is in [0, 100]. The rank of the percentile is `q/100 * (n - 1)`; the
/// value is interpolated between the two order statistics around it.
/// `sorted` must be ascending. Returns NaN for an empty slice.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Returns an ascending copy of `values`.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Median (50th percentile). Returns NaN for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    percentile_sorted(&sorted_copy(values), 50.0)
}

// ============================================================================
// Ranking with ties
// ============================================================================

/// Assigns 1-based ranks, giving tied values the average of their ranks.
///
/// Returns the ranks (in input order) and the size of every tie group with
/// more than one member.
fn average_ranks(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut start = 0;

    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end (0-based) share ranks start+1..=end
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        if end - start > 1 {
            ties.push(end - start);
        }
        start = end;
    }

    (ranks, ties)
}

fn tie_term(ties: &[usize]) -> f64 {
    ties.iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum()
}

// ============================================================================
// Friedman test
// ============================================================================

/// Result of a Friedman test.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FriedmanResult {
    /// Tie-corrected chi-square statistic
    pub statistic: f64,
    /// p-value from the chi-square distribution with k - 1 degrees of freedom
    pub p_value: f64,
    /// Degrees of freedom (groups - 1)
    pub df: usize,
    /// Number of blocks (requests)
    pub n_blocks: usize,
    /// Number of groups (algorithms)
    pub k_groups: usize,
}

impl FriedmanResult {
    /// Returns true if the difference is significant at the given alpha level.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }

    /// Formats the result for display, marking `*` when p < alpha.
    pub fn format(&self, alpha: f64) -> String {
        let sig_marker = if self.is_significant(alpha) { "*" } else { "" };
        format!(
            "χ²({})={:.3}, p={:.4}{}",
            self.df, self.statistic, self.p_value, sig_marker
        )
    }
}

/// Performs the Friedman test over k paired series of equal length.
///
/// Each position is a block (one request); values within a block are ranked
/// across groups, tied values sharing their average rank.
///
/// # Formula
///
/// ```text
/// Q = [12 / (n k (k+1)) Σ R_j² − 3 n (k+1)] / C
/// C = 1 − Σ (t³ − t) / (n k (k² − 1))
/// ```
///
/// where `R_j` is the rank sum of group j and `t` ranges over tie-group sizes.
///
/// # Errors
///
/// - fewer than 2 groups, empty or unequal-length series
/// - every block fully tied (C = 0), which leaves the statistic undefined
pub fn friedman_test(groups: &[&[f64]]) -> Result<FriedmanResult, StatTestError> {
    let k = groups.len();
    if k < 2 {
        return Err(StatTestError::TooFewGroups(k));
    }
    let n = groups[0].len();
    if n == 0 {
        return Err(StatTestError::EmptySample);
    }
    if groups.iter().any(|g| g.len() != n) {
        return Err(StatTestError::LengthMismatch);
    }

    let mut rank_sums = vec![0.0; k];
    let mut ties_total = 0.0;
    let mut block = vec![0.0; k];

    for i in 0..n {
        for (j, group) in groups.iter().enumerate() {
            block[j] = group[i];
        }
        let (ranks, ties) = average_ranks(&block);
        for (sum, rank) in rank_sums.iter_mut().zip(&ranks) {
            *sum += rank;
        }
        ties_total += tie_term(&ties);
    }

    let (n_f, k_f) = (n as f64, k as f64);
    let correction = 1.0 - ties_total / (n_f * k_f * (k_f * k_f - 1.0));
    if correction <= f64::EPSILON {
        return Err(StatTestError::AllTied);
    }

    let sum_sq: f64 = rank_sums.iter().map(|r| r * r).sum();
    let statistic =
        (12.0 / (n_f * k_f * (k_f + 1.0)) * sum_sq - 3.0 * n_f * (k_f + 1.0)) / correction;
    let df = k - 1;

    Ok(FriedmanResult {
        statistic,
        p_value: chi_square_sf(statistic, df as f64).clamp(0.0, 1.0),
        df,
        n_blocks: n,
        k_groups: k,
    })
}

// ============================================================================
// Wilcoxon signed-rank test
// ============================================================================

/// How the signed-rank p-value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignedRankMethod {
    /// Exact null distribution (small samples without tied magnitudes)
    Exact,
    /// Normal approximation with tie correction
    Normal,
}

/// Result of a Wilcoxon signed-rank test.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WilcoxonResult {
    /// min(W+, W−)
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Pairs with a non-zero difference
    pub n_effective: usize,
    pub method: SignedRankMethod,
}

impl WilcoxonResult {
    /// Returns true if the difference is significant at the given alpha level.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }

    /// Formats the result for display, marking `*` when p < alpha.
    pub fn format(&self, alpha: f64) -> String {
        let sig_marker = if self.is_significant(alpha) { "*" } else { "" };
        format!(
            "W={:.1}, n={}, p={:.4}{}",
            self.statistic, self.n_effective, self.p_value, sig_marker
        )
    }
}

/// Performs a two-sided Wilcoxon signed-rank test on paired samples.
///
/// Zero differences are discarded before ranking. The p-value comes from the
/// exact null distribution when at most [`EXACT_SIGNED_RANK_MAX_N`] non-zero
/// differences remain and none of their magnitudes tie; otherwise from the
/// normal approximation with tie-corrected variance.
///
/// # Errors
///
/// - unequal or empty inputs
/// - every difference is zero (identical series), which invalidates the test
pub fn wilcoxon_signed_rank(
    system_a: &[f64],
    system_b: &[f64],
) -> Result<WilcoxonResult, StatTestError> {
    if system_a.len() != system_b.len() {
        return Err(StatTestError::LengthMismatch);
    }
    if system_a.is_empty() {
        return Err(StatTestError::EmptySample);
    }

    let diffs: Vec<f64> = system_a
        .iter()
        .zip(system_b)
        .map(|(a, b)| a - b)
        .filter(|d| *d != 0.0)
        .collect();

    let n = diffs.len();
    if n == 0 {
        return Err(StatTestError::ZeroDifferences);
    }

    let magnitudes: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let (ranks, ties) = average_ranks(&magnitudes);

    let w_plus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let n_f = n as f64;
    let w_minus = n_f * (n_f + 1.0) / 2.0 - w_plus;
    let statistic = w_plus.min(w_minus);

    let (p_value, method) = if n <= EXACT_SIGNED_RANK_MAX_N && ties.is_empty() {
        let p = 2.0 * signed_rank_cdf(n, statistic.round() as usize);
        (p, SignedRankMethod::Exact)
    } else {
        let expected = n_f * (n_f + 1.0) / 4.0;
        let variance = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_term(&ties) / 48.0;
        if variance <= 0.0 {
            return Err(StatTestError::AllTied);
        }
        let z = (statistic - expected) / variance.sqrt();
        (2.0 * normal_cdf(z), SignedRankMethod::Normal)
    };

    Ok(WilcoxonResult {
        statistic,
        p_value: p_value.clamp(0.0, 1.0),
        n_effective: n,
        method,
    })
}

/// P(W ≤ t) under the null for n untied ranks.
///
/// Counts subsets of {1..n} by rank sum; every subset is equally likely.
fn signed_rank_cdf(n: usize, t: usize) -> f64 {
    let max_sum = n * (n + 1) / 2;
    let mut counts = vec![0.0f64; max_sum + 1];
    counts[0] = 1.0;
    for rank in 1..=n {
        for s in (rank..=max_sum).rev() {
            counts[s] += counts[s - rank];
        }
    }
    let total = 2f64.powi(n as i32);
    counts.iter().take(t.min(max_sum) + 1).sum::<f64>() / total
}

// ============================================================================
// Internal: Distribution functions
// ============================================================================

/// Survival function of the chi-square distribution: P(X > x).
fn chi_square_sf(x: f64, df: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    upper_incomplete_gamma(df / 2.0, x / 2.0)
}

/// Regularized upper incomplete gamma function Q(a, x).
///
/// Series expansion below `a + 1`, continued fraction above.
fn upper_incomplete_gamma(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    if x < a + 1.0 {
        1.0 - gamma_series(a, x)
    } else {
        gamma_cf(a, x)
    }
}

const GAMMA_MAX_ITER: usize = 500;
const GAMMA_EPS: f64 = 1e-14;
const GAMMA_FPMIN: f64 = 1e-300;

/// Lower regularized gamma P(a, x) by series.
fn gamma_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut del = 1.0 / a;
    let mut sum = del;
    for _ in 0..GAMMA_MAX_ITER {
        ap += 1.0;
        del *= x / ap;
        sum += del;
        if del.abs() < sum.abs() * GAMMA_EPS {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

/// Upper regularized gamma Q(a, x) by Lentz's continued fraction.
fn gamma_cf(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / GAMMA_FPMIN;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=GAMMA_MAX_ITER {
        let i = i as f64;
        let an = -i * (i - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < GAMMA_FPMIN {
            d = GAMMA_FPMIN;
        }
        c = b + an / c;
        if c.abs() < GAMMA_FPMIN {
            c = GAMMA_FPMIN;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < GAMMA_EPS {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Normal CDF using error function approximation.
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / 2.0_f64.sqrt()))
}

/// Error function approximation (Abramowitz and Stegun 7.1.26).
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Log gamma function (Lanczos approximation).
fn ln_gamma(x: f64) -> f64 {
    let coeffs = [
        76.18009172947146,
        -86.50532032941677,
        24.01409824083091,
        -1.231739572450155,
        0.1208650973866179e-2,
        -0.5395239384953e-5,
    ];

    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();

    let mut ser = 1.000000000190015;
    for (i, &coeff) in coeffs.iter().enumerate() {
        ser += coeff / (x + 1.0 + i as f64);
    }

    -tmp + (2.5066282746310005 * ser / x).ln()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_linear_interpolation() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        // pos = 0.25 * 3 = 0.75 -> 1 + 0.75
        assert!((percentile_sorted(&sorted, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile_sorted(&sorted, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile_sorted(&sorted, 75.0) - 3.25).abs() < 1e-12);
        assert!((percentile_sorted(&sorted, 100.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_median_odd_and_single() {
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
        assert!((median(&[0.7]) - 0.7).abs() < 1e-12);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_population_std() {
        // Population std of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std(&values) - 2.0).abs() < 1e-12);
        assert!((mean(&values) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_ranks_with_ties() {
        let (ranks, ties) = average_ranks(&[10.0, 20.0, 10.0, 30.0]);
        assert_eq!(ranks, vec![1.5, 3.0, 1.5, 4.0]);
        assert_eq!(ties, vec![2]);
    }

    #[test]
    fn test_chi_square_sf_two_df_is_exponential() {
        // For df = 2, P(X > x) = exp(-x / 2)
        for x in [0.5, 2.0, 8.0, 15.0] {
            assert!((chi_square_sf(x, 2.0) - (-x / 2.0f64).exp()).abs() < 1e-8);
        }
        assert_eq!(chi_square_sf(0.0, 3.0), 1.0);
    }

    #[test]
    fn test_chi_square_sf_one_df() {
        // 3.841 is the 95th percentile of chi-square(1)
        assert!((chi_square_sf(3.841458820694124, 1.0) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_friedman_consistent_ordering() {
        // Every block ranks A < B < C -> R = (4, 8, 12), Q = 8, p = e^-4
        let a = [0.1, 0.2, 0.3, 0.4];
        let b = [0.5, 0.6, 0.7, 0.8];
        let c = [0.9, 1.0, 1.1, 1.2];

        let result = friedman_test(&[&a, &b, &c]).unwrap();
        assert_eq!(result.df, 2);
        assert!((result.statistic - 8.0).abs() < 1e-9);
        assert!((result.p_value - (-4.0f64).exp()).abs() < 1e-6);
        assert!(result.is_significant(0.05));
    }

    #[test]
    fn test_friedman_no_difference() {
        // Alternating winners: rank sums equal, Q = 0
        let a = [1.0, 0.0, 1.0, 0.0];
        let b = [0.0, 1.0, 0.0, 1.0];

        let result = friedman_test(&[&a, &b]).unwrap();
        assert!(result.statistic.abs() < 1e-9);
        assert!((result.p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_friedman_all_tied_is_error() {
        let a = [0.5; 12];
        let b = [0.5; 12];
        assert!(matches!(
            friedman_test(&[&a, &b]),
            Err(StatTestError::AllTied)
        ));
    }

    #[test]
    fn test_friedman_rejects_bad_shapes() {
        let a = [0.5, 0.6];
        let b = [0.5];
        assert!(matches!(
            friedman_test(&[&a]),
            Err(StatTestError::TooFewGroups(1))
        ));
        assert!(matches!(
            friedman_test(&[&a, &b]),
            Err(StatTestError::LengthMismatch)
        ));
    }

    #[test]
    fn test_wilcoxon_exact_all_positive() {
        // Ten distinct positive differences: W- = 0, p = 2 / 2^10
        let a: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let b = vec![0.0; 10];

        let result = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(result.method, SignedRankMethod::Exact);
        assert_eq!(result.statistic, 0.0);
        assert!((result.p_value - 2.0 / 1024.0).abs() < 1e-12);
        assert!(result.is_significant(0.05));
    }

    #[test]
    fn test_wilcoxon_exact_symmetric_is_not_significant() {
        // Differences +1, -2, +3, -4, +5, -6: W+ = 9, W- = 12
        let a = vec![1.0, 0.0, 3.0, 0.0, 5.0, 0.0];
        let b = vec![0.0, 2.0, 0.0, 4.0, 0.0, 6.0];

        let result = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(result.statistic, 9.0);
        assert!(result.p_value > 0.5);
    }

    #[test]
    fn test_wilcoxon_ties_use_normal_approximation() {
        // Reciprocal-rank style data with tied magnitudes
        let a = vec![1.0, 1.0, 0.5, 1.0, 0.5, 1.0, 1.0, 0.5, 1.0, 1.0, 0.0, 1.0];
        let b = vec![0.5, 0.0, 0.0, 0.5, 0.5, 0.0, 0.5, 0.0, 0.0, 0.5, 0.0, 0.5];

        let result = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(result.method, SignedRankMethod::Normal);
        assert_eq!(result.n_effective, 10);
        assert!(result.p_value > 0.0 && result.p_value < 0.05);
    }

    #[test]
    fn test_wilcoxon_large_sample_uses_normal_approximation() {
        // 60 distinct positive differences: past the exact threshold
        let a: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let b = vec![0.0; 60];

        let result = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(result.method, SignedRankMethod::Normal);
        assert_eq!(result.n_effective, 60);
        assert!(result.p_value.is_finite());
        assert!(result.p_value < 0.001);
    }

    #[test]
    fn test_format_marks_significance_at_given_alpha() {
        let result = WilcoxonResult {
            statistic: 3.0,
            p_value: 0.03,
            n_effective: 12,
            method: SignedRankMethod::Normal,
        };
        assert!(result.format(0.05).ends_with('*'));
        assert!(!result.format(0.01).ends_with('*'));

        let friedman = FriedmanResult {
            statistic: 4.7,
            p_value: 0.03,
            df: 1,
            n_blocks: 12,
            k_groups: 2,
        };
        assert!(friedman.format(0.05).ends_with('*'));
        assert_eq!(friedman.format(0.01), "χ²(1)=4.700, p=0.0300");
    }

    #[test]
    fn test_wilcoxon_identical_series_is_error() {
        let a = vec![0.3, 0.5, 1.0];
        assert!(matches!(
            wilcoxon_signed_rank(&a, &a),
            Err(StatTestError::ZeroDifferences)
        ));
    }

    #[test]
    fn test_signed_rank_cdf_bounds() {
        assert!((signed_rank_cdf(3, 0) - 0.125).abs() < 1e-12);
        assert!((signed_rank_cdf(3, 6) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 0.001);
        assert!((normal_cdf(1.96) - 0.975).abs() < 0.01);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 0.01);
    }
}
