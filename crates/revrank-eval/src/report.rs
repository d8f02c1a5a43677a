//! Console narration of an evaluation report.

use revrank_core::evaluation::comparison::ComparisonReport;
use revrank_core::evaluation::significance::{
    FriedmanOutcome, PairOutcome, SignificanceOutcome, SignificanceReport,
};
use revrank_core::evaluation::{EvaluationBundle, EvaluationReport};

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "-".to_string(),
    }
}

pub fn print_report(project: &str, report: &EvaluationReport) {
    println!("\n{}", "=".repeat(80));
    println!("REVIEWER RECOMMENDATION EVALUATION: {}", project);
    println!("{}", "=".repeat(80));

    let gt = &report.ground_truth;
    println!(
        "Ground truth: {} of {} requests have reviewers ({} distinct reviewers)",
        gt.requests_with_reviewers, gt.total_requests, gt.distinct_reviewers
    );

    for (name, bundle) in &report.bundles {
        print_bundle(name, bundle, report.config.dcg_cutoff);
    }

    if !report.failures.is_empty() {
        println!("\n{}", "-".repeat(70));
        println!("FAILED ALGORITHMS");
        for (name, reason) in &report.failures {
            println!("  {}: {}", name, reason);
        }
    }

    if let Some(comparison) = &report.comparison {
        print_comparison(comparison);
    }

    print_significance(&report.significance);

    println!("{}\n", "=".repeat(80));
}

fn print_bundle(name: &str, bundle: &EvaluationBundle, dcg_cutoff: usize) {
    println!("\n{}", "-".repeat(70));
    println!("{}", name);

    let basic = &bundle.basic;
    println!("  Requests analyzed:        {}", basic.total_requests_analyzed);
    println!("  Candidates recommended:   {}", basic.candidates_recommended);
    println!("  Valid requests:           {}", basic.valid_requests);
    println!("  Coverage:                 {:.4}", basic.coverage);

    if let Some(scores) = &bundle.score_distribution {
        println!(
            "  Scores: mean={:.4} median={:.4} std={:.4} range=[{:.4}, {:.4}]",
            scores.mean, scores.median, scores.std, scores.min, scores.max
        );
    }

    let Some(agg) = &bundle.aggregates else {
        println!("  No valid requests: metrics undefined");
        return;
    };

    println!(
        "  {:<6} {:>8} {:>8} {:>8} {:>8}",
        "k", "Prec", "Recall", "F1", "Hit"
    );
    for (k, precision) in &agg.precision_at_k {
        println!(
            "  {:<6} {:>8.4} {:>8} {:>8} {:>8}",
            k,
            precision,
            cell(agg.recall_at_k.get(k).copied()),
            cell(agg.f1_at_k.get(k).copied()),
            cell(agg.hit_rate_at_k.get(k).copied()),
        );
    }
    println!(
        "  MRR={:.4} MAP={:.4} DCG@{k}={:.4} NDCG@{k}={:.4}",
        agg.mrr,
        agg.map,
        agg.avg_dcg,
        agg.avg_ndcg,
        k = dcg_cutoff
    );

    if let Some(success) = &bundle.success {
        println!(
            "  Success rate: {:.4} ({} requests)",
            success.recommendation_success_rate, success.successful_recommendations
        );
    }

    for (metric, stats) in &bundle.stability {
        println!(
            "  Stability {:<18} median={:.4} iqr={:.4} std={:.4} cv={:.4}",
            metric, stats.median, stats.iqr, stats.std, stats.cv
        );
    }
}

fn print_comparison(comparison: &ComparisonReport) {
    println!("\n{}", "-".repeat(70));
    println!("COMPARISON");
    println!(
        "{:<16} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
        "Algorithm", "P@1", "R@1", "F1@1", "P@5", "R@5", "F1@5", "MRR", "MAP", "Cover"
    );
    for row in &comparison.table {
        println!(
            "{:<16} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7.4}",
            row.algorithm,
            cell(row.precision_at_1),
            cell(row.recall_at_1),
            cell(row.f1_at_1),
            cell(row.precision_at_5),
            cell(row.recall_at_5),
            cell(row.f1_at_5),
            cell(row.mrr),
            cell(row.map),
            row.coverage,
        );
    }

    if !comparison.stability.is_empty() {
        println!("\nReciprocal rank stability (lower IQR = more consistent):");
        println!(
            "{:<16} {:>8} {:>8} {:>8} {:>8}",
            "Algorithm", "Median", "IQR", "Std", "CV"
        );
        for row in &comparison.stability {
            println!(
                "{:<16} {:>8.4} {:>8.4} {:>8.4} {:>8.4}",
                row.algorithm, row.median, row.iqr, row.std, row.cv
            );
        }
    }

    for board in &comparison.leaderboards {
        println!("\nRanking by {}:", board.label);
        for entry in &board.entries {
            println!("  {}. {}: {:.4}", entry.rank, entry.algorithm, entry.value);
        }
    }

    println!();
    for best in &comparison.best_performers {
        println!("Best {}: {} ({:.4})", best.label, best.algorithm, best.value);
    }
    if let Some(stable) = &comparison.most_stable {
        println!(
            "Most stable: {} (reciprocal rank IQR {:.4})",
            stable.algorithm, stable.iqr
        );
    }
    if let Some(spread) = &comparison.spread {
        println!("MRR range: {:.4}", spread.range);
        println!("Relative difference: {:.1}%", spread.relative_pct);
    }
}

fn print_significance(outcome: &SignificanceOutcome) {
    println!("\n{}", "-".repeat(70));
    println!("STATISTICAL SIGNIFICANCE (* = p < alpha)");
    match outcome {
        SignificanceOutcome::Skipped { reason } => println!("Skipped: {}", reason),
        SignificanceOutcome::Completed(report) => print_tests(report),
    }
}

fn print_tests(report: &SignificanceReport) {
    println!(
        "{} over {} aligned requests, alpha={}",
        report.metric, report.aligned_samples, report.alpha
    );
    if !report.requests_aligned {
        println!("Warning: aligned positions refer to different requests");
    }

    match &report.friedman {
        FriedmanOutcome::Completed {
            result,
            significant,
        } => {
            println!("Friedman: {}", result.format(report.alpha));
            if *significant {
                println!("  Algorithms differ; see pairwise tests");
            } else {
                println!("  No difference detected between algorithms");
            }
        }
        FriedmanOutcome::Skipped { reason } => println!("Friedman: skipped ({})", reason),
    }

    for pair in &report.pairwise {
        match &pair.outcome {
            PairOutcome::Completed {
                result,
                significant,
            } => println!(
                "  {} vs {}: W={:.1}, p={:.4}{}",
                pair.algorithm_a,
                pair.algorithm_b,
                result.statistic,
                result.p_value,
                if *significant { "*" } else { "" }
            ),
            PairOutcome::Skipped { reason } => println!(
                "  {} vs {}: skipped ({})",
                pair.algorithm_a, pair.algorithm_b, reason
            ),
        }
    }
}
