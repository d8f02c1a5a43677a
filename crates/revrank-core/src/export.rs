//! Evaluation artifacts.
//!
//! A completed run is written as two timestamped files in the results
//! directory:
//!
//! - `{project}_metrics_{timestamp}.json` - the full report as a nested record
//! - `{project}_summary_{timestamp}.csv` - one row per algorithm, one column
//!   per metric (requires the `tabular-export` feature)
//!
//! Both artifacts are produced from plain JSON values built by
//! [`to_plain_value`], so no wrapper type or non-finite float reaches a file.

use crate::config::DEFAULT_RESULTS_DIR;
use crate::error::ExportError;
use crate::evaluation::{EvaluationBundle, EvaluationReport};
use chrono::Local;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where and under which name artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub results_dir: PathBuf,
    /// Project identifier used as the file-name prefix
    pub project: String,
}

impl ExportConfig {
    pub fn new(results_dir: impl Into<PathBuf>, project: impl Into<String>) -> Self {
        Self {
            results_dir: results_dir.into(),
            project: project.into(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RESULTS_DIR, "project")
    }
}

/// Paths of the artifacts written for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub structured: PathBuf,
    /// `None` when tabular export is unavailable
    pub tabular: Option<PathBuf>,
}

/// One flattened table row: column name to plain value.
pub type FlatRow = IndexMap<String, Value>;

#[derive(Serialize)]
struct StructuredRecord<'a> {
    project: &'a str,
    timestamp: &'a str,
    report: &'a EvaluationReport,
}

/// Writes evaluation reports to disk.
#[derive(Debug, Clone)]
pub struct ResultSink {
    config: ExportConfig,
    tabular_available: bool,
}

impl ResultSink {
    /// Creates a sink whose tabular capability is the `tabular-export` feature.
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            tabular_available: cfg!(feature = "tabular-export"),
        }
    }

    /// Creates a sink that only writes the structured record.
    pub fn without_tabular(config: ExportConfig) -> Self {
        Self {
            config,
            tabular_available: false,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn tabular_available(&self) -> bool {
        self.tabular_available
    }

    /// Writes the report stamped with the current local time.
    pub fn write(&self, report: &EvaluationReport) -> Result<ExportSummary, ExportError> {
        self.write_at(report, &timestamp())
    }

    /// Writes the report under an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Fails if the results directory cannot be created or a file cannot be
    /// written. A missing tabular capability is not an error: it is logged
    /// and reported as `tabular: None`.
    pub fn write_at(
        &self,
        report: &EvaluationReport,
        timestamp: &str,
    ) -> Result<ExportSummary, ExportError> {
        fs::create_dir_all(&self.config.results_dir)?;

        let structured = self.artifact_path("metrics", timestamp, "json");
        let record = to_plain_value(&StructuredRecord {
            project: &self.config.project,
            timestamp,
            report,
        })?;
        fs::write(&structured, serde_json::to_string_pretty(&record)?)?;
        info!("Wrote structured record to {}", structured.display());

        let tabular = if self.tabular_available {
            let path = self.artifact_path("summary", timestamp, "csv");
            let rows = flatten_rows(&report.bundles)?;
            write_csv(&path, &rows)?;
            info!("Wrote summary table to {}", path.display());
            Some(path)
        } else {
            warn!("Tabular export unavailable, only the structured record was written");
            None
        };

        Ok(ExportSummary {
            structured,
            tabular,
        })
    }

    fn artifact_path(&self, kind: &str, timestamp: &str, extension: &str) -> PathBuf {
        self.config.results_dir.join(format!(
            "{}_{}_{}.{}",
            self.config.project, kind, timestamp, extension
        ))
    }
}

/// Current local time as `YYYYMMDD_HHMMSS`.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

// ============================================================================
// Plain values
// ============================================================================

/// Converts any serializable value into a plain JSON tree.
///
/// This is the single conversion applied before anything is written.
/// Non-finite floats become `null`; maps with non-string keys (such as
/// cutoffs) get their keys stringified.
pub fn to_plain_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, ExportError> {
    Ok(serde_json::to_value(value)?)
}

/// Flattens bundles into one row per algorithm.
///
/// Column groups, in order: `algorithm`, `basic_*`, per-cutoff
/// `precision_at_k`/`recall_at_k`/`f1_at_k`/`hit_rate_at_k`, `ranking_*`,
/// `other_*` (success counters), `score_*` (score distribution) and
/// `stability_{metric}_{stat}`. Undefined groups are left out of the row.
pub fn flatten_rows(
    bundles: &BTreeMap<String, EvaluationBundle>,
) -> Result<Vec<FlatRow>, ExportError> {
    bundles
        .iter()
        .map(|(name, bundle)| flatten_bundle(name, bundle))
        .collect()
}

fn flatten_bundle(name: &str, bundle: &EvaluationBundle) -> Result<FlatRow, ExportError> {
    let mut row = FlatRow::new();
    row.insert("algorithm".to_string(), Value::from(name));
    flatten_into(&mut row, "basic", to_plain_value(&bundle.basic)?);

    if let Some(agg) = &bundle.aggregates {
        for (group, by_k) in [
            ("precision", &agg.precision_at_k),
            ("recall", &agg.recall_at_k),
            ("f1", &agg.f1_at_k),
            ("hit_rate", &agg.hit_rate_at_k),
        ] {
            for (k, value) in by_k {
                row.insert(format!("{}_at_{}", group, k), to_plain_value(value)?);
            }
        }
        for (key, value) in [
            ("mrr", agg.mrr),
            ("map", agg.map),
            ("avg_dcg", agg.avg_dcg),
            ("avg_ndcg", agg.avg_ndcg),
        ] {
            row.insert(format!("ranking_{}", key), to_plain_value(&value)?);
        }
    }

    if let Some(success) = &bundle.success {
        flatten_into(&mut row, "other", to_plain_value(success)?);
    }
    if let Some(dist) = &bundle.score_distribution {
        flatten_into(&mut row, "score", to_plain_value(dist)?);
    }
    flatten_into(&mut row, "stability", to_plain_value(&bundle.stability)?);

    Ok(row)
}

/// Inserts `value` under `prefix`, expanding nested objects as `prefix_key`.
fn flatten_into(row: &mut FlatRow, prefix: &str, value: Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(row, &format!("{}_{}", prefix, key), nested);
            }
        }
        other => {
            row.insert(prefix.to_string(), other);
        }
    }
}

// ============================================================================
// CSV
// ============================================================================

/// Renders rows as CSV. Columns are the union of all row keys in first-seen
/// order; missing and null cells are empty.
pub fn render_csv(rows: &[FlatRow]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|c| csv_field(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| match row.get(*column) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => csv_field(s),
                Some(other) => csv_field(&other.to_string()),
            })
            .collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn write_csv(path: &Path, rows: &[FlatRow]) -> Result<(), ExportError> {
    fs::write(path, render_csv(rows))?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
