//! Export path and project resolution.

use revrank_core::config::DEFAULT_RESULTS_DIR;
use std::path::{Path, PathBuf};

/// Environment variable for a custom results directory
pub const RESULTS_DIR_ENV: &str = "REVRANK_RESULTS_DIR";

/// Resolves the results directory.
///
/// Search order:
/// 1. `--results-dir` flag
/// 2. `$REVRANK_RESULTS_DIR` environment variable
/// 3. `evaluation_results` in the working directory
pub fn resolve_results_dir(flag: Option<&Path>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    match std::env::var(RESULTS_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_RESULTS_DIR),
    }
}

/// Resolves the project identifier used to name artifacts.
///
/// The `--project` flag wins over the run file; without either, the run
/// file's stem is used.
pub fn resolve_project(flag: Option<&str>, from_input: Option<&str>, input_path: &Path) -> String {
    flag.or(from_input)
        .map(str::to_string)
        .or_else(|| {
            input_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "project".to_string())
}
