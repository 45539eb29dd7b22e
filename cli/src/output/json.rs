//! JSON output helpers.
//!
//! `--json` prints one pretty-printed document on stdout: the run report on
//! completion, or an error object when the run cannot start.

use anyhow::{Context, Result};

use crate::domain::RunReport;

/// Renders domain types as machine-readable JSON.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Print the run report as JSON on stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_report(&self, report: &RunReport) -> Result<()> {
        println!("{}", format_report(report)?);
        Ok(())
    }
}

/// Serialize a report with its derived status and exit code.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_report(report: &RunReport) -> Result<String> {
    let obj = serde_json::json!({
        "status": report.status().to_string(),
        "exit_code": report.exit_code(),
        "failures": report.failures().count(),
        "report": report,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen in
/// practice: `serde_json` only fails on non-finite floats and maps with
/// non-string keys, neither of which appear here).
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
