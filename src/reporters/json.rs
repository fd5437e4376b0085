//! JSON reporter
//!
//! Outputs the models as pretty-printed JSON, suitable for piping to jq.

use super::Report;
use anyhow::Result;

/// Render report as JSON
pub fn render(report: Report<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&report)?)
}
