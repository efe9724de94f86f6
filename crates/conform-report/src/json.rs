use serde::Serialize;

use conform_core::rule::Report;

/// Wrapper for check output that adds pass/fail metadata.
#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    pub report: Option<&'a Report>,
    pub check: CheckStatus,
}

#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub passed: bool,
    pub violation_count: usize,
    pub error_count: usize,
}

/// Format a check result as JSON. Returns (json_string, passed).
pub fn format_check(report: Option<&Report>, compact: bool) -> serde_json::Result<(String, bool)> {
    let passed = report.is_none();
    let output = CheckOutput {
        report,
        check: CheckStatus {
            passed,
            violation_count: report.map_or(0, Report::violation_count),
            error_count: report.map_or(0, |r| r.errors.len()),
        },
    };

    let json = if compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    Ok((json, passed))
}
