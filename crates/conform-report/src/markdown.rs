use conform_core::rule::Report;

/// Format a check result as Markdown. Returns (markdown, passed).
///
/// A failing report uses the stable layout of `Report`'s `Display`.
pub fn format_check(report: Option<&Report>) -> (String, bool) {
    match report {
        None => ("## No architecture violations found\n".to_string(), true),
        Some(report) => (report.to_string(), false),
    }
}
