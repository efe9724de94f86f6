use colored::Colorize;

use conform_core::rule::Report;

/// Format a validation report for terminal output.
pub fn format_report(report: &Report) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{}\n",
        "conform - Architecture Conformance".bold()
    ));
    out.push_str(&format!("{}\n", "=".repeat(40)));

    for section in &report.sections {
        out.push_str(&format!(
            "\n{} ({} found)\n{}\n",
            format!("{} Conventions", section.category).yellow().bold(),
            section.violations.len(),
            "-".repeat(40),
        ));
        for v in &section.violations {
            out.push_str(&format!("  - {v}\n"));
        }
    }

    if !report.errors.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n{}\n",
            "General Errors".red().bold(),
            report.errors.len(),
            "-".repeat(40),
        ));
        for e in &report.errors {
            out.push_str(&format!("  - {e}\n"));
        }
    }

    out.push('\n');
    out
}

/// Format a check result for CI use. Returns (text, passed).
pub fn format_check(report: Option<&Report>) -> (String, bool) {
    match report {
        None => {
            let out = format!(
                "{}\n{}\n",
                "No architecture violations found!".green().bold(),
                "CHECK PASSED".green().bold()
            );
            (out, true)
        }
        Some(report) => {
            let mut out = format_report(report);
            out.push_str(&format!(
                "{}: {} violation(s), {} error(s)\n",
                "CHECK FAILED".red().bold(),
                report.violation_count(),
                report.errors.len(),
            ));
            (out, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_report;

    #[test]
    fn test_format_report_lists_sections_in_order() {
        let text = format_report(&sample_report());
        let layer = text.find("Layer Conventions").unwrap();
        let naming = text.find("Naming Conventions").unwrap();
        assert!(layer < naming);
        assert!(text.contains("  - arch violation: <App> is not allowed to refer to <Internal>"));
        assert!(text.contains("General Errors"));
    }

    #[test]
    fn test_format_check() {
        let (text, passed) = format_check(None);
        assert!(passed);
        assert!(text.contains("CHECK PASSED"));

        let report = sample_report();
        let (text, passed) = format_check(Some(&report));
        assert!(!passed);
        assert!(text.contains("2 violation(s), 1 error(s)"));
    }
}
