//! Human-readable report rendering.

use colored::Colorize;
use psychds_core::{IssueOutput, ValidationResult, ValidatorOptions};
use std::fmt::Write;

const MAX_FILES_SHOWN: usize = 5;

pub fn render(result: &ValidationResult, options: &ValidatorOptions) -> String {
    let mut out = String::new();

    for issue in &result.issues.errors {
        render_issue(&mut out, issue, "ERROR".red().bold().to_string(), options);
    }
    if options.show_warnings {
        for issue in &result.issues.warnings {
            render_issue(&mut out, issue, "WARNING".yellow().bold().to_string(), options);
        }
    } else if !result.issues.warnings.is_empty() {
        let _ = writeln!(
            out,
            "{}",
            format!(
                "({} warnings hidden; rerun with --showWarnings to see them)",
                result.issues.warnings.len()
            )
            .dimmed()
        );
    }

    let summary = &result.summary;
    let _ = writeln!(out, "{}", "Summary:".bold());
    let _ = writeln!(
        out,
        "  {} files, {}",
        summary.total_files,
        human_size(summary.size)
    );
    if !summary.data_types.is_empty() {
        let _ = writeln!(out, "  data types: {}", summary.data_types.join(", "));
    }
    let _ = writeln!(out, "  schema version: {}", summary.schema_version);
    if options.verbose && !summary.suggested_columns.is_empty() {
        let _ = writeln!(
            out,
            "  suggested columns: {}",
            summary.suggested_columns.join(", ")
        );
    }

    let verdict = if result.valid {
        "This dataset appears to be Psych-DS compatible".green().to_string()
    } else {
        "This dataset does not appear to be Psych-DS compatible"
            .red()
            .to_string()
    };
    let _ = writeln!(out, "{}", verdict);
    out
}

fn render_issue(out: &mut String, issue: &IssueOutput, label: String, options: &ValidatorOptions) {
    let _ = writeln!(out, "[{}] {} {}", label, issue.key.bold(), issue.reason);
    let shown = if options.verbose {
        issue.files.len()
    } else {
        issue.files.len().min(MAX_FILES_SHOWN)
    };
    for file in issue.files.iter().take(shown) {
        match &file.evidence {
            Some(evidence) => {
                let _ = writeln!(out, "    .{}  ({})", file.file.path, evidence);
            }
            None => {
                let _ = writeln!(out, "    .{}", file.file.path);
            }
        }
    }
    if issue.files.len() > shown {
        let _ = writeln!(
            out,
            "    {}",
            format!("... and {} more files", issue.files.len() - shown).dimmed()
        );
    }
    if let Some(url) = &issue.help_url {
        let _ = writeln!(out, "    {}", url.dimmed());
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
