//! Console rendering of outcomes and the final summary

use colored::Colorize;
use std::fmt::Write;

use super::types::{OutcomeStatus, TestOutcome};
use super::Report;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Header printed before a suite starts
pub fn print_banner(title: &str) {
    println!("{}", RULE);
    println!("🎙️  {}", title.bold());
    println!("{}\n", RULE);
}

/// Print one outcome as it is recorded
pub fn print_outcome(outcome: &TestOutcome) {
    println!("{}", format_outcome(outcome));
}

fn format_outcome(outcome: &TestOutcome) -> String {
    let mut line = match outcome.status {
        OutcomeStatus::Passed => format!("  {} {}", "✓".green(), outcome.name),
        OutcomeStatus::Failed => format!("  {} {}", "✗".red(), outcome.name.red()),
        OutcomeStatus::Skipped => format!("  {} {}", "⚠".yellow(), outcome.name.yellow()),
    };
    if !outcome.passed() {
        if let Some(ref detail) = outcome.detail {
            let _ = write!(line, "\n     {}", detail.dimmed());
        }
    }
    line
}

/// Render the summary block: counts, rate and a recap of failures
pub fn render_summary(report: &Report) -> String {
    let summary = report.summarize();
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", RULE);
    let _ = writeln!(out, "{} {}", "TEST SUMMARY".bold(), report.suite().dimmed());
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "{} Tests Passed: {}", "✓".green(), summary.passed);
    let _ = writeln!(out, "{} Tests Failed: {}", "✗".red(), summary.failed);
    if summary.skipped > 0 {
        let _ = writeln!(out, "{} Skipped: {}", "⚠".yellow(), summary.skipped);
    }
    let _ = writeln!(out, "  Total Tests: {}", summary.total);
    if let Some(rate) = summary.success_rate() {
        let _ = writeln!(out, "  Success Rate: {}%", rate);
    }
    let _ = writeln!(out, "{}", RULE);

    let failed: Vec<_> = report.outcomes().iter().filter(|o| o.failed()).collect();
    if !failed.is_empty() {
        let _ = writeln!(out, "\nFailed Tests:");
        for outcome in failed {
            let _ = writeln!(out, "{}", format_outcome(outcome));
        }
    }

    out
}
