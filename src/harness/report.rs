//! Console rendering for harness runs.

use std::io::{self, Write};

use crate::config::RouteCase;
use crate::harness::{body_excerpt, CaseOutcome, CaseReport};

/// Pass count over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub total: usize,
}

impl Summary {
    pub fn record(&mut self, report: &CaseReport) {
        self.total += 1;
        if report.passed() {
            self.passed += 1;
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    /// Percentage of passed cases; 0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.passed as f64 / self.total as f64 * 100.0
    }
}

pub fn render_no_match(out: &mut impl Write, filter: &str, table: &[RouteCase]) -> io::Result<()> {
    writeln!(out, "No tests found matching filter: \"{}\"", filter)?;
    writeln!(out, "Available test descriptions:")?;
    for case in table {
        writeln!(out, "  - {}", case.description)?;
    }
    Ok(())
}

/// Run banner; with a filter, shows how many of `available` cases it kept.
pub fn render_header(
    out: &mut impl Write,
    filter: Option<&str>,
    selected: usize,
    available: usize,
) -> io::Result<()> {
    writeln!(out, "Testing Lambda function...")?;
    if let Some(filter) = filter {
        writeln!(out, "Filter: \"{}\" ({}/{} tests)", filter, selected, available)?;
    }
    writeln!(out, "\n")
}

pub fn render_case(out: &mut impl Write, report: &CaseReport) -> io::Result<()> {
    let case = &report.case;
    writeln!(out, "Testing: {} ({})", case.description, case.path)?;
    writeln!(out, "Expected status: {}", case.expected_status)?;
    writeln!(out, "{}", "=".repeat(50))?;

    match &report.outcome {
        CaseOutcome::Completed { status, body } => {
            writeln!(out, "Actual status: {}", status)?;
            if report.passed() {
                writeln!(out, "✅ Status code matches expected")?;
            } else {
                writeln!(
                    out,
                    "❌ Status code mismatch! Expected: {}, Got: {}",
                    case.expected_status, status
                )?;
            }
            writeln!(out, "Body: {}", body_excerpt(body))?;
        }
        CaseOutcome::Errored(e) => {
            writeln!(out, "❌ Error: {}", e)?;
            let trace = e.trace_text();
            if trace != e.to_string() {
                writeln!(out, "{}", trace)?;
            }
        }
    }
    writeln!(out)?;
    writeln!(out)
}

pub fn render_summary(out: &mut impl Write, summary: &Summary) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "TEST SUMMARY")?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "Passed: {}/{}", summary.passed, summary.total)?;
    writeln!(out, "Success rate: {:.1}%", summary.success_rate())?;
    if summary.all_passed() {
        writeln!(out, "🎉 All tests passed!")
    } else {
        writeln!(out, "⚠️  Some tests failed. Please check the results above.")
    }
}
