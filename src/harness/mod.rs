//! Direct handler test harness.
//!
//! # Data Flow
//! ```text
//! route table (config) + CLI paths/filter
//!     → select_cases
//!     → run_case: literal GET event → invoke → status + body excerpt
//!     → report.rs: per-case block, then the summary
//! ```
//!
//! The harness bypasses HTTP entirely; it loads the artifact once and calls
//! the handler the same way the dev server does.

pub mod report;

use std::sync::OnceLock;

use regex::Regex;

use crate::config::{FunctionConfig, RouteCase};
use crate::event::{to_invocation_context, InvocationEvent};
use crate::handler::{invoke, HandlerRef, InvocationError};

pub use report::{render_case, render_header, render_no_match, render_summary, Summary};

/// Pick the cases to run.
///
/// Explicit `paths` replace the table with ad-hoc cases expecting 200; then
/// `filter` keeps cases whose description contains it, ignoring case.
pub fn select_cases(table: &[RouteCase], filter: Option<&str>, paths: &[String]) -> Vec<RouteCase> {
    let candidates: Vec<RouteCase> = if paths.is_empty() {
        table.to_vec()
    } else {
        paths
            .iter()
            .map(|path| RouteCase::new(path, &format!("Route {}", path), 200))
            .collect()
    };

    match filter {
        Some(filter) => {
            let needle = filter.to_lowercase();
            candidates
                .into_iter()
                .filter(|case| case.description.to_lowercase().contains(&needle))
                .collect()
        }
        None => candidates,
    }
}

/// Number of cases the filter chooses from: the ad-hoc paths when given,
/// otherwise the table.
pub fn candidate_count(table: &[RouteCase], paths: &[String]) -> usize {
    if paths.is_empty() {
        table.len()
    } else {
        paths.len()
    }
}

/// Inner HTML of the `<body>` element, or the whole body if there is none.
pub fn body_excerpt(body: &str) -> &str {
    static BODY: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = BODY.get_or_init(|| Regex::new(r"<body[^>]*>([\s\S]*?)</body>").ok());

    pattern
        .as_ref()
        .and_then(|re| re.captures(body))
        .and_then(|caps| caps.get(1))
        .map(|inner| inner.as_str().trim())
        .unwrap_or(body)
}

/// What happened when one case ran.
#[derive(Debug)]
pub enum CaseOutcome {
    /// The handler completed; `status` is what it returned (200 if absent).
    Completed { status: u16, body: String },
    /// The handler threw, failed or never completed.
    Errored(InvocationError),
}

#[derive(Debug)]
pub struct CaseReport {
    pub case: RouteCase,
    pub outcome: CaseOutcome,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        match &self.outcome {
            CaseOutcome::Completed { status, .. } => *status == self.case.expected_status,
            CaseOutcome::Errored(_) => false,
        }
    }
}

/// Invoke `handler` with the literal event for `case`.
pub async fn run_case(handler: HandlerRef, case: &RouteCase, function: &FunctionConfig) -> CaseReport {
    let event = InvocationEvent::literal(&case.path);
    let context = to_invocation_context(function);
    tracing::debug!(path = %case.path, aws_request_id = %context.aws_request_id, "Invoking handler");

    let outcome = match invoke(handler, event, context).await {
        Ok(result) => CaseOutcome::Completed {
            status: result.status_or_default(),
            body: result.body.unwrap_or_default(),
        },
        Err(e) => CaseOutcome::Errored(e),
    };

    CaseReport {
        case: case.clone(),
        outcome,
    }
}
