//! Output records and the time helpers they rely on.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

use crate::model::{OutcomeSummary, TestCaseReference, TestCaseStatus};

/// One failing test case batch, denormalized with its execution context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub test_case: Vec<TestCaseReference>,
    pub test_case_result: Vec<TestCaseStatus>,
    pub matrix: String,
    pub environment_summary: Vec<OutcomeSummary>,
    /// Test-process duration of the step, in seconds.
    pub duration: i64,
    /// Execution creation date, `YYYY-MM-DD` (UTC).
    pub creation_time: String,
    /// True when the execution was created less than 24 hours before the
    /// run, i.e. it is recent. This is not the "older than a day" flag.
    pub within_past_day: bool,
    pub execution_id: String,
    pub step_id: String,
}

impl ResultRecord {
    pub fn failed_count(&self) -> usize {
        self.test_case_result
            .iter()
            .filter(|s| **s == TestCaseStatus::Failed)
            .count()
    }
}

/// Whether a test in a failing step was reported by a failed or a
/// successful (and therefore flaky) execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineKind {
    Failed,
    Flaky,
}

/// One line of the outcome summary report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeLine {
    pub kind: LineKind,
    pub test_name: String,
    pub matrix: String,
    pub step_outcome: OutcomeSummary,
}

impl fmt::Display for OutcomeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            LineKind::Failed => "Test",
            LineKind::Flaky => "Flaky Test",
        };
        write!(
            f,
            "{}: {} Matrix: {} Outcome: {}",
            label, self.test_name, self.matrix, self.step_outcome
        )
    }
}

/// Length of the "recent" window.
pub fn one_day() -> Duration {
    Duration::hours(24)
}

/// `YYYY-MM-DD` in UTC.
pub fn format_creation_date(created: DateTime<Utc>) -> String {
    created.format("%Y-%m-%d").to_string()
}

/// True when `created` is less than 24 hours before `now`. Exactly 24h old
/// is outside the window.
pub fn within_past_day(created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(created) < one_day()
}
