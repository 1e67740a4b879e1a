//! Closed vocabularies used by the ToolResults API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse classification of an execution, step or environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeSummary {
    Unset,
    Success,
    Failure,
    Inconclusive,
    Skipped,
    Flaky,
}

impl OutcomeSummary {
    pub const ALL: [OutcomeSummary; 6] = [
        OutcomeSummary::Unset,
        OutcomeSummary::Success,
        OutcomeSummary::Failure,
        OutcomeSummary::Inconclusive,
        OutcomeSummary::Skipped,
        OutcomeSummary::Flaky,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeSummary::Unset => "unset",
            OutcomeSummary::Success => "success",
            OutcomeSummary::Failure => "failure",
            OutcomeSummary::Inconclusive => "inconclusive",
            OutcomeSummary::Skipped => "skipped",
            OutcomeSummary::Flaky => "flaky",
        }
    }

    /// Environment outcomes that let an execution's steps through to extraction.
    pub fn is_unhealthy(self) -> bool {
        match self {
            OutcomeSummary::Flaky | OutcomeSummary::Failure => true,
            OutcomeSummary::Unset
            | OutcomeSummary::Success
            | OutcomeSummary::Inconclusive
            | OutcomeSummary::Skipped => false,
        }
    }
}

impl fmt::Display for OutcomeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeSummary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutcomeSummary::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let valid: Vec<&str> = OutcomeSummary::ALL.iter().map(|o| o.as_str()).collect();
                format!("unknown outcome '{}' (expected one of: {})", s, valid.join(", "))
            })
    }
}

/// Lifecycle of an execution. Only `Complete` is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionState {
    UnknownState,
    Pending,
    InProgress,
    Complete,
}

/// Status of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestCaseStatus {
    Passed,
    Failed,
    Error,
    Skipped,
    Flaky,
}

impl fmt::Display for TestCaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestCaseStatus::Passed => "passed",
            TestCaseStatus::Failed => "failed",
            TestCaseStatus::Error => "error",
            TestCaseStatus::Skipped => "skipped",
            TestCaseStatus::Flaky => "flaky",
        };
        f.write_str(s)
    }
}
