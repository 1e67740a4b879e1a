//! Typed ToolResults resources.
//!
//! Only the fields the extractor reads are modelled; everything else in the
//! response is ignored by serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::outcome::{ExecutionState, OutcomeSummary, TestCaseStatus};

/// Google encodes int64 as a JSON string; accept numbers too.
fn int64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(i64),
        Str(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Num(n) => Ok(n),
        Repr::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(default, deserialize_with = "int64")]
    pub seconds: i64,
    #[serde(default)]
    pub nanos: i32,
}

impl Timestamp {
    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos.max(0) as u32)
    }
}

/// A protobuf-style `{seconds, nanos}` duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDuration {
    #[serde(default, deserialize_with = "int64")]
    pub seconds: i64,
    #[serde(default)]
    pub nanos: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default = "unset")]
    pub summary: OutcomeSummary,
}

fn unset() -> OutcomeSummary {
    OutcomeSummary::Unset
}

/// Zero value of the test status enum; omitted from the wire when set.
fn passed() -> TestCaseStatus {
    TestCaseStatus::Passed
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub history_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub execution_id: String,
    #[serde(default)]
    pub state: Option<ExecutionState>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub creation_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<Timestamp>,
    #[serde(default)]
    pub test_execution_matrix_id: Option<String>,
}

impl Execution {
    pub fn is_complete(&self) -> bool {
        self.state == Some(ExecutionState::Complete)
    }

    pub fn outcome_summary(&self) -> Option<OutcomeSummary> {
        self.outcome.map(|o| o.summary)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_suite_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionValue {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutputReference {
    #[serde(default)]
    pub test_case: Option<TestCaseReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecution {
    #[serde(default)]
    pub tool_outputs: Vec<ToolOutputReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestTiming {
    #[serde(default)]
    pub test_process_duration: Option<ApiDuration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestExecutionStep {
    #[serde(default)]
    pub test_timing: Option<TestTiming>,
    #[serde(default)]
    pub tool_execution: Option<ToolExecution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub step_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub test_execution_step: Option<TestExecutionStep>,
    #[serde(default)]
    pub dimension_value: Vec<DimensionValue>,
}

impl Step {
    pub fn outcome_summary(&self) -> Option<OutcomeSummary> {
        self.outcome.map(|o| o.summary)
    }

    /// `testExecutionStep.testTiming.testProcessDuration.seconds`
    pub fn test_process_seconds(&self) -> Option<i64> {
        self.test_execution_step
            .as_ref()?
            .test_timing
            .as_ref()?
            .test_process_duration
            .map(|d| d.seconds)
    }

    /// Test case references attached to the step's tool outputs.
    pub fn tool_output_test_cases(&self) -> impl Iterator<Item = &TestCaseReference> {
        self.test_execution_step
            .iter()
            .filter_map(|tes| tes.tool_execution.as_ref())
            .flat_map(|te| te.tool_outputs.iter())
            .filter_map(|out| out.test_case.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub test_case_id: Option<String>,
    pub test_case_reference: TestCaseReference,
    #[serde(default = "passed")]
    pub status: TestCaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<ApiDuration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedResult {
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub state: Option<ExecutionState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub environment_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub environment_result: Option<MergedResult>,
    #[serde(default)]
    pub dimension_value: Vec<DimensionValue>,
}

impl Environment {
    pub fn outcome_summary(&self) -> Option<OutcomeSummary> {
        self.environment_result
            .as_ref()?
            .outcome
            .map(|o| o.summary)
    }
}
