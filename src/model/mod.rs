//! ToolResults data model: resources, vocabularies and paging defaults.

pub mod outcome;
pub mod resources;

pub use outcome::{ExecutionState, OutcomeSummary, TestCaseStatus};
pub use resources::{
    ApiDuration, DimensionValue, Environment, Execution, History, MergedResult, Outcome, Step,
    TestCase, TestCaseReference, TestExecutionStep, TestTiming, Timestamp, ToolExecution,
    ToolOutputReference,
};

/// Page size used when listing a history's executions.
pub const EXECUTION_PAGE_SIZE: u32 = 120;
/// Page size used when listing an execution's steps.
pub const STEP_PAGE_SIZE: u32 = 200;
/// Page size used when listing a step's test cases.
pub const TEST_CASE_PAGE_SIZE: u32 = 200;
