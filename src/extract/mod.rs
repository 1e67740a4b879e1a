//! Result extraction: walk histories → executions → steps → test cases and
//! collect the failing batches of executions that match a target outcome.

pub mod record;

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::gateway::{Page, PageRequest, ToolResults};
use crate::model::{
    Execution, History, OutcomeSummary, Step, TestCaseStatus, EXECUTION_PAGE_SIZE,
    STEP_PAGE_SIZE, TEST_CASE_PAGE_SIZE,
};

pub use record::{format_creation_date, within_past_day, LineKind, OutcomeLine, ResultRecord};

/// Which of the histories matching a name filter are walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistorySelection {
    /// The first history returned by the API.
    #[default]
    First,
    /// Every matching history, in API order.
    All,
}

/// How list calls are paged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pagination {
    /// Read the first page only; later pages are dropped.
    #[default]
    SinglePage,
    /// Follow `nextPageToken` until the collection is exhausted.
    Exhaust,
}

/// Page sizes sent with each list call. `None` leaves it to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    pub executions: Option<u32>,
    pub steps: Option<u32>,
    pub test_cases: Option<u32>,
    pub environments: Option<u32>,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            executions: Some(EXECUTION_PAGE_SIZE),
            steps: Some(STEP_PAGE_SIZE),
            test_cases: Some(TEST_CASE_PAGE_SIZE),
            environments: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractOptions {
    pub history_selection: HistorySelection,
    pub pagination: Pagination,
    pub page_sizes: PageSizes,
}

/// Read every page (or only the first) of a list call.
async fn collect<T, F, Fut>(pagination: Pagination, page_size: Option<u32>, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut request = PageRequest::sized(page_size);
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    loop {
        let page = fetch(request.clone()).await?;
        items.extend(page.items);
        match (pagination, page.next_page_token) {
            (Pagination::Exhaust, Some(token)) => {
                if !seen.insert(token.clone()) {
                    return Err(Error::unexpected(
                        "page",
                        format!("server repeated page token '{}'", token),
                    ));
                }
                request = request.with_token(token);
            }
            (Pagination::SinglePage, Some(_)) => {
                debug!(read = items.len(), "more pages available, reading the first only");
                break;
            }
            (_, None) => break,
        }
    }
    Ok(items)
}

fn execution_created(execution: &Execution) -> Result<DateTime<Utc>> {
    execution
        .creation_time
        .and_then(|ts| ts.to_datetime())
        .ok_or_else(|| {
            Error::unexpected(
                "execution",
                format!("execution {} has no valid creationTime", execution.execution_id),
            )
        })
}

fn execution_matrix(execution: &Execution) -> Result<String> {
    execution.test_execution_matrix_id.clone().ok_or_else(|| {
        Error::unexpected(
            "execution",
            format!("execution {} has no testExecutionMatrixId", execution.execution_id),
        )
    })
}

fn step_outcome(step: &Step) -> Result<OutcomeSummary> {
    step.outcome_summary().ok_or_else(|| {
        Error::unexpected("step", format!("step {} has no outcome", step.step_id))
    })
}

/// Walks one project's test results through a [`ToolResults`] gateway.
///
/// Nothing is cached: every call fetches fresh data and calls are issued one
/// at a time.
pub struct ResultExtractor<G> {
    gateway: G,
    options: ExtractOptions,
}

impl<G: ToolResults> ResultExtractor<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_options(gateway, ExtractOptions::default())
    }

    pub fn with_options(gateway: G, options: ExtractOptions) -> Self {
        Self { gateway, options }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Failing test case batches of complete executions whose outcome is
    /// `target`.
    pub async fn extract_results(
        &self,
        project_id: &str,
        filter_by_name: &str,
        target: OutcomeSummary,
    ) -> Result<Vec<ResultRecord>> {
        self.extract_results_at(project_id, filter_by_name, target, Utc::now())
            .await
    }

    /// [`extract_results`](Self::extract_results) evaluated against `now`.
    pub async fn extract_results_at(
        &self,
        project_id: &str,
        filter_by_name: &str,
        target: OutcomeSummary,
        now: DateTime<Utc>,
    ) -> Result<Vec<ResultRecord>> {
        info!(%project_id, %filter_by_name, %target, "extracting results");

        let mut records = Vec::new();
        for history in self
            .select_histories(project_id, filter_by_name, self.options.history_selection)
            .await?
        {
            let executions = self
                .matching_executions(project_id, &history, target)
                .await?;
            for execution in &executions {
                self.extract_execution(project_id, &history, execution, now, &mut records)
                    .await?;
            }
        }

        info!(records = records.len(), %target, "extraction complete");
        Ok(records)
    }

    /// Complete executions with outcome `target` created less than 24 hours
    /// before now.
    pub async fn filter_recent_executions(
        &self,
        project_id: &str,
        filter_by_name: &str,
        target: OutcomeSummary,
    ) -> Result<Vec<Execution>> {
        self.filter_recent_executions_at(project_id, filter_by_name, target, Utc::now())
            .await
    }

    pub async fn filter_recent_executions_at(
        &self,
        project_id: &str,
        filter_by_name: &str,
        target: OutcomeSummary,
        now: DateTime<Utc>,
    ) -> Result<Vec<Execution>> {
        let mut recent = Vec::new();
        for history in self
            .select_histories(project_id, filter_by_name, self.options.history_selection)
            .await?
        {
            for execution in self
                .matching_executions(project_id, &history, target)
                .await?
            {
                if within_past_day(execution_created(&execution)?, now) {
                    recent.push(execution);
                }
            }
        }
        info!(executions = recent.len(), %target, "recent executions");
        Ok(recent)
    }

    /// Test names from the tool outputs of failing steps. Tests in failed
    /// executions are reported as failed, tests in successful executions as
    /// flaky. Every history matching the filter is walked, whatever the
    /// configured history selection.
    pub async fn outcome_summaries(
        &self,
        project_id: &str,
        filter_by_name: &str,
    ) -> Result<Vec<OutcomeLine>> {
        let pagination = self.options.pagination;
        let sizes = self.options.page_sizes;
        let gateway = &self.gateway;

        let mut lines = Vec::new();
        for history in self
            .select_histories(project_id, filter_by_name, HistorySelection::All)
            .await?
        {
            let history_id = history.history_id.as_str();
            let executions = collect(pagination, sizes.executions, move |page| {
                gateway.list_executions(project_id, history_id, page)
            })
            .await?;

            for execution in executions.iter().filter(|e| e.is_complete()) {
                let kind = match execution.outcome_summary() {
                    Some(OutcomeSummary::Failure) => LineKind::Failed,
                    Some(OutcomeSummary::Success) => LineKind::Flaky,
                    Some(
                        OutcomeSummary::Unset
                        | OutcomeSummary::Inconclusive
                        | OutcomeSummary::Skipped
                        | OutcomeSummary::Flaky,
                    )
                    | None => continue,
                };

                let execution_id = execution.execution_id.as_str();
                let steps = collect(pagination, sizes.steps, move |page| {
                    gateway.list_steps(project_id, history_id, execution_id, page)
                })
                .await?;

                for step in &steps {
                    if step_outcome(step)? != OutcomeSummary::Failure
                        || step.dimension_value.is_empty()
                        || step.test_execution_step.is_none()
                    {
                        continue;
                    }
                    for reference in step.tool_output_test_cases() {
                        lines.push(OutcomeLine {
                            kind,
                            test_name: reference.name.clone(),
                            matrix: execution_matrix(execution)?,
                            step_outcome: OutcomeSummary::Failure,
                        });
                    }
                }
            }
        }
        Ok(lines)
    }

    async fn select_histories(
        &self,
        project_id: &str,
        filter_by_name: &str,
        selection: HistorySelection,
    ) -> Result<Vec<History>> {
        let gateway = &self.gateway;
        let mut histories = match selection {
            HistorySelection::First => {
                gateway
                    .list_histories(project_id, filter_by_name, PageRequest::default())
                    .await?
                    .items
            }
            HistorySelection::All => {
                collect(self.options.pagination, None, move |page| {
                    gateway.list_histories(project_id, filter_by_name, page)
                })
                .await?
            }
        };

        if histories.is_empty() {
            info!(%project_id, %filter_by_name, "no histories match filter");
            return Ok(histories);
        }
        if selection == HistorySelection::First {
            if histories.len() > 1 {
                debug!(
                    matched = histories.len(),
                    selected = %histories[0].history_id,
                    "several histories match, using the first"
                );
            }
            histories.truncate(1);
        }
        Ok(histories)
    }

    /// Complete executions of `history` whose outcome is `target`.
    async fn matching_executions(
        &self,
        project_id: &str,
        history: &History,
        target: OutcomeSummary,
    ) -> Result<Vec<Execution>> {
        let gateway = &self.gateway;
        let history_id = history.history_id.as_str();
        let executions = collect(
            self.options.pagination,
            self.options.page_sizes.executions,
            move |page| gateway.list_executions(project_id, history_id, page),
        )
        .await?;

        let mut matching = Vec::new();
        for execution in executions {
            if !execution.is_complete() {
                debug!(execution_id = %execution.execution_id, state = ?execution.state, "skipping incomplete execution");
                continue;
            }
            let summary = execution.outcome_summary().ok_or_else(|| {
                Error::unexpected(
                    "execution",
                    format!("complete execution {} has no outcome", execution.execution_id),
                )
            })?;
            if summary == target {
                matching.push(execution);
            }
        }

        debug!(%history_id, matching = matching.len(), %target, "filtered executions");
        Ok(matching)
    }

    async fn extract_execution(
        &self,
        project_id: &str,
        history: &History,
        execution: &Execution,
        now: DateTime<Utc>,
        records: &mut Vec<ResultRecord>,
    ) -> Result<()> {
        let gateway = &self.gateway;
        let pagination = self.options.pagination;
        let sizes = self.options.page_sizes;
        let history_id = history.history_id.as_str();
        let execution_id = execution.execution_id.as_str();

        let environments = collect(pagination, sizes.environments, move |page| {
            gateway.list_environments(project_id, history_id, execution_id, page)
        })
        .await?;

        let environment_summary = environments
            .iter()
            .map(|env| {
                env.outcome_summary().ok_or_else(|| {
                    Error::unexpected(
                        "environment",
                        format!(
                            "environment {} of execution {} has no outcome",
                            env.environment_id, execution_id
                        ),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if !environment_summary.iter().any(|s| s.is_unhealthy()) {
            debug!(%execution_id, ?environment_summary, "no flaky or failed environment, skipping steps");
            return Ok(());
        }

        let steps = collect(pagination, sizes.steps, move |page| {
            gateway.list_steps(project_id, history_id, execution_id, page)
        })
        .await?;

        for step in &steps {
            if step_outcome(step)? != OutcomeSummary::Failure {
                continue;
            }

            let step_id = step.step_id.as_str();
            let cases = collect(pagination, sizes.test_cases, move |page| {
                gateway.list_test_cases(project_id, history_id, execution_id, step_id, page)
            })
            .await?;

            if !cases.iter().any(|c| matches!(c.status, TestCaseStatus::Failed)) {
                debug!(%execution_id, %step_id, cases = cases.len(), "failing step without failed test cases");
                continue;
            }

            let duration = step.test_process_seconds().ok_or_else(|| {
                Error::unexpected(
                    "step",
                    format!("step {} has no testProcessDuration", step.step_id),
                )
            })?;
            let created = execution_created(execution)?;

            let (test_case, test_case_result): (Vec<_>, Vec<_>) = cases
                .into_iter()
                .map(|c| (c.test_case_reference, c.status))
                .unzip();

            records.push(ResultRecord {
                test_case,
                test_case_result,
                matrix: execution_matrix(execution)?,
                environment_summary: environment_summary.clone(),
                duration,
                creation_time: format_creation_date(created),
                within_past_day: within_past_day(created, now),
                execution_id: execution_id.to_string(),
                step_id: step_id.to_string(),
            });
        }
        Ok(())
    }
}
