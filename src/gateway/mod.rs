//! Access to the ToolResults resource collections.
//!
//! [`ToolResults`] is the seam between the extractor and the network;
//! [`http::HttpGateway`] is the production implementation.

pub mod auth;
pub mod http;

use crate::error::Result;
use crate::model::{Environment, Execution, History, Step, TestCase};

/// Paging parameters for a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

impl PageRequest {
    pub fn sized(page_size: Option<u32>) -> Self {
        Self {
            page_size,
            page_token: None,
        }
    }

    pub fn with_token(&self, token: String) -> Self {
        Self {
            page_size: self.page_size,
            page_token: Some(token),
        }
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// List/get operations over histories, executions, steps, test cases and
/// environments.
#[async_trait::async_trait]
pub trait ToolResults: Send + Sync {
    async fn list_histories(
        &self,
        project_id: &str,
        filter_by_name: &str,
        page: PageRequest,
    ) -> Result<Page<History>>;

    async fn list_executions(
        &self,
        project_id: &str,
        history_id: &str,
        page: PageRequest,
    ) -> Result<Page<Execution>>;

    async fn get_execution(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
    ) -> Result<Execution>;

    async fn list_steps(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        page: PageRequest,
    ) -> Result<Page<Step>>;

    async fn get_step(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        step_id: &str,
    ) -> Result<Step>;

    async fn list_test_cases(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        step_id: &str,
        page: PageRequest,
    ) -> Result<Page<TestCase>>;

    async fn get_test_case(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        step_id: &str,
        test_case_id: &str,
    ) -> Result<TestCase>;

    async fn list_environments(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        page: PageRequest,
    ) -> Result<Page<Environment>>;

    async fn get_environment(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        environment_id: &str,
    ) -> Result<Environment>;
}
