//! ToolResults v1beta3 over HTTPS with `reqwest`.

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::auth::{self, AccessToken, Credentials};
use super::{Page, PageRequest, ToolResults};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::model::{Environment, Execution, History, Step, TestCase};

/// Authenticated ToolResults client. Built once per run and shared read-only.
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    token: AccessToken,
}

impl HttpGateway {
    /// Authenticate with `credentials` and return a ready gateway.
    pub async fn connect(api: &ApiConfig, credentials: &Credentials) -> Result<Self> {
        let client = build_client(api)?;
        let token = auth::fetch_access_token(&client, credentials).await?;
        Self::from_parts(client, &api.base_url, token)
    }

    /// Use an already issued access token.
    pub fn with_token(api: &ApiConfig, token: AccessToken) -> Result<Self> {
        let client = build_client(api)?;
        Self::from_parts(client, &api.base_url, token)
    }

    fn from_parts(client: Client, base_url: &str, token: AccessToken) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid API base URL '{}': {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// `projects/{p}/histories/...` joined onto the base URL, each segment
    /// percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::Config(format!("base URL {} cannot hold a path", self.base_url)))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T> {
        if chrono::Utc::now() >= self.token.expires_at {
            warn!(expires_at = %self.token.expires_at, "access token has expired");
        }

        debug!(%resource, %url, ?query, "GET");
        let resp = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token.token)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::unexpected(resource, e.to_string()))
    }

    async fn list<R, T>(
        &self,
        resource: &'static str,
        segments: &[&str],
        page: &PageRequest,
        extra: &[(&str, String)],
    ) -> Result<Page<T>>
    where
        R: DeserializeOwned + Into<Page<T>>,
    {
        let mut query: Vec<(&str, String)> = extra.to_vec();
        if let Some(size) = page.page_size {
            query.push(("pageSize", size.to_string()));
        }
        if let Some(token) = &page.page_token {
            query.push(("pageToken", token.clone()));
        }
        let url = self.url(segments)?;
        let resp: R = self.get_json(resource, url, &query).await?;
        Ok(resp.into())
    }
}

fn build_client(api: &ApiConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(api.timeout())
        .user_agent(api.user_agent.clone())
        .build()?)
}

// ---------------------------------------------------------------------------
// List response envelopes. A missing collection key means an empty page.
// ---------------------------------------------------------------------------

macro_rules! list_response {
    ($name:ident, $field:ident, $item:ty) => {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct $name {
            #[serde(default)]
            $field: Vec<$item>,
            #[serde(default)]
            next_page_token: Option<String>,
        }

        impl From<$name> for Page<$item> {
            fn from(resp: $name) -> Self {
                Page {
                    items: resp.$field,
                    next_page_token: resp.next_page_token.filter(|t| !t.is_empty()),
                }
            }
        }
    };
}

list_response!(ListHistoriesResponse, histories, History);
list_response!(ListExecutionsResponse, executions, Execution);
list_response!(ListStepsResponse, steps, Step);
list_response!(ListTestCasesResponse, test_cases, TestCase);
list_response!(ListEnvironmentsResponse, environments, Environment);

#[async_trait::async_trait]
impl ToolResults for HttpGateway {
    async fn list_histories(
        &self,
        project_id: &str,
        filter_by_name: &str,
        page: PageRequest,
    ) -> Result<Page<History>> {
        self.list::<ListHistoriesResponse, _>(
            "histories",
            &["projects", project_id, "histories"],
            &page,
            &[("filterByName", filter_by_name.to_string())],
        )
        .await
    }

    async fn list_executions(
        &self,
        project_id: &str,
        history_id: &str,
        page: PageRequest,
    ) -> Result<Page<Execution>> {
        self.list::<ListExecutionsResponse, _>(
            "executions",
            &["projects", project_id, "histories", history_id, "executions"],
            &page,
            &[],
        )
        .await
    }

    async fn get_execution(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
    ) -> Result<Execution> {
        let url = self.url(&[
            "projects",
            project_id,
            "histories",
            history_id,
            "executions",
            execution_id,
        ])?;
        self.get_json("execution", url, &[]).await
    }

    async fn list_steps(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        page: PageRequest,
    ) -> Result<Page<Step>> {
        self.list::<ListStepsResponse, _>(
            "steps",
            &[
                "projects",
                project_id,
                "histories",
                history_id,
                "executions",
                execution_id,
                "steps",
            ],
            &page,
            &[],
        )
        .await
    }

    async fn get_step(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        step_id: &str,
    ) -> Result<Step> {
        let url = self.url(&[
            "projects",
            project_id,
            "histories",
            history_id,
            "executions",
            execution_id,
            "steps",
            step_id,
        ])?;
        self.get_json("step", url, &[]).await
    }

    async fn list_test_cases(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        step_id: &str,
        page: PageRequest,
    ) -> Result<Page<TestCase>> {
        self.list::<ListTestCasesResponse, _>(
            "testCases",
            &[
                "projects",
                project_id,
                "histories",
                history_id,
                "executions",
                execution_id,
                "steps",
                step_id,
                "testCases",
            ],
            &page,
            &[],
        )
        .await
    }

    async fn get_test_case(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        step_id: &str,
        test_case_id: &str,
    ) -> Result<TestCase> {
        let url = self.url(&[
            "projects",
            project_id,
            "histories",
            history_id,
            "executions",
            execution_id,
            "steps",
            step_id,
            "testCases",
            test_case_id,
        ])?;
        self.get_json("testCase", url, &[]).await
    }

    async fn list_environments(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        page: PageRequest,
    ) -> Result<Page<Environment>> {
        self.list::<ListEnvironmentsResponse, _>(
            "environments",
            &[
                "projects",
                project_id,
                "histories",
                history_id,
                "executions",
                execution_id,
                "environments",
            ],
            &page,
            &[],
        )
        .await
    }

    async fn get_environment(
        &self,
        project_id: &str,
        history_id: &str,
        execution_id: &str,
        environment_id: &str,
    ) -> Result<Environment> {
        let url = self.url(&[
            "projects",
            project_id,
            "histories",
            history_id,
            "executions",
            execution_id,
            "environments",
            environment_id,
        ])?;
        self.get_json("environment", url, &[]).await
    }
}
