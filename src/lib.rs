//! flakescan -- failed and flaky test reporting for Firebase Test Lab.
//!
//! This crate queries the Cloud ToolResults API (histories → executions →
//! steps → test cases, plus environments), filters executions by outcome and
//! returns the failing test case batches enriched with timing and environment
//! data.

pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod model;
pub mod project;

pub use error::{Error, Result};
pub use extract::{ExtractOptions, HistorySelection, Pagination, ResultExtractor, ResultRecord};
pub use gateway::http::HttpGateway;
pub use gateway::ToolResults;

use config::Config;
use gateway::auth::Credentials;
use project::Project;

/// Resolve credentials for `project` and authenticate a gateway.
///
/// Fails with a configuration error before any network call when the
/// project's credential variable is missing or unusable.
pub async fn connect(project: Project, config: &Config) -> Result<HttpGateway> {
    let credentials = Credentials::from_env(project)?;
    tracing::info!(%project, base_url = %config.api.base_url, "connecting to ToolResults");
    HttpGateway::connect(&config.api, &credentials).await
}
