//! Error type shared by the gateway and the extractor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no credentials configured for project {project}: set {var} to the service-account JSON")]
    MissingCredentials { project: String, var: String },

    #[error("credentials in {var} are unusable: {reason}")]
    InvalidCredentials { var: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request to {url} failed with status {status}: {body}")]
    Api { status: u16, url: String, body: String },

    #[error("unexpected {resource} response: {detail}")]
    UnexpectedResponse {
        resource: &'static str,
        detail: String,
    },
}

impl Error {
    pub(crate) fn unexpected(resource: &'static str, detail: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            resource,
            detail: detail.into(),
        }
    }

    /// True for the configuration failures that should abort before any API call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingCredentials { .. } | Error::InvalidCredentials { .. } | Error::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
