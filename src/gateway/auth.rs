//! Service-account authentication (OAuth2 JWT-bearer grant).
//!
//! Credentials come from `GCLOUD_AUTH_<PROJECT>`; the token is fetched once
//! per run and reused for every API call.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::project::Project;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account key file that authentication needs.
#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

/// Parsed and validated service-account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub client_email: String,
    pub token_uri: String,
    private_key_id: Option<String>,
    signing_key: EncodingKey,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl Credentials {
    /// Resolve credentials for `project` from the process environment.
    pub fn from_env(project: Project) -> Result<Self> {
        Self::resolve(project, |var| std::env::var(var).ok())
    }

    /// Resolve credentials for `project` using `lookup` to read variables.
    pub fn resolve(project: Project, lookup: impl FnOnce(&str) -> Option<String>) -> Result<Self> {
        let var = project.credential_var();
        let raw = lookup(var.as_str())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::MissingCredentials {
                project: project.id().to_string(),
                var: var.clone(),
            })?;
        Self::from_json(&var, &raw)
    }

    /// Parse a service-account JSON document. `source` names where it came
    /// from for error messages.
    pub fn from_json(source: &str, raw: &str) -> Result<Self> {
        let key: ServiceAccountKey =
            serde_json::from_str(raw).map_err(|e| Error::InvalidCredentials {
                var: source.to_string(),
                reason: format!("not a service-account JSON document: {}", e),
            })?;

        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            Error::InvalidCredentials {
                var: source.to_string(),
                reason: format!("private_key is not an RSA PEM key: {}", e),
            }
        })?;

        debug!(client_email = %key.client_email, %source, "resolved service-account credentials");

        Ok(Self {
            client_email: key.client_email,
            token_uri: key.token_uri,
            private_key_id: key.private_key_id,
            signing_key,
        })
    }

    /// Point token requests at a different endpoint.
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Build the signed RS256 assertion exchanged for an access token.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| Error::Auth(format!("failed to sign assertion: {}", e)))
    }
}

/// A bearer token for the ToolResults API.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchange a signed assertion for an access token.
pub async fn fetch_access_token(
    client: &reqwest::Client,
    credentials: &Credentials,
) -> Result<AccessToken> {
    let now = Utc::now();
    let assertion = credentials.assertion(now)?;

    debug!(token_uri = %credentials.token_uri, "requesting access token");
    let resp = client
        .post(&credentials.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(Error::Auth(format!(
            "token endpoint {} returned {}: {}",
            credentials.token_uri, status, body
        )));
    }

    let parsed: TokenResponse =
        serde_json::from_str(&body).map_err(|e| Error::unexpected("token", e.to_string()))?;
    let lifetime = parsed.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);

    info!(client_email = %credentials.client_email, expires_in = lifetime, "authenticated");
    Ok(AccessToken::new(
        parsed.access_token,
        now + Duration::seconds(lifetime),
    ))
}
