//! TOML configuration for flakescan.
//!
//! Every field has a default, so an empty (or absent) file is valid. The
//! file location is resolved from the `--config` flag, then the
//! `FLAKESCAN_CONFIG` environment variable, then `./flakescan.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::extract::PageSizes;
use crate::model::{EXECUTION_PAGE_SIZE, STEP_PAGE_SIZE, TEST_CASE_PAGE_SIZE};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "FLAKESCAN_CONFIG";

/// Config file picked up from the working directory when nothing else is set.
pub const LOCAL_CONFIG: &str = "flakescan.toml";

pub const DEFAULT_BASE_URL: &str = "https://toolresults.googleapis.com/toolresults/v1beta3/";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub paging: PagingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration for this process.
    ///
    /// An explicit path must load; the environment and local fallbacks only
    /// warn when they cannot be read.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve(
            explicit,
            std::env::var(CONFIG_ENV).ok(),
            Path::new(LOCAL_CONFIG),
        )
    }

    fn resolve(explicit: Option<&Path>, env_path: Option<String>, local: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Some(env_path) = env_path {
            let path = PathBuf::from(env_path);
            match Self::load(&path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "{} set but file could not be loaded, trying fallback",
                        CONFIG_ENV
                    );
                }
            }
        }

        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

/// ToolResults endpoint and transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the ToolResults REST API; must end with `/`.
    pub base_url: String,
    /// Per-request timeout (seconds).
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: concat!("flakescan/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub execution_page_size: u32,
    pub step_page_size: u32,
    pub test_case_page_size: u32,
    /// Left to the server when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_page_size: Option<u32>,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            execution_page_size: EXECUTION_PAGE_SIZE,
            step_page_size: STEP_PAGE_SIZE,
            test_case_page_size: TEST_CASE_PAGE_SIZE,
            environment_page_size: None,
        }
    }
}

impl From<&PagingConfig> for PageSizes {
    fn from(cfg: &PagingConfig) -> Self {
        PageSizes {
            executions: Some(cfg.execution_page_size),
            steps: Some(cfg.step_page_size),
            test_cases: Some(cfg.test_case_page_size),
            environments: cfg.environment_page_size,
        }
    }
}
