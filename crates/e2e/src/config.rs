//! Harness configuration
//!
//! Loaded from an optional TOML file; the CLI overrides individual fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::browser::BrowserConfig;
use crate::checks::CheckSettings;
use crate::error::{E2eError, E2eResult};
use crate::locale::Locale;
use crate::server::ServerConfig;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root URL of the application under test
    pub base_url: String,

    pub locale: Locale,

    pub server: ServerConfig,

    pub browser: BrowserConfig,

    pub checks: CheckSettings,

    /// Where to write the JSON results file, if anywhere
    pub output: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            locale: Locale::default(),
            server: ServerConfig::default(),
            browser: BrowserConfig::default(),
            checks: CheckSettings::default(),
            output: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> E2eResult<()> {
        let base = self.base_url();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(E2eError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.checks.element_wait_ms == 0 {
            return Err(E2eError::InvalidConfig("checks.element_wait_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn api_url(&self) -> String {
        format!("{}/api", self.base_url())
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.api_url())
    }
}
