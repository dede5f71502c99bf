//! Process-wide client configuration.
//!
//! Constructed once at startup, validated, then shared immutably (via `Arc`)
//! with every component. Nothing mutates it after the listener starts; no
//! synchronization is needed because it is write-once, read-many.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse the config file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Client configuration. Every field has a default, so a partial config file
/// only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Port the proxy listens on (localhost only).
    pub port: u16,
    /// LCS endpoint answering "do you have a bundle for this URL?".
    pub lcs_lookup_endpoint: String,
    /// RS endpoint told "please prepare a bundle for this URL".
    pub rs_create_endpoint: String,
    /// LCS endpoint receiving decode-failure reports.
    pub decode_error_endpoint: String,
    /// Template for the interim "please wait" page.
    pub please_wait_page: PathBuf,
    /// Directory holding `<language>.json` translation files.
    pub translations_dir: PathBuf,
    /// Bound on every outbound call, so a hung LCS or RS cannot pin a
    /// request path forever.
    pub upstream_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: 3090,
            lcs_lookup_endpoint: "http://localhost:3091/lookup".to_string(),
            rs_create_endpoint: "http://localhost:3093/create".to_string(),
            decode_error_endpoint: "http://localhost:3091/error/decode".to_string(),
            please_wait_page: PathBuf::from("views/wait.html"),
            translations_dir: PathBuf::from("translations"),
            upstream_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the fields the proxy cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be nonzero".to_string()));
        }
        for (name, endpoint) in [
            ("lcs_lookup_endpoint", &self.lcs_lookup_endpoint),
            ("rs_create_endpoint", &self.rs_create_endpoint),
            ("decode_error_endpoint", &self.decode_error_endpoint),
        ] {
            if !endpoint.starts_with("http") {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be an http(s) URL, got {endpoint:?}"
                )));
            }
        }
        if self.upstream_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "upstream_timeout_secs must be nonzero".to_string(),
            ));
        }
        Ok(())
    }

    /// Timeout applied to every outbound call.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}
