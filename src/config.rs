//! Proxy settings and charm configuration.
//!
//! `ProxyConfig` is the optional `nfs-server-proxy.toml` that tunes how the
//! binary talks to the runtime. `CharmConfig` is the operator-facing charm
//! configuration, read fresh from `config-get` on every hook.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ProxyError;

/// Integration the proxy publishes on when none is configured.
pub const DEFAULT_INTEGRATION: &str = "nfs-share";

fn default_integration() -> String {
    DEFAULT_INTEGRATION.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Top-level proxy settings, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Relation name the endpoint is published on.
    #[serde(default = "default_integration")]
    pub integration: String,
    #[serde(default)]
    pub hook_tools: HookToolsConfig,
}

/// How hook tools are located and invoked.
#[derive(Debug, Clone, Deserialize)]
pub struct HookToolsConfig {
    /// Directory containing the hook tools. Looked up on `PATH` when unset.
    pub dir: Option<PathBuf>,
    /// Per-invocation timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            integration: default_integration(),
            hook_tools: HookToolsConfig::default(),
        }
    }
}

impl Default for HookToolsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProxyConfig {
    /// Read, parse and validate a settings file.
    pub async fn load(path: &Path) -> crate::Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ProxyError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: ProxyConfig = toml::from_str(&content).map_err(|e| {
            ProxyError::InvalidConfig(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the settings, failing fast before any hook tool is run.
    pub fn validate(&self) -> crate::Result<()> {
        let name = &self.integration;
        if name.is_empty()
            || !name.starts_with(|c: char| c.is_ascii_lowercase())
            || name.ends_with('-')
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ProxyError::InvalidConfig(format!(
                "integration '{}' must be lowercase alphanumeric with hyphens, starting with a letter",
                name
            )));
        }

        if self.hook_tools.timeout_secs == 0 {
            return Err(ProxyError::InvalidConfig(
                "hook_tools.timeout_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Charm configuration as returned by `config-get --format=json`.
///
/// Unknown options are ignored; an unset option is absent or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CharmConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl CharmConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
        }
    }
}
