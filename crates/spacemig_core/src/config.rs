use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = "spacemig/0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_CONFIG_FILENAME: &str = "spacemig.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct MigratorConfig {
    #[serde(default)]
    pub source: InstanceSection,
    #[serde(default)]
    pub target: InstanceSection,
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub migration: MigrationSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct InstanceSection {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct HttpSection {
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct MigrationSection {
    pub title_prefix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceRole {
    Source,
    Target,
}

impl InstanceRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }

    fn env_prefix(self) -> &'static str {
        match self {
            Self::Source => "SOURCE",
            Self::Target => "TARGET",
        }
    }
}

impl MigratorConfig {
    pub fn instance(&self, role: InstanceRole) -> &InstanceSection {
        match role {
            InstanceRole::Source => &self.source,
            InstanceRole::Target => &self.target,
        }
    }

    /// Resolve the instance base URL: env `<ROLE>_BASE_URL` > config > None.
    pub fn base_url(&self, role: InstanceRole) -> Option<String> {
        env_override(&format!("{}_BASE_URL", role.env_prefix()))
            .or_else(|| self.instance(role).base_url.clone())
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
    }

    pub fn username(&self, role: InstanceRole) -> Option<String> {
        env_override(&format!("{}_USERNAME", role.env_prefix()))
            .or_else(|| self.instance(role).username.clone())
    }

    pub fn api_token(&self, role: InstanceRole) -> Option<String> {
        env_override(&format!("{}_API_TOKEN", role.env_prefix()))
            .or_else(|| self.instance(role).api_token.clone())
    }

    pub fn page_size(&self, role: InstanceRole) -> usize {
        self.instance(role)
            .page_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Resolve the HTTP timeout: env SPACEMIG_HTTP_TIMEOUT_MS > config > DEFAULT_TIMEOUT_MS.
    pub fn timeout_ms(&self) -> u64 {
        env_override("SPACEMIG_HTTP_TIMEOUT_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .or(self.http.timeout_ms)
            .filter(|timeout| *timeout > 0)
            .unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    /// Resolve user agent: env SPACEMIG_USER_AGENT > config > DEFAULT_USER_AGENT.
    pub fn user_agent(&self) -> String {
        env_override("SPACEMIG_USER_AGENT")
            .or_else(|| self.http.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    pub fn title_prefix(&self) -> String {
        self.migration.title_prefix.clone().unwrap_or_default()
    }
}

/// Load and parse a MigratorConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<MigratorConfig> {
    if !config_path.exists() {
        return Ok(MigratorConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: MigratorConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Trimmed, non-empty value of an environment variable.
pub(crate) fn env_override(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
