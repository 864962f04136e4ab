use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{
    DEFAULT_CONFIG_FILENAME, InstanceRole, MigratorConfig, env_override, load_config,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Config,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Config => "config",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedRuntime {
    pub config_path: PathBuf,
    pub config_source: ValueSource,
    pub config_exists: bool,
    pub config: MigratorConfig,
}

impl ResolvedRuntime {
    pub fn diagnostics(&self) -> String {
        format!(
            "config_path={} ({}, {})\nsource_base_url={} ({})\ntarget_base_url={} ({})\ntimeout_ms={}\nsource_page_size={}\nuser_agent={}",
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
            if self.config_exists { "found" } else { "missing" },
            self.config
                .base_url(InstanceRole::Source)
                .unwrap_or_else(|| "<unset>".to_string()),
            self.base_url_source(InstanceRole::Source).as_str(),
            self.config
                .base_url(InstanceRole::Target)
                .unwrap_or_else(|| "<unset>".to_string()),
            self.base_url_source(InstanceRole::Target).as_str(),
            self.config.timeout_ms(),
            self.config.page_size(InstanceRole::Source),
            self.config.user_agent(),
        )
    }

    fn base_url_source(&self, role: InstanceRole) -> ValueSource {
        let key = match role {
            InstanceRole::Source => "SOURCE_BASE_URL",
            InstanceRole::Target => "TARGET_BASE_URL",
        };
        if env_override(key).is_some() {
            ValueSource::Env
        } else if self.config.instance(role).base_url.is_some() {
            ValueSource::Config
        } else {
            ValueSource::Default
        }
    }
}

/// Resolve the config file (flag > SPACEMIG_CONFIG > `<cwd>/spacemig.toml`) and load it.
pub fn resolve_runtime(
    context: &ResolutionContext,
    overrides: &RuntimeOverrides,
) -> Result<ResolvedRuntime> {
    let (config_path, config_source) = match &overrides.config {
        Some(path) => (absolutize(&context.cwd, path), ValueSource::Flag),
        None => match env_override("SPACEMIG_CONFIG") {
            Some(path) => (absolutize(&context.cwd, Path::new(&path)), ValueSource::Env),
            None => (context.cwd.join(DEFAULT_CONFIG_FILENAME), ValueSource::Default),
        },
    };
    let config_exists = config_path.exists();
    let config = load_config(&config_path)?;
    Ok(ResolvedRuntime {
        config_path,
        config_source,
        config_exists,
        config,
    })
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
