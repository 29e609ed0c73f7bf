//! Settings for codegloss.
//!
//! Settings come from a YAML file, are overridden by environment variables
//! and finally by command-line flags. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::language::TargetLanguage;

/// Settings file names searched for in the current directory.
pub const DEFAULT_SETTINGS_NAMES: &[&str] = &["codegloss.yaml", ".codegloss.yaml"];

/// Environment variable overriding the endpoint.
pub const ENV_ENDPOINT: &str = "CODEGLOSS_ENDPOINT";
/// Environment variable overriding the target language.
pub const ENV_LANGUAGE: &str = "CODEGLOSS_LANGUAGE";

/// Template written by `codegloss init`.
pub const SETTINGS_TEMPLATE: &str = include_str!("templates/codegloss.yaml");

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub language: TargetLanguage,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_auto_line_limit")]
    pub auto_line_limit: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
}

fn default_endpoint() -> String {
    "http://localhost:7071/api/code_ai_interpreter".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_cache_capacity() -> usize {
    crate::client::DEFAULT_CAPACITY
}

fn default_auto_line_limit() -> usize {
    100
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_wrap_width() -> usize {
    crate::render::DEFAULT_WRAP_WIDTH
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            language: TargetLanguage::default(),
            timeout_ms: default_timeout_ms(),
            cache_capacity: default_cache_capacity(),
            auto_line_limit: default_auto_line_limit(),
            debounce_ms: default_debounce_ms(),
            wrap_width: default_wrap_width(),
        }
    }
}

impl Settings {
    /// Parse settings from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    /// Parse settings from YAML text. Empty text yields the defaults.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Load settings from `explicit`, or the first discovered file, or defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => discover_settings(),
        };

        match path {
            Some(p) => Self::parse_file(&p)
                .map_err(|e| anyhow::anyhow!("reading settings {}: {}", p.display(), e)),
            None => Ok(Self::default()),
        }
    }

    /// Apply `CODEGLOSS_*` environment overrides.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(
            std::env::var(ENV_ENDPOINT).ok().as_deref(),
            std::env::var(ENV_LANGUAGE).ok().as_deref(),
        )
    }

    /// Override the endpoint and language when given.
    pub fn apply_overrides(
        &mut self,
        endpoint: Option<&str>,
        language: Option<&str>,
    ) -> anyhow::Result<()> {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint.trim().to_string();
        }
        if let Some(language) = language.filter(|l| !l.trim().is_empty()) {
            self.language = language.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Find a settings file in the current directory, then the user config directory.
pub fn discover_settings() -> Option<PathBuf> {
    for name in DEFAULT_SETTINGS_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Some(path);
        }
    }
    user_settings_path().filter(|p| p.exists())
}

/// `config.yaml` in the platform's config directory for codegloss.
pub fn user_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "codegloss").map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Validate settings for correctness.
pub fn validate(settings: &Settings) -> anyhow::Result<()> {
    let url = reqwest::Url::parse(&settings.endpoint)
        .map_err(|e| anyhow::anyhow!("invalid endpoint {:?}: {}", settings.endpoint, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!(
            "invalid endpoint {:?}: scheme must be http or https",
            settings.endpoint
        );
    }

    if settings.cache_capacity == 0 {
        anyhow::bail!("cache_capacity must be at least 1");
    }

    if settings.wrap_width < 20 {
        anyhow::bail!("wrap_width must be at least 20, got {}", settings.wrap_width);
    }

    if settings.auto_line_limit == 0 {
        anyhow::bail!("auto_line_limit must be at least 1");
    }

    Ok(())
}
