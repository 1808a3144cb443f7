//! Configuration management for Draftchat.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding `engine.base_url`.
pub const API_URL_ENV: &str = "DRAFTCHAT_API_URL";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Draft engine connection
    pub engine: EngineConfig,

    /// Drafting session behaviour
    pub session: SessionConfig,

    /// Export settings
    pub export: ExportConfig,
}

/// Draft engine connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine base URL
    pub base_url: String,

    /// Per-request timeout in seconds (unset = wait indefinitely)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Drafting session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of web results requested in the fallback search
    pub web_results_limit: usize,

    /// Pause between a successful bootstrap and the automatic re-match
    pub bootstrap_resume_delay_ms: u64,

    /// Default for strict replacement when submitting answers
    pub strict_replace: bool,

    /// Whether to open the transcript with a greeting
    pub greeting: bool,
}

impl SessionConfig {
    /// Bootstrap resume delay as a [`Duration`].
    pub fn bootstrap_resume_delay(&self) -> Duration {
        Duration::from_millis(self.bootstrap_resume_delay_ms)
    }
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory exported drafts are written to
    pub output_dir: PathBuf,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.draftchat.toml` in current directory
    /// 2. `~/.config/draftchat/config.toml`
    /// 3. Falls back to defaults
    ///
    /// `DRAFTCHAT_API_URL` overrides the engine URL in every case.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_file_or_default()?;
        config.apply_env();
        Ok(config)
    }

    fn load_file_or_default() -> anyhow::Result<Self> {
        // Try local config first
        let local_config = PathBuf::from(".draftchat.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        // Try global config
        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.engine.base_url = url.trim().to_string();
            }
        }
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("draftchat"))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:8000".to_string(), timeout_secs: None }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { web_results_limit: 3, bootstrap_resume_delay_ms: 1500, strict_replace: true, greeting: true }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { output_dir: PathBuf::from(".") }
    }
}
