//! Configuration structures loaded from the TOML config file.
//!
//! The whole configuration is read once at startup and shared read-only as
//! `Arc<HookConfig>`; nothing mutates it while pipelines execute.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{HookError, Result};

/// Key of the fallback entry in the `[scripts]` table.
pub const DEFAULT_SCRIPTS_KEY: &str = "#default";

#[derive(Debug, Deserialize, Clone)]
pub struct HookConfig {
    /// Address the HTTP server binds to. Overridable via `BIND_ADDRESS`.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Repository owner logins permitted to trigger pipelines.
    pub accounts: Vec<String>,
    /// Shared webhook secret. When unset, signed requests pass unverified.
    #[serde(default)]
    pub secret: Option<String>,
    /// Whether clone URLs use the public https form or the ssh form.
    #[serde(default)]
    pub public_repo: bool,
    #[serde(default = "default_gh_server")]
    pub gh_server: String,
    /// Base directory for per-branch checkouts and build output.
    pub temp: PathBuf,
    #[serde(default)]
    pub email: EmailConfig,
    /// Script paths keyed by branch name, with a `#default` fallback entry.
    pub scripts: HashMap<String, ScriptEntry>,
}

/// One `[scripts.<branch>]` table. Either stage may be omitted, in which
/// case resolution falls back to the `#default` entry for that stage.
#[derive(Debug, Deserialize, Clone)]
pub struct ScriptEntry {
    #[serde(default)]
    pub build: Option<PathBuf>,
    #[serde(default)]
    pub publish: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmailConfig {
    /// Send outcome reports to the pusher. Off by default.
    #[serde(default)]
    pub sendreports: bool,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_gh_server() -> String {
    "github.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

/// Load and parse the configuration file
pub fn load_config(path: &str) -> Result<HookConfig> {
    let config_str = fs::read_to_string(path).map_err(|e| {
        HookError::ConfigError(format!("Failed to read config file '{}': {}", path, e))
    })?;

    let config: HookConfig = toml::from_str(&config_str).map_err(|e| {
        HookError::ConfigError(format!("Failed to parse config file '{}': {}", path, e))
    })?;

    Ok(config)
}
