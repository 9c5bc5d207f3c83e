use std::io;

use crate::scripts::Stage;

/// Custom error type for jekyll-hook operations
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("No {stage} script configured for branch '{branch}' and no '#default' entry")]
    ScriptUnresolved { branch: String, stage: Stage },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Mail transport error: {0}")]
    MailError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Helper type for Results that use HookError
pub type Result<T> = std::result::Result<T, HookError>;
