//! Configuration management for ask.
//!
//! Configuration is read once at startup from `AI_ASK_*` environment
//! variables and passed down explicitly from there.

use std::env::VarError;
use thiserror::Error;

/// Base URL of the chat-completion API (without `/chat/completions`).
pub const BASE_URL_VAR: &str = "AI_ASK_BASE_URL";
/// Bearer token sent with every request.
pub const API_KEY_VAR: &str = "AI_ASK_API_KEY";
/// Model name placed in the request body.
pub const MODEL_VAR: &str = "AI_ASK_MODEL";
/// Tracing filter directive for diagnostics on stderr.
pub const LOG_VAR: &str = "AI_ASK_LOG";

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} is not set")]
    Missing(&'static str),
    /// A required variable is set but not valid UTF-8.
    #[error("{0} is not valid UTF-8")]
    NotUnicode(&'static str),
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env(model_override: Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name), model_override)
    }

    /// Load configuration through `lookup`, checking variables in a fixed
    /// order and reporting the first one that is missing or unreadable.
    ///
    /// An empty value counts as unset. When `model_override` is given the
    /// model variable is not consulted at all.
    pub fn from_lookup<F>(lookup: F, model_override: Option<String>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let required = |name: &'static str| match lookup(name) {
            Ok(value) if !value.is_empty() => Ok(value),
            Ok(_) | Err(VarError::NotPresent) => Err(ConfigError::Missing(name)),
            Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
        };

        let base_url = required(BASE_URL_VAR)?;
        let api_key = required(API_KEY_VAR)?;
        let model = match model_override.filter(|m| !m.is_empty()) {
            Some(model) => model,
            None => required(MODEL_VAR)?,
        };

        Ok(Self {
            base_url,
            api_key,
            model,
        })
    }
}
