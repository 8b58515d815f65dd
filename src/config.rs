// src/config.rs
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT: usize = 16;
const MAX_TIMEOUT_SECS: usize = 3600;
const MAX_CONCURRENT: usize = 4096;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be an integer between 1 and {max}, got '{value}'")]
    InvalidNumber { key: &'static str, value: String, max: usize },
    #[error("{key} must be true or false, got '{value}'")]
    InvalidBool { key: &'static str, value: String },
}

/// Process configuration, read once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub request_timeout: Duration,
    pub max_concurrent_calls: usize,
    pub expose_error_detail: bool,
    pub bind_addr: String,
    pub static_dir: String,
}

// The key never goes to logs in full.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("gemini_api_key", &self.gemini_api_key.as_deref().map(mask_key))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("request_timeout", &self.request_timeout)
            .field("max_concurrent_calls", &self.max_concurrent_calls)
            .field("expose_error_detail", &self.expose_error_detail)
            .field("bind_addr", &self.bind_addr)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT,
            expose_error_detail: false,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let request_timeout = match get("CHAT_TIMEOUT_SECS") {
            Some(v) => {
                Duration::from_secs(parse_bounded("CHAT_TIMEOUT_SECS", &v, MAX_TIMEOUT_SECS)? as u64)
            }
            None => defaults.request_timeout,
        };
        let max_concurrent_calls = match get("CHAT_MAX_CONCURRENT") {
            Some(v) => parse_bounded("CHAT_MAX_CONCURRENT", &v, MAX_CONCURRENT)?,
            None => defaults.max_concurrent_calls,
        };
        let expose_error_detail = match get("CHAT_EXPOSE_ERRORS") {
            Some(v) => parse_bool("CHAT_EXPOSE_ERRORS", &v)?,
            None => defaults.expose_error_detail,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            api_base: get("GEMINI_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            request_timeout,
            max_concurrent_calls,
            expose_error_detail,
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            static_dir: get("STATIC_DIR").unwrap_or(defaults.static_dir),
        })
    }
}

fn parse_bounded(key: &'static str, value: &str, max: usize) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        _ => Err(ConfigError::InvalidNumber { key, value: value.to_string(), max }),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool { key, value: value.to_string() }),
    }
}

/// First few characters of a credential followed by an ellipsis.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}...")
}
