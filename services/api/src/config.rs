//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;

use curriculum_chat_core::ClearScope;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub gemini_api_key: String,
    pub qa_model: String,
    /// Overrides the Gemini endpoint, used to point tests at a local stub.
    pub gemini_base_url: Option<String>,
    pub gateway_timeout: Duration,
    pub document_clear_scope: ClearScope,
    pub clear_transcript_on_replace: bool,
    pub max_transcript_messages: Option<usize>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Gateway Settings ---
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let qa_model =
            std::env::var("QA_MODEL").unwrap_or_else(|_| "gemini-3-flash-preview".to_string());

        let gemini_base_url = std::env::var("GEMINI_BASE_URL").ok();

        let timeout_secs = match std::env::var("GATEWAY_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "GATEWAY_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a number of seconds", raw),
                )
            })?,
            Err(_) => 300,
        };
        let gateway_timeout = Duration::from_secs(timeout_secs);

        // --- Load Session Policy Settings ---
        let document_clear_scope = match std::env::var("DOCUMENT_CLEAR_SCOPE") {
            Ok(raw) => parse_clear_scope(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DOCUMENT_CLEAR_SCOPE".to_string(),
                    format!("'{}' is not 'course' or 'all'", raw),
                )
            })?,
            Err(_) => ClearScope::ActiveCourse,
        };

        let clear_transcript_on_replace = match std::env::var("CLEAR_TRANSCRIPT_ON_REPLACE") {
            Ok(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CLEAR_TRANSCRIPT_ON_REPLACE".to_string(),
                    format!("'{}' is not 'true' or 'false'", raw),
                )
            })?,
            Err(_) => false,
        };

        let max_transcript_messages = match std::env::var("MAX_TRANSCRIPT_MESSAGES") {
            Ok(raw) => Some(raw.parse::<usize>().map_err(|_| {
                ConfigError::InvalidValue(
                    "MAX_TRANSCRIPT_MESSAGES".to_string(),
                    format!("'{}' is not a message count", raw),
                )
            })?),
            Err(_) => None,
        };

        Ok(Self {
            bind_address,
            log_level,
            gemini_api_key,
            qa_model,
            gemini_base_url,
            gateway_timeout,
            document_clear_scope,
            clear_transcript_on_replace,
            max_transcript_messages,
        })
    }

    /// The session policy built from the loaded settings, applied to every
    /// controller this process creates.
    pub fn session_policy(&self) -> curriculum_chat_core::SessionPolicy {
        curriculum_chat_core::SessionPolicy {
            document_clear_scope: self.document_clear_scope,
            clear_transcript_on_replace: self.clear_transcript_on_replace,
            max_transcript_messages: self.max_transcript_messages,
        }
    }
}

fn parse_clear_scope(raw: &str) -> Option<ClearScope> {
    match raw.to_lowercase().as_str() {
        "course" => Some(ClearScope::ActiveCourse),
        "all" => Some(ClearScope::AllCourses),
        _ => None,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_scope_accepts_course_and_all() {
        assert_eq!(parse_clear_scope("course"), Some(ClearScope::ActiveCourse));
        assert_eq!(parse_clear_scope("ALL"), Some(ClearScope::AllCourses));
        assert_eq!(parse_clear_scope("everything"), None);
    }

    #[test]
    fn bool_knobs_accept_numeric_forms() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }
}
