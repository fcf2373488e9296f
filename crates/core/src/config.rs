//! Environment-based configuration for the pipeline and its backend.

use crate::signals::TieBreakPolicy;
use std::time::Duration;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    /// Override for OpenAI-compatible endpoints (Groq, local inference, ...).
    pub api_base: Option<String>,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Independent deadline applied to every generator dispatch.
    pub generator_timeout: Duration,
    /// Deadline applied to each sandboxed evaluation test case.
    pub eval_case_timeout: Duration,
    pub tie_break: TieBreakPolicy,
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: String) -> Result<T, ConfigError> {
    raw.parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw))
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let api_base = std::env::var("OPENAI_API_BASE").ok();

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let temperature = match std::env::var("GENERATION_TEMPERATURE") {
            Ok(raw) => parse_var::<f32>("GENERATION_TEMPERATURE", raw)?,
            Err(_) => 0.7,
        };

        let max_tokens = match std::env::var("GENERATION_MAX_TOKENS") {
            Ok(raw) => parse_var::<u32>("GENERATION_MAX_TOKENS", raw)?,
            Err(_) => 1024,
        };

        let generator_timeout = match std::env::var("GENERATOR_TIMEOUT_MS") {
            Ok(raw) => Duration::from_millis(parse_var::<u64>("GENERATOR_TIMEOUT_MS", raw)?),
            Err(_) => Duration::from_millis(20_000),
        };

        let eval_case_timeout = match std::env::var("EVAL_CASE_TIMEOUT_MS") {
            Ok(raw) => Duration::from_millis(parse_var::<u64>("EVAL_CASE_TIMEOUT_MS", raw)?),
            Err(_) => Duration::from_millis(10_000),
        };

        let tie_break = match std::env::var("QUIZ_CODING_TIE_BREAK") {
            Ok(raw) => raw
                .parse::<TieBreakPolicy>()
                .map_err(|e| ConfigError::InvalidValue("QUIZ_CODING_TIE_BREAK".to_string(), e))?,
            Err(_) => TieBreakPolicy::default(),
        };

        Ok(Self {
            api_key,
            api_base,
            chat_model,
            temperature,
            max_tokens,
            generator_timeout,
            eval_case_timeout,
            tie_break,
        })
    }
}
