//! Agent configuration from the environment.
//!
//! **Interaction**: the CLI calls `dotenv::dotenv().ok()`, then `AgentConfig::from_env()`,
//! applies flag overrides, and builds `ChatOpenAI` / `TurnOptions` from the result.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::llm::{OpenAiConfig, RetryPolicy};
use crate::turn::{TurnOptions, DEFAULT_MAX_ITERATIONS};

pub const DEFAULT_BASE_URL: &str = "https://api.moonshot.cn/v1";
pub const DEFAULT_MODEL: &str = "moonshot-v1-8k";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no API key: set KIMI_API_KEY or OPENAI_API_KEY (environment or .env)")]
    MissingApiKey,
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Resolved settings for the model client and the turn loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// `None` until a key is found; only network commands need it.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub max_iterations: usize,
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
    pub max_retries: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            model_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

impl AgentConfig {
    /// Reads the process environment. Run `dotenv::dotenv().ok()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let config = Self {
            api_key: get("KIMI_API_KEY").or_else(|| get("OPENAI_API_KEY")),
            base_url: get("KIMI_API_BASE")
                .or_else(|| get("OPENAI_BASE_URL"))
                .unwrap_or(defaults.base_url),
            model: get("AGENT_MODEL").unwrap_or(defaults.model),
            temperature: parse_or("AGENT_TEMPERATURE", get("AGENT_TEMPERATURE"), defaults.temperature)?,
            max_tokens: get("AGENT_MAX_TOKENS")
                .map(|v| parse("AGENT_MAX_TOKENS", v))
                .transpose()?,
            max_iterations: parse_or(
                "AGENT_MAX_ITERATIONS",
                get("AGENT_MAX_ITERATIONS"),
                defaults.max_iterations,
            )?,
            model_timeout: Duration::from_secs(parse_or(
                "AGENT_MODEL_TIMEOUT_SECS",
                get("AGENT_MODEL_TIMEOUT_SECS"),
                defaults.model_timeout.as_secs(),
            )?),
            tool_timeout: Duration::from_secs(parse_or(
                "AGENT_TOOL_TIMEOUT_SECS",
                get("AGENT_TOOL_TIMEOUT_SECS"),
                defaults.tool_timeout.as_secs(),
            )?),
            max_retries: parse_or("AGENT_MAX_RETRIES", get("AGENT_MAX_RETRIES"), defaults.max_retries)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no turn could run with. Re-run after applying CLI overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AGENT_MAX_ITERATIONS".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// Model client settings; fails without an API key.
    pub fn openai_config(&self) -> Result<OpenAiConfig, ConfigError> {
        let mut config = OpenAiConfig::new(self.require_api_key()?, &self.base_url, &self.model)
            .with_temperature(self.temperature)
            .with_request_timeout(self.model_timeout);
        if let Some(n) = self.max_tokens {
            config = config.with_max_tokens(n);
        }
        Ok(config)
    }

    pub fn turn_options(&self) -> TurnOptions {
        TurnOptions::default()
            .with_max_iterations(self.max_iterations)
            .with_model_timeout(self.model_timeout)
            .with_tool_timeout(Some(self.tool_timeout))
            .with_retry(RetryPolicy {
                max_retries: self.max_retries,
                ..RetryPolicy::default()
            })
    }
}

fn parse<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    value.map_or(Ok(default), |v| parse(key, v))
}
