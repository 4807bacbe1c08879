//! Runtime configuration for the news search.
//!
//! Settings come from environment variables with CLI flags layered on top.
//! Everything except the API key has a default.

use std::time::Duration;

use thiserror::Error;

use crate::error::LlmError;
use crate::llm::{OpenAiClient, DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::scheduler::{PollerConfig, WorkerPoolConfig, DEFAULT_WAIT_TIMEOUT};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for a news search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsConfig {
    // LLM settings
    /// Base URL of the Responses API.
    pub api_base: String,
    /// API key sent as a bearer token.
    pub api_key: Option<String>,
    /// Model used for every lookup.
    pub model: String,
    /// HTTP timeout for a single API call.
    pub request_timeout: Duration,

    // Polling settings
    /// Upper bound on each executor wait.
    pub poll_timeout: Duration,
    /// Extra sleep after every poll iteration.
    pub idle_delay: Option<Duration>,

    // Pool settings
    /// Cap on lookups running at once. Unbounded when unset.
    pub max_concurrent: Option<usize>,
    /// Deadline for a single lookup. None when unset.
    pub job_timeout: Option<Duration>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_timeout: DEFAULT_WAIT_TIMEOUT,
            idle_delay: None,
            max_concurrent: None,
            job_timeout: None,
        }
    }
}

impl NewsConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `OPENAI_API_KEY`: API key (no default)
    /// - `OPENAI_API_BASE`: API base URL (default: https://api.openai.com/v1)
    /// - `NEWS_MODEL`: Model name (default: gpt-4o-mini)
    /// - `NEWS_REQUEST_TIMEOUT_SECS`: HTTP timeout (default: 120)
    /// - `NEWS_POLL_TIMEOUT_MS`: Poll wait bound (default: 1000)
    /// - `NEWS_IDLE_DELAY_MS`: Extra per-iteration delay (default: none)
    /// - `NEWS_MAX_CONCURRENT`: Concurrency cap (default: unbounded)
    /// - `NEWS_JOB_TIMEOUT_SECS`: Per-lookup deadline (default: none)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the result
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = var("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()) {
            config.api_key = Some(val);
        }

        if let Some(val) = var("OPENAI_API_BASE") {
            config.api_base = val;
        }

        if let Some(val) = var("NEWS_MODEL") {
            config.model = val;
        }

        if let Some(val) = var("NEWS_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "NEWS_REQUEST_TIMEOUT_SECS")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = var("NEWS_POLL_TIMEOUT_MS") {
            let ms: u64 = parse_env_value(&val, "NEWS_POLL_TIMEOUT_MS")?;
            config.poll_timeout = Duration::from_millis(ms);
        }

        if let Some(val) = var("NEWS_IDLE_DELAY_MS") {
            let ms: u64 = parse_env_value(&val, "NEWS_IDLE_DELAY_MS")?;
            config.idle_delay = Some(Duration::from_millis(ms));
        }

        if let Some(val) = var("NEWS_MAX_CONCURRENT") {
            config.max_concurrent = Some(parse_env_value(&val, "NEWS_MAX_CONCURRENT")?);
        }

        if let Some(val) = var("NEWS_JOB_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "NEWS_JOB_TIMEOUT_SECS")?;
            config.job_timeout = Some(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_base must not be empty".to_string(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model must not be empty".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.poll_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "poll_timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "max_concurrent must be greater than 0".to_string(),
            ));
        }

        if self.job_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ValidationFailed(
                "job_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the API base URL.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the poll wait bound.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the extra per-iteration delay.
    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = Some(delay);
        self
    }

    /// Sets the concurrency cap.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = Some(max);
        self
    }

    /// Sets the per-lookup deadline.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    /// Poller settings derived from this configuration.
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            wait_timeout: self.poll_timeout,
            idle_delay: self.idle_delay,
        }
    }

    /// Worker pool settings derived from this configuration.
    pub fn pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            max_concurrent: self.max_concurrent,
            job_timeout: self.job_timeout,
        }
    }

    /// Builds the API client.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingApiKey` when no key is configured.
    pub fn build_client(&self) -> Result<OpenAiClient, LlmError> {
        let api_key = self.api_key.clone().ok_or(LlmError::MissingApiKey)?;
        OpenAiClient::new(
            self.api_base.clone(),
            Some(api_key),
            self.model.clone(),
            self.request_timeout,
        )
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
