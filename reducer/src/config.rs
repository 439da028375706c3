use crate::retry::RetryPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tuning knobs for a [`crate::Reducer`]. Every field has a default, so a TOML
/// file only needs to name the values it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    pub max_output_size: usize,
    pub chunk_size: usize,
    pub model: String,
    pub temperature: f32,
    /// Upper bound on split/summarize/recombine rounds.
    pub max_rounds: usize,
    /// Summarizer calls in flight at once.
    pub concurrency: usize,
    /// Floor for a single chunk's summary target.
    pub min_summary_chars: usize,
    pub call_timeout_secs: u64,
    pub overall_timeout_secs: u64,
    pub allow_truncation: bool,
    pub slice_oversized_words: bool,
    pub retry: RetryConfig,
    pub llm: LlmConfig,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            max_output_size: 2500,
            chunk_size: 10_000,
            model: "llama3:8b".to_string(),
            temperature: 0.0,
            max_rounds: 3,
            concurrency: 4,
            min_summary_chars: 200,
            call_timeout_secs: 120,
            overall_timeout_secs: 600,
            allow_truncation: true,
            slice_oversized_words: false,
            retry: RetryConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl ReducerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_output_size", self.max_output_size as u64),
            ("chunk_size", self.chunk_size as u64),
            ("max_rounds", self.max_rounds as u64),
            ("concurrency", self.concurrency as u64),
            ("call_timeout_secs", self.call_timeout_secs),
            ("overall_timeout_secs", self.overall_timeout_secs),
            ("retry.max_attempts", self.retry.max_attempts as u64),
        ];

        for (name, value) in positive {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be positive", name)));
            }
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::InvalidConfig(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }

        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            jitter_ratio: 0.25,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: 2.0,
            jitter_ratio: config.jitter_ratio.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL; `None` uses the OpenAI default.
    pub api_base: Option<String>,
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}
