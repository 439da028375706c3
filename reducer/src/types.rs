use crate::config::ReducerConfig;
use crate::truncate::char_len;
use crate::{Error, Result};
use serde::Serialize;

/// Visible boundary between source texts in every combined output.
pub const SOURCE_SEPARATOR: &str = "\n\n---\n\n";

/// Input to [`crate::Reducer::reduce`]. Built fresh for every call.
#[derive(Clone, Debug)]
pub struct ReductionRequest {
    pub texts: Vec<String>,
    /// Hard ceiling on the result, in chars.
    pub max_output_size: usize,
    /// Largest unit handed to the summarizer in one call, in chars.
    pub chunk_size: usize,
    pub model: String,
    pub allow_truncation: bool,
}

impl ReductionRequest {
    pub fn new(
        texts: Vec<String>,
        max_output_size: usize,
        chunk_size: usize,
        model: impl Into<String>,
    ) -> Self {
        Self {
            texts,
            max_output_size,
            chunk_size,
            model: model.into(),
            allow_truncation: true,
        }
    }

    pub fn from_config(texts: Vec<String>, config: &ReducerConfig) -> Self {
        Self::new(
            texts,
            config.max_output_size,
            config.chunk_size,
            config.model.clone(),
        )
        .allow_truncation(config.allow_truncation)
    }

    pub fn allow_truncation(mut self, allow: bool) -> Self {
        self.allow_truncation = allow;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_output_size == 0 {
            return Err(Error::InvalidConfig(
                "max_output_size must be positive".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn input_chars(&self) -> usize {
        self.texts.iter().map(|t| char_len(t)).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SummaryOutcome {
    /// Chunk was already within its target and skipped the summarizer.
    Passthrough,
    Summarized,
    /// Summarizer returned something at least as long as the chunk; truncated instead.
    NotShorter,
    /// Generation failed or timed out; truncated instead.
    Failed(String),
}

impl SummaryOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SummaryOutcome::NotShorter | SummaryOutcome::Failed(_))
    }
}

impl std::fmt::Display for SummaryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryOutcome::Passthrough => write!(f, "passthrough"),
            SummaryOutcome::Summarized => write!(f, "summarized"),
            SummaryOutcome::NotShorter => write!(f, "not shorter, truncated"),
            SummaryOutcome::Failed(e) => write!(f, "failed, truncated: {}", e),
        }
    }
}

/// Result of reducing one chunk.
#[derive(Clone, Debug)]
pub struct Summary {
    pub source: usize,
    pub index: usize,
    pub input_chars: usize,
    pub text: String,
    pub outcome: SummaryOutcome,
    pub elapsed: std::time::Duration,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RoundReport {
    pub round: usize,
    pub chunks: usize,
    pub summarizer_calls: usize,
    pub failures: usize,
    pub fallbacks: usize,
    pub input_chars: usize,
    pub output_chars: usize,
    pub elapsed_ms: u64,
}

/// Reduced text plus advisory diagnostics. Only `text` is contractual.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ReductionResult {
    pub text: String,
    pub input_chars: usize,
    pub output_chars: usize,
    pub rounds: Vec<RoundReport>,
    /// The final text was cut by the safety net rather than produced by summaries.
    pub truncated: bool,
    /// A strict whole-text compression pass ran after the round limit.
    pub strict_pass: bool,
    pub deadline_exceeded: bool,
    pub summarizer_calls: usize,
    pub failed_calls: usize,
    pub fallbacks: usize,
    pub elapsed_ms: u64,
}

impl ReductionResult {
    pub fn compression_ratio(&self) -> f64 {
        if self.input_chars == 0 {
            return 1.0;
        }
        self.output_chars as f64 / self.input_chars as f64
    }

    /// True when truncation or fallbacks rather than summaries shaped the output.
    pub fn is_degraded(&self) -> bool {
        self.truncated || self.deadline_exceeded || self.fallbacks > 0
    }
}
