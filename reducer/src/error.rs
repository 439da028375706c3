use async_openai::error::OpenAIError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Openai error: {0}")]
    OpenaiError(#[from] OpenAIError),

    #[error("No response from llm: {0}")]
    LLMResponseError(String),

    #[error("Generation timed out after {0:?}")]
    GenerationTimeout(std::time::Duration),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Missing arg: {0}")]
    MissingArg(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Task join error: {0}")]
    TaskJoinError(#[from] tokio::task::JoinError),

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}

impl Error {
    /// Transient failures worth another attempt: network errors and rate limits.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::OpenaiError(OpenAIError::Reqwest(_)) => true,
            Error::OpenaiError(OpenAIError::ApiError(api)) => {
                let code = api.code.as_deref().unwrap_or_default();
                let kind = api.r#type.as_deref().unwrap_or_default();
                code.contains("rate_limit")
                    || kind.contains("rate_limit")
                    || kind == "server_error"
                    || api.message.to_lowercase().contains("rate limit")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use async_openai::error::{ApiError, OpenAIError};

    fn api_error(message: &str, code: Option<&str>) -> Error {
        Error::OpenaiError(OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: None,
            param: None,
            code: code.map(str::to_string),
        }))
    }

    #[test]
    fn test_rate_limit_is_retryable() {
        assert!(api_error("slow down", Some("rate_limit_exceeded")).is_retryable());
        assert!(api_error("Rate limit reached for requests", None).is_retryable());
    }

    #[test]
    fn test_permanent_errors_are_not_retryable() {
        assert!(!api_error("model not found", Some("model_not_found")).is_retryable());
        assert!(!Error::LLMResponseError("content is empty".to_string()).is_retryable());
        assert!(!Error::GenerationTimeout(std::time::Duration::from_secs(1)).is_retryable());
        assert!(!Error::InvalidConfig("chunk_size".to_string()).is_retryable());
    }
}
