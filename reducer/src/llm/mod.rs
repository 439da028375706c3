use crate::Result;
use async_trait::async_trait;

mod openai;
pub use openai::OpenAI;

#[derive(Clone, Debug)]
pub enum Message {
    User(String),
    Assistant(String),
    System(String),
}

impl Message {
    pub fn content(&self) -> &str {
        match self {
            Message::User(s) | Message::Assistant(s) | Message::System(s) => s,
        }
    }
}

pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub model: &'a str,
    pub temperature: f32,
}

pub struct CompletionResponse {
    pub content: String,
}

/// Text generation capability. Implementations must be safe to call concurrently.
#[async_trait]
pub trait LLM {
    async fn completion<'a>(&self, request: CompletionRequest<'a>) -> Result<CompletionResponse>;
}
