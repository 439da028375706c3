use crate::config::LlmConfig;
use crate::llm;
use crate::{Error, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs, Role,
    },
};
use async_trait::async_trait;

/// Chat completion backend for any OpenAI-compatible endpoint.
pub struct OpenAI {
    client: Client<OpenAIConfig>,
}

impl OpenAI {
    /// Points the client at `config.api_base` (e.g. a local Ollama server) and
    /// reads the key from `config.api_key_env` when that variable is set.
    pub fn from_config(config: &LlmConfig) -> std::sync::Arc<Self> {
        let mut openai_config = OpenAIConfig::new();
        if let Some(base) = &config.api_base {
            openai_config = openai_config.with_api_base(base);
        }
        if let Ok(key) = std::env::var(&config.api_key_env) {
            openai_config = openai_config.with_api_key(key);
        }

        std::sync::Arc::new(Self {
            client: Client::with_config(openai_config),
        })
    }
}

impl TryFrom<&llm::Message> for ChatCompletionRequestMessage {
    type Error = Error;

    fn try_from(msg: &llm::Message) -> Result<Self> {
        match msg {
            llm::Message::User(msg) => Ok(ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.clone()),
                    name: None,
                },
            )),
            llm::Message::System(msg) => Ok(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.clone()),
                    name: None,
                },
            )),
            llm::Message::Assistant(msg) => Ok(ChatCompletionRequestMessage::Assistant(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.clone(),
                    ))
                    .build()?,
            )),
        }
    }
}

#[async_trait]
impl llm::LLM for OpenAI {
    async fn completion<'a>(
        &self,
        request: llm::CompletionRequest<'a>,
    ) -> Result<llm::CompletionResponse> {
        let completion = CreateChatCompletionRequestArgs::default()
            .model(request.model)
            .temperature(request.temperature)
            .messages(
                request
                    .messages
                    .iter()
                    .map(ChatCompletionRequestMessage::try_from)
                    .collect::<Result<Vec<_>>>()?,
            )
            .build()?;

        let res = self.client.chat().create(completion).await?;

        let choice = res
            .choices
            .first()
            .ok_or(Error::LLMResponseError("choices is empty".to_string()))?;

        if choice.message.role != Role::Assistant {
            return Err(Error::LLMResponseError(
                "expected role to be assistant".to_string(),
            ));
        }

        let content = choice
            .message
            .content
            .as_ref()
            .ok_or(Error::LLMResponseError("content is empty".to_string()))?;

        Ok(llm::CompletionResponse {
            content: content.clone(),
        })
    }
}
