use crate::Result;
use crate::llm::{CompletionRequest, LLM, Message};
use crate::truncate::char_len;
use std::sync::Arc;

/// Average characters per word, separator included.
pub const CHARS_PER_WORD: usize = 6;

/// Below this target/source ratio the prompt asks for only the most critical facts.
const AGGRESSIVE_RATIO: f64 = 0.2;

/// Thin wrapper that turns a chunk and a target length into one generation call.
/// It never checks the length of what comes back.
pub struct ChunkSummarizer {
    llm: Arc<dyn LLM + Send + Sync>,
}

impl ChunkSummarizer {
    pub fn new(llm: Arc<dyn LLM + Send + Sync>) -> Self {
        Self { llm }
    }

    pub async fn summarize_chunk(
        &self,
        text: &str,
        target_length: usize,
        model: &str,
        temperature: f32,
    ) -> Result<String> {
        self.generate(chunk_prompt(text, target_length), model, temperature)
            .await
    }

    /// Last-chance pass over an already reduced text that is still over budget.
    pub async fn compress_strict(
        &self,
        text: &str,
        max_chars: usize,
        model: &str,
        temperature: f32,
    ) -> Result<String> {
        self.generate(strict_prompt(text, max_chars), model, temperature)
            .await
    }

    async fn generate(&self, prompt: String, model: &str, temperature: f32) -> Result<String> {
        let messages = [Message::User(prompt)];
        let response = self
            .llm
            .completion(CompletionRequest {
                messages: &messages,
                model,
                temperature,
            })
            .await?;

        Ok(response.content.trim().to_string())
    }
}

pub fn target_words(target_length: usize) -> usize {
    (target_length / CHARS_PER_WORD).max(1)
}

pub fn chunk_prompt(text: &str, target_length: usize) -> String {
    let words = target_words(target_length);
    let ratio = target_length as f64 / char_len(text).max(1) as f64;

    if ratio < AGGRESSIVE_RATIO {
        format!(
            "Create an extremely concise summary of the text below in about {words} words \
             ({target_length} characters).
Include ONLY the most critical facts, statistics and conclusions:
1. Key numerical values and statistics
2. Major conclusions
3. Essential context

Give at most 1-2 sentences per article.

Text:
{text}

Respond with ONLY the summarized text, without any meta commentary."
        )
    } else {
        format!(
            "Summarize the text below in about {words} words ({target_length} characters).
Preserve:
1. Important facts and statistics
2. Key values, figures and dates exactly as written
3. Critical context
4. Essential points and conclusions

Text:
{text}

Respond with ONLY the summarized text, without any meta commentary."
        )
    }
}

pub fn strict_prompt(text: &str, max_chars: usize) -> String {
    let limit = max_chars.saturating_sub(max_chars / 20).max(1);
    format!(
        "The summary below is still too long. Rewrite it in AT MOST {limit} characters, \
         keeping only the most critical facts and figures.

{text}

Respond with ONLY the summarized text, without any meta commentary."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingLLM {
        reply: String,
        seen: Mutex<Vec<(String, String, f32)>>,
    }

    #[async_trait]
    impl LLM for RecordingLLM {
        async fn completion<'a>(
            &self,
            request: CompletionRequest<'a>,
        ) -> Result<CompletionResponse> {
            self.seen.lock().unwrap().push((
                request.messages[0].content().to_string(),
                request.model.to_string(),
                request.temperature,
            ));
            Ok(CompletionResponse {
                content: self.reply.clone(),
            })
        }
    }

    #[test]
    fn test_target_words() {
        assert_eq!(target_words(600), 100);
        assert_eq!(target_words(3), 1);
    }

    #[test]
    fn test_prompt_asks_for_length_and_facts() {
        let prompt = chunk_prompt(&"fact ".repeat(100), 300);
        assert!(prompt.contains("about 50 words"));
        assert!(prompt.contains("statistics"));
        assert!(prompt.contains("ONLY the summarized text"));
        assert!(!prompt.contains("extremely concise"));
    }

    #[test]
    fn test_extreme_compression_uses_aggressive_prompt() {
        let prompt = chunk_prompt(&"x".repeat(10_000), 500);
        assert!(prompt.contains("extremely concise"));
    }

    #[test]
    fn test_strict_prompt_leaves_margin() {
        assert!(strict_prompt("text", 2000).contains("AT MOST 1900 characters"));
    }

    #[tokio::test]
    async fn test_forwards_model_and_trims_reply() -> Result<()> {
        let llm = Arc::new(RecordingLLM {
            reply: "  short summary \n".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let summarizer = ChunkSummarizer::new(llm.clone());

        let out = summarizer
            .summarize_chunk("a long chunk of text", 60, "llama3:8b", 0.0)
            .await?;

        assert_eq!(out, "short summary");
        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("a long chunk of text"));
        assert_eq!(seen[0].1, "llama3:8b");
        assert_eq!(seen[0].2, 0.0);
        Ok(())
    }
}
