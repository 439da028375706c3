use crate::sources::Document;
use reducer::callbacks::EventLogger;
use reducer::llm::{self, CompletionRequest, Message};
use reducer::{ReducerBuilder, ReducerConfig, ReductionResult, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

const ANSWER_PROMPT: &str = include_str!("prompts/answer.md");
const FINAL_ANSWER_MARKER: &str = "FINAL ANSWER:";

#[derive(Serialize)]
pub struct Answer {
    pub question: String,
    pub final_answer: String,
    pub raw_answer: String,
    pub context: ReductionResult,
}

/// Reduces loaded documents into a context and answers questions over it.
pub struct Orchestrator {
    reducer: reducer::Reducer,
    llm: Arc<dyn llm::LLM + Send + Sync>,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn llm::LLM + Send + Sync>,
        config: ReducerConfig,
        trace: Option<&Path>,
    ) -> Result<Self> {
        let mut builder = ReducerBuilder::new().llm(llm.clone()).config(config);

        if let Some(path) = trace {
            let file = std::fs::File::create(path)?;
            builder = builder.callback(EventLogger::new("reduction trace", file)?);
        }

        Ok(Self {
            reducer: builder.build()?,
            llm,
        })
    }

    pub async fn reduce(&self, documents: &[Document]) -> Result<ReductionResult> {
        let texts = documents.iter().map(Document::labeled).collect();
        self.reducer.reduce(self.reducer.request(texts)).await
    }

    pub async fn answer(
        &self,
        question: &str,
        documents: &[Document],
        answer_model: Option<&str>,
    ) -> Result<Answer> {
        let context = self.reduce(documents).await?;
        if context.is_degraded() {
            tracing::warn!(
                truncated = context.truncated,
                fallbacks = context.fallbacks,
                "answering from a degraded context"
            );
        }

        let config = self.reducer.config();
        let model = answer_model.unwrap_or(&config.model);
        let messages = [Message::User(answer_prompt(question, &context.text))];

        tracing::info!(model, context_chars = context.output_chars, "generating answer");
        let response = self
            .llm
            .completion(CompletionRequest {
                messages: &messages,
                model,
                temperature: config.temperature,
            })
            .await?;

        Ok(Answer {
            question: question.to_string(),
            final_answer: final_answer(&response.content),
            raw_answer: response.content,
            context,
        })
    }
}

fn answer_prompt(question: &str, context: &str) -> String {
    let context = if context.trim().is_empty() {
        "(no documents provided)"
    } else {
        context
    };
    ANSWER_PROMPT
        .replace("{question}", question)
        .replace("{context}", context)
}

/// Pulls the short answer out of a model response: drops any `<think>` block
/// and returns the text after the last `FINAL ANSWER:` marker, or the whole
/// trimmed response when there is none.
pub fn final_answer(raw: &str) -> String {
    let visible = match raw.rfind("</think>") {
        Some(end) => &raw[end + "</think>".len()..],
        None => raw,
    };

    match visible.rfind(FINAL_ANSWER_MARKER) {
        Some(start) => visible[start + FINAL_ANSWER_MARKER.len()..]
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string(),
        None => visible.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reducer::llm::{CompletionResponse, LLM};
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct ScriptedLLM {
        prompts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl LLM for ScriptedLLM {
        async fn completion<'a>(
            &self,
            request: CompletionRequest<'a>,
        ) -> Result<CompletionResponse> {
            let prompt = request.messages[0].content().to_string();
            self.prompts
                .lock()
                .unwrap()
                .push((request.model.to_string(), prompt));
            Ok(CompletionResponse {
                content: "<think>Mercury, Venus...</think>\nTwo planets.\nFINAL ANSWER: 2".to_string(),
            })
        }
    }

    fn doc(name: &str, text: &str) -> Document {
        Document {
            path: PathBuf::from(name),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_final_answer_extraction() {
        assert_eq!(final_answer("reasoning\nFINAL ANSWER: 42\n"), "42");
        assert_eq!(final_answer("FINAL ANSWER:\n  Paris "), "Paris");
        assert_eq!(final_answer("  just text  "), "just text");
        assert_eq!(
            final_answer("<think>FINAL ANSWER: wrong</think> FINAL ANSWER: right"),
            "right"
        );
    }

    #[test]
    fn test_answer_prompt_fills_placeholders() {
        let prompt = answer_prompt("How many moons?", "");
        assert!(prompt.contains("## QUESTION\nHow many moons?"));
        assert!(prompt.contains("(no documents provided)"));
        assert!(!prompt.contains("{context}"));
    }

    #[tokio::test]
    async fn test_answer_uses_reduced_context() -> Result<()> {
        let llm = Arc::new(ScriptedLLM {
            prompts: Mutex::new(Vec::new()),
        });
        let orchestrator = Orchestrator::new(llm.clone(), ReducerConfig::default(), None)?;

        let docs = [
            doc("a.txt", "Mercury has no moons."),
            doc("b.txt", "Venus has no moons."),
        ];
        let answer = orchestrator
            .answer("How many planets have no moons?", &docs, Some("deepseek-r1:32b"))
            .await?;

        assert_eq!(answer.final_answer, "2");
        assert!(answer.context.rounds.is_empty());
        assert_eq!(
            answer.context.text,
            "From a.txt:\nMercury has no moons.\n\n---\n\nFrom b.txt:\nVenus has no moons."
        );

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, "deepseek-r1:32b");
        assert!(prompts[0].1.contains("Venus has no moons."));
        Ok(())
    }

    #[tokio::test]
    async fn test_trace_file_records_rounds() -> Result<()> {
        let llm = Arc::new(ScriptedLLM {
            prompts: Mutex::new(Vec::new()),
        });
        let trace = std::env::temp_dir().join(format!("research-trace-{}.md", std::process::id()));
        let config = ReducerConfig {
            max_output_size: 100,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(llm, config, Some(&trace))?;

        let result = orchestrator
            .reduce(&[doc("long.txt", &"fact ".repeat(200))])
            .await?;
        assert!(result.output_chars <= 100);

        let written = std::fs::read_to_string(&trace)?;
        assert!(written.starts_with("## reduction trace\n\n### Round 1\n"));
        Ok(())
    }
}
