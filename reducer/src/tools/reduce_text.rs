use crate::tools::{Tool, ToolCall, ToolDefinition};
use crate::{Reducer, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize, JsonSchema)]
pub struct ReduceTextArgs {
    /// Texts to condense, in order.
    pub texts: Vec<String>,
    /// Maximum characters in the result; defaults to the reducer's configuration.
    pub max_output_size: Option<usize>,
    /// Maximum characters per summarization call.
    pub chunk_size: Option<usize>,
}

pub struct ReduceTextTool {
    reducer: Arc<Reducer>,
}

impl ReduceTextTool {
    pub fn new(reducer: Arc<Reducer>) -> Box<Self> {
        Box::new(Self { reducer })
    }
}

#[async_trait]
impl Tool for ReduceTextTool {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<ReduceTextArgs>(
            "reduce_text",
            "condense a list of documents into a single text under a character budget, \
             preserving numbers, figures and conclusions",
        )
    }

    async fn invoke(&self, call: &ToolCall) -> Result<String> {
        let args: ReduceTextArgs = call.args()?;
        let mut request = self.reducer.request(args.texts);
        if let Some(max) = args.max_output_size {
            request.max_output_size = max;
        }
        if let Some(chunk_size) = args.chunk_size {
            request.chunk_size = chunk_size;
        }

        let result = self.reducer.reduce(request).await?;
        if result.is_degraded() {
            tracing::info!(
                truncated = result.truncated,
                fallbacks = result.fallbacks,
                "reduce_text returned a degraded result"
            );
        }
        Ok(result.text)
    }
}
