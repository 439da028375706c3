use crate::Result;
use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde::Serialize;

mod reduce_text;
pub use reduce_text::{ReduceTextArgs, ReduceTextTool};

/// Name, description and JSON schema of a capability's arguments. Enough for
/// any orchestration layer to register the capability in its own format.
#[derive(Clone, Debug, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub desc: String,
    pub params: serde_json::Value,
}

impl ToolDefinition {
    pub fn new<P: JsonSchema>(name: &str, desc: &str) -> Result<Self> {
        let schema = schema_for!(P);
        let params = serde_json::to_value(&schema.schema)?;
        Ok(Self {
            name: name.to_string(),
            desc: desc.to_string(),
            params,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: String,
}

impl ToolCall {
    pub fn args<O: for<'de> serde::Deserialize<'de>>(&self) -> Result<O> {
        let args = serde_json::from_str(&self.args)?;
        Ok(args)
    }
}

/// A capability bound to a plain signature: JSON arguments in, text out.
#[async_trait]
pub trait Tool {
    fn definition(&self) -> Result<ToolDefinition>;

    async fn invoke(&self, call: &ToolCall) -> Result<String>;
}
