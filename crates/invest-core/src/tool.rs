//! Tool trait definition

use crate::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

/// A data-gathering function an agent can call.
///
/// Tools receive a JSON record matching [`Tool::input_schema`] and answer with
/// a JSON value. The report tools answer with a single string holding the
/// textual rendering of their result, which downstream agents treat as
/// opaque context.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with the given parameters
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Unique name within a [`crate::ToolRegistry`]
    fn name(&self) -> &str;

    /// Human-readable description shown to the calling agent
    fn description(&self) -> &str;

    /// JSON Schema describing the expected input record
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::json;
    ///
    /// let schema = json!({
    ///     "type": "object",
    ///     "properties": {
    ///         "ticker": { "type": "string" }
    ///     },
    ///     "required": ["ticker"]
    /// });
    /// assert_eq!(schema["required"][0], "ticker");
    /// ```
    fn input_schema(&self) -> Value;

    /// Definition record (name, description, schema) handed to an LLM
    fn definition(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "input_schema": self.input_schema(),
        })
    }
}
