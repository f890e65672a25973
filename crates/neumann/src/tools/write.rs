use std::fs;

use neumann_core::tool::{Error as ToolError, Parameters, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use tokio::task::spawn_blocking;

#[derive(Deserialize, JsonSchema)]
pub struct WriteInput {
    path: String,
    content: String,
}

/// A tool for creating or overwriting a file.
pub struct WriteTool {
    parameters: Parameters,
}

impl WriteTool {
    /// Creates a new write tool.
    #[inline]
    pub fn new() -> Self {
        WriteTool {
            parameters: Parameters::from_schema(
                &schema_for!(WriteInput).to_value(),
            ),
        }
    }
}

impl Default for WriteTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for WriteTool {
    type Input = WriteInput;

    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Write content to file"
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: WriteInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move {
            spawn_blocking(move || -> ToolResult {
                fs::write(&input.path, input.content)?;
                Ok("ok".to_owned())
            })
            .await
            .map_err(|_| {
                ToolError::execution_error().with_reason("Failed to write file")
            })?
        }
    }
}
