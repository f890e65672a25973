use std::fs;

use neumann_core::tool::{Error as ToolError, Parameters, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use tokio::task::spawn_blocking;

use super::lenient;

#[derive(Deserialize, JsonSchema)]
pub struct EditInput {
    path: String,
    old: String,
    new: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    #[schemars(with = "Option<bool>")]
    all: Option<bool>,
}

/// A tool for replacing text in a file.
pub struct EditTool {
    parameters: Parameters,
}

impl EditTool {
    /// Creates a new edit tool.
    #[inline]
    pub fn new() -> Self {
        EditTool {
            parameters: Parameters::from_schema(
                &schema_for!(EditInput).to_value(),
            ),
        }
    }
}

impl Default for EditTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for EditTool {
    type Input = EditInput;

    fn name(&self) -> &str {
        "edit"
    }

    fn description(&self) -> &str {
        "Replace old with new in file (old must be unique unless all=true)"
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: EditInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move {
            spawn_blocking(move || -> ToolResult {
                let text = fs::read_to_string(&input.path)?;
                let replaced = replace(
                    &text,
                    &input.old,
                    &input.new,
                    input.all.unwrap_or(false),
                )?;
                fs::write(&input.path, replaced)?;
                Ok("ok".to_owned())
            })
            .await
            .map_err(|_| {
                ToolError::execution_error().with_reason("Failed to edit file")
            })?
        }
    }
}

fn replace(
    text: &str,
    old: &str,
    new: &str,
    all: bool,
) -> Result<String, ToolError> {
    let count = if old.is_empty() {
        0
    } else {
        text.matches(old).count()
    };
    if count == 0 {
        return Err(
            ToolError::execution_error().with_reason("old_string not found")
        );
    }
    if count > 1 && !all {
        return Err(ToolError::execution_error().with_reason(format!(
            "old_string appears {count} times, must be unique (use all=true)"
        )));
    }
    Ok(if all {
        text.replace(old, new)
    } else {
        text.replacen(old, new, 1)
    })
}
