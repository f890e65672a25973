use std::fmt::Write as _;
use std::fs;

use neumann_core::tool::{Error as ToolError, Parameters, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use tokio::task::spawn_blocking;

use super::lenient;

#[derive(Deserialize, JsonSchema)]
pub struct ReadInput {
    path: String,
    #[serde(default, deserialize_with = "lenient::number")]
    #[schemars(with = "Option<u64>")]
    offset: Option<usize>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[schemars(with = "Option<u64>")]
    limit: Option<usize>,
}

/// A tool for reading file content with line numbers.
pub struct ReadTool {
    parameters: Parameters,
}

impl ReadTool {
    /// Creates a new read tool.
    #[inline]
    pub fn new() -> Self {
        ReadTool {
            parameters: Parameters::from_schema(
                &schema_for!(ReadInput).to_value(),
            ),
        }
    }
}

impl Default for ReadTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ReadTool {
    type Input = ReadInput;

    fn name(&self) -> &str {
        "read"
    }

    fn description(&self) -> &str {
        "Read file with line numbers (file path, not directory)"
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ReadInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move {
            spawn_blocking(move || -> ToolResult {
                let text = fs::read_to_string(&input.path)?;
                Ok(number_lines(
                    &text,
                    input.offset.unwrap_or(0),
                    input.limit,
                ))
            })
            .await
            .map_err(|_| {
                ToolError::execution_error().with_reason("Failed to read file")
            })?
        }
    }
}

/// Renders lines `offset..offset + limit` as `{n:>4}| {line}`, keeping the
/// line endings.
fn number_lines(text: &str, offset: usize, limit: Option<usize>) -> String {
    let mut result = String::new();
    let lines = text.split_inclusive('\n').skip(offset);
    for (idx, line) in lines.take(limit.unwrap_or(usize::MAX)).enumerate() {
        let _ = write!(result, "{:>4}| {line}", offset + idx + 1);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_lines() {
        let text = "first\nsecond\nthird";
        assert_eq!(
            number_lines(text, 0, None),
            "   1| first\n   2| second\n   3| third"
        );
        assert_eq!(number_lines(text, 1, Some(1)), "   2| second\n");
        assert_eq!(number_lines(text, 5, None), "");
    }

    #[test]
    fn test_parameters() {
        assert_eq!(
            ReadTool::new().parameters().to_string(),
            "path: string, offset: number?, limit: number?"
        );
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "a\r\nb\nc\n").unwrap();

        let tool = ReadTool::new();
        let result = tool
            .execute(ReadInput {
                path: path.display().to_string(),
                offset: Some(1),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(result, "   2| b\n   3| c\n");

        let result = tool
            .execute(ReadInput {
                path: path.display().to_string(),
                offset: None,
                limit: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(result, "   1| a\r\n");

        let result = tool
            .execute(ReadInput {
                path: dir.path().join("missing").display().to_string(),
                offset: None,
                limit: None,
            })
            .await;
        assert!(result.is_err());
    }
}
