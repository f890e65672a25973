use std::fs;
use std::path::Path;

use neumann_core::tool::{Error as ToolError, Parameters, Tool, ToolResult};
use regex::Regex;
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use tokio::task::spawn_blocking;
use walkdir::{DirEntry, WalkDir};

const MAX_HITS: usize = 50;

#[derive(Deserialize, JsonSchema)]
pub struct GrepInput {
    pat: String,
    path: Option<String>,
}

/// A tool for searching file contents with a regular expression.
pub struct GrepTool {
    parameters: Parameters,
}

impl GrepTool {
    /// Creates a new grep tool.
    #[inline]
    pub fn new() -> Self {
        GrepTool {
            parameters: Parameters::from_schema(
                &schema_for!(GrepInput).to_value(),
            ),
        }
    }
}

impl Default for GrepTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for GrepTool {
    type Input = GrepInput;

    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search files for regex pattern"
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: GrepInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move {
            let pattern = Regex::new(&input.pat).map_err(|err| {
                ToolError::invalid_input().with_reason(err.to_string())
            })?;
            let root = input.path.unwrap_or_else(|| ".".to_owned());

            spawn_blocking(move || {
                let hits = search(&pattern, Path::new(&root));
                if hits.is_empty() {
                    "none".to_owned()
                } else {
                    hits.join("\n")
                }
            })
            .await
            .map_err(|_| {
                ToolError::execution_error().with_reason("Failed to search files")
            })
        }
    }
}

fn search(pattern: &Regex, root: &Path) -> Vec<String> {
    let files = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file());

    let mut hits = vec![];
    for entry in files {
        // Unreadable and non-text files are skipped.
        let Ok(text) = fs::read_to_string(entry.path()) else {
            continue;
        };
        for (idx, line) in text.lines().enumerate() {
            if !pattern.is_match(line) {
                continue;
            }
            hits.push(format!(
                "{}:{}:{}",
                entry.path().display(),
                idx + 1,
                line.trim_end()
            ));
            if hits.len() == MAX_HITS {
                return hits;
            }
        }
    }
    hits
}

#[inline]
fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
