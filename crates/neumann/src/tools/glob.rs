use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glob::MatchOptions;
use neumann_core::tool::{Error as ToolError, Parameters, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use tokio::task::spawn_blocking;

#[derive(Deserialize, JsonSchema)]
pub struct GlobInput {
    pat: String,
    path: Option<String>,
}

/// A tool for finding files using glob patterns.
pub struct GlobTool {
    parameters: Parameters,
}

impl GlobTool {
    /// Creates a new glob tool.
    #[inline]
    pub fn new() -> Self {
        GlobTool {
            parameters: Parameters::from_schema(
                &schema_for!(GlobInput).to_value(),
            ),
        }
    }
}

impl Default for GlobTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for GlobTool {
    type Input = GlobInput;

    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find files by pattern, sorted by mtime"
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: GlobInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move {
            let base = input.path.as_deref().unwrap_or(".");
            let pattern = format!("{base}/{}", input.pat).replace("//", "/");
            let options = MatchOptions {
                require_literal_leading_dot: true,
                ..Default::default()
            };
            let paths = glob::glob_with(&pattern, options).map_err(|err| {
                ToolError::invalid_input().with_reason(err.to_string())
            })?;

            spawn_blocking(move || {
                let mut found: Vec<(SystemTime, PathBuf)> = paths
                    .flatten()
                    .map(|path| (modified(&path), path))
                    .collect();
                found.sort_by(|a, b| b.0.cmp(&a.0));
                let listing: Vec<_> = found
                    .iter()
                    .map(|(_, path)| path.display().to_string())
                    .collect();
                if listing.is_empty() {
                    "none".to_owned()
                } else {
                    listing.join("\n")
                }
            })
            .await
            .map_err(|_| {
                ToolError::execution_error().with_reason("Failed to execute glob")
            })
        }
    }
}

/// Directories and unreadable entries sort as the oldest.
fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .ok()
        .filter(|meta| meta.is_file())
        .and_then(|meta| meta.modified().ok())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_glob() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        let now = SystemTime::now();
        for (name, age) in [("src/old.rs", 60), ("src/nested/new.rs", 1)] {
            let file = File::create(root.join(name)).unwrap();
            file.set_modified(now - Duration::from_secs(age)).unwrap();
        }

        let tool = GlobTool::new();
        let base = format!("{}/", root.display());
        let result = tool
            .execute(GlobInput {
                pat: "**/*.rs".to_owned(),
                path: Some(base.clone()),
            })
            .await
            .unwrap();
        assert_eq!(
            result,
            format!(
                "{0}/src/nested/new.rs\n{0}/src/old.rs",
                root.display()
            )
        );

        let result = tool
            .execute(GlobInput {
                pat: "*.md".to_owned(),
                path: Some(base),
            })
            .await
            .unwrap();
        assert_eq!(result, "none");
    }

    #[tokio::test]
    async fn test_bad_pattern() {
        let result = GlobTool::new()
            .execute(GlobInput {
                pat: "***".to_owned(),
                path: None,
            })
            .await;
        assert!(result.is_err());
    }
}
