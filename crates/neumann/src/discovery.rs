//! Loading of external tools described in TOML files.
//!
//! Every `*.toml` file in the tool directory whose name does not start with
//! `_` is read in file-name order. Each top-level table is a candidate:
//!
//! ```toml
//! [word_count]
//! name = "wc"
//! description = "Count lines of a file"
//! parameters = { path = "string" }
//! run = "wc -l \"$NEU_ARG_PATH\""
//! confirm = false
//! ```
//!
//! The command runs through `sh -c`. It receives the arguments as a JSON
//! object on stdin and as `NEU_ARG_<KEY>` environment variables.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use neumann_core::tool::{Error as ToolError, Parameters, Tool, ToolResult};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use toml::Table;

const REQUIRED_KEYS: [&str; 4] = ["name", "description", "parameters", "run"];

/// A problem found while loading the tool directory.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The tool directory does not exist.
    #[error("Tool directory '{}' not found.", .0.display())]
    MissingDirectory(PathBuf),
    /// The tool directory could not be listed.
    #[error("Failed to list tool directory '{}': {source}", .path.display())]
    ListDirectory {
        /// The tool directory.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// A tool file could not be read.
    #[error("Error loading tool file {}: {source}", .path.display())]
    Read {
        /// The tool file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// A tool file is not valid TOML.
    #[error("Error loading tool file {}: {source}", .path.display())]
    Parse {
        /// The tool file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: toml::de::Error,
    },
    /// A table looks like a tool but lacks some keys.
    #[error(
        "Skipped potential tool '{table}' in {}. Missing keys: {}",
        .path.display(),
        .missing.join(", ")
    )]
    Incomplete {
        /// The tool file.
        path: PathBuf,
        /// Name of the table.
        table: String,
        /// The required keys that are absent.
        missing: Vec<&'static str>,
    },
    /// A table looks like a tool but a key holds the wrong kind of value.
    #[error(
        "Skipped potential tool '{table}' in {}. Key '{key}' must be {expected}",
        .path.display()
    )]
    InvalidKey {
        /// The tool file.
        path: PathBuf,
        /// Name of the table.
        table: String,
        /// The offending key.
        key: &'static str,
        /// What the key should hold.
        expected: &'static str,
    },
    /// A tool file declares no usable tool.
    #[error(
        "Loaded {} but found no valid tools (tables with name, description, parameters, run).",
        .0.display()
    )]
    NoTools(PathBuf),
}

impl DiscoveryError {
    /// Returns `true` for problems that are worth a notice but do not
    /// indicate a broken file.
    #[inline]
    pub fn is_notice(&self) -> bool {
        matches!(self, DiscoveryError::NoTools(_))
    }
}

/// The outcome of loading a tool directory.
#[derive(Debug, Default)]
pub struct Discovery {
    tools: Vec<ExternalTool>,
    problems: Vec<DiscoveryError>,
}

impl Discovery {
    /// Returns the loaded tools in file and declaration order.
    #[inline]
    pub fn tools(&self) -> &[ExternalTool] {
        &self.tools
    }

    /// Returns the problems met while loading, in the order met.
    #[inline]
    pub fn problems(&self) -> &[DiscoveryError] {
        &self.problems
    }
}

/// Loads the tools declared in `dir`.
///
/// Problems never stop the loading; they are collected and logged.
pub fn discover(dir: &Path) -> Discovery {
    let mut discovery = Discovery::default();
    if !dir.is_dir() {
        discovery.report(DiscoveryError::MissingDirectory(dir.to_owned()));
        return discovery;
    }

    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_tool_file(path))
            .collect(),
        Err(source) => {
            discovery.report(DiscoveryError::ListDirectory {
                path: dir.to_owned(),
                source,
            });
            return discovery;
        }
    };
    files.sort();

    for path in files {
        discovery.load_file(path);
    }
    info!(
        "loaded {} external tools from {}",
        discovery.tools.len(),
        dir.display()
    );
    discovery
}

impl Discovery {
    fn load_file(&mut self, path: PathBuf) {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(source) => {
                self.report(DiscoveryError::Read { path, source });
                return;
            }
        };
        let table: Table = match toml::from_str(&text) {
            Ok(table) => table,
            Err(source) => {
                self.report(DiscoveryError::Parse { path, source });
                return;
            }
        };

        let mut found = 0;
        for (key, value) in &table {
            let Some(candidate) = value.as_table() else {
                continue;
            };
            match ExternalTool::from_table(candidate) {
                Ok(tool) => {
                    debug!("found tool {} in {}", tool.name, path.display());
                    self.tools.push(tool);
                    found += 1;
                }
                // Tables without `run` or `parameters` are not meant as tools.
                Err(Rejection::Missing(missing))
                    if candidate.contains_key("run")
                        || candidate.contains_key("parameters") =>
                {
                    self.report(DiscoveryError::Incomplete {
                        path: path.clone(),
                        table: key.clone(),
                        missing,
                    });
                }
                Err(Rejection::Missing(_)) => {}
                Err(Rejection::WrongType { key: bad_key, expected }) => {
                    self.report(DiscoveryError::InvalidKey {
                        path: path.clone(),
                        table: key.clone(),
                        key: bad_key,
                        expected,
                    });
                }
            }
        }
        if found == 0 {
            self.report(DiscoveryError::NoTools(path));
        }
    }

    fn report(&mut self, problem: DiscoveryError) {
        if problem.is_notice() {
            info!("{problem}");
        } else {
            warn!("{problem}");
        }
        self.problems.push(problem);
    }
}

fn is_tool_file(path: &Path) -> bool {
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let hidden = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('_'));
    is_toml && !hidden && path.is_file()
}

/// A tool backed by a shell command line.
#[derive(Clone, Debug)]
pub struct ExternalTool {
    name: String,
    description: String,
    parameters: Parameters,
    run: String,
    confirm: bool,
}

/// Why a table was not turned into a tool.
enum Rejection {
    Missing(Vec<&'static str>),
    WrongType {
        key: &'static str,
        expected: &'static str,
    },
}

impl ExternalTool {
    /// Builds a tool from its table.
    fn from_table(table: &Table) -> Result<Self, Rejection> {
        let missing: Vec<_> = REQUIRED_KEYS
            .into_iter()
            .filter(|key| !table.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(Rejection::Missing(missing));
        }

        let text = |key: &'static str| {
            table
                .get(key)
                .and_then(toml::Value::as_str)
                .map(ToOwned::to_owned)
                .ok_or(Rejection::WrongType {
                    key,
                    expected: "a string",
                })
        };
        let name = text("name")?;
        let description = text("description")?;
        let run = text("run")?;
        let parameters = table
            .get("parameters")
            .and_then(toml::Value::as_table)
            .ok_or(Rejection::WrongType {
                key: "parameters",
                expected: "a table",
            })?;
        let parameters = Parameters::new(parameters.iter().map(|(key, tag)| {
            (key.clone(), tag.as_str().unwrap_or("string").to_owned())
        }));
        let confirm = match table.get("confirm") {
            None => false,
            Some(value) => value.as_bool().ok_or(Rejection::WrongType {
                key: "confirm",
                expected: "a boolean",
            })?,
        };

        Ok(Self {
            name,
            description,
            parameters,
            run,
            confirm,
        })
    }

    /// Returns the command line the tool runs.
    #[inline]
    pub fn command(&self) -> &str {
        &self.run
    }
}

impl Tool for ExternalTool {
    type Input = Map<String, Value>;

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn confirm(&self) -> bool {
        self.confirm
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: Map<String, Value>,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let run = self.run.clone();
        async move { run_external(&run, input).await }
    }
}

async fn run_external(run: &str, input: Map<String, Value>) -> ToolResult {
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(run)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &input {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        command.env(format!("NEU_ARG_{}", key.to_uppercase()), value);
    }

    let mut child = command.spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        let payload = Value::Object(input).to_string();
        // Commands that ignore stdin may close it early.
        if let Err(err) = stdin.write_all(payload.as_bytes()).await {
            debug!("failed to pass arguments on stdin: {err}");
        }
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => format!("command exited with {}", output.status),
            stderr => stderr.to_owned(),
        };
        return Err(ToolError::execution_error().with_reason(reason));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(match stdout.trim() {
        "" => "(empty)".to_owned(),
        stdout => stdout.to_owned(),
    })
}
