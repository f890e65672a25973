use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use neumann_core::tool::{Error as ToolError, Parameters, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::select;
use tokio::time::timeout;

/// Receives each line of shell output as soon as it is read.
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

/// The time budget of one command.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize, JsonSchema)]
pub struct BashInput {
    cmd: String,
}

/// A tool for running shell commands.
///
/// Every call needs the operator's approval. Output lines are forwarded to
/// the sink while the command runs, and the command is killed once it runs
/// past its time budget, keeping what it printed so far.
pub struct BashTool {
    parameters: Parameters,
    sink: Option<OutputSink>,
    timeout: Duration,
}

impl BashTool {
    /// Creates a new bash tool.
    #[inline]
    pub fn new() -> Self {
        BashTool {
            parameters: Parameters::from_schema(
                &schema_for!(BashInput).to_value(),
            ),
            sink: None,
            timeout: COMMAND_TIMEOUT,
        }
    }

    /// Sets the sink that receives output lines as they arrive.
    #[inline]
    pub fn with_output_sink(mut self, sink: OutputSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the time budget of one command.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for BashTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for BashTool {
    type Input = BashInput;

    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Run shell command"
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn confirm(&self) -> bool {
        true
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: BashInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let sink = self.sink.clone();
        let budget = self.timeout;
        async move {
            let output = run_command(&input.cmd, budget, sink).await?;
            let output = output.trim();
            Ok(if output.is_empty() {
                "(empty)".to_owned()
            } else {
                output.to_owned()
            })
        }
    }
}

async fn run_command(
    cmd: &str,
    budget: Duration,
    sink: Option<OutputSink>,
) -> Result<String, ToolError> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take())
    else {
        return Err(ToolError::execution_error()
            .with_reason("failed to capture command output"));
    };

    let mut output = String::new();
    // One deadline covers reading the pipes and waiting for the exit, since
    // a command may close its pipes and keep running.
    let run = async {
        let mut stdout = BufReader::new(stdout);
        let mut stderr = BufReader::new(stderr);
        let (mut stdout_buf, mut stderr_buf) = (Vec::new(), Vec::new());
        let (mut stdout_open, mut stderr_open) = (true, true);
        while stdout_open || stderr_open {
            let (read, from_stdout) = select! {
                read = stdout.read_until(b'\n', &mut stdout_buf), if stdout_open => {
                    (read, true)
                }
                read = stderr.read_until(b'\n', &mut stderr_buf), if stderr_open => {
                    (read, false)
                }
            };
            let (buf, open) = if from_stdout {
                (&mut stdout_buf, &mut stdout_open)
            } else {
                (&mut stderr_buf, &mut stderr_open)
            };
            match read {
                Ok(0) => *open = false,
                Ok(_) => {
                    let line = take_line(buf);
                    if let Some(sink) = &sink {
                        sink(&line);
                    }
                    output.push_str(&line);
                    output.push('\n');
                }
                Err(err) => {
                    debug!("stopped reading command output: {err}");
                    *open = false;
                }
            }
        }
        child.wait().await
    };

    let finished = timeout(budget, run).await;
    match finished {
        Ok(status) => {
            let status = status?;
            trace!("command exited with {status}");
        }
        Err(_) => {
            warn!("command timed out, killing it");
            // The child is killed on drop even if this fails.
            let _ = child.kill().await;
            output.push_str(&format!("\n(timed out after {}s)", budget.as_secs()));
        }
    }
    Ok(output)
}

/// Decodes one raw output line, dropping its line ending.
fn take_line(buf: &mut Vec<u8>) -> String {
    let mut end = buf.len();
    if buf[..end].ends_with(b"\n") {
        end -= 1;
    }
    if buf[..end].ends_with(b"\r") {
        end -= 1;
    }
    let line = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.clear();
    line
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn recording_tool() -> (BashTool, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(vec![]));
        let sink = lines.clone();
        let tool = BashTool::new().with_output_sink(Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_owned());
        }));
        (tool, lines)
    }

    fn input(cmd: &str) -> BashInput {
        BashInput {
            cmd: cmd.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_output() {
        let (tool, lines) = recording_tool();
        assert!(tool.confirm());

        let result = tool.execute(input("echo one; echo two >&2")).await;
        let result = result.unwrap();
        assert!(result.contains("one"), "{result}");
        assert!(result.contains("two"), "{result}");
        let mut seen = lines.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, ["one", "two"]);

        let result = tool.execute(input("true")).await;
        assert_eq!(result, Ok("(empty)".to_owned()));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_keeps_reading() {
        let (tool, lines) = recording_tool();
        let result = tool
            .execute(input("echo before; printf '\\377\\n'; echo after"))
            .await;
        assert_eq!(result, Ok("before\n\u{fffd}\nafter".to_owned()));
        assert_eq!(*lines.lock().unwrap(), ["before", "\u{fffd}", "after"]);
    }

    #[tokio::test]
    async fn test_timeout_after_pipes_close() {
        let tool = BashTool::new().with_timeout(Duration::from_secs(1));
        let started = std::time::Instant::now();
        let result = tool
            .execute(input("echo hi; exec >/dev/null 2>&1; sleep 10"))
            .await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(result, Ok("hi\n\n(timed out after 1s)".to_owned()));
    }

    #[test]
    fn test_take_line() {
        let mut buf = b"a\r\n".to_vec();
        assert_eq!(take_line(&mut buf), "a");
        assert!(buf.is_empty());
        let mut buf = b"tail".to_vec();
        assert_eq!(take_line(&mut buf), "tail");
    }

    #[tokio::test]
    async fn test_timeout_keeps_output() {
        let tool = BashTool::new().with_timeout(Duration::from_secs(1));
        let result = tool.execute(input("echo started; sleep 10")).await;
        assert_eq!(result, Ok("started\n\n(timed out after 1s)".to_owned()));
    }
}
