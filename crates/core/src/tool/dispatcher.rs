use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use neumann_model::ToolCall;
use serde_json::{Map, Value};
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::Instrument;

use super::{Approval, ApprovalHandler, Error, ToolRegistry};

/// The time budget of one call when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Why a call did not produce a result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// No tool with this name is registered.
    NotFound(String),
    /// The argument string is not a JSON object.
    InvalidArguments {
        /// Name of the requested tool.
        tool: String,
        /// What is wrong with the arguments.
        reason: String,
    },
    /// The operator rejected the call, with an optional reason.
    Denied(Option<String>),
    /// The call exceeded its time budget and was aborted.
    TimedOut(Duration),
    /// The tool failed.
    Tool(Error),
    /// The tool panicked.
    Panicked(String),
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotFound(name) => {
                write!(f, "Tool '{name}' not found.")
            }
            DispatchError::InvalidArguments { tool, reason } => {
                write!(f, "invalid arguments for {tool}: {reason}")
            }
            DispatchError::Denied(why) => {
                f.write_str("User denied execution permission.")?;
                if let Some(why) = why {
                    write!(f, " Reason: {why}")?;
                }
                Ok(())
            }
            DispatchError::TimedOut(budget) => {
                write!(f, "timed out after {}s", budget.as_secs())
            }
            DispatchError::Tool(err) => write!(f, "{}", err.reason()),
            DispatchError::Panicked(message) => f.write_str(message),
        }
    }
}

impl StdError for DispatchError {}

/// The outcome of dispatching one call.
pub type DispatchResult = Result<String, DispatchError>;

/// Renders an outcome as the content of a tool message.
///
/// Failures become `error: <message>`.
pub fn render_result(result: &DispatchResult) -> String {
    match result {
        Ok(content) => content.clone(),
        Err(err) => format!("error: {err}"),
    }
}

/// Runs tool calls against a registry.
///
/// Each call goes through lookup, argument parsing, the optional approval
/// and finally a time-bounded execution in its own task.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    approval_handler: Option<Arc<dyn ApprovalHandler>>,
    timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher with the default time budget.
    ///
    /// Without an approval handler every call is approved.
    #[inline]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            approval_handler: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the handler asked before running tools that need approval.
    #[inline]
    pub fn with_approval_handler(
        mut self,
        handler: Arc<dyn ApprovalHandler>,
    ) -> Self {
        self.approval_handler = Some(handler);
        self
    }

    /// Sets the time budget of one call.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the registry calls are looked up in.
    #[inline]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Dispatches one call.
    pub async fn dispatch(&self, call: &ToolCall) -> DispatchResult {
        let span = debug_span!("tool dispatch", tool = %call.name, id = %call.id);
        self.dispatch_inner(call).instrument(span).await
    }

    async fn dispatch_inner(&self, call: &ToolCall) -> DispatchResult {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!("tool not found: {}", call.name);
            return Err(DispatchError::NotFound(call.name.clone()));
        };

        let arguments = parse_arguments(&call.arguments).map_err(|reason| {
            DispatchError::InvalidArguments {
                tool: call.name.clone(),
                reason,
            }
        })?;

        if tool.confirm() {
            let result = match &self.approval_handler {
                Some(handler) => {
                    handler.request(&Approval::new(&call.name, &arguments)).await
                }
                None => super::ApprovalResult::approve(),
            };
            trace!("tool call approval result: {result:?}");
            if !result.approved {
                return Err(DispatchError::Denied(result.why));
            }
        }

        trace!("spawning a tool with args: {arguments:?}");
        let mut handle = tokio::spawn(tool.call(Value::Object(arguments)));
        match timeout(self.timeout, &mut handle).await {
            Ok(Ok(result)) => result.map_err(|err| {
                warn!("tool {} failed: {}", call.name, err.reason());
                DispatchError::Tool(err)
            }),
            Ok(Err(err)) => Err(join_error(err)),
            Err(_) => {
                // Dropping the task kills any child process it owns.
                handle.abort();
                warn!("tool {} timed out", call.name);
                Err(DispatchError::TimedOut(self.timeout))
            }
        }
    }
}

/// Parses an argument string, an empty string being an empty object.
fn parse_arguments(arguments: &str) -> Result<Map<String, Value>, String> {
    if arguments.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(arguments) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(err) => Err(err.to_string()),
    }
}

fn join_error(err: JoinError) -> DispatchError {
    if !err.is_panic() {
        return DispatchError::Panicked("tool task was cancelled".to_owned());
    }
    let payload = err.into_panic();
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_owned()
    };
    DispatchError::Panicked(message)
}
