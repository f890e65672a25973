use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use neumann_core::tool::{ApprovalHandler, ToolRegistry};
use neumann_core::{Agent, AgentBuilder, AgentEvent, TurnError};
use neumann_model::ModelProvider;

use crate::discovery::{Discovery, discover};
use crate::tools::*;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    tool_dir: Option<PathBuf>,
    shell_output: Option<OutputSink>,
    shell_timeout: Duration,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            tool_dir: None,
            shell_output: None,
            shell_timeout: COMMAND_TIMEOUT,
        }
    }

    /// Replaces the generated system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Loads additional tools from a directory of TOML files.
    #[inline]
    pub fn with_tool_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.tool_dir = Some(dir.into());
        self
    }

    /// Sets the time budget of one tool call.
    #[inline]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.agent_builder = self.agent_builder.with_tool_timeout(timeout);
        self
    }

    /// Sets the time budget of one shell command.
    #[inline]
    pub fn with_shell_timeout(mut self, timeout: Duration) -> Self {
        self.shell_timeout = timeout;
        self
    }

    /// Advertises the tools through the native tool-calling interface too.
    #[inline]
    pub fn with_native_tools(mut self, native_tools: bool) -> Self {
        self.agent_builder = self.agent_builder.with_native_tools(native_tools);
        self
    }

    /// Sets the handler asked before running tools that need approval.
    #[inline]
    pub fn with_approval_handler<H: ApprovalHandler + 'static>(
        mut self,
        handler: H,
    ) -> Self {
        self.agent_builder = self.agent_builder.with_approval_handler(handler);
        self
    }

    /// Attaches a callback that receives shell output lines as they arrive.
    #[inline]
    pub fn on_shell_output(
        mut self,
        on_output: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.shell_output = Some(Arc::new(on_output));
        self
    }

    /// Attaches a callback that observes the progress of every turn.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(AgentEvent) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_event(on_event);
        self
    }

    /// Builds a new session.
    ///
    /// External tools are loaded here and override built-in tools of the
    /// same name.
    pub fn build(self) -> Session {
        let mut bash = BashTool::new().with_timeout(self.shell_timeout);
        if let Some(sink) = self.shell_output {
            bash = bash.with_output_sink(sink);
        }

        let mut registry = ToolRegistry::new();
        registry.register(ReadTool::new());
        registry.register(WriteTool::new());
        registry.register(EditTool::new());
        registry.register(GlobTool::new());
        registry.register(GrepTool::new());
        registry.register(bash);

        let discovery = self.tool_dir.map(|dir| {
            let discovery = discover(&dir);
            for tool in discovery.tools() {
                registry.register(tool.clone());
            }
            discovery
        });

        let agent = self.agent_builder.with_registry(registry).build();
        Session { agent, discovery }
    }
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session holds a fully configured agent that you can use directly, and it
/// is basically a wrapper around [`Agent`].
pub struct Session {
    agent: Agent,
    discovery: Option<Discovery>,
}

impl Session {
    /// Sends a message and runs the turn to completion.
    #[inline]
    pub async fn send_message(&mut self, message: &str) -> Result<(), TurnError> {
        self.agent.send_message(message).await
    }

    /// Clears the conversation.
    #[inline]
    pub fn reset(&mut self) {
        self.agent.reset();
    }

    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Returns what happened while loading the tool directory, if one was
    /// configured.
    #[inline]
    pub fn discovery(&self) -> Option<&Discovery> {
        self.discovery.as_ref()
    }
}
