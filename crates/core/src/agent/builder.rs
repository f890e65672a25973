use std::env;
use std::sync::Arc;
use std::time::Duration;

use neumann_model::ModelProvider;

use super::{Agent, AgentEvent, EventHandler};
use crate::conversation::Conversation;
use crate::model_client::ModelClient;
use crate::prompt::system_prompt;
use crate::tool::{
    ApprovalHandler, DEFAULT_TIMEOUT, Dispatcher, Tool, ToolRegistry,
};

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    registry: ToolRegistry,
    system_prompt: Option<String>,
    approval_handler: Option<Arc<dyn ApprovalHandler>>,
    tool_timeout: Duration,
    native_tools: bool,
    on_event: Option<EventHandler>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            registry: ToolRegistry::new(),
            system_prompt: None,
            approval_handler: None,
            tool_timeout: DEFAULT_TIMEOUT,
            native_tools: false,
            on_event: None,
        }
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.registry.register(tool);
        self
    }

    /// Replaces the tools with a prepared registry.
    #[inline]
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Overrides the generated system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the handler that approves calls to tools requiring it.
    ///
    /// Without a handler, such calls run unattended.
    #[inline]
    pub fn with_approval_handler<H: ApprovalHandler + 'static>(
        mut self,
        handler: H,
    ) -> Self {
        self.approval_handler = Some(Arc::new(handler));
        self
    }

    /// Sets the time budget of one tool call.
    #[inline]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Advertises the tools through the native tool-calling interface too.
    #[inline]
    pub fn with_native_tools(mut self, native_tools: bool) -> Self {
        self.native_tools = native_tools;
        self
    }

    /// Attaches a callback that observes the progress of every turn.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(AgentEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let Self {
            model_client,
            registry,
            system_prompt: custom_prompt,
            approval_handler,
            tool_timeout,
            native_tools,
            on_event,
        } = self;

        let system_prompt = custom_prompt.unwrap_or_else(|| {
            let cwd = env::current_dir()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|_| ".".to_owned());
            system_prompt(&registry, &cwd)
        });

        let mut dispatcher =
            Dispatcher::new(Arc::new(registry)).with_timeout(tool_timeout);
        if let Some(handler) = approval_handler {
            dispatcher = dispatcher.with_approval_handler(handler);
        }

        Agent {
            model_client,
            dispatcher,
            system_prompt,
            native_tools,
            conversation: Conversation::default(),
            stage: Default::default(),
            on_event,
        }
    }
}
