mod builder;
mod state;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use neumann_model::{
    ErrorKind, Message, ModelFinishReason, ModelProviderError, ModelRequest,
    ModelResponseEvent, ToolCall,
};
use serde_json::Value;

use crate::conversation::Conversation;
use crate::extract::{self, DeltaAssembler};
use crate::model_client::ModelClient;
use crate::tool::{DispatchError, Dispatcher, ToolRegistry, render_result};
pub use builder::AgentBuilder;
pub use state::{AgentStage, Command};

/// The first argument shown next to a tool call is cut after this many
/// characters.
const CALL_PREVIEW_CHARS: usize = 50;

type EventHandler = Arc<dyn Fn(AgentEvent) + Send + Sync>;

/// Progress notifications of a turn, in the order they happen.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum AgentEvent {
    /// A request is about to be sent.
    RequestStarted,
    /// The first event of the reply arrived.
    ResponseStarted,
    /// A piece of the reply text.
    TextDelta(String),
    /// An undecoded stream payload, only seen when the provider echoes them.
    Raw(String),
    /// The reply is complete and has been added to the history.
    ResponseFinished {
        /// The full reply text.
        content: String,
        /// Tool calls extracted from the reply.
        tool_calls: Vec<ToolCall>,
        /// Why the server stopped generating, if it said so.
        finish_reason: Option<ModelFinishReason>,
    },
    /// The argument string of a call is not a JSON object.
    ArgumentsInvalid {
        /// Name of the requested tool.
        name: String,
    },
    /// A tool call is about to be dispatched.
    ToolCallStarted {
        /// Name of the requested tool.
        name: String,
        /// The first argument value, shortened.
        preview: String,
    },
    /// A tool call produced its result.
    ToolCallFinished {
        /// Name of the requested tool.
        name: String,
        /// The content appended to the history.
        content: String,
    },
}

/// The reason a turn ended before the model stopped requesting tools.
#[derive(Debug)]
pub enum TurnError {
    /// The request could not be sent.
    Request(Box<dyn ModelProviderError>),
    /// The reply broke off while streaming.
    Stream(Box<dyn ModelProviderError>),
}

impl TurnError {
    /// Returns the kind of the underlying provider error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            TurnError::Request(err) | TurnError::Stream(err) => err.kind(),
        }
    }
}

impl Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::Request(err) => write!(f, "request failed: {err}"),
            TurnError::Stream(err) => write!(f, "reply broke off: {err}"),
        }
    }
}

impl StdError for TurnError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TurnError::Request(err) | TurnError::Stream(err) => {
                Some(err.as_ref())
            }
        }
    }
}

/// An agent instance, which maintains a conversation, a model client and
/// the tools the model may call.
///
/// One turn runs at a time: [`send_message`](Self::send_message) takes
/// `&mut self` and only returns once the model stops requesting tools or
/// the request fails.
pub struct Agent {
    model_client: ModelClient,
    dispatcher: Dispatcher,
    system_prompt: String,
    native_tools: bool,
    conversation: Conversation,
    stage: AgentStage,
    on_event: Option<EventHandler>,
}

impl Agent {
    /// Runs one turn for the operator message `input`.
    ///
    /// On failure the history keeps everything appended before the failed
    /// request, but never a partial reply.
    pub async fn send_message<S: Into<String>>(
        &mut self,
        input: S,
    ) -> Result<(), TurnError> {
        self.conversation.push_user(input);
        let result = self.run_turn().await;
        self.stage = AgentStage::AwaitingInput;
        result
    }

    /// Clears the history.
    #[inline]
    pub fn reset(&mut self) {
        self.conversation.clear();
    }

    /// Returns the history.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the current stage.
    #[inline]
    pub fn stage(&self) -> AgentStage {
        self.stage
    }

    /// Returns the system prompt sent with every request.
    #[inline]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Returns the tools available to the model.
    #[inline]
    pub fn registry(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }

    async fn run_turn(&mut self) -> Result<(), TurnError> {
        loop {
            let tool_calls = self.request_reply().await?;
            if tool_calls.is_empty() {
                return Ok(());
            }

            self.stage = AgentStage::Dispatching;
            for call in &tool_calls {
                let content = self.dispatch(call).await;
                self.conversation.push_tool_result(call, content);
            }
        }
    }

    /// Sends the history, streams the reply and appends it.
    async fn request_reply(&mut self) -> Result<Vec<ToolCall>, TurnError> {
        self.stage = AgentStage::Requesting;
        let request = self.build_request();
        self.emit(AgentEvent::RequestStarted);
        let mut response = self
            .model_client
            .send_request(request)
            .await
            .map_err(TurnError::Request)?;

        self.stage = AgentStage::Streaming;
        let mut assembler = DeltaAssembler::default();
        let mut content = String::new();
        let mut finish_reason = None;
        let mut started = false;
        while let Some(event) =
            response.next_event().await.map_err(TurnError::Stream)?
        {
            if !started {
                started = true;
                self.emit(AgentEvent::ResponseStarted);
            }
            match event {
                ModelResponseEvent::TextDelta(text) => {
                    content.push_str(&text);
                    self.emit(AgentEvent::TextDelta(text));
                }
                ModelResponseEvent::ToolCallDelta(delta) => {
                    assembler.push(delta);
                }
                ModelResponseEvent::Finished(reason) => {
                    finish_reason = Some(reason);
                }
                ModelResponseEvent::Raw(data) => {
                    self.emit(AgentEvent::Raw(data));
                }
            }
        }
        drop(response);

        let tool_calls = extract::resolve(assembler, &content);
        debug!(
            "reply finished with {} tool calls ({finish_reason:?})",
            tool_calls.len()
        );
        self.conversation
            .push_assistant(content.clone(), tool_calls.clone());
        self.emit(AgentEvent::ResponseFinished {
            content,
            tool_calls: tool_calls.clone(),
            finish_reason,
        });
        Ok(tool_calls)
    }

    async fn dispatch(&self, call: &ToolCall) -> String {
        let first_argument = match serde_json::from_str::<Value>(&call.arguments)
        {
            Ok(Value::Object(map)) => map.into_iter().next().map(|(_, v)| v),
            Ok(_) => None,
            // An empty argument string is an empty object.
            Err(_) if call.arguments.trim().is_empty() => None,
            Err(_) => {
                self.emit(AgentEvent::ArgumentsInvalid {
                    name: call.name.clone(),
                });
                None
            }
        };
        self.emit(AgentEvent::ToolCallStarted {
            name: call.name.clone(),
            preview: first_argument.map(|v| preview(&v)).unwrap_or_default(),
        });

        let result = self.dispatcher.dispatch(call).await;
        if let Err(DispatchError::InvalidArguments { reason, .. }) = &result {
            debug!("arguments of {} are invalid: {reason}", call.name);
        }
        let content = render_result(&result);
        self.emit(AgentEvent::ToolCallFinished {
            name: call.name.clone(),
            content: content.clone(),
        });
        content
    }

    fn build_request(&self) -> ModelRequest {
        let mut messages = Vec::with_capacity(self.conversation.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(self.conversation.messages().iter().cloned());
        ModelRequest {
            messages,
            tools: if self.native_tools {
                self.registry().definitions()
            } else {
                vec![]
            },
        }
    }

    #[inline]
    fn emit(&self, event: AgentEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }
}

fn preview(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.chars().take(CALL_PREVIEW_CHARS).collect()
}
