use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A streamed response from the model provider.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Attempts to pull out the next event from the response.
    ///
    /// # Return value
    ///
    /// There are several possible return values, each indicating a
    /// distinct response state:
    ///
    /// - `Poll::Pending` means that this response is still waiting for
    ///   the next event. Implementations will ensure that the current
    ///   task will be notified when the next event may be ready.
    /// - `Poll::Ready(Ok(Some(event)))` means the response has an event
    ///   to deliver, and may produce further events on subsequent
    ///   `poll_next_event` calls.
    /// - `Poll::Ready(Ok(None))` means the response has completed.
    /// - `Poll::Ready(Err(error))` means an error occurred while
    ///   processing the response.
    ///
    /// Calling this method after completion should always return `None`.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// The reason why a model response has finished.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model needs to call a tool.
    ToolCalls,
    /// The model has finished generating text.
    Stop,
    /// The output was cut off by a token limit.
    Length,
    /// Any reason the server reported that is not known here.
    Other(String),
}

impl ModelFinishReason {
    /// Maps the reason string used by chat-completion servers.
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "tool_calls" | "function_call" => ModelFinishReason::ToolCalls,
            "stop" => ModelFinishReason::Stop,
            "length" => ModelFinishReason::Length,
            other => ModelFinishReason::Other(other.to_owned()),
        }
    }
}

/// One incremental fragment of a tool call, keyed by its slot index.
///
/// Fragments with the same `index` belong to the same call. `id` and `name`
/// replace what was seen before, `arguments` must be appended.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Zero-based slot index.
    pub index: u32,
    /// The call identifier, usually only present in the first fragment.
    pub id: Option<String>,
    /// The function name, usually only present in the first fragment.
    pub name: Option<String>,
    /// A piece of the argument string.
    pub arguments: Option<String>,
}

/// The event from a model response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// Received a piece of the reply text.
    TextDelta(String),
    /// Received a tool call fragment.
    ToolCallDelta(ToolCallDelta),
    /// The server reported why generation stopped. More events may still
    /// follow (usage chunks, for example).
    Finished(ModelFinishReason),
    /// The undecoded payload of a stream event, only produced when the
    /// provider is configured to echo raw payloads.
    Raw(String),
}
