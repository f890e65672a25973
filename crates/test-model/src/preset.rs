use neumann_model::ToolCallDelta;
use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "text_delta")]
    TextDelta(String),
    #[serde(rename = "tool_call_delta")]
    ToolCallDelta(ToolCallDelta),
    #[serde(rename = "raw")]
    Raw(String),
    /// The connection drops at this point of the stream.
    #[serde(rename = "disconnect")]
    Disconnect,
}

impl PresetEvent {
    /// Creates a tool call fragment event.
    #[inline]
    pub fn tool_call_delta(
        index: u32,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) -> Self {
        PresetEvent::ToolCallDelta(ToolCallDelta {
            index,
            id: id.map(ToOwned::to_owned),
            name: name.map(ToOwned::to_owned),
            arguments: arguments.map(ToOwned::to_owned),
        })
    }
}

/// The preset response for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request will fail in the first `failure` attempts.
    /// `Some(0)` means the request will fail infinitely.
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// Creates a text-only `PresetResponse`, split on spaces.
    pub fn with_text(text: &str) -> Self {
        let mut events = vec![];
        let mut rest = text;
        while let Some(pos) = rest.find(' ') {
            events.push(PresetEvent::TextDelta(rest[..=pos].to_owned()));
            rest = &rest[pos + 1..];
        }
        if !rest.is_empty() {
            events.push(PresetEvent::TextDelta(rest.to_owned()));
        }
        Self::with_events(events)
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    pub(crate) fn has_tool_calls(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, PresetEvent::ToolCallDelta(_)))
    }
}
