//! Conversation-related types.

use neumann_model::{Message, ToolCall};

/// The message history of one conversation.
///
/// The history is append-only. It never contains the system prompt, which is
/// prepended fresh to every request instead.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Appends an operator message.
    #[inline]
    pub fn push_user<S: Into<String>>(&mut self, content: S) {
        self.messages.push(Message::user(content));
    }

    /// Appends a model reply together with the tool calls it requested.
    #[inline]
    pub fn push_assistant(&mut self, content: String, tool_calls: Vec<ToolCall>) {
        self.messages.push(Message::Assistant {
            content: Some(content),
            tool_calls,
        });
    }

    /// Appends the result of `call`.
    #[inline]
    pub fn push_tool_result<S: Into<String>>(
        &mut self,
        call: &ToolCall,
        content: S,
    ) {
        self.messages.push(Message::Tool {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
        });
    }

    /// Drops the whole history.
    #[inline]
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Returns the messages in the order they were added.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the conversation has no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
