//! Vocabulary shared between the agent and chat-completion backends.
//!
//! A backend implements [`ModelProvider`] and yields [`ModelResponseEvent`]s from a
//! [`ModelResponse`]. Conversation history is kept as [`Message`]s in the
//! shape every OpenAI-compatible server understands, so requests can be
//! built without knowing which backend sits behind them.

#![deny(missing_docs)]

mod error;
mod message;
mod provider;
mod request;
mod response;

pub use error::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
