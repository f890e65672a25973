//! Core logic including the agent loop, tool-call extraction, tool dispatch,
//! conversation history, etc.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
pub mod extract;
mod model_client;
pub mod prompt;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, AgentEvent, AgentStage, Command, TurnError,
};
