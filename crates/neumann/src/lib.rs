//! An interactive coding agent for the terminal that works with local,
//! OpenAI-compatible chat-completion servers.
//!
//! The crate includes the `neu` CLI. It can also be used as a library: a
//! [`Session`] wires the built-in tools, the tools discovered in a directory
//! and any model provider into an agent.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod discovery;
mod session;
pub mod tools;

pub use session::{Session, SessionBuilder};

/// Re-exports of [`neumann_core`] crate.
pub mod core {
    pub use neumann_core::*;
}
