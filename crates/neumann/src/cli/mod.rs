//! Terminal front end of `neu`.

mod args;
mod console;
mod render;

pub use args::Args;
pub use console::{Console, ConsoleApprover};
pub use render::Renderer;
