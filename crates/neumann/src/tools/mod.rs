//! The built-in tools: file reading and editing, file search and shell
//! commands.

mod bash;
mod edit;
mod glob;
mod grep;
mod lenient;
mod read;
mod write;

pub use bash::{BashTool, COMMAND_TIMEOUT, OutputSink};
pub use edit::EditTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use read::ReadTool;
pub use write::WriteTool;
