//! Tool call supports.

mod approval;
mod dispatcher;
mod error;
mod object;
mod parameters;
mod registry;
#[cfg(test)]
pub(crate) mod testing;

use serde::de::DeserializeOwned;

pub use approval::{Approval, ApprovalHandler, ApprovalResult};
pub use dispatcher::{
    DEFAULT_TIMEOUT, DispatchError, DispatchResult, Dispatcher, render_result,
};
pub use error::{Error, ErrorKind};
pub use parameters::Parameters;
pub use registry::{ToolInfo, ToolRegistry};

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A capability the model can invoke by name.
///
/// Arguments arrive as a JSON object and are decoded into [`Tool::Input`]
/// before [`Tool::execute`] runs. Anything a tool needs at call time, such
/// as a shell output sink, is configured when the tool is built and cloned
/// into the returned future.
pub trait Tool: Send + Sync + 'static {
    /// Decoded call arguments.
    type Input: DeserializeOwned;

    /// The name the model uses to call this tool.
    fn name(&self) -> &str;

    /// One line shown to the model next to the signature.
    fn description(&self) -> &str;

    /// Declared parameters, used for the prompt and the native tool list.
    fn parameters(&self) -> &Parameters;

    /// Returns `true` if the operator must approve every call.
    fn confirm(&self) -> bool {
        false
    }

    /// Runs the tool.
    ///
    /// The future must not borrow `self`. It may be dropped at any await
    /// point when the call times out.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
