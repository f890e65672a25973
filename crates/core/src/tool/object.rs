use std::future::ready;

use futures_util::future::BoxFuture;
use serde_json::Value;

use super::{Error, Parameters, Tool, ToolResult};

/// Object-safe view of a [`Tool`], so tools with different inputs can share
/// one registry.
pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &Parameters;

    fn confirm(&self) -> bool;

    /// Decodes `arguments` and starts the call.
    fn call(&self, arguments: Value) -> BoxFuture<'static, ToolResult>;
}

pub(crate) struct Erased<T: Tool>(pub T);

impl<T: Tool> ToolObject for Erased<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn parameters(&self) -> &Parameters {
        self.0.parameters()
    }

    fn confirm(&self) -> bool {
        self.0.confirm()
    }

    fn call(&self, arguments: Value) -> BoxFuture<'static, ToolResult> {
        match serde_json::from_value::<T::Input>(arguments) {
            Ok(input) => Box::pin(self.0.execute(input)),
            Err(err) => {
                debug!("rejected arguments for {}: {err}", self.0.name());
                let err = Error::invalid_input().with_reason(err.to_string());
                Box::pin(ready(Err(err)))
            }
        }
    }
}
