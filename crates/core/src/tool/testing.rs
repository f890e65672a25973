use std::future::ready;

use serde_json::Value;

use super::{Parameters, Tool, ToolResult};

/// Returns its input, serialized.
pub(crate) struct EchoTool {
    name: &'static str,
    description: &'static str,
    parameters: Parameters,
}

impl EchoTool {
    pub(crate) fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            parameters: Parameters::new([("text", "string")]),
        }
    }
}

impl Tool for EchoTool {
    type Input = Value;

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Ok(input.to_string()))
    }
}
