use std::sync::Arc;

use indexmap::IndexMap;
use neumann_model::ModelTool;

use super::object::{ToolObject, Erased};
use super::{Parameters, Tool};

/// A name-keyed set of tools, in registration order.
///
/// The registry is filled at startup and then shared read-only.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn ToolObject>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// A tool with the same name is replaced, keeping its position.
    pub fn register<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        if self.tools.contains_key(&name) {
            debug!("tool {name} replaces an earlier registration");
        }
        self.tools.insert(name, Arc::new(Erased(tool)));
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Arc<dyn ToolObject>> {
        self.tools.get(name)
    }

    /// Returns `true` if a tool with `name` is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Returns the number of tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if there are no tools.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Iterates the tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = ToolInfo<'_>> {
        self.tools.values().map(|tool| ToolInfo {
            tool: tool.as_ref(),
        })
    }

    /// Returns the native tool definitions for a model request.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.iter()
            .map(|info| ModelTool {
                name: info.name().to_owned(),
                description: info.description().to_owned(),
                parameters: info.parameters().to_json_schema(),
            })
            .collect()
    }
}

/// A borrowed view of a registered tool.
#[derive(Clone, Copy)]
pub struct ToolInfo<'a> {
    tool: &'a dyn ToolObject,
}

impl<'a> ToolInfo<'a> {
    /// Returns the name of the tool.
    #[inline]
    pub fn name(&self) -> &'a str {
        self.tool.name()
    }

    /// Returns the description of the tool.
    #[inline]
    pub fn description(&self) -> &'a str {
        self.tool.description()
    }

    /// Returns the parameters of the tool.
    #[inline]
    pub fn parameters(&self) -> &'a Parameters {
        self.tool.parameters()
    }

    /// Returns `true` if calls need the operator's approval.
    #[inline]
    pub fn confirm(&self) -> bool {
        self.tool.confirm()
    }
}
