//! The default system prompt.

use std::fmt::Write;

use crate::tool::ToolRegistry;

const TAG_INSTRUCTIONS: &str = "\nTo use a tool, you MUST use this exact XML format:\n\
    <function=tool_name>\n<parameter=param_name>value</parameter>\n</function>\n";

const TAG_EXAMPLE: &str = "\nExample:\n\
    <function=read>\n<parameter=path>file.txt</parameter>\n</function>\n";

/// Builds the system prompt: the working directory, the catalogue of
/// `registry` in registration order, and how to call tools with inline tags.
pub fn system_prompt(registry: &ToolRegistry, cwd: &str) -> String {
    let mut prompt = format!("Concise coding assistant. cwd: {cwd}\n\n");
    prompt.push_str("You have access to the following tools:\n");
    for tool in registry.iter() {
        // Writing to a `String` never fails.
        let _ = writeln!(
            prompt,
            "- {}({}): {}",
            tool.name(),
            tool.parameters(),
            tool.description()
        );
    }
    prompt.push_str(TAG_INSTRUCTIONS);
    prompt.push_str(TAG_EXAMPLE);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::testing::EchoTool;

    #[test]
    fn test_system_prompt() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::new("echo", "Echo text"));

        let prompt = system_prompt(&registry, "/work");
        assert_eq!(
            prompt,
            "Concise coding assistant. cwd: /work\n\n\
             You have access to the following tools:\n\
             - echo(text: string): Echo text\n\
             \nTo use a tool, you MUST use this exact XML format:\n\
             <function=tool_name>\n<parameter=param_name>value</parameter>\n</function>\n\
             \nExample:\n\
             <function=read>\n<parameter=path>file.txt</parameter>\n</function>\n"
        );
    }
}
