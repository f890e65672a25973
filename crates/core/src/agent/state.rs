/// The stage an [`Agent`](super::Agent) is in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AgentStage {
    /// Waiting for the operator.
    #[default]
    AwaitingInput,
    /// A request is on its way to the model.
    Requesting,
    /// The reply is being streamed.
    Streaming,
    /// Tool calls of the last reply are running.
    Dispatching,
}

/// A line of operator input.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Terminate the session.
    Exit,
    /// Clear the history.
    Reset,
    /// Send a new user message.
    Message(String),
}

impl Command {
    /// Interprets one line, `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line {
            "" => None,
            "/q" | "exit" => Some(Command::Exit),
            "/c" => Some(Command::Reset),
            _ => Some(Command::Message(line.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(Command::parse("   "), None);
        assert_eq!(Command::parse("/q"), Some(Command::Exit));
        assert_eq!(Command::parse("exit\n"), Some(Command::Exit));
        assert_eq!(Command::parse("/c"), Some(Command::Reset));
        assert_eq!(
            Command::parse("  list the files "),
            Some(Command::Message("list the files".to_owned()))
        );
    }
}
