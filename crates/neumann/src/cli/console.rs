use std::io::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use neumann::core::tool::{Approval, ApprovalHandler, ApprovalResult};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Line-based operator input shared by the prompt and the approvals.
pub struct Console {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Console {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(io::stdin()).lines()),
        }
    }

    /// Prints `prompt` and waits for a line, `None` once stdin is closed.
    pub async fn read_line(&self, prompt: impl std::fmt::Display) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();

        match self.lines.lock().await.next_line().await {
            Ok(line) => line,
            Err(err) => {
                error!("error reading input: {err}");
                None
            }
        }
    }
}

/// Asks the operator on the terminal before a tool runs.
pub struct ConsoleApprover {
    console: Arc<Console>,
}

impl ConsoleApprover {
    pub fn new(console: Arc<Console>) -> Self {
        Self { console }
    }
}

#[async_trait]
impl ApprovalHandler for ConsoleApprover {
    async fn request(&self, approval: &Approval) -> ApprovalResult {
        let caution = format!(
            "\n⚠️  CAUTION: The model wants to execute '{}':",
            approval.tool()
        );
        println!("{}", caution.red());
        for (key, value) in approval.arguments() {
            println!("{}", format!("   {key}: {value}").red());
        }

        loop {
            let prompt = "Allow execution? [y/N] ".bold();
            let Some(answer) = self.console.read_line(prompt).await else {
                return ApprovalResult::reject(None);
            };
            match parse_choice(&answer) {
                Some(true) => return ApprovalResult::approve(),
                Some(false) => {
                    let prompt = "Reason for rejection (optional): ".dimmed();
                    let why = self.console.read_line(prompt).await;
                    return ApprovalResult::reject(
                        why.map(|why| why.trim().to_owned()),
                    );
                }
                None => continue,
            }
        }
    }
}

/// `Some(true)` approves, `Some(false)` rejects, `None` asks again.
fn parse_choice(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("y\n"), Some(true));
        assert_eq!(parse_choice(" YES "), Some(true));
        assert_eq!(parse_choice(""), Some(false));
        assert_eq!(parse_choice("No"), Some(false));
        assert_eq!(parse_choice("maybe"), None);
    }
}
