use std::fmt::{self, Display};

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Values longer than this are cut in approval previews.
const PREVIEW_CHARS: usize = 200;

/// The decision of an operator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApprovalResult {
    /// Whether the call may run.
    pub approved: bool,
    /// An optional reason given when rejecting.
    pub why: Option<String>,
}

impl ApprovalResult {
    /// Creates an approving result.
    #[inline]
    pub fn approve() -> Self {
        Self {
            approved: true,
            why: None,
        }
    }

    /// Creates a rejecting result with an optional reason.
    #[inline]
    pub fn reject(why: Option<String>) -> Self {
        Self {
            approved: false,
            why: why.filter(|why| !why.is_empty()),
        }
    }
}

/// Approval for a tool call request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Approval {
    tool: String,
    arguments: Vec<(String, String)>,
}

impl Approval {
    /// Creates an approval for calling `tool` with `arguments`.
    ///
    /// Every argument value is rendered as text, strings without quotes, and
    /// cut after 200 characters.
    pub fn new<S: Into<String>>(tool: S, arguments: &Map<String, Value>) -> Self {
        let arguments = arguments
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), preview(&text))
            })
            .collect();
        Self {
            tool: tool.into(),
            arguments,
        }
    }

    /// Returns the name of the tool to run.
    #[inline]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Returns the argument previews in the order received.
    #[inline]
    pub fn arguments(&self) -> &[(String, String)] {
        &self.arguments
    }
}

impl Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tool)?;
        for (key, value) in &self.arguments {
            write!(f, "\n   {key}: {value}")?;
        }
        Ok(())
    }
}

/// A type that asks the operator whether a tool call may run.
///
/// At most one request is pending at a time.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    /// Asks for a decision on `approval`.
    async fn request(&self, approval: &Approval) -> ApprovalResult;
}

fn preview(text: &str) -> String {
    let total = text.chars().count();
    if total <= PREVIEW_CHARS {
        return text.to_owned();
    }
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{head}... ({} more chars)", total - PREVIEW_CHARS)
}
