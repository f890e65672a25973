//! Turning model output into tool calls.
//!
//! Two encodings compete. Servers with native tool calling stream
//! [`ToolCallDelta`](neumann_model::ToolCallDelta) fragments that are
//! assembled by [`DeltaAssembler`]. Models that only know the prompt-level
//! convention embed `<function=NAME>` blocks in their text, which are picked
//! up by [`parse_tagged`]. [`resolve`] applies the priority between them.

mod delta;
mod tagged;

use neumann_model::ToolCall;
use uuid::Uuid;

pub use delta::DeltaAssembler;
pub use tagged::parse_tagged;

/// The marker that must appear in the text for tag extraction to run.
pub const TAG_MARKER: &str = "<function=";

/// Produces the tool calls of one assistant reply.
///
/// Delta-assembled calls always win. Only when there are none, and `content`
/// contains [`TAG_MARKER`], the inline tags are parsed instead.
pub fn resolve(assembler: DeltaAssembler, content: &str) -> Vec<ToolCall> {
    let calls = assembler.finish();
    if !calls.is_empty() {
        return calls;
    }
    if content.contains(TAG_MARKER) {
        let calls = parse_tagged(content);
        trace!("extracted {} tagged tool calls", calls.len());
        return calls;
    }
    vec![]
}

/// Creates a fresh call identifier, `call_` followed by 8 hex digits.
pub fn generate_call_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("call_{}", &uuid[..8])
}
