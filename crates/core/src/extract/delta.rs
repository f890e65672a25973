use std::collections::BTreeMap;

use neumann_model::{ToolCall, ToolCallDelta};

use super::generate_call_id;

#[derive(Clone, Debug, Default)]
struct PendingDelta {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Assembles streamed tool call fragments, keyed by slot index.
///
/// The assembler lives for one assistant reply and is consumed by
/// [`finish`](Self::finish).
#[derive(Clone, Debug, Default)]
pub struct DeltaAssembler {
    slots: BTreeMap<u32, PendingDelta>,
}

impl DeltaAssembler {
    /// Merges one fragment into its slot.
    ///
    /// `id` and `name` overwrite what the slot had, `arguments` are appended.
    pub fn push(&mut self, delta: ToolCallDelta) {
        let slot = self.slots.entry(delta.index).or_default();
        if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
            slot.id = Some(id);
        }
        if let Some(name) = delta.name.filter(|name| !name.is_empty()) {
            slot.name = name;
        }
        if let Some(arguments) = delta.arguments {
            slot.arguments.push_str(&arguments);
        }
    }

    /// Returns `true` if no fragment was pushed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Materializes one call per slot, in ascending slot order.
    ///
    /// Slots that never received an id get a generated one.
    pub fn finish(self) -> Vec<ToolCall> {
        self.slots
            .into_values()
            .map(|slot| ToolCall {
                id: slot.id.unwrap_or_else(generate_call_id),
                name: slot.name,
                arguments: slot.arguments,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(index: u32, arguments: &str) -> ToolCallDelta {
        ToolCallDelta {
            index,
            arguments: Some(arguments.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn test_arguments_are_concatenated() {
        let mut assembler = DeltaAssembler::default();
        assembler.push(ToolCallDelta {
            index: 0,
            id: Some("call_1".to_owned()),
            name: Some("read".to_owned()),
            arguments: Some(r#"{"a""#.to_owned()),
        });
        assembler.push(delta(0, ":1}"));

        let calls = assembler.finish();
        assert_eq!(
            calls,
            vec![ToolCall {
                id: "call_1".to_owned(),
                name: "read".to_owned(),
                arguments: r#"{"a":1}"#.to_owned(),
            }]
        );
    }

    #[test]
    fn test_slot_order_is_independent_of_arrival() {
        let mut assembler = DeltaAssembler::default();
        assembler.push(ToolCallDelta {
            index: 1,
            id: Some("call_b".to_owned()),
            name: Some("glob".to_owned()),
            arguments: None,
        });
        assembler.push(ToolCallDelta {
            index: 0,
            id: Some("call_a".to_owned()),
            name: Some("read".to_owned()),
            arguments: None,
        });
        assembler.push(delta(1, "{}"));
        assembler.push(delta(0, "{}"));

        let ids: Vec<_> =
            assembler.finish().into_iter().map(|call| call.id).collect();
        assert_eq!(ids, ["call_a", "call_b"]);
    }

    #[test]
    fn test_missing_id_is_generated() {
        let mut assembler = DeltaAssembler::default();
        assembler.push(ToolCallDelta {
            index: 0,
            name: Some("bash".to_owned()),
            ..Default::default()
        });
        assert!(!assembler.is_empty());

        let calls = assembler.finish();
        assert!(calls[0].id.starts_with("call_"));
        assert_eq!(calls[0].arguments, "");
    }

    #[test]
    fn test_later_name_overwrites() {
        let mut assembler = DeltaAssembler::default();
        assembler.push(ToolCallDelta {
            index: 0,
            name: Some("gre".to_owned()),
            ..Default::default()
        });
        assembler.push(ToolCallDelta {
            index: 0,
            name: Some("grep".to_owned()),
            ..Default::default()
        });
        assert_eq!(assembler.finish()[0].name, "grep");
    }
}
