use std::sync::LazyLock;

use neumann_model::ToolCall;
use regex::Regex;
use serde_json::{Map, Value};

use super::generate_call_id;

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<function=(\w+)>(.*?)</function>")
        .expect("function pattern is valid")
});

static PARAMETER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<parameter=(\w+)>(.*?)</parameter>")
        .expect("parameter pattern is valid")
});

/// Extracts `<function=NAME>` blocks embedded in free text.
///
/// Each block becomes one call with a generated id. Its
/// `<parameter=KEY>VALUE</parameter>` pairs form a flat JSON object of
/// strings, values trimmed of surrounding whitespace. Tags that are not
/// closed are ignored.
pub fn parse_tagged(text: &str) -> Vec<ToolCall> {
    FUNCTION_RE
        .captures_iter(text)
        .map(|func| {
            let mut arguments = Map::new();
            for param in PARAMETER_RE.captures_iter(&func[2]) {
                arguments.insert(
                    param[1].to_owned(),
                    Value::String(param[2].trim().to_owned()),
                );
            }
            ToolCall {
                id: generate_call_id(),
                name: func[1].to_owned(),
                arguments: Value::Object(arguments).to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn arguments(call: &ToolCall) -> Value {
        serde_json::from_str(&call.arguments).unwrap()
    }

    #[test]
    fn test_multi_line_value() {
        let text = "I'll write it.\n\
            <function=write>\n\
            <parameter=path>src/main.rs</parameter>\n\
            <parameter=content>\n\
            fn main() {\n    println!(\"hi\");\n}\n\
            </parameter>\n\
            </function>";
        let calls = parse_tagged(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "write");
        assert_eq!(
            arguments(&calls[0]),
            json!({
                "path": "src/main.rs",
                "content": "fn main() {\n    println!(\"hi\");\n}"
            })
        );
    }

    #[test]
    fn test_multiple_blocks() {
        let text = "<function=read><parameter=path>a</parameter></function>\
            text in between\
            <function=glob><parameter=pat>*.rs</parameter>\
            <parameter=path> src </parameter></function>";
        let calls = parse_tagged(text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "read");
        assert_eq!(calls[1].name, "glob");
        assert_eq!(arguments(&calls[1]), json!({ "pat": "*.rs", "path": "src" }));
        assert_ne!(calls[0].id, calls[1].id);
    }

    #[test]
    fn test_duplicate_keys_keep_last() {
        let text = "<function=read><parameter=path>a</parameter>\
            <parameter=path>b</parameter></function>";
        assert_eq!(arguments(&parse_tagged(text)[0]), json!({ "path": "b" }));
    }

    #[test]
    fn test_malformed_tags_are_skipped() {
        assert!(parse_tagged("<function=read><parameter=path>a").is_empty());
        assert!(parse_tagged("<function=bad name></function>").is_empty());

        // An unterminated parameter leaves the block without arguments.
        let calls =
            parse_tagged("<function=bash><parameter=cmd>ls</function>");
        assert_eq!(calls.len(), 1);
        assert_eq!(arguments(&calls[0]), json!({}));
    }
}
