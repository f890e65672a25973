//! Deserializers for scalar arguments that may arrive as strings.
//!
//! Calls extracted from inline tags carry every value as a string, so
//! `"10"` must be read like `10` and `"true"` like `true`.

use serde::de::{Deserializer, Error};
use serde::Deserialize;
use serde_json::Value;

pub(crate) fn number<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a count, got {n}"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a count, got {s:?}"))),
        other => Err(D::Error::custom(format!("expected a count, got {other}"))),
    }
}

pub(crate) fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(D::Error::custom(format!("expected a boolean, got {s:?}"))),
        },
        other => Err(D::Error::custom(format!("expected a boolean, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Input {
        #[serde(default, deserialize_with = "number")]
        limit: Option<usize>,
        #[serde(default, deserialize_with = "flag")]
        all: Option<bool>,
    }

    fn parse(value: Value) -> Result<Input, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_native_and_string_spellings() {
        let input = parse(json!({ "limit": 10, "all": true })).unwrap();
        assert_eq!((input.limit, input.all), (Some(10), Some(true)));

        let input = parse(json!({ "limit": " 10 ", "all": "False" })).unwrap();
        assert_eq!((input.limit, input.all), (Some(10), Some(false)));

        let input = parse(json!({})).unwrap();
        assert_eq!((input.limit, input.all), (None, None));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = parse(json!({ "limit": "ten" })).unwrap_err();
        assert!(err.to_string().contains("expected a count"), "{err}");
        assert!(parse(json!({ "limit": -1 })).is_err());
        assert!(parse(json!({ "all": "maybe" })).is_err());
    }
}
