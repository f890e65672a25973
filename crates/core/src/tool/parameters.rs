use std::fmt::{self, Display};

use serde_json::{Map, Value, json};

/// Marks a parameter that may be omitted.
const OPTIONAL_SUFFIX: char = '?';

/// The ordered parameter list of a tool.
///
/// Every parameter has a type tag such as `string` or `number`. A trailing
/// `?` marks the parameter as optional, e.g. `number?`. The tags are shown
/// to the model in the system prompt and are turned into a JSON schema for
/// native tool calling.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Parameters {
    entries: Vec<(String, String)>,
}

impl Parameters {
    /// Creates the parameter list from `(name, type tag)` pairs.
    ///
    /// A later entry with an existing name replaces the earlier tag.
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (name, tag) in entries {
            params.insert(name.into(), tag.into());
        }
        params
    }

    /// Derives the parameter list from an object JSON schema, as produced by
    /// `schemars` for an input struct.
    ///
    /// Nullable types use their non-null variant, `integer` is reported as
    /// `number`, and properties missing from `required` are optional.
    pub fn from_schema(schema: &Value) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut params = Self::default();
        let Some(properties) = schema.get("properties").and_then(Value::as_object)
        else {
            return params;
        };
        for (name, property) in properties {
            let mut tag = schema_type(property).to_owned();
            if !required.contains(&name.as_str()) {
                tag.push(OPTIONAL_SUFFIX);
            }
            params.insert(name.clone(), tag);
        }
        params
    }

    fn insert(&mut self, name: String, tag: String) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = tag,
            None => self.entries.push((name, tag)),
        }
    }

    /// Returns the `(name, type tag)` pairs in declaration order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, tag)| (name.as_str(), tag.as_str()))
    }

    /// Returns the number of parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tool takes no parameters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds an object JSON schema from the type tags.
    ///
    /// Tags that are not JSON schema types are advertised as strings.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = vec![];
        for (name, tag) in self.iter() {
            let (base, optional) = match tag.strip_suffix(OPTIONAL_SUFFIX) {
                Some(base) => (base, true),
                None => (tag, false),
            };
            let ty = match base {
                "string" | "number" | "integer" | "boolean" | "array"
                | "object" => base,
                _ => "string",
            };
            properties.insert(name.to_owned(), json!({ "type": ty }));
            if !optional {
                required.push(Value::String(name.to_owned()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl Display for Parameters {
    /// Formats the list as `name: tag, name: tag`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (name, tag)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {tag}")?;
        }
        Ok(())
    }
}

fn schema_type(property: &Value) -> &str {
    let ty = match property.get("type") {
        Some(Value::String(ty)) => ty.as_str(),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|ty| *ty != "null")
            .unwrap_or("string"),
        _ => "string",
    };
    if ty == "integer" { "number" } else { ty }
}
