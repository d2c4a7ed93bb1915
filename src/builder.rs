//! Small builder over a JSON Schema object.

use serde_json::{Map, Value};

use crate::metadata::Metadata;

/// Reserved annotation keyword carrying a diagnostic message where a
/// sub-shape could not be compiled.
pub const UNSUPPORTED_KEYWORD: &str = "x-unsupported";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaBuilder {
    map: Map<String, Value>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_type(ty: &str) -> Self {
        Self::new().with("type", ty)
    }

    /// Start from an existing schema value. Boolean schemas are rewritten to
    /// their object equivalents so annotations can be attached.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => Ok(Self { map }),
            Value::Bool(true) => Ok(Self::new()),
            Value::Bool(false) => Ok(Self::new().with("not", Value::Object(Map::new()))),
            other => Err(format!("schema fragment must be an object or boolean, found `{other}`")),
        }
    }

    /// Parse a raw fragment supplied by the host.
    pub fn from_fragment(raw: &str) -> Result<Self, String> {
        let value = serde_json::from_str::<Value>(raw)
            .map_err(|error| format!("invalid schema fragment: {error}"))?;
        Self::from_value(value)
    }

    /// Marker schema standing in for something that could not be compiled.
    pub fn unsupported(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new().with(UNSUPPORTED_KEYWORD, message)
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.map.insert(key.to_string(), value.into());
        self
    }

    /// Append to `$comment`, keeping anything already there.
    pub fn comment(mut self, text: &str) -> Self {
        let text = match self.map.get("$comment").and_then(Value::as_str) {
            Some(existing) => format!("{existing}\n{text}"),
            None => text.to_string(),
        };
        self.map.insert("$comment".into(), Value::from(text));
        self
    }

    pub fn annotate(&mut self, metadata: Option<&Metadata>) {
        if let Some(metadata) = metadata.filter(|metadata| !metadata.is_empty()) {
            metadata.apply_to(&mut self.map);
        }
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }

    pub fn build(self) -> Value {
        Value::Object(self.map)
    }
}

/// Escape a key for use in a JSON Pointer reference token.
pub fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
