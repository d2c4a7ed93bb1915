//! Per-request compilation settings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// What to do with a map whose key type does not serialize as a string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum DictionaryKeyMode {
    /// Accept, with a `$comment` noting the key must be stringifiable.
    #[default]
    Loose,
    /// Replace the whole map with an unsupported marker.
    Strict,
    /// Accept without comment.
    Silent,
    /// Drop the property that owns the map.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Value of the `$schema` keyword.
    pub dialect: String,
    pub dictionary_keys: DictionaryKeyMode,
    /// Nesting ceiling for one walk; exceeding it aborts the compilation.
    pub max_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: DEFAULT_DIALECT.to_string(),
            dictionary_keys: DictionaryKeyMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CompileOptions {
    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    pub fn with_dictionary_keys(mut self, mode: DictionaryKeyMode) -> Self {
        self.dictionary_keys = mode;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
