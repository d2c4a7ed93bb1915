//! Definitions table shared by one compilation walk.
//!
//! A key is reserved before its node's children are compiled, so a node that
//! reaches itself again sees the reservation and emits a `$ref` instead of
//! recursing. The slot is filled once the node is built. First writer wins.

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{Map, Value};

use crate::builder::escape_pointer;

pub const DEFS_KEYWORD: &str = "$defs";

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Reserved,
    Built(Value),
}

/// Bytes that may not appear raw in a URI fragment. Non-ASCII is always
/// encoded.
const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[derive(Debug, Default)]
pub struct Defs {
    slots: IndexMap<String, Slot>,
}

impl Defs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`. Returns false when it is already reserved or built.
    pub fn reserve(&mut self, key: &str) -> bool {
        if self.slots.contains_key(key) {
            return false;
        }
        self.slots.insert(key.to_string(), Slot::Reserved);
        true
    }

    /// Store the finished schema for a reserved key. A slot that already
    /// holds a schema keeps it.
    pub fn fill(&mut self, key: &str, schema: Value) {
        if let Some(Slot::Built(_)) = self.slots.get(key) {
            return;
        }
        self.slots.insert(key.to_string(), Slot::Built(schema));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.slots.get(key) {
            Some(Slot::Built(schema)) => Some(schema),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// URI fragment pointing at the definition stored under `key`: the JSON
    /// Pointer token, percent-encoded where RFC 3986 forbids it in a fragment.
    pub fn pointer(key: &str) -> String {
        let token = escape_pointer(key);
        format!("#/{DEFS_KEYWORD}/{}", utf8_percent_encode(&token, FRAGMENT))
    }

    /// Built definitions sorted by key. Slots still reserved are skipped; a
    /// finished walk leaves none.
    pub fn into_sorted(self) -> Map<String, Value> {
        sorted_by_key(self.slots.into_iter().filter_map(|(key, slot)| match slot {
            Slot::Built(schema) => Some((key, schema)),
            Slot::Reserved => None,
        }))
    }
}

/// Collect definitions into a map ordered by key.
pub fn sorted_by_key<I: IntoIterator<Item = (String, Value)>>(entries: I) -> Map<String, Value> {
    let mut entries: Vec<(String, Value)> = entries.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_writer_wins() {
        let mut defs = Defs::new();
        assert!(defs.reserve("Address"));
        assert!(!defs.reserve("Address"));
        assert!(defs.get("Address").is_none());
        defs.fill("Address", json!({ "type": "object" }));
        defs.fill("Address", json!({ "type": "string" }));
        assert_eq!(defs.get("Address"), Some(&json!({ "type": "object" })));
    }

    #[test]
    fn sorted_output() {
        let mut defs = Defs::new();
        for key in ["b", "c", "a"] {
            defs.reserve(key);
            defs.fill(key, json!({ "title": key }));
        }
        let keys: Vec<String> = defs.into_sorted().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn references_escape_keys() {
        assert_eq!(Defs::pointer("Address"), "#/$defs/Address");
        assert_eq!(Defs::pointer("a/b"), "#/$defs/a~1b");
        assert_eq!(Defs::pointer("Pair<int, string>"), "#/$defs/Pair%3Cint,%20string%3E");
        assert_eq!(Defs::pointer("Lazy`1[]"), "#/$defs/Lazy%601%5B%5D");
        assert_eq!(Defs::pointer("Größe"), "#/$defs/Gr%C3%B6%C3%9Fe");
        assert_eq!(Defs::pointer("50%"), "#/$defs/50%25");
    }
}
