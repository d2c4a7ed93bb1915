//! Descriptive metadata attached to nodes and properties.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hash::{self, StructuralHash};

/// Immutable annotation record built by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.examples.is_empty()
            && self.comment.is_none()
            && !self.deprecated
    }

    /// Layer `overlay` on top of `self`. Scalars set in the overlay win;
    /// examples are replaced only by a non-empty list; `deprecated` is sticky.
    pub fn merged(&self, overlay: &Metadata) -> Metadata {
        Metadata {
            title: overlay.title.clone().or_else(|| self.title.clone()),
            description: overlay.description.clone().or_else(|| self.description.clone()),
            examples: if overlay.examples.is_empty() {
                self.examples.clone()
            } else {
                overlay.examples.clone()
            },
            comment: overlay.comment.clone().or_else(|| self.comment.clone()),
            deprecated: self.deprecated || overlay.deprecated,
        }
    }

    /// Write the annotation keywords onto a schema object. Existing
    /// annotation keywords are replaced, except `$comment` which accumulates.
    /// Structural keywords are never touched.
    pub fn apply_to(&self, schema: &mut Map<String, Value>) {
        if let Some(title) = &self.title {
            schema.insert("title".into(), Value::from(title.clone()));
        }
        if let Some(description) = &self.description {
            schema.insert("description".into(), Value::from(description.clone()));
        }
        if let Some(comment) = &self.comment {
            let joined = match schema.get("$comment").and_then(Value::as_str) {
                Some(existing) if existing.lines().any(|line| line == comment.as_str()) => existing.to_string(),
                Some(existing) => format!("{existing}\n{comment}"),
                None => comment.clone(),
            };
            schema.insert("$comment".into(), Value::from(joined));
        }
        if !self.examples.is_empty() {
            schema.insert("examples".into(), Value::Array(self.examples.clone()));
        }
        if self.deprecated {
            schema.insert("deprecated".into(), Value::Bool(true));
        }
    }
}

impl StructuralHash for Metadata {
    fn structural_hash(&self) -> u64 {
        let mut h = hash::SEED;
        h = hash::step(h, hash::of_opt_str(self.title.as_deref()));
        h = hash::step(h, hash::of_opt_str(self.description.as_deref()));
        h = hash::step(h, hash::of_ordered(self.examples.iter().map(|v| hash::of_str(&v.to_string()))));
        h = hash::step(h, hash::of_opt_str(self.comment.as_deref()));
        hash::step(h, self.deprecated as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn titled(title: &str) -> Metadata {
        Metadata { title: Some(title.into()), ..Metadata::default() }
    }

    #[test]
    fn overlay_wins_for_scalars() {
        let base = Metadata {
            title: Some("Type".into()),
            description: Some("from the type".into()),
            ..Metadata::default()
        };
        let merged = base.merged(&titled("Property"));
        assert_eq!(merged.title.as_deref(), Some("Property"));
        assert_eq!(merged.description.as_deref(), Some("from the type"));
    }

    #[test]
    fn examples_only_replaced_by_non_empty_list() {
        let base = Metadata { examples: vec![json!(1)], ..Metadata::default() };
        assert_eq!(base.merged(&Metadata::default()).examples, vec![json!(1)]);
        let overlay = Metadata { examples: vec![json!(2), json!(3)], ..Metadata::default() };
        assert_eq!(base.merged(&overlay).examples, vec![json!(2), json!(3)]);
    }

    #[test]
    fn deprecated_is_sticky() {
        let base = Metadata { deprecated: true, ..Metadata::default() };
        assert!(base.merged(&Metadata::default()).deprecated);
        assert!(Metadata::default().merged(&base).deprecated);
    }

    #[test]
    fn apply_writes_annotation_keywords_only() {
        let meta = Metadata {
            title: Some("T".into()),
            comment: Some("c".into()),
            deprecated: true,
            ..Metadata::default()
        };
        let mut map = Map::new();
        map.insert("type".into(), json!("string"));
        meta.apply_to(&mut map);
        assert_eq!(
            Value::Object(map),
            json!({ "type": "string", "title": "T", "$comment": "c", "deprecated": true })
        );
    }

    #[test]
    fn comments_accumulate() {
        let mut map = Map::new();
        map.insert("$comment".into(), json!("keys must be stringifiable"));
        Metadata { comment: Some("see docs".into()), ..Metadata::default() }.apply_to(&mut map);
        assert_eq!(map["$comment"], "keys must be stringifiable\nsee docs");

        Metadata { comment: Some("see docs".into()), ..Metadata::default() }.apply_to(&mut map);
        assert_eq!(map["$comment"], "keys must be stringifiable\nsee docs");

        Metadata { comment: Some("see".into()), ..Metadata::default() }.apply_to(&mut map);
        assert_eq!(map["$comment"], "keys must be stringifiable\nsee docs\nsee");
    }

    #[test]
    fn comment_participates_in_hash() {
        let a = Metadata { comment: Some("one".into()), ..Metadata::default() };
        let b = Metadata { comment: Some("two".into()), ..Metadata::default() };
        assert_ne!(a.structural_hash(), b.structural_hash());
        assert_eq!(a.structural_hash(), a.clone().structural_hash());
    }
}
