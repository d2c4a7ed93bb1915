//! Property compiler: one property node → one `(name, schema)` pair.

use serde_json::Value;
use tracing::debug;

use super::Compiler;
use crate::builder::SchemaBuilder;
use crate::error::Result;
use crate::node::{PropertyNode, PropertyShape};

impl<'g> Compiler<'g> {
    /// `None` when the member's dictionary-key policy drops the property.
    pub(crate) fn compile_property(
        &mut self,
        owner: &str,
        property: &'g PropertyNode,
    ) -> Result<Option<(String, Value)>> {
        let schema = match &property.shape {
            PropertyShape::Override { schema } => match SchemaBuilder::from_fragment(schema) {
                Ok(builder) => builder,
                Err(message) => self.unsupported(
                    &format!("{owner}.{}", property.name),
                    format!("override for property `{}`: {message}", property.name),
                ),
            },
            PropertyShape::Custom { member, default } => {
                let Some(mut builder) = self.compile_object(*member)? else {
                    debug!(owner, property = %property.name, "dropping property");
                    return Ok(None);
                };
                builder.annotate(property.metadata.as_ref());
                if let Some(literal) = default {
                    builder = builder.with("default", parse_default(literal));
                }
                builder
            }
        };
        Ok(Some((property.name.clone(), schema.build())))
    }
}

/// Default literals are JSON when they parse as JSON and plain strings
/// otherwise.
fn parse_default(literal: &str) -> Value {
    serde_json::from_str(literal).unwrap_or_else(|_| Value::String(literal.to_string()))
}
