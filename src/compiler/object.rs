//! Object compiler and its definitions-table cache.

use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use super::{Compiled, Compiler};
use crate::builder::SchemaBuilder;
use crate::defs::Defs;
use crate::error::Result;
use crate::node::{ObjectId, ObjectKind, ObjectNode, ObjectShape, PropertyNode};
use crate::options::DictionaryKeyMode;

impl<'g> Compiler<'g> {
    /// Compile the node behind `id`. Custom and abstract nodes go through
    /// the definitions table and come back as a `$ref`.
    pub(crate) fn compile_object(&mut self, id: ObjectId) -> Result<Compiled> {
        let graph = self.graph;
        let node = graph.get(id)?;
        match node.kind() {
            ObjectKind::Custom | ObjectKind::Abstract => self.compile_cached(node).map(Some),
            _ => self.compile_node(node),
        }
    }

    /// Compile without consulting the definitions table, then apply the
    /// node's own metadata.
    pub(crate) fn compile_node(&mut self, node: &'g ObjectNode) -> Result<Compiled> {
        let compiled = self.compile_shape(node)?;
        Ok(compiled.map(|mut builder| {
            builder.annotate(node.metadata.as_ref());
            builder
        }))
    }

    /// Structural keywords only; the caller decides which metadata applies.
    pub(crate) fn compile_shape(&mut self, node: &'g ObjectNode) -> Result<Compiled> {
        self.descend(&node.identity, |c| c.dispatch(node))
    }

    fn compile_cached(&mut self, node: &'g ObjectNode) -> Result<SchemaBuilder> {
        let key = node.identity.as_str();
        if self.root_identity == Some(key) {
            trace!(identity = key, "reference to document root");
            return Ok(SchemaBuilder::new().with("$ref", "#"));
        }
        let reference = SchemaBuilder::new().with("$ref", Defs::pointer(key));
        if !self.defs.reserve(key) {
            trace!(identity = key, "definition already reserved");
            return Ok(reference);
        }
        debug!(identity = key, kind = %node.kind(), "reserved definition");

        let built = match self.compile_node(node)? {
            Some(builder) => builder,
            None => self.unsupported(key, format!("`{key}` produced no schema")),
        };
        self.defs.fill(key, built.build());
        Ok(reference)
    }

    fn dispatch(&mut self, node: &'g ObjectNode) -> Result<Compiled> {
        trace!(identity = %node.identity, kind = %node.kind(), "compiling");
        let builder = match &node.shape {
            ObjectShape::System { primitive } => match SchemaBuilder::from_value(primitive.schema()) {
                Ok(builder) => builder,
                Err(message) => self.unsupported(&node.identity, message),
            },
            ObjectShape::Override { schema } => match SchemaBuilder::from_fragment(schema) {
                Ok(builder) => builder,
                Err(message) => {
                    self.unsupported(&node.identity, format!("override for `{}`: {message}", node.identity))
                }
            },
            ObjectShape::Nullable { element } => {
                let Some(inner) = self.compile_object(*element)? else {
                    return Ok(None);
                };
                SchemaBuilder::new().with("oneOf", json!([inner.build(), { "type": "null" }]))
            }
            ObjectShape::Array { element, .. } => {
                let Some(items) = self.compile_object(*element)? else {
                    return Ok(None);
                };
                SchemaBuilder::of_type("array").with("items", items.build())
            }
            ObjectShape::Map { key, value, .. } => return self.compile_map(node, *key, *value),
            ObjectShape::Generic { base, arguments } => {
                let message = format!(
                    "could not resolve generic `{}` (definition `{base}`, {} type argument(s)); compiled as an opaque object",
                    node.identity,
                    arguments.len(),
                );
                self.note(&node.identity, message.clone());
                SchemaBuilder::of_type("object").comment(&message)
            }
            ObjectShape::Abstract { implementations } => self.compile_union(node, implementations)?,
            ObjectShape::Custom { properties, .. } => self.compile_custom(node, properties)?,
            ObjectShape::Tuple { elements } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    let Some(item) = self.compile_object(*element)? else {
                        return Ok(None);
                    };
                    items.push(item.build());
                }
                let arity = items.len();
                SchemaBuilder::of_type("array")
                    .with("prefixItems", items)
                    .with("minItems", arity)
                    .with("maxItems", arity)
            }
        };
        Ok(Some(builder))
    }

    fn compile_custom(&mut self, node: &'g ObjectNode, properties: &'g [PropertyNode]) -> Result<SchemaBuilder> {
        let mut props = Map::new();
        let mut required = Vec::new();
        for property in properties {
            let Some((name, schema)) = self.compile_property(&node.identity, property)? else {
                continue;
            };
            if property.nullability.is_required() {
                required.push(Value::from(name.clone()));
            }
            props.insert(name, schema);
        }
        let mut builder = SchemaBuilder::of_type("object").with("properties", props);
        if !required.is_empty() {
            builder = builder.with("required", required);
        }
        Ok(builder)
    }

    /// Maps become `additionalProperties` objects. Keys that do not
    /// serialize as strings are handled per [`DictionaryKeyMode`].
    fn compile_map(&mut self, node: &'g ObjectNode, key: ObjectId, value: ObjectId) -> Result<Compiled> {
        let graph = self.graph;
        let key_node = graph.get(key)?;
        let string_keys = matches!(
            key_node.shape,
            ObjectShape::System { primitive } if primitive.is_string_like()
        );

        let mut comment = None;
        if !string_keys {
            match self.options.dictionary_keys {
                DictionaryKeyMode::Loose => {
                    comment = Some(format!(
                        "keys of `{}` are `{}` values and must be stringifiable",
                        node.identity, key_node.identity
                    ));
                }
                DictionaryKeyMode::Strict => {
                    let message = format!(
                        "dictionary key type `{}` of `{}` is not string-like",
                        key_node.identity, node.identity
                    );
                    return Ok(Some(self.unsupported(&node.identity, message)));
                }
                DictionaryKeyMode::Silent => {}
                DictionaryKeyMode::Skip => {
                    debug!(identity = %node.identity, key = %key_node.identity, "skipping map with non-string keys");
                    return Ok(None);
                }
            }
        }

        let Some(values) = self.compile_object(value)? else {
            return Ok(None);
        };
        let mut builder = SchemaBuilder::of_type("object").with("additionalProperties", values.build());
        if let Some(comment) = comment {
            builder = builder.comment(&comment);
        }
        Ok(Some(builder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::UNSUPPORTED_KEYWORD;
    use crate::metadata::Metadata;
    use crate::node::{PropertyNode, TypeGraph};
    use crate::options::CompileOptions;
    use crate::primitive::Primitive;

    fn system(graph: &mut TypeGraph, primitive: Primitive, identity: &str) -> ObjectId {
        graph.add(ObjectNode::new(identity, ObjectShape::System { primitive }))
    }

    fn compile(graph: &TypeGraph, id: ObjectId, options: &CompileOptions) -> Option<Value> {
        let mut compiler = Compiler::new(graph, options);
        compiler.compile_object(id).unwrap().map(SchemaBuilder::build)
    }

    #[test]
    fn nullable_is_one_of_inner_and_null() {
        let mut graph = TypeGraph::new();
        let int = system(&mut graph, Primitive::Int32, "int");
        let nullable = graph.add(ObjectNode::new("int?", ObjectShape::Nullable { element: int }));
        let schema = compile(&graph, nullable, &CompileOptions::default()).unwrap();
        let arms = schema["oneOf"].as_array().unwrap();
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0], Primitive::Int32.schema());
        assert_eq!(arms[1], json!({ "type": "null" }));
    }

    #[test]
    fn tuple_has_fixed_positional_items() {
        let mut graph = TypeGraph::new();
        let s = system(&mut graph, Primitive::String, "string");
        let b = system(&mut graph, Primitive::Boolean, "bool");
        let tuple = graph.add(ObjectNode::new("(string, bool)", ObjectShape::Tuple { elements: vec![s, b] }));
        let schema = compile(&graph, tuple, &CompileOptions::default()).unwrap();
        assert_eq!(
            schema,
            json!({
                "type": "array",
                "prefixItems": [{ "type": "string" }, { "type": "boolean" }],
                "minItems": 2,
                "maxItems": 2
            })
        );
        assert!(schema.get("items").is_none());
    }

    #[test]
    fn generic_is_an_annotated_object() {
        let mut graph = TypeGraph::new();
        let s = system(&mut graph, Primitive::String, "string");
        let generic = graph.add(ObjectNode::new(
            "Lazy<string>",
            ObjectShape::Generic { base: "Lazy`1".into(), arguments: vec![s] },
        ));
        let options = CompileOptions::default();
        let mut compiler = Compiler::new(&graph, &options);
        let schema = compiler.compile_object(generic).unwrap().unwrap().build();
        assert_eq!(schema["type"], "object");
        assert!(schema["$comment"].as_str().unwrap().contains("Lazy<string>"));
        assert_eq!(compiler.diagnostics.len(), 1);
    }

    #[test]
    fn override_replaces_compilation() {
        let mut graph = TypeGraph::new();
        let raw = graph.add(
            ObjectNode::new("Money", ObjectShape::Override { schema: r#"{"type":"string","pattern":"^\\d+$"}"#.into() })
                .with_metadata(Metadata { title: Some("Money".into()), ..Metadata::default() }),
        );
        let schema = compile(&graph, raw, &CompileOptions::default()).unwrap();
        assert_eq!(schema, json!({ "type": "string", "pattern": "^\\d+$", "title": "Money" }));
    }

    #[test]
    fn malformed_override_becomes_marker() {
        let mut graph = TypeGraph::new();
        let raw = graph.add(ObjectNode::new("Broken", ObjectShape::Override { schema: "{".into() }));
        let schema = compile(&graph, raw, &CompileOptions::default()).unwrap();
        assert!(schema[UNSUPPORTED_KEYWORD].as_str().unwrap().contains("Broken"));
    }

    #[test]
    fn metadata_never_overrides_structure() {
        let mut graph = TypeGraph::new();
        let s = system(&mut graph, Primitive::String, "string");
        let list = graph.add(ObjectNode::new("string[]", ObjectShape::array(s)).with_metadata(Metadata {
            description: Some("names".into()),
            ..Metadata::default()
        }));
        let schema = compile(&graph, list, &CompileOptions::default()).unwrap();
        assert_eq!(schema, json!({ "type": "array", "items": { "type": "string" }, "description": "names" }));
    }

    fn int_keyed_map(graph: &mut TypeGraph) -> ObjectId {
        let key = system(graph, Primitive::Int32, "int");
        let value = system(graph, Primitive::String, "string");
        graph.add(ObjectNode::new("Dictionary<int, string>", ObjectShape::map(key, value)))
    }

    #[test]
    fn dictionary_key_modes() {
        let mut graph = TypeGraph::new();
        let map = int_keyed_map(&mut graph);
        let with = |mode| compile(&graph, map, &CompileOptions::default().with_dictionary_keys(mode));

        let loose = with(DictionaryKeyMode::Loose).unwrap();
        assert_eq!(loose["additionalProperties"], json!({ "type": "string" }));
        assert!(loose["$comment"].as_str().unwrap().contains("stringifiable"));

        let strict = with(DictionaryKeyMode::Strict).unwrap();
        assert!(strict.get(UNSUPPORTED_KEYWORD).is_some());
        assert!(strict.get("additionalProperties").is_none());

        let silent = with(DictionaryKeyMode::Silent).unwrap();
        assert_eq!(silent, json!({ "type": "object", "additionalProperties": { "type": "string" } }));

        assert!(with(DictionaryKeyMode::Skip).is_none());
    }

    #[test]
    fn string_keys_ignore_the_policy() {
        let mut graph = TypeGraph::new();
        let key = system(&mut graph, Primitive::Guid, "Guid");
        let value = system(&mut graph, Primitive::Boolean, "bool");
        let map = graph.add(ObjectNode::new("Dictionary<Guid, bool>", ObjectShape::map(key, value)));
        let options = CompileOptions::default().with_dictionary_keys(DictionaryKeyMode::Strict);
        let schema = compile(&graph, map, &options).unwrap();
        assert_eq!(schema, json!({ "type": "object", "additionalProperties": { "type": "boolean" } }));
    }

    #[test]
    fn skip_drops_the_owning_property_only() {
        let mut graph = TypeGraph::new();
        let map = int_keyed_map(&mut graph);
        let wrapped = graph.add(ObjectNode::new("Dictionary<int, string>[]", ObjectShape::array(map)));
        let s = system(&mut graph, Primitive::String, "string");
        let owner = graph.add(ObjectNode::new(
            "Owner",
            ObjectShape::custom(vec![PropertyNode::custom("lookup", wrapped), PropertyNode::custom("name", s)]),
        ));
        let options = CompileOptions::default().with_dictionary_keys(DictionaryKeyMode::Skip);
        let mut compiler = Compiler::new(&graph, &options);
        compiler.compile_object(owner).unwrap();
        assert_eq!(
            compiler.defs.get("Owner").unwrap(),
            &json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            })
        );
    }

    #[test]
    fn custom_nodes_are_cached_by_identity() {
        let mut graph = TypeGraph::new();
        let s = system(&mut graph, Primitive::String, "string");
        let address = graph.add(ObjectNode::new("Address", ObjectShape::custom(vec![PropertyNode::custom("street", s)])));
        let options = CompileOptions::default();
        let mut compiler = Compiler::new(&graph, &options);
        let first = compiler.compile_object(address).unwrap().unwrap().build();
        let second = compiler.compile_object(address).unwrap().unwrap().build();
        assert_eq!(first, json!({ "$ref": "#/$defs/Address" }));
        assert_eq!(first, second);
        assert_eq!(compiler.defs.len(), 1);
    }

    #[test]
    fn self_reference_terminates() {
        let mut graph = TypeGraph::new();
        let node = graph.add(ObjectNode::new("TreeNode", ObjectShape::custom(vec![])));
        let children = graph.add(ObjectNode::new("TreeNode[]", ObjectShape::array(node)));
        graph.push_property(node, PropertyNode::custom("children", children)).unwrap();

        let options = CompileOptions::default();
        let mut compiler = Compiler::new(&graph, &options);
        compiler.compile_object(node).unwrap();
        assert_eq!(
            compiler.defs.get("TreeNode").unwrap()["properties"]["children"],
            json!({ "type": "array", "items": { "$ref": "#/$defs/TreeNode" } })
        );
    }
}
