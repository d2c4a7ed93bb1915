//! Abstract-union resolver.
//!
//! Implementations are precomputed on the node (see
//! [`crate::node::ImplementationIndex`]); this only compiles them. Each one
//! goes through the definitions table like any other custom node, so an
//! implementation shared by several unions is still emitted once.

use tracing::debug;

use super::Compiler;
use crate::builder::SchemaBuilder;
use crate::error::Result;
use crate::node::{ObjectId, ObjectNode};

impl<'g> Compiler<'g> {
    pub(crate) fn compile_union(
        &mut self,
        node: &'g ObjectNode,
        implementations: &'g [ObjectId],
    ) -> Result<SchemaBuilder> {
        let builder = SchemaBuilder::of_type("object");
        if implementations.is_empty() {
            debug!(identity = %node.identity, "abstract type has no known implementations");
            return Ok(builder);
        }

        let mut arms = Vec::with_capacity(implementations.len());
        for id in implementations {
            match self.compile_object(*id)? {
                Some(arm) => arms.push(arm.build()),
                None => debug!(identity = %node.identity, implementation = %id, "implementation dropped"),
            }
        }
        if arms.is_empty() {
            return Ok(builder);
        }
        Ok(builder.with("oneOf", arms))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::node::{ObjectShape, PropertyNode, TypeGraph};
    use crate::options::CompileOptions;
    use crate::primitive::Primitive;

    #[test]
    fn empty_union_is_a_plain_object() {
        let mut graph = TypeGraph::new();
        let shape = graph.add(ObjectNode::new("Shape", ObjectShape::Abstract { implementations: vec![] }));
        let options = CompileOptions::default();
        let mut compiler = Compiler::new(&graph, &options);
        compiler.compile_object(shape).unwrap();
        assert_eq!(compiler.defs.get("Shape").unwrap(), &json!({ "type": "object" }));
    }

    #[test]
    fn shared_implementations_are_defined_once() {
        let mut graph = TypeGraph::new();
        let radius = graph.add(ObjectNode::new("double", ObjectShape::System { primitive: Primitive::Double }));
        let circle = graph.add(ObjectNode::new(
            "Circle",
            ObjectShape::custom(vec![PropertyNode::custom("radius", radius)]),
        ));
        let shape = graph.add(ObjectNode::new("Shape", ObjectShape::Abstract { implementations: vec![circle] }));
        let round = graph.add(ObjectNode::new("IRound", ObjectShape::Abstract { implementations: vec![circle] }));

        let options = CompileOptions::default();
        let mut compiler = Compiler::new(&graph, &options);
        compiler.compile_object(shape).unwrap();
        compiler.compile_object(round).unwrap();

        assert_eq!(compiler.defs.len(), 3);
        let arm = json!({ "$ref": "#/$defs/Circle" });
        assert_eq!(compiler.defs.get("Shape").unwrap()["oneOf"], json!([arm.clone()]));
        assert_eq!(compiler.defs.get("IRound").unwrap()["oneOf"], json!([arm]));
    }
}
