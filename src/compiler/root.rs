//! Root compiler: envelope, inlined root shape, accumulated `$defs`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{Compiler, Diagnostic};
use crate::defs::{sorted_by_key, DEFS_KEYWORD};
use crate::error::{Result, SchemaError};
use crate::metadata::Metadata;
use crate::node::{ObjectId, ObjectKind, TypeGraph};
use crate::options::CompileOptions;

/// What to compile and how to label the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootRequest {
    pub root: ObjectId,
    /// Emitted as `$id` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Output filename hint, handed back untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Request-level annotations; they take precedence over the root node's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl RootRequest {
    pub fn new(root: ObjectId) -> Self {
        Self { root, id: None, file_name: None, metadata: None }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Extractor output as read from disk: one graph plus the request for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    #[serde(flatten)]
    pub request: RootRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<CompileOptions>,
    pub objects: TypeGraph,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    pub document: Value,
    pub file_name: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledSchema {
    pub fn definitions(&self) -> usize {
        self.document
            .get(DEFS_KEYWORD)
            .and_then(Value::as_object)
            .map(Map::len)
            .unwrap_or(0)
    }
}

/// Compile `request.root` into a complete schema document.
///
/// The root is inlined at the top level; only what it reaches is placed in
/// `$defs`. Fails only when the graph breaks a contract.
pub fn build(graph: &TypeGraph, request: &RootRequest, options: &CompileOptions) -> Result<CompiledSchema> {
    graph.validate()?;
    let root = graph.get(request.root).map_err(|_| SchemaError::InvalidRoot(request.root.0))?;
    debug!(root = %root.identity, kind = %root.kind(), "compiling schema");

    let mut compiler = Compiler::new(graph, options);
    if matches!(root.kind(), ObjectKind::Custom | ObjectKind::Abstract) {
        compiler.root_identity = Some(root.identity.as_str());
    }

    let mut shape = match compiler.compile_shape(root)? {
        Some(builder) => builder,
        None => compiler.unsupported(
            &root.identity,
            format!("root `{}` was dropped by the dictionary-key policy", root.identity),
        ),
    };
    let metadata = match (&root.metadata, &request.metadata) {
        (Some(node), Some(requested)) => Some(node.merged(requested)),
        (node, requested) => requested.clone().or_else(|| node.clone()),
    };
    shape.annotate(metadata.as_ref());

    let mut document = Map::new();
    document.insert("$schema".into(), Value::from(options.dialect.clone()));
    if let Some(id) = &request.id {
        document.insert("$id".into(), Value::from(id.clone()));
    }

    let mut defs = Map::new();
    for (key, value) in shape.into_map() {
        match key.as_str() {
            "$schema" | "$id" => {}
            // definitions carried by a root override fragment
            DEFS_KEYWORD => {
                if let Value::Object(carried) = value {
                    defs.extend(carried);
                }
            }
            _ => {
                document.insert(key, value);
            }
        }
    }
    // carried definitions were written first and keep their keys
    for (key, schema) in compiler.defs.into_sorted() {
        if defs.contains_key(&key) {
            debug!(key = %key, "definition already carried by the root fragment");
            continue;
        }
        defs.insert(key, schema);
    }
    if !defs.is_empty() {
        document.insert(DEFS_KEYWORD.into(), Value::Object(sorted_by_key(defs)));
    }

    debug!(
        root = %root.identity,
        diagnostics = compiler.diagnostics.len(),
        "schema compiled"
    );
    Ok(CompiledSchema {
        document: Value::Object(document),
        file_name: request.file_name.clone(),
        diagnostics: compiler.diagnostics,
    })
}
