//! Compile a resolved type graph into a single JSON Schema document.
//!
//! The graph ([`TypeGraph`]) comes from a host-language extractor. [`build`]
//! walks it from one root, inlines the root, deduplicates every reachable
//! custom and abstract type into `$defs`, and embeds `x-unsupported` markers
//! wherever a shape could not be expressed.
pub mod builder;
pub mod compiler;
pub mod defs;
pub mod error;
pub mod hash;
pub mod metadata;
pub mod node;
pub mod options;
pub mod path_de;
pub mod primitive;

pub use compiler::{build, CompiledSchema, Diagnostic, GraphDocument, RootRequest};
pub use error::{Result, SchemaError};
pub use metadata::Metadata;
pub use node::{
    ImplementationIndex, Nullability, ObjectId, ObjectKind, ObjectNode, ObjectShape, PropertyNode, PropertyShape,
    TypeGraph,
};
pub use options::{CompileOptions, DictionaryKeyMode};
pub use primitive::Primitive;
