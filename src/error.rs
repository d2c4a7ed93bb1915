//! Fatal compilation errors.
//!
//! Anything in here means the node graph broke a contract; unsupported but
//! well-formed shapes never surface as errors, they become markers inside
//! the schema instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Debug, Error)]
pub enum SchemaError {
    /// A child id that points outside the arena.
    #[error("node `{owner}` references missing node #{id}")]
    DanglingNode { owner: String, id: usize },

    #[error("root node #{0} is not in the graph")]
    InvalidRoot(usize),

    #[error("custom node `{owner}` declares property `{name}` more than once")]
    DuplicateProperty { owner: String, name: String },

    #[error("abstract node `{owner}` lists implementation `{identity}` more than once")]
    DuplicateImplementation { owner: String, identity: String },

    #[error("{kind} node #{id} has an empty identity key")]
    EmptyIdentity { id: usize, kind: &'static str },

    #[error("node `{identity}` is a {found} node, expected {expected}")]
    KindMismatch {
        identity: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("recursion depth limit of {limit} exceeded while compiling `{identity}`")]
    DepthExceeded { limit: usize, identity: String },
}
