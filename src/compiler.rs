//! Schema compiler.
//!
//! One [`Compiler`] is one synchronous depth-first walk over one graph with
//! its own definitions table. Nothing in here is shared between walks, so
//! separate graphs can be compiled on separate threads.
pub mod object;
pub mod property;
pub mod root;
pub mod union;

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::builder::SchemaBuilder;
use crate::defs::Defs;
use crate::error::{Result, SchemaError};
use crate::node::TypeGraph;
use crate::options::CompileOptions;

pub use root::{build, CompiledSchema, GraphDocument, RootRequest};

/// A structural failure that was recovered by embedding a marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Identity of the node (or `Owner.property`) the marker stands in for.
    pub identity: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.identity, self.message)
    }
}

/// Output of compiling one object node. `None` means the dictionary-key
/// policy asked for the owning property to be dropped.
pub(crate) type Compiled = Option<SchemaBuilder>;

pub(crate) struct Compiler<'g> {
    graph: &'g TypeGraph,
    options: &'g CompileOptions,
    defs: Defs,
    diagnostics: Vec<Diagnostic>,
    depth: usize,
    /// Identity of an inlined custom/abstract root; references back to it
    /// point at the document itself.
    root_identity: Option<&'g str>,
}

impl<'g> Compiler<'g> {
    pub(crate) fn new(graph: &'g TypeGraph, options: &'g CompileOptions) -> Self {
        Self {
            graph,
            options,
            defs: Defs::new(),
            diagnostics: Vec::new(),
            depth: 0,
            root_identity: None,
        }
    }

    /// Run `f` one level deeper, failing the walk past the ceiling.
    fn descend<T>(&mut self, identity: &str, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.options.max_depth {
            return Err(SchemaError::DepthExceeded {
                limit: self.options.max_depth,
                identity: identity.to_string(),
            });
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn note(&mut self, identity: &str, message: String) {
        warn!(identity, "{message}");
        self.diagnostics.push(Diagnostic { identity: identity.to_string(), message });
    }

    /// Record a diagnostic and return the marker schema for it.
    fn unsupported(&mut self, identity: &str, message: String) -> SchemaBuilder {
        let marker = SchemaBuilder::unsupported(message.clone());
        self.note(identity, message);
        marker
    }
}
