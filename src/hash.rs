//! Structural hashing of node graphs.
//!
//! A deterministic polynomial hash: start at [`SEED`], then for every
//! component `h = h * 31 + component`, wrapping on overflow. Order matters.
//! Two graphs with the same content hash the same regardless of how they
//! were built, which is the only thing this is for.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, SchemaError};
use crate::node::{ObjectId, ObjectNode, ObjectShape, PropertyNode, PropertyShape, TypeGraph};
use crate::options::DEFAULT_MAX_DEPTH;

pub const SEED: u64 = 1701;
const FACTOR: u64 = 31;

pub trait StructuralHash {
    fn structural_hash(&self) -> u64;
}

#[inline]
pub fn step(h: u64, component: u64) -> u64 {
    h.wrapping_mul(FACTOR).wrapping_add(component)
}

/// Combine already-hashed elements of an ordered collection.
pub fn of_ordered<I: IntoIterator<Item = u64>>(items: I) -> u64 {
    items.into_iter().fold(SEED, step)
}

pub fn of_str(s: &str) -> u64 {
    s.bytes().fold(SEED, |h, b| step(h, b as u64))
}

pub fn of_opt_str(s: Option<&str>) -> u64 {
    s.map(of_str).unwrap_or(0)
}

/// Hashes object nodes of one graph, memoizing finished nodes.
///
/// A node reached again while it is still being hashed (a cycle)
/// contributes the hash of its identity key instead of recursing. Nesting
/// past `max_depth` fails the walk, same as compilation.
pub struct GraphHasher<'g> {
    graph: &'g TypeGraph,
    done: HashMap<ObjectId, u64>,
    active: HashSet<ObjectId>,
    depth: usize,
    max_depth: usize,
}

impl<'g> GraphHasher<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self {
            graph,
            done: HashMap::new(),
            active: HashSet::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn object(&mut self, id: ObjectId) -> Result<u64> {
        if let Some(h) = self.done.get(&id) {
            return Ok(*h);
        }
        let node = self.graph.get(id)?;
        if self.depth >= self.max_depth {
            return Err(SchemaError::DepthExceeded {
                limit: self.max_depth,
                identity: node.identity.clone(),
            });
        }
        if !self.active.insert(id) {
            return Ok(step(of_str("cycle"), of_str(&node.identity)));
        }
        self.depth += 1;
        let h = self.node(node);
        self.depth -= 1;
        self.active.remove(&id);
        let h = h?;
        self.done.insert(id, h);
        Ok(h)
    }

    fn node(&mut self, node: &ObjectNode) -> Result<u64> {
        let mut h = step(SEED, node.kind() as u64);
        h = step(h, of_str(&node.identity));
        h = step(h, node.metadata.as_ref().map(|m| m.structural_hash()).unwrap_or(0));
        let shape = match &node.shape {
            ObjectShape::System { primitive } => primitive.ordinal(),
            ObjectShape::Override { schema } => of_str(schema),
            ObjectShape::Nullable { element } => self.object(*element)?,
            ObjectShape::Generic { base, arguments } => step(of_str(base), self.objects(arguments)?),
            ObjectShape::Map { base, key, value } => {
                let key = self.object(*key)?;
                let value = self.object(*value)?;
                step(step(of_str(base), key), value)
            }
            ObjectShape::Array { base, element } => step(of_str(base), self.object(*element)?),
            ObjectShape::Abstract { implementations } => self.objects(implementations)?,
            ObjectShape::Custom { properties, .. } => {
                let mut hashes = Vec::with_capacity(properties.len());
                for property in properties {
                    hashes.push(self.property(property)?);
                }
                of_ordered(hashes)
            }
            ObjectShape::Tuple { elements } => self.objects(elements)?,
        };
        Ok(step(h, shape))
    }

    fn objects(&mut self, ids: &[ObjectId]) -> Result<u64> {
        let mut hashes = Vec::with_capacity(ids.len());
        for id in ids {
            hashes.push(self.object(*id)?);
        }
        Ok(of_ordered(hashes))
    }

    fn property(&mut self, property: &PropertyNode) -> Result<u64> {
        let mut h = step(SEED, of_str(&property.name));
        h = step(h, property.metadata.as_ref().map(|m| m.structural_hash()).unwrap_or(0));
        h = step(h, property.nullability as u64);
        let shape = match &property.shape {
            PropertyShape::Override { schema } => step(1, of_str(schema)),
            PropertyShape::Custom { member, default } => {
                step(step(2, self.object(*member)?), of_opt_str(default.as_deref()))
            }
        };
        Ok(step(h, shape))
    }
}

impl TypeGraph {
    /// Structural hash of the subgraph reachable from `root`, nesting at
    /// most [`DEFAULT_MAX_DEPTH`] levels.
    pub fn structural_hash(&self, root: ObjectId) -> Result<u64> {
        self.structural_hash_within(root, DEFAULT_MAX_DEPTH)
    }

    pub fn structural_hash_within(&self, root: ObjectId, max_depth: usize) -> Result<u64> {
        GraphHasher::new(self).with_max_depth(max_depth).object(root)
    }
}
