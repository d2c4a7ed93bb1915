//! Node model: the host-language-independent description of a type universe.
//!
//! Nodes live in an arena ([`TypeGraph`]) and refer to each other by
//! [`ObjectId`]. That is what lets a type mention itself: the child is an
//! index, not an owned box.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::metadata::Metadata;
use crate::primitive::Primitive;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Index of an object node inside its [`TypeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Variant tag of an [`ObjectShape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    System,
    Override,
    Nullable,
    Generic,
    Map,
    Array,
    Abstract,
    Custom,
    Tuple,
}

impl ObjectKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::System => "system",
            ObjectKind::Override => "override",
            ObjectKind::Nullable => "nullable",
            ObjectKind::Generic => "generic",
            ObjectKind::Map => "map",
            ObjectKind::Array => "array",
            ObjectKind::Abstract => "abstract",
            ObjectKind::Custom => "custom",
            ObjectKind::Tuple => "tuple",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One type as the extractor saw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectNode {
    /// Stable type-identity key. Used as the `$defs` key for custom and
    /// abstract nodes and in diagnostics for everything else.
    pub identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(flatten)]
    pub shape: ObjectShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ObjectShape {
    /// Intrinsic type.
    System { primitive: Primitive },
    /// Raw schema fragment that replaces normal compilation.
    Override { schema: String },
    Nullable { element: ObjectId },
    /// Generic shape with no recognised specialization. `base` is the identity
    /// of the open generic definition.
    Generic { base: String, arguments: Vec<ObjectId> },
    Map { base: String, key: ObjectId, value: ObjectId },
    Array { base: String, element: ObjectId },
    Abstract {
        #[serde(default)]
        implementations: Vec<ObjectId>,
    },
    Custom {
        #[serde(default)]
        properties: Vec<PropertyNode>,
        /// Abstract nodes this type derives from or implements. Only read by
        /// [`ImplementationIndex::scan`].
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        implements: Vec<ObjectId>,
    },
    Tuple { elements: Vec<ObjectId> },
}

/// Whether the extractor could prove a member nullable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Nullability {
    Nullable,
    NonNullable,
    /// Neither proven; treated as non-nullable.
    #[default]
    Unknown,
}

impl Nullability {
    pub fn is_required(self) -> bool {
        !matches!(self, Nullability::Nullable)
    }
}

/// A named member of a custom object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub nullability: Nullability,
    #[serde(flatten)]
    pub shape: PropertyShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PropertyShape {
    Override { schema: String },
    Custom {
        member: ObjectId,
        /// Default value as written in the host source.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
}

/// Arena of object nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeGraph {
    objects: Vec<ObjectNode>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl ObjectNode {
    pub fn new(identity: impl Into<String>, shape: ObjectShape) -> Self {
        Self { identity: identity.into(), metadata: None, shape }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn kind(&self) -> ObjectKind {
        self.shape.kind()
    }

    /// Direct children, in declaration order.
    pub fn children(&self) -> Vec<ObjectId> {
        match &self.shape {
            ObjectShape::System { .. } | ObjectShape::Override { .. } => Vec::new(),
            ObjectShape::Nullable { element } | ObjectShape::Array { element, .. } => vec![*element],
            ObjectShape::Generic { arguments, .. } => arguments.clone(),
            ObjectShape::Map { key, value, .. } => vec![*key, *value],
            ObjectShape::Abstract { implementations } => implementations.clone(),
            ObjectShape::Custom { properties, implements } => properties
                .iter()
                .filter_map(|p| match p.shape {
                    PropertyShape::Custom { member, .. } => Some(member),
                    PropertyShape::Override { .. } => None,
                })
                .chain(implements.iter().copied())
                .collect(),
            ObjectShape::Tuple { elements } => elements.clone(),
        }
    }
}

impl ObjectShape {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectShape::System { .. } => ObjectKind::System,
            ObjectShape::Override { .. } => ObjectKind::Override,
            ObjectShape::Nullable { .. } => ObjectKind::Nullable,
            ObjectShape::Generic { .. } => ObjectKind::Generic,
            ObjectShape::Map { .. } => ObjectKind::Map,
            ObjectShape::Array { .. } => ObjectKind::Array,
            ObjectShape::Abstract { .. } => ObjectKind::Abstract,
            ObjectShape::Custom { .. } => ObjectKind::Custom,
            ObjectShape::Tuple { .. } => ObjectKind::Tuple,
        }
    }

    pub fn custom(properties: Vec<PropertyNode>) -> Self {
        ObjectShape::Custom { properties, implements: Vec::new() }
    }

    pub fn array(element: ObjectId) -> Self {
        ObjectShape::Array { base: "Array".into(), element }
    }

    pub fn map(key: ObjectId, value: ObjectId) -> Self {
        ObjectShape::Map { base: "Dictionary".into(), key, value }
    }
}

impl PropertyNode {
    pub fn custom(name: impl Into<String>, member: ObjectId) -> Self {
        Self {
            name: name.into(),
            metadata: None,
            nullability: Nullability::Unknown,
            shape: PropertyShape::Custom { member, default: None },
        }
    }

    pub fn raw(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
            nullability: Nullability::Unknown,
            shape: PropertyShape::Override { schema: schema.into() },
        }
    }

    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        if let PropertyShape::Custom { default, .. } = &mut self.shape {
            *default = Some(literal.into());
        }
        self
    }

    pub fn with_nullability(mut self, nullability: Nullability) -> Self {
        self.nullability = nullability;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: ObjectNode) -> ObjectId {
        self.objects.push(node);
        ObjectId(self.objects.len() - 1)
    }

    /// Resolve an id. A dangling id is a broken graph, not an unsupported
    /// shape.
    pub fn get(&self, id: ObjectId) -> Result<&ObjectNode> {
        self.objects.get(id.0).ok_or_else(|| SchemaError::DanglingNode {
            owner: "<graph>".into(),
            id: id.0,
        })
    }

    /// Append a property to a custom node. Used to close cycles after the
    /// node already has an id.
    pub fn push_property(&mut self, owner: ObjectId, property: PropertyNode) -> Result<()> {
        let node = self.objects.get_mut(owner.0).ok_or_else(|| SchemaError::DanglingNode {
            owner: "<graph>".into(),
            id: owner.0,
        })?;
        match &mut node.shape {
            ObjectShape::Custom { properties, .. } => {
                properties.push(property);
                Ok(())
            }
            other => Err(SchemaError::KindMismatch {
                identity: node.identity.clone(),
                expected: ObjectKind::Custom.name(),
                found: other.kind().name(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectNode)> {
        self.objects.iter().enumerate().map(|(i, n)| (ObjectId(i), n))
    }

    /// Contract checks. Any failure here means the extractor produced an
    /// invalid graph and the whole compilation must stop.
    pub fn validate(&self) -> Result<()> {
        for (id, node) in self.iter() {
            for child in node.children() {
                if child.0 >= self.objects.len() {
                    return Err(SchemaError::DanglingNode {
                        owner: node.identity.clone(),
                        id: child.0,
                    });
                }
            }

            match &node.shape {
                ObjectShape::Custom { properties, .. } => {
                    check_identity(id, node)?;
                    let mut seen = HashSet::new();
                    for property in properties {
                        if !seen.insert(property.name.as_str()) {
                            return Err(SchemaError::DuplicateProperty {
                                owner: node.identity.clone(),
                                name: property.name.clone(),
                            });
                        }
                    }
                }
                ObjectShape::Abstract { implementations } => {
                    check_identity(id, node)?;
                    let mut seen = HashSet::new();
                    for implementation in implementations {
                        let identity = self.objects[implementation.0].identity.as_str();
                        if !seen.insert(identity) {
                            return Err(SchemaError::DuplicateImplementation {
                                owner: node.identity.clone(),
                                identity: identity.to_string(),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Fill every abstract node's implementation list from the `implements`
    /// declarations of custom nodes. Implementations already listed are kept
    /// and not repeated.
    pub fn link_implementations(&mut self) {
        let index = ImplementationIndex::scan(self);
        for node in &mut self.objects {
            let identity = node.identity.clone();
            if let ObjectShape::Abstract { implementations } = &mut node.shape {
                for found in index.implementations_of(&identity) {
                    if !implementations.contains(found) {
                        implementations.push(*found);
                    }
                }
            }
        }
        // an implementation listed by id and found again under another id
        // with the same identity would trip validation; drop the later one
        let identities: Vec<String> = self.objects.iter().map(|n| n.identity.clone()).collect();
        for node in &mut self.objects {
            if let ObjectShape::Abstract { implementations } = &mut node.shape {
                let mut seen = HashSet::new();
                implementations.retain(|id| {
                    identities.get(id.0).is_none_or(|identity| seen.insert(identity.clone()))
                });
            }
        }
    }
}

fn check_identity(id: ObjectId, node: &ObjectNode) -> Result<()> {
    if node.identity.trim().is_empty() {
        return Err(SchemaError::EmptyIdentity { id: id.0, kind: node.kind().name() });
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION SCAN
// ————————————————————————————————————————————————————————————————————————————

/// Abstract identity → concrete implementations, computed once per graph.
#[derive(Debug, Default)]
pub struct ImplementationIndex {
    by_abstract: IndexMap<String, Vec<ObjectId>>,
}

impl ImplementationIndex {
    /// Walk the whole arena once. Only custom nodes count as concrete; the
    /// targets of `implements` must be abstract nodes to be recorded.
    pub fn scan(graph: &TypeGraph) -> Self {
        let mut by_abstract: IndexMap<String, Vec<ObjectId>> = IndexMap::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for (id, node) in graph.iter() {
            let ObjectShape::Custom { implements, .. } = &node.shape else {
                continue;
            };
            for target in implements {
                let Ok(target) = graph.get(*target) else { continue };
                if target.kind() != ObjectKind::Abstract {
                    continue;
                }
                if seen.insert((target.identity.clone(), node.identity.clone())) {
                    by_abstract.entry(target.identity.clone()).or_default().push(id);
                }
            }
        }
        Self { by_abstract }
    }

    pub fn implementations_of(&self, identity: &str) -> &[ObjectId] {
        self.by_abstract.get(identity).map(Vec::as_slice).unwrap_or(&[])
    }
}
