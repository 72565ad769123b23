//! Resolved nodes.

use indexmap::IndexMap;

use dtlink_core::{
    identifier::Name,
    span::{Span, Spanned},
};

use super::{AstRef, NodeId, Property, Tombstone};

/// A named, optionally addressed entity in the resolved graph.
///
/// Nodes are never removed from the arena. Deleting a node detaches it from
/// its parent's active children and records a [`Tombstone`] in the parent.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: Name,
    pub(crate) address: Option<u64>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) properties: IndexMap<Name, Property>,
    pub(crate) definitions: Vec<AstRef>,
    pub(crate) labels: Vec<Spanned<Name>>,
    pub(crate) deleted_nodes: Vec<Tombstone<NodeId>>,
    pub(crate) deleted_properties: Vec<Tombstone<Property>>,
    pub(crate) referenced_by: Vec<AstRef>,
    pub(crate) linked_ref_labels: Vec<AstRef>,
    pub(crate) linked_node_paths: Vec<AstRef>,
    pub(crate) deleted: bool,
}

impl Node {
    pub(crate) fn new(name: Name, address: Option<u64>, parent: Option<NodeId>) -> Self {
        Self {
            name,
            address,
            parent,
            children: Vec::new(),
            properties: IndexMap::new(),
            definitions: Vec::new(),
            labels: Vec::new(),
            deleted_nodes: Vec::new(),
            deleted_properties: Vec::new(),
            referenced_by: Vec::new(),
            linked_ref_labels: Vec::new(),
            linked_node_paths: Vec::new(),
            deleted: false,
        }
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn address(&self) -> Option<u64> {
        self.address
    }

    /// `name@address`, or just the name.
    pub fn full_name(&self) -> String {
        match self.address {
            Some(address) => format!("{}@{address:x}", self.name),
            None => self.name.to_string(),
        }
    }

    /// Whether this node is identified by `name` and `address`.
    pub fn is(&self, name: Name, address: Option<u64>) -> bool {
        self.name == name && self.address == address
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Active children in resolution order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Active properties, keyed by name.
    pub fn properties(&self) -> &IndexMap<Name, Property> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(&Name::new(name))
    }

    /// Every AST block that contributed to this node, in resolution order.
    pub fn definitions(&self) -> &[AstRef] {
        &self.definitions
    }

    pub fn labels(&self) -> &[Spanned<Name>] {
        &self.labels
    }

    pub fn has_label(&self, label: Name) -> bool {
        self.labels.iter().any(|l| *l.inner() == label)
    }

    pub fn deleted_nodes(&self) -> &[Tombstone<NodeId>] {
        &self.deleted_nodes
    }

    pub fn deleted_properties(&self) -> &[Tombstone<Property>] {
        &self.deleted_properties
    }

    /// Reference blocks that attached to this node.
    pub fn referenced_by(&self) -> &[AstRef] {
        &self.referenced_by
    }

    /// Label references that resolved to this node.
    pub fn linked_ref_labels(&self) -> &[AstRef] {
        &self.linked_ref_labels
    }

    /// Path segments that resolved to this node.
    pub fn linked_node_paths(&self) -> &[AstRef] {
        &self.linked_node_paths
    }

    /// Whether this node itself was tombstoned in its parent.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Span of the first contributing definition.
    pub fn first_definition(&self) -> Option<Span> {
        self.definitions.first().map(|definition| definition.span)
    }
}
