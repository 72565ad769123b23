//! The resolved node graph.
//!
//! Nodes live in an arena owned by [`Graph`] and refer to each other by
//! [`NodeId`]. Links back into the AST are [`AstRef`]s: an [`AstId`] plus
//! the span it covers, never a pointer.

mod node;
mod property;

use std::fmt;

use dtlink_core::{identifier::Name, span::Span};
use dtlink_parser::ast::{AstId, split_unit_address};

pub use node::Node;
pub use property::Property;

/// Index of a node in its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A non-owning link to an AST element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AstRef {
    pub id: AstId,
    pub span: Span,
}

impl AstRef {
    pub fn new(id: AstId, span: Span) -> Self {
        Self { id, span }
    }
}

/// A deleted node or property together with the statement that deleted it.
#[derive(Debug, Clone)]
pub struct Tombstone<T> {
    pub target: T,
    pub by: AstRef,
}

/// Arena of every node created during one resolution pass.
///
/// The node at [`Graph::root`] is the merged tree root. Nodes created for
/// unresolved reference blocks have no parent and are not reachable from it.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(Name::new("/"), None, None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Number of nodes in the arena, detached and deleted ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node id in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub(crate) fn add_child(&mut self, parent: NodeId, name: Name, address: Option<u64>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name, address, Some(parent)));
        self.node_mut(parent).children.push(id);
        id
    }

    /// Create a parentless node that stands in for an unresolved target.
    pub(crate) fn add_detached(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(Name::new(""), None, None));
        id
    }

    /// The active child of `parent` identified by `name` and `address`.
    pub fn find_child(&self, parent: NodeId, name: Name, address: Option<u64>) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).is(name, address))
    }

    /// Look up the active child of `parent` by path semantics: a name
    /// without a unit address also matches an addressed child of that name
    /// when no unaddressed child exists.
    pub fn lookup(&self, parent: NodeId, name: Name, address: Option<u64>) -> Option<NodeId> {
        self.find_child(parent, name, address).or_else(|| {
            if address.is_some() {
                return None;
            }
            self.node(parent)
                .children
                .iter()
                .copied()
                .find(|&child| self.node(child).name == name)
        })
    }

    /// [`Graph::lookup`] for one textual path segment such as `uart@1000`.
    pub fn lookup_child(&self, parent: NodeId, segment: &str) -> Option<NodeId> {
        let (name, address) = split_unit_address(segment);
        self.lookup(parent, Name::new(name), address)
    }

    /// Whether `id` is reachable from the root through active children.
    pub fn is_live(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            let node = self.node(current);
            if node.deleted {
                return false;
            }
            match node.parent {
                Some(parent) => current = parent,
                None => return current == self.root(),
            }
        }
    }

    /// Absolute path of `id`, such as `/soc/serial@1000`.
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            segments.push(self.node(current).full_name());
            current = parent;
        }
        if segments.is_empty() {
            return "/".to_string();
        }
        segments
            .iter()
            .rev()
            .fold(String::new(), |path, segment| format!("{path}/{segment}"))
    }

    /// `id` and its active descendants, pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev());
        }
        out
    }

    /// Every live node, pre-order from the root.
    pub fn live_nodes(&self) -> Vec<NodeId> {
        self.subtree(self.root())
    }

    /// Move `target` from the active children of its parent into the
    /// parent's tombstones. Returns the parent, or `None` for parentless
    /// nodes, which cannot be deleted.
    pub(crate) fn delete_node(&mut self, target: NodeId, by: AstRef) -> Option<NodeId> {
        let parent = self.node(target).parent?;
        let siblings = &mut self.node_mut(parent).children;
        siblings.retain(|&child| child != target);
        self.node_mut(parent)
            .deleted_nodes
            .push(Tombstone { target, by });
        self.node_mut(target).deleted = true;
        Some(parent)
    }

    /// The tombstone recording the deletion of `target`, if any.
    pub fn tombstone_of(&self, target: NodeId) -> Option<&Tombstone<NodeId>> {
        let parent = self.node(target).parent?;
        self.node(parent)
            .deleted_nodes
            .iter()
            .find(|tombstone| tombstone.target == target)
    }
}
