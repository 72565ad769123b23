//! The scope predicate and the visibility queries built on it.
//!
//! A source element is in scope from a cursor when it ends before the
//! cursor in the same file, or lives in a file earlier in the resolution
//! order. Files are wholly visible or wholly invisible to each other.
//!
//! The visibility queries answer "what could the author see at this point":
//! a node deleted further down is still visible above the delete, and a
//! property overridden later still shows its earlier definition.

use indexmap::IndexMap;

use dtlink_core::{
    identifier::Name,
    span::{FileId, Position, Span},
};
use dtlink_parser::ast::split_unit_address;

use crate::{
    graph::{NodeId, Property},
    runtime::Runtime,
};

/// A position in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub file: FileId,
    pub position: Position,
}

impl Cursor {
    pub fn new(file: FileId, position: Position) -> Self {
        Self { file, position }
    }
}

/// Whether `candidate` is in scope from `cursor` under the file `order`.
///
/// Files missing from `order` see nothing from other files.
///
/// # Examples
///
/// ```
/// # use dtlink::scope::{Cursor, in_scope};
/// # use dtlink_core::span::{FileId, LineIndex, Position};
/// let (a, b) = (FileId::new(0), FileId::new(1));
/// let span = LineIndex::new("x;").span(a, 0..2);
///
/// assert!(in_scope(&[a, b], Cursor::new(b, Position::new(0, 0)), span));
/// assert!(!in_scope(&[b, a], Cursor::new(b, Position::new(9, 0)), span));
/// assert!(in_scope(&[a], Cursor::new(a, Position::new(0, 2)), span));
/// assert!(!in_scope(&[a], Cursor::new(a, Position::new(0, 1)), span));
/// ```
pub fn in_scope(order: &[FileId], cursor: Cursor, candidate: Span) -> bool {
    if candidate.file() == cursor.file {
        return candidate.end_pos() <= cursor.position;
    }
    let rank = |file: FileId| order.iter().position(|&known| known == file);
    match (rank(candidate.file()), rank(cursor.file)) {
        (Some(candidate), Some(origin)) => candidate < origin,
        _ => false,
    }
}

impl Runtime {
    /// [`in_scope`] under this runtime's file order.
    pub fn in_scope(&self, cursor: Cursor, candidate: Span) -> bool {
        in_scope(&self.file_order(), cursor, candidate)
    }

    /// Whether `id` hangs off the root at `cursor`: no ancestor, itself
    /// included, was deleted by a statement in scope.
    fn visible_at(&self, id: NodeId, cursor: Cursor, order: &[FileId]) -> bool {
        let graph = self.graph();
        let mut current = id;
        loop {
            let node = graph.node(current);
            if node.is_deleted() {
                let deleted_here = graph
                    .tombstone_of(current)
                    .is_some_and(|tombstone| in_scope(order, cursor, tombstone.by.span));
                if deleted_here {
                    return false;
                }
            }
            match node.parent() {
                Some(parent) => current = parent,
                None => return current == graph.root(),
            }
        }
    }

    fn defined_at(&self, id: NodeId, cursor: Cursor, order: &[FileId]) -> bool {
        self.graph()
            .node(id)
            .definitions()
            .iter()
            .any(|definition| in_scope(order, cursor, definition.span))
    }

    /// Labels usable at `cursor`, with the node each one names.
    ///
    /// Includes labels of nodes deleted by a statement after the cursor.
    pub fn visible_labels(&self, cursor: Cursor) -> Vec<(Name, NodeId)> {
        let order = self.file_order();
        let mut labels = Vec::new();
        for id in self.graph().ids() {
            if !self.visible_at(id, cursor, &order) {
                continue;
            }
            for label in self.graph().node(id).labels() {
                let entry = (*label.inner(), id);
                if in_scope(&order, cursor, label.span()) && !labels.contains(&entry) {
                    labels.push(entry);
                }
            }
        }
        labels
    }

    /// Children of `node` defined before `cursor` and not yet deleted there.
    pub fn visible_child_definitions(&self, node: NodeId, cursor: Cursor) -> Vec<NodeId> {
        let order = self.file_order();
        let parent = self.graph().node(node);
        let tombstoned = parent.deleted_nodes().iter().map(|tombstone| tombstone.target);
        parent
            .children()
            .iter()
            .copied()
            .chain(tombstoned)
            .filter(|&child| {
                self.visible_at(child, cursor, &order) && self.defined_at(child, cursor, &order)
            })
            .collect()
    }

    /// Properties of `node` as seen from `cursor`, one per name.
    ///
    /// Each entry is the newest definition in scope, replaced ones included.
    /// Properties deleted by a statement after the cursor still show.
    pub fn visible_properties(&self, node: NodeId, cursor: Cursor) -> Vec<&Property> {
        let order = self.file_order();
        let node = self.graph().node(node);
        let tombstoned = node
            .deleted_properties()
            .iter()
            .filter(|tombstone| !in_scope(&order, cursor, tombstone.by.span))
            .map(|tombstone| &tombstone.target);

        let mut visible: IndexMap<Name, &Property> = IndexMap::new();
        for property in node.properties().values().chain(tombstoned) {
            if visible.contains_key(&property.name()) {
                continue;
            }
            let newest = property
                .history()
                .find(|definition| in_scope(&order, cursor, definition.span()));
            if let Some(definition) = newest {
                visible.insert(property.name(), definition);
            }
        }
        visible.into_values().collect()
    }

    /// Resolve a path as seen from `cursor`.
    ///
    /// Like [`Runtime::resolve_path`], but a label must be visible and each
    /// segment must name a child visible at the cursor.
    pub fn child_from_scope<S: AsRef<str>>(&self, segments: &[S], cursor: Cursor) -> Option<NodeId> {
        let (first, rest) = segments.split_first()?;
        let start = match first.as_ref() {
            "/" => self.root(),
            first => {
                let label = Name::new(first.strip_prefix('&')?);
                self.visible_labels(cursor)
                    .into_iter()
                    .rev()
                    .find_map(|(name, node)| (name == label).then_some(node))?
            }
        };

        rest.iter().try_fold(start, |node, segment| {
            let (name, address) = split_unit_address(segment.as_ref());
            let name = Name::new(name);
            let children = self.visible_child_definitions(node, cursor);
            let graph = self.graph();
            let exact = children
                .iter()
                .copied()
                .find(|&child| graph.node(child).is(name, address));
            if exact.is_some() || address.is_some() {
                return exact;
            }
            children
                .iter()
                .copied()
                .find(|&child| graph.node(child).name() == name)
        })
    }
}
