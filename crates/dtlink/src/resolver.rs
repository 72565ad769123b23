//! The linker pass.
//!
//! [`resolve`] walks the top-level statements of every file in order and
//! builds one merged [`Graph`](crate::graph::Graph). Within each block body
//! node definitions are processed before properties and deletes, so a
//! statement may refer to a sibling node defined later in the same block.
//!
//! Failures never stop the pass. An unresolved reference block is still
//! walked against a detached stand-in node so nested statements produce
//! their own issues.

use std::{collections::HashSet, mem, sync::Arc};

use indexmap::{IndexMap, map::Entry};
use log::{debug, trace};

use dtlink_core::{
    identifier::Name,
    span::{Span, Spanned},
};
use dtlink_parser::{
    ParsedFile,
    ast::{
        DeleteNode, DeleteProperty, DeleteTarget, LabelAssign, LabelRef, NodeBlock, NodeKind,
        NodeName, PathRef, PropertyDef, RefTarget, Reference, SourceFile, Statement,
    },
};

use crate::{
    config::DiagnosticsConfig,
    graph::{AstRef, NodeId, Property, Tombstone},
    issue::{Issue, IssueKind},
    runtime::Runtime,
};

/// Resolve `files`, in order, into a new [`Runtime`].
///
/// # Examples
///
/// ```
/// # use std::sync::Arc;
/// # use dtlink::{config::DiagnosticsConfig, resolver::resolve};
/// # use dtlink_core::span::FileId;
/// let parsed = dtlink_parser::parse("/ { a: node { }; };\n&a { status = \"okay\"; };", FileId::new(0));
/// let runtime = resolve(vec![Arc::new(parsed)], &DiagnosticsConfig::default(), 1);
///
/// let node = runtime.label("a").unwrap();
/// assert_eq!(runtime.node(node).definitions().len(), 2);
/// assert!(runtime.issues().is_empty());
/// ```
pub fn resolve(files: Vec<Arc<ParsedFile>>, config: &DiagnosticsConfig, generation: u64) -> Runtime {
    let mut resolver = Resolver::new(config, Runtime::new(generation, files.clone()));
    for parsed in &files {
        resolver.process_file(&parsed.ast);
    }
    resolver.finish()
}

/// The node statements of a body are currently applied to.
#[derive(Debug, Clone, Copy)]
struct Scope {
    node: NodeId,
    /// Set below an unresolved reference block.
    detached: bool,
}

struct Resolver<'cfg> {
    config: &'cfg DiagnosticsConfig,
    runtime: Runtime,
    pending_labels: Vec<LabelRef>,
    pending_paths: Vec<PathRef>,
}

impl<'cfg> Resolver<'cfg> {
    fn new(config: &'cfg DiagnosticsConfig, runtime: Runtime) -> Self {
        Self {
            config,
            runtime,
            pending_labels: Vec::new(),
            pending_paths: Vec::new(),
        }
    }

    fn process_file(&mut self, file: &SourceFile) {
        let issues_before = self.runtime.issues.len();
        let scope = Scope {
            node: self.runtime.root(),
            detached: false,
        };
        for statement in &file.statements {
            self.process_statement(scope, statement);
        }
        debug!(
            file:% = file.file,
            statements = file.statements.len(),
            issues = self.runtime.issues.len() - issues_before;
            "Resolved file"
        );
    }

    fn finish(mut self) -> Runtime {
        self.retry_pending_paths();
        if self.config.report_unresolved_values() {
            for label in mem::take(&mut self.pending_labels) {
                self.report(Issue::new(
                    IssueKind::UnableToResolveChildNode,
                    label.span,
                    label.label.to_string(),
                ));
            }
        }
        self.check_label_uniqueness();

        debug!(
            generation = self.runtime.generation,
            nodes = self.runtime.graph.len(),
            labels = self.runtime.label_table.len(),
            issues = self.runtime.issues.len();
            "Resolution pass complete"
        );
        self.runtime
    }

    fn report(&mut self, issue: Issue) {
        trace!(issue:% = issue; "Recorded issue");
        self.runtime.issues.push(issue);
    }

    /// Process a block body: node definitions first, then everything else,
    /// each group in source order.
    fn process_body(&mut self, scope: Scope, body: &[Statement]) {
        self.check_duplicate_names(body);

        let (nodes, rest): (Vec<&Statement>, Vec<&Statement>) =
            body.iter().partition(|statement| statement.is_node());
        for statement in nodes.into_iter().chain(rest) {
            self.process_statement(scope, statement);
        }
    }

    fn process_statement(&mut self, scope: Scope, statement: &Statement) {
        match statement {
            Statement::Node(block) => self.process_node_block(scope, block),
            Statement::Property(property) => self.process_property(scope, property),
            Statement::DeleteNode(delete) => self.process_delete_node(scope, delete),
            Statement::DeleteProperty(delete) => self.process_delete_property(scope, delete),
        }
    }

    /// Report sibling child definitions that collide on `(name, address)`
    /// with no delete of that name between them.
    fn check_duplicate_names(&mut self, body: &[Statement]) {
        let mut seen: Vec<&NodeName> = Vec::new();
        for statement in body {
            match statement {
                Statement::Node(NodeBlock {
                    kind: NodeKind::Child(name),
                    ..
                }) => {
                    let first = seen
                        .iter()
                        .find(|seen| seen.matches(name.name, name.address))
                        .map(|first| first.span);
                    match first {
                        Some(first) => self.report(
                            Issue::new(IssueKind::DuplicateNodeName, name.span, name.to_string())
                                .with_related([first]),
                        ),
                        None => seen.push(name),
                    }
                }
                Statement::DeleteNode(DeleteNode {
                    target: DeleteTarget::Name(name),
                    ..
                }) => seen.retain(|seen| !seen.matches(name.name, name.address)),
                _ => {}
            }
        }
    }

    fn process_node_block(&mut self, scope: Scope, block: &NodeBlock) {
        let block_ref = AstRef::new(block.id, block.span);
        match &block.kind {
            NodeKind::Root(_) => {
                self.runtime.roots.push(block_ref);
                let root = self.runtime.root();
                self.define(root, block, false);
            }
            NodeKind::Child(name) => {
                let graph = &mut self.runtime.graph;
                let node = match graph.find_child(scope.node, name.name, name.address) {
                    Some(existing) => existing,
                    None => graph.add_child(scope.node, name.name, name.address),
                };
                trace!(node:% = name, parent:% = scope.node, detached = scope.detached; "Child node");
                self.define(node, block, scope.detached);
            }
            NodeKind::Ref(target) => match self.resolve_target(target) {
                Some(node) => {
                    trace!(reference:% = target, node:% = node; "Linked reference block");
                    self.runtime.reference_blocks.push(block_ref);
                    self.runtime.graph.node_mut(node).referenced_by.push(block_ref);
                    self.define(node, block, false);
                }
                None => {
                    trace!(reference:% = target; "Unlinked reference block");
                    self.runtime.unlinked_reference_blocks.push(block_ref);
                    let subject = match target {
                        RefTarget::Label(label) => label.label.to_string(),
                        RefTarget::Path(path) => path.to_string(),
                    };
                    self.report(Issue::new(
                        IssueKind::UnableToResolveChildNode,
                        target.span(),
                        subject,
                    ));
                    let stand_in = self.runtime.graph.add_detached();
                    self.define(stand_in, block, true);
                }
            },
        }
    }

    /// Record `block` as a definition of `node` and walk its body.
    fn define(&mut self, node: NodeId, block: &NodeBlock, detached: bool) {
        self.runtime
            .graph
            .node_mut(node)
            .definitions
            .push(AstRef::new(block.id, block.span));
        self.runtime.owners.insert(block.id, node);
        self.bind_labels(node, &block.labels, detached);
        self.process_body(Scope { node, detached }, &block.body);
    }

    fn bind_labels(&mut self, node: NodeId, labels: &[LabelAssign], detached: bool) {
        for label in labels {
            self.runtime
                .graph
                .node_mut(node)
                .labels
                .push(Spanned::new(label.name, label.span));
            if detached {
                continue;
            }
            trace!(label:% = label.name, node:% = node; "Bound label");
            self.runtime.label_table.insert(label.name, node);
            self.link_pending_labels(label.name, node);
        }
    }

    /// Link every queued property reference to `label`, now bound to `node`.
    fn link_pending_labels(&mut self, label: Name, node: NodeId) {
        let (matched, rest): (Vec<_>, Vec<_>) = mem::take(&mut self.pending_labels)
            .into_iter()
            .partition(|pending| pending.label == label);
        self.pending_labels = rest;
        for reference in &matched {
            self.link_label(reference, node);
        }
    }

    fn resolve_target(&mut self, target: &RefTarget) -> Option<NodeId> {
        match target {
            RefTarget::Label(label) => {
                let node = self.runtime.label_table.get(&label.label).copied()?;
                self.link_label(label, node);
                Some(node)
            }
            RefTarget::Path(path) => self.link_path(path),
        }
    }

    fn link_label(&mut self, reference: &LabelRef, node: NodeId) {
        self.runtime.links.insert(reference.id, node);
        self.runtime
            .graph
            .node_mut(node)
            .linked_ref_labels
            .push(AstRef::new(reference.id, reference.span));
    }

    /// The nodes each leading segment of `path` resolves to.
    fn walk_path(&self, path: &PathRef) -> Vec<NodeId> {
        let graph = &self.runtime.graph;
        let mut resolved = Vec::with_capacity(path.segments.len());
        let mut current = graph.root();
        for segment in &path.segments {
            match graph.lookup(current, segment.name, segment.address) {
                Some(next) => {
                    resolved.push(next);
                    current = next;
                }
                None => break,
            }
        }
        resolved
    }

    fn link_segments(&mut self, path: &PathRef, resolved: &[NodeId]) {
        for (segment, &node) in path.segments.iter().zip(resolved) {
            self.runtime
                .graph
                .node_mut(node)
                .linked_node_paths
                .push(AstRef::new(path.id, segment.span));
        }
    }

    /// Link `path` if every segment resolves. Nothing is linked otherwise.
    fn link_path(&mut self, path: &PathRef) -> Option<NodeId> {
        let resolved = self.walk_path(path);
        if resolved.len() != path.segments.len() {
            return None;
        }
        self.link_segments(path, &resolved);
        let target = resolved.last().copied().unwrap_or(self.runtime.root());
        self.runtime.links.insert(path.id, target);
        Some(target)
    }

    fn retry_pending_paths(&mut self) {
        for path in mem::take(&mut self.pending_paths) {
            if self.link_path(&path).is_some() {
                trace!(path:% = path; "Linked path value on retry");
                continue;
            }
            let resolved = self.walk_path(&path);
            self.link_segments(&path, &resolved);
            if self.config.report_unresolved_values() {
                self.report(Issue::new(
                    IssueKind::UnableToResolveChildNode,
                    path.span,
                    path.to_string(),
                ));
            }
        }
    }

    fn process_property(&mut self, scope: Scope, definition: &PropertyDef) {
        self.runtime.owners.insert(definition.id, scope.node);

        let name = *definition.name.inner();
        let property = Property::new(definition.clone());
        match self.runtime.graph.node_mut(scope.node).properties.entry(name) {
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(property);
                entry.get_mut().supersede(previous);
            }
            Entry::Vacant(entry) => {
                entry.insert(property);
            }
        }

        for reference in definition.references() {
            match reference {
                Reference::Label(label) => {
                    match self.runtime.label_table.get(&label.label).copied() {
                        Some(node) => self.link_label(label, node),
                        None => self.pending_labels.push(label.clone()),
                    }
                }
                Reference::Path(path) => {
                    if self.link_path(path).is_none() {
                        self.pending_paths.push(path.clone());
                    }
                }
            }
        }
    }

    fn process_delete_node(&mut self, scope: Scope, delete: &DeleteNode) {
        self.runtime.owners.insert(delete.id, scope.node);
        let by = AstRef::new(delete.id, delete.span);

        match &delete.target {
            DeleteTarget::Name(name) => {
                match self.runtime.graph.find_child(scope.node, name.name, name.address) {
                    Some(target) => {
                        self.delete_node(target, by);
                    }
                    None => self.report(Issue::new(
                        IssueKind::NodeDoesNotExist,
                        name.span,
                        name.to_string(),
                    )),
                }
            }
            DeleteTarget::Label(label) => {
                let target = self.runtime.label_table.get(&label.label).copied();
                if let Some(node) = target {
                    self.link_label(label, node);
                }
                self.delete_global(target, by, label.span, label.label.to_string());
            }
            DeleteTarget::Path(path) => {
                let target = self.link_path(path);
                self.delete_global(target, by, path.span, path.to_string());
            }
        }
    }

    /// Apply a label or path delete. Unresolved targets, and the root, are
    /// recorded as unlinked.
    fn delete_global(&mut self, target: Option<NodeId>, by: AstRef, span: Span, subject: String) {
        match target.and_then(|node| self.delete_node(node, by)) {
            Some(_) => self.runtime.global_deletes.push(by),
            None => {
                self.runtime.unlinked_deletes.push(by);
                self.report(Issue::new(IssueKind::UnableToResolveChildNode, span, subject));
            }
        }
    }

    /// Tombstone `target` in its parent and purge every label bound to it or
    /// one of its descendants.
    fn delete_node(&mut self, target: NodeId, by: AstRef) -> Option<NodeId> {
        let parent = self.runtime.graph.delete_node(target, by)?;
        let doomed: HashSet<NodeId> = self.runtime.graph.subtree(target).into_iter().collect();
        self.runtime
            .label_table
            .retain(|_, node| !doomed.contains(node));
        trace!(node:% = target, parent:% = parent, by:% = by.span; "Deleted node");
        Some(parent)
    }

    fn process_delete_property(&mut self, scope: Scope, delete: &DeleteProperty) {
        self.runtime.owners.insert(delete.id, scope.node);
        let name = *delete.name.inner();
        let node = self.runtime.graph.node_mut(scope.node);

        match node.properties.shift_remove(&name) {
            Some(property) => node.deleted_properties.push(Tombstone {
                target: property,
                by: AstRef::new(delete.id, delete.span),
            }),
            None => self.report(Issue::new(
                IssueKind::PropertyDoesNotExist,
                delete.name.span(),
                name.to_string(),
            )),
        }
    }

    /// Group every label of a live node or property by text and report each
    /// group bound to more than one owner once, at its first occurrence.
    fn check_label_uniqueness(&mut self) {
        let graph = &self.runtime.graph;
        let mut groups: IndexMap<Name, Vec<(Span, LabelOwner)>> = IndexMap::new();
        for id in graph.live_nodes() {
            let node = graph.node(id);
            for label in node.labels() {
                groups
                    .entry(*label.inner())
                    .or_default()
                    .push((label.span(), LabelOwner::Node(id)));
            }
            for property in node.properties().values() {
                for label in property.labels() {
                    groups
                        .entry(*label.inner())
                        .or_default()
                        .push((label.span(), LabelOwner::Property(id, property.name())));
                }
            }
        }

        let mut issues = Vec::new();
        for (label, mut members) in groups {
            members.sort_by_key(|(span, _)| (self.runtime.file_rank(span.file()), span.start()));
            let Some(&(first_span, first_owner)) = members.first() else {
                continue;
            };
            if members.iter().all(|(_, owner)| *owner == first_owner) {
                continue;
            }
            issues.push(
                Issue::new(IssueKind::LabelAlreadyInUse, first_span, label.to_string())
                    .with_related(members[1..].iter().map(|(span, _)| *span)),
            );
        }
        for issue in issues {
            self.report(issue);
        }
    }
}

/// What a label is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelOwner {
    Node(NodeId),
    Property(NodeId, Name),
}

#[cfg(test)]
mod tests {
    use dtlink_core::span::FileId;

    use super::*;

    fn resolve_sources(sources: &[&str]) -> Runtime {
        let files = sources
            .iter()
            .enumerate()
            .map(|(i, source)| Arc::new(dtlink_parser::parse(source, FileId::new(i as u32))))
            .collect();
        resolve(files, &DiagnosticsConfig::default(), 0)
    }

    fn kinds(runtime: &Runtime) -> Vec<IssueKind> {
        runtime.issues().iter().map(Issue::kind).collect()
    }

    #[test]
    fn test_body_nodes_before_properties() {
        // The delete precedes the node textually but still finds it.
        let runtime = resolve_sources(&["/ { /delete-node/ a; a { }; };"]);
        assert!(runtime.issues().is_empty(), "{:?}", runtime.issues());
        assert!(runtime.resolve("/a").is_none());
        assert_eq!(runtime.node(runtime.root()).deleted_nodes().len(), 1);
    }

    #[test]
    fn test_duplicate_sibling_names() {
        let runtime = resolve_sources(&["/ { a { }; a { }; b@1 { }; b@2 { }; };"]);
        assert_eq!(kinds(&runtime), [IssueKind::DuplicateNodeName]);
        // Duplicates still merge into one node.
        let a = runtime.resolve("/a").unwrap();
        assert_eq!(runtime.node(a).definitions().len(), 2);
        assert_eq!(runtime.issues()[0].related().len(), 1);
    }

    #[test]
    fn test_pending_label_linked_when_bound() {
        let runtime = resolve_sources(&["/ { p = <&late>; late: node { }; };"]);
        // Node blocks run first, so the reference links immediately.
        assert!(runtime.issues().is_empty());

        let runtime = resolve_sources(&["/ { p = <&late>; };", "/ { late: node { }; };"]);
        assert!(runtime.issues().is_empty());
        let node = runtime.label("late").unwrap();
        assert_eq!(runtime.node(node).linked_ref_labels().len(), 1);
    }

    #[test]
    fn test_unresolved_value_reported_at_end() {
        let runtime = resolve_sources(&["/ { p = <&nowhere>, &{/missing/path}; };"]);
        assert_eq!(
            kinds(&runtime),
            [
                IssueKind::UnableToResolveChildNode,
                IssueKind::UnableToResolveChildNode
            ]
        );
        assert_eq!(runtime.issues()[0].args(), ["/missing/path"]);
        assert_eq!(runtime.issues()[1].args(), ["nowhere"]);
    }

    #[test]
    fn test_unresolved_values_can_be_silenced() {
        let parsed = dtlink_parser::parse("/ { p = <&nowhere>; };", FileId::new(0));
        let runtime = resolve(
            vec![Arc::new(parsed)],
            &DiagnosticsConfig::new(false, false),
            0,
        );
        assert!(runtime.issues().is_empty());
    }

    #[test]
    fn test_path_value_retried_at_end() {
        let runtime = resolve_sources(&["/ { p = &{/later}; };", "/ { later { }; };"]);
        assert!(runtime.issues().is_empty(), "{:?}", runtime.issues());
        let later = runtime.resolve("/later").unwrap();
        assert_eq!(runtime.node(later).linked_node_paths().len(), 1);
    }

    #[test]
    fn test_delete_root_by_path_is_unlinked() {
        let runtime = resolve_sources(&["/delete-node/ &{/};"]);
        assert_eq!(kinds(&runtime), [IssueKind::UnableToResolveChildNode]);
        assert_eq!(runtime.unlinked_deletes().len(), 1);
    }

    #[test]
    fn test_labels_in_detached_scope_are_not_bound() {
        let runtime = resolve_sources(&["&missing { inner: child { }; };"]);
        assert_eq!(kinds(&runtime), [IssueKind::UnableToResolveChildNode]);
        assert!(runtime.label("inner").is_none());
    }

    #[test]
    fn test_label_on_same_node_twice_is_not_a_conflict() {
        let runtime = resolve_sources(&["/ { l: a { }; };\n/ { l: a { }; };"]);
        assert!(runtime.issues().is_empty(), "{:?}", runtime.issues());
    }

    #[test]
    fn test_property_label_conflicts_with_node_label() {
        let runtime = resolve_sources(&["/ { l: p = <1>; l: a { }; };"]);
        assert_eq!(kinds(&runtime), [IssueKind::LabelAlreadyInUse]);
    }
}
