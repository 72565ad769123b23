//! The result of one resolution pass.
//!
//! A [`Runtime`] owns the merged node [`Graph`], the label table, the
//! classification of top-level statements and the issues found on the way.
//! It is built once by the resolver and read-only afterwards.

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;

use dtlink_core::{
    identifier::Name,
    span::{FileId, Position},
};
use dtlink_parser::{
    ParsedFile,
    ast::{AstId, AstNode, Statement},
};

use crate::{
    graph::{AstRef, Graph, Node, NodeId},
    issue::Issue,
};

/// Property names holding a node's phandle.
const PHANDLE_PROPERTIES: [&str; 2] = ["phandle", "linux,phandle"];

/// A resolved graph together with everything recorded while building it.
#[derive(Debug)]
pub struct Runtime {
    pub(crate) generation: u64,
    pub(crate) files: Vec<Arc<ParsedFile>>,
    pub(crate) graph: Graph,
    pub(crate) roots: Vec<AstRef>,
    pub(crate) reference_blocks: Vec<AstRef>,
    pub(crate) unlinked_reference_blocks: Vec<AstRef>,
    pub(crate) unlinked_deletes: Vec<AstRef>,
    pub(crate) global_deletes: Vec<AstRef>,
    pub(crate) label_table: IndexMap<Name, NodeId>,
    pub(crate) owners: HashMap<AstId, NodeId>,
    pub(crate) links: HashMap<AstId, NodeId>,
    pub(crate) issues: Vec<Issue>,
}

/// The deepest AST element covering a position and the node it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct DeepestAst<'a> {
    /// The node the innermost statement defines or sits in.
    pub node: NodeId,
    /// The innermost statement covering the position.
    pub statement: &'a Statement,
    /// The most specific element covering the position.
    pub element: AstNode<'a>,
}

impl Runtime {
    pub(crate) fn new(generation: u64, files: Vec<Arc<ParsedFile>>) -> Self {
        Self {
            generation,
            files,
            graph: Graph::new(),
            roots: Vec::new(),
            reference_blocks: Vec::new(),
            unlinked_reference_blocks: Vec::new(),
            unlinked_deletes: Vec::new(),
            global_deletes: Vec::new(),
            label_table: IndexMap::new(),
            owners: HashMap::new(),
            links: HashMap::new(),
            issues: Vec::new(),
        }
    }

    /// Monotonic number of the pass that produced this runtime.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn root(&self) -> NodeId {
        self.graph.root()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.graph.node(id)
    }

    /// Files in resolution order.
    pub fn file_order(&self) -> Vec<FileId> {
        self.files.iter().map(|parsed| parsed.ast.file).collect()
    }

    /// Position of `file` in the resolution order.
    pub fn file_rank(&self, file: FileId) -> Option<usize> {
        self.files.iter().position(|parsed| parsed.ast.file == file)
    }

    pub fn parsed(&self, file: FileId) -> Option<&ParsedFile> {
        self.files
            .iter()
            .find(|parsed| parsed.ast.file == file)
            .map(Arc::as_ref)
    }

    /// Issues recorded by the pass, in the order they were found.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Top-level root blocks.
    pub fn roots(&self) -> &[AstRef] {
        &self.roots
    }

    /// Reference blocks whose target resolved.
    pub fn reference_blocks(&self) -> &[AstRef] {
        &self.reference_blocks
    }

    /// Reference blocks whose target did not resolve.
    pub fn unlinked_reference_blocks(&self) -> &[AstRef] {
        &self.unlinked_reference_blocks
    }

    /// Label and path deletes whose target did not resolve.
    pub fn unlinked_deletes(&self) -> &[AstRef] {
        &self.unlinked_deletes
    }

    /// Label and path deletes that were applied.
    pub fn global_deletes(&self) -> &[AstRef] {
        &self.global_deletes
    }

    /// Label text to live node.
    pub fn label_table(&self) -> &IndexMap<Name, NodeId> {
        &self.label_table
    }

    pub fn label(&self, label: &str) -> Option<NodeId> {
        self.label_table.get(&Name::new(label)).copied()
    }

    /// The node a statement defines or was evaluated in.
    pub fn owner(&self, statement: AstId) -> Option<NodeId> {
        self.owners.get(&statement).copied()
    }

    /// The node a label or path reference resolved to.
    pub fn linked_node(&self, reference: AstId) -> Option<NodeId> {
        self.links.get(&reference).copied()
    }

    /// Resolve a path given as segments.
    ///
    /// The first segment is `/` for the root or `&label`; the rest are node
    /// names with optional unit addresses.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dtlink::{Context, MemorySources, config::AppConfig};
    /// let sources = MemorySources::new().with_file("board.dts", "/ { soc { l: uart@1000 { }; }; };");
    /// let mut context = Context::new("board.dts", sources, AppConfig::default());
    /// let runtime = context.runtime().unwrap();
    ///
    /// let uart = runtime.resolve_path(&["/", "soc", "uart@1000"]).unwrap();
    /// assert_eq!(runtime.resolve_path(&["&l"]), Some(uart));
    /// assert_eq!(runtime.resolve_path(&["/", "soc", "uart"]), Some(uart));
    /// ```
    pub fn resolve_path<S: AsRef<str>>(&self, segments: &[S]) -> Option<NodeId> {
        let (first, rest) = segments.split_first()?;
        let start = match first.as_ref() {
            "/" => self.root(),
            first => self.label(first.strip_prefix('&')?)?,
        };
        rest.iter().try_fold(start, |node, segment| {
            self.graph.lookup_child(node, segment.as_ref())
        })
    }

    /// Resolve `/a/b@1` or `&label/a`.
    pub fn resolve(&self, path: &str) -> Option<NodeId> {
        let (head, rest) = match path.strip_prefix('/') {
            Some(rest) => ("/", rest),
            None => path.split_once('/').unwrap_or((path, "")),
        };
        let segments: Vec<&str> = std::iter::once(head)
            .chain(rest.split('/').filter(|segment| !segment.is_empty()))
            .collect();
        self.resolve_path(&segments)
    }

    /// Every live node whose `phandle` or `linux,phandle` is `value`, in
    /// tree order.
    pub fn all_nodes_with_phandle(&self, value: u64) -> Vec<NodeId> {
        self.graph
            .live_nodes()
            .into_iter()
            .filter(|&id| {
                let node = self.graph.node(id);
                PHANDLE_PROPERTIES.iter().any(|name| {
                    node.property(name)
                        .and_then(|property| property.first_cell())
                        == Some(value)
                })
            })
            .collect()
    }

    /// Find the deepest AST element covering `position` in `file`.
    ///
    /// Among siblings covering the position the last declared wins.
    pub fn deepest_ast_node(&self, file: FileId, position: Position) -> Option<DeepestAst<'_>> {
        let parsed = self.parsed(file)?;
        let chain = parsed.ast.ancestry_at(position);
        let element = *chain.last()?;
        let statement = chain.iter().rev().find_map(|node| match node {
            AstNode::Statement(statement) => Some(*statement),
            _ => None,
        })?;
        let node = self.owner(statement.id())?;
        Some(DeepestAst {
            node,
            statement,
            element,
        })
    }
}

