//! Text rendering of a resolved node tree.

use std::fmt;

use dtlink::{SourceMap, graph::NodeId, runtime::Runtime, span::Span};

const INDENT: &str = "    ";

/// Renders the live tree of a [`Runtime`] in devicetree source syntax.
///
/// Properties that replaced earlier definitions note how many they replaced,
/// and deletions are listed as comments with the location of the deleting
/// statement.
pub struct TreeDump<'a> {
    runtime: &'a Runtime,
    sources: &'a SourceMap,
}

impl<'a> TreeDump<'a> {
    pub fn new(runtime: &'a Runtime, sources: &'a SourceMap) -> Self {
        Self { runtime, sources }
    }

    fn location(&self, span: Span) -> String {
        match self.sources.path(span.file()) {
            Some(path) => format!("{}:{}", path.display(), span.start_pos()),
            None => span.to_string(),
        }
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = self.runtime.node(id);
        let indent = INDENT.repeat(depth);
        let inner = INDENT.repeat(depth + 1);

        write!(f, "{indent}")?;
        for label in node.labels() {
            write!(f, "{label}: ")?;
        }
        let name = if node.parent().is_none() {
            "/".to_string()
        } else {
            node.full_name()
        };
        writeln!(f, "{name} {{")?;

        for property in node.properties().values() {
            write!(f, "{inner}")?;
            for label in property.labels() {
                write!(f, "{label}: ")?;
            }
            write!(f, "{}", property.name())?;
            for (i, value) in property.values().iter().enumerate() {
                let separator = if i == 0 { " = " } else { ", " };
                write!(f, "{separator}{value}")?;
            }
            write!(f, ";")?;
            match property.all_replaced().len() {
                0 => writeln!(f)?,
                1 => writeln!(f, " // replaces 1 definition")?,
                n => writeln!(f, " // replaces {n} definitions")?,
            }
        }

        for &child in node.children() {
            self.write_node(f, child, depth + 1)?;
        }

        for tombstone in node.deleted_properties() {
            writeln!(
                f,
                "{inner}// deleted property {} at {}",
                tombstone.target.name(),
                self.location(tombstone.by.span)
            )?;
        }
        for tombstone in node.deleted_nodes() {
            writeln!(
                f,
                "{inner}// deleted node {} at {}",
                self.runtime.node(tombstone.target).full_name(),
                self.location(tombstone.by.span)
            )?;
        }

        writeln!(f, "{indent}}};")
    }
}

impl fmt::Display for TreeDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.runtime.root(), 0)
    }
}
