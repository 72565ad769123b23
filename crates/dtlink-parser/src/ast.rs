//! Syntax tree for devicetree source files.
//!
//! The tree is owned and free of source lifetimes so parsed files can be
//! cached and shared between resolution passes. Every element carries a
//! [`Span`]; statements and reference values additionally carry an [`AstId`],
//! which the linker uses to refer back to the tree without holding pointers.

use std::fmt;

use dtlink_core::{
    identifier::Name,
    span::{FileId, Position, Span, Spanned},
};

/// Stable identity of a statement or reference value within one parse.
///
/// Ids are assigned in pre-order once a file is fully parsed, so they are
/// deterministic for a given source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AstId {
    file: FileId,
    index: u32,
}

impl AstId {
    pub fn new(file: FileId, index: u32) -> Self {
        Self { file, index }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file: FileId,
    pub statements: Vec<Statement>,
    pub includes: Vec<Include>,
}

impl SourceFile {
    /// Build a file and number its statements and references.
    pub fn new(file: FileId, mut statements: Vec<Statement>, includes: Vec<Include>) -> Self {
        let mut ids = IdAllocator { file, next: 0 };
        for statement in &mut statements {
            ids.number_statement(statement);
        }
        Self {
            file,
            statements,
            includes,
        }
    }

    /// The chain of AST elements covering `position`, outermost first.
    ///
    /// At every level the last sibling whose span covers the position wins.
    /// Empty when no top-level statement covers it.
    pub fn ancestry_at(&self, position: Position) -> Vec<AstNode<'_>> {
        let mut chain = Vec::new();
        let mut candidates: Vec<AstNode<'_>> =
            self.statements.iter().map(AstNode::Statement).collect();

        while let Some(next) = candidates
            .iter()
            .rev()
            .find(|node| node.span().covers(self.file, position))
            .copied()
        {
            chain.push(next);
            candidates = next.children();
        }
        chain
    }
}

struct IdAllocator {
    file: FileId,
    next: u32,
}

impl IdAllocator {
    fn next(&mut self) -> AstId {
        let id = AstId::new(self.file, self.next);
        self.next += 1;
        id
    }

    fn number_statement(&mut self, statement: &mut Statement) {
        match statement {
            Statement::Node(block) => {
                block.id = self.next();
                if let NodeKind::Ref(target) = &mut block.kind {
                    match target {
                        RefTarget::Label(label) => label.id = self.next(),
                        RefTarget::Path(path) => path.id = self.next(),
                    }
                }
                for child in &mut block.body {
                    self.number_statement(child);
                }
            }
            Statement::Property(property) => {
                property.id = self.next();
                for value in &mut property.values {
                    self.number_value(value);
                }
            }
            Statement::DeleteNode(delete) => {
                delete.id = self.next();
                match &mut delete.target {
                    DeleteTarget::Name(_) => {}
                    DeleteTarget::Label(label) => label.id = self.next(),
                    DeleteTarget::Path(path) => path.id = self.next(),
                }
            }
            Statement::DeleteProperty(delete) => delete.id = self.next(),
        }
    }

    fn number_value(&mut self, value: &mut Value) {
        match value {
            Value::LabelRef(label) => label.id = self.next(),
            Value::PathRef(path) => path.id = self.next(),
            Value::Cells(cells) => {
                for cell in &mut cells.cells {
                    match cell {
                        Cell::LabelRef(label) => label.id = self.next(),
                        Cell::PathRef(path) => path.id = self.next(),
                        Cell::Number(_) | Cell::Symbol(_) => {}
                    }
                }
            }
            Value::String(_) | Value::Bytes(_) => {}
        }
    }
}

/// A top-level or nested statement.
#[derive(Debug, Clone)]
pub enum Statement {
    Node(NodeBlock),
    Property(PropertyDef),
    DeleteNode(DeleteNode),
    DeleteProperty(DeleteProperty),
}

impl Statement {
    pub fn id(&self) -> AstId {
        match self {
            Statement::Node(block) => block.id,
            Statement::Property(property) => property.id,
            Statement::DeleteNode(delete) => delete.id,
            Statement::DeleteProperty(delete) => delete.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Statement::Node(block) => block.span,
            Statement::Property(property) => property.span,
            Statement::DeleteNode(delete) => delete.span,
            Statement::DeleteProperty(delete) => delete.span,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Statement::Node(_))
    }
}

/// A label definition such as `uart0:`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelAssign {
    pub name: Name,
    pub span: Span,
}

/// A node name with an optional unit address, `serial@1000`.
///
/// Unit addresses that are not a single hexadecimal number stay part of the
/// name, so identity still compares the full text.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeName {
    pub name: Name,
    pub address: Option<u64>,
    pub span: Span,
}

impl NodeName {
    pub fn parse(text: &str, span: Span) -> Self {
        let (name, address) = split_unit_address(text);
        Self {
            name: Name::new(name),
            address,
            span,
        }
    }

    /// Whether this name denotes the node identified by `name` and `address`.
    pub fn matches(&self, name: Name, address: Option<u64>) -> bool {
        self.name == name && self.address == address
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(address) = self.address {
            write!(f, "@{address:x}")?;
        }
        Ok(())
    }
}

/// Split `name@unit` into its name and hexadecimal unit address.
///
/// A unit that is not a single hexadecimal number is kept in the name.
pub fn split_unit_address(text: &str) -> (&str, Option<u64>) {
    text.split_once('@')
        .and_then(|(name, unit)| {
            u64::from_str_radix(unit, 16)
                .ok()
                .map(|address| (name, Some(address)))
        })
        .unwrap_or((text, None))
}

/// `&label`
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRef {
    pub id: AstId,
    pub label: Name,
    pub span: Span,
}

/// `&{/path/to@1}`. An empty segment list denotes the root.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRef {
    pub id: AstId,
    pub segments: Vec<NodeName>,
    pub span: Span,
}

impl fmt::Display for PathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// What a reference block attaches to.
#[derive(Debug, Clone, PartialEq)]
pub enum RefTarget {
    Label(LabelRef),
    Path(PathRef),
}

impl RefTarget {
    pub fn span(&self) -> Span {
        match self {
            RefTarget::Label(label) => label.span,
            RefTarget::Path(path) => path.span,
        }
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Label(label) => write!(f, "&{}", label.label),
            RefTarget::Path(path) => write!(f, "&{{{path}}}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// `/ { ... };` with the span of the `/`.
    Root(Span),
    /// `name@addr { ... };`
    Child(NodeName),
    /// `&label { ... };` or `&{/path} { ... };`
    Ref(RefTarget),
}

/// A node body: root block, child node or reference block.
#[derive(Debug, Clone)]
pub struct NodeBlock {
    pub id: AstId,
    pub kind: NodeKind,
    pub labels: Vec<LabelAssign>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub id: AstId,
    pub labels: Vec<LabelAssign>,
    pub name: Spanned<Name>,
    pub values: Vec<Value>,
    pub span: Span,
}

impl PropertyDef {
    /// Every label and path reference in the value list, in source order.
    pub fn references(&self) -> impl Iterator<Item = Reference<'_>> {
        self.values.iter().flat_map(|value| match value {
            Value::LabelRef(label) => vec![Reference::Label(label)],
            Value::PathRef(path) => vec![Reference::Path(path)],
            Value::Cells(cells) => cells
                .cells
                .iter()
                .filter_map(|cell| match cell {
                    Cell::LabelRef(label) => Some(Reference::Label(label)),
                    Cell::PathRef(path) => Some(Reference::Path(path)),
                    Cell::Number(_) | Cell::Symbol(_) => None,
                })
                .collect(),
            Value::String(_) | Value::Bytes(_) => Vec::new(),
        })
    }

    /// The first number of the first cell list, as used by `phandle`.
    pub fn first_cell(&self) -> Option<u64> {
        self.values.iter().find_map(|value| match value {
            Value::Cells(cells) => match cells.cells.first() {
                Some(Cell::Number(number)) => Some(*number.inner()),
                _ => None,
            },
            _ => None,
        })
    }
}

/// A reference embedded in a property value.
#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    Label(&'a LabelRef),
    Path(&'a PathRef),
}

impl Reference<'_> {
    pub fn id(&self) -> AstId {
        match self {
            Reference::Label(label) => label.id,
            Reference::Path(path) => path.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Reference::Label(label) => label.span,
            Reference::Path(path) => path.span,
        }
    }
}

/// One comma separated element of a property value.
#[derive(Debug, Clone)]
pub enum Value {
    String(Spanned<String>),
    Cells(Cells),
    Bytes(Spanned<Vec<u8>>),
    LabelRef(LabelRef),
    PathRef(PathRef),
}

impl Value {
    pub fn span(&self) -> Span {
        match self {
            Value::String(string) => string.span(),
            Value::Cells(cells) => cells.span,
            Value::Bytes(bytes) => bytes.span(),
            Value::LabelRef(label) => label.span,
            Value::PathRef(path) => path.span,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(string) => write!(f, "\"{}\"", string.inner()),
            Value::Cells(cells) => {
                write!(f, "<")?;
                for (i, cell) in cells.cells.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{cell}")?;
                }
                write!(f, ">")
            }
            Value::Bytes(bytes) => {
                write!(f, "[")?;
                for (i, byte) in bytes.inner().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{byte:02x}")?;
                }
                write!(f, "]")
            }
            Value::LabelRef(label) => write!(f, "&{}", label.label),
            Value::PathRef(path) => write!(f, "&{{{path}}}"),
        }
    }
}

/// A `<...>` cell list.
#[derive(Debug, Clone)]
pub struct Cells {
    pub cells: Vec<Cell>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Cell {
    Number(Spanned<u64>),
    /// A name left behind by the preprocessor, such as `GIC_SPI`.
    Symbol(Spanned<Name>),
    LabelRef(LabelRef),
    PathRef(PathRef),
}

impl Cell {
    pub fn span(&self) -> Span {
        match self {
            Cell::Number(number) => number.span(),
            Cell::Symbol(symbol) => symbol.span(),
            Cell::LabelRef(label) => label.span,
            Cell::PathRef(path) => path.span,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(number) => write!(f, "{:#x}", number.inner()),
            Cell::Symbol(symbol) => write!(f, "{}", symbol.inner()),
            Cell::LabelRef(label) => write!(f, "&{}", label.label),
            Cell::PathRef(path) => write!(f, "&{{{path}}}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeleteTarget {
    Name(NodeName),
    Label(LabelRef),
    Path(PathRef),
}

impl DeleteTarget {
    pub fn span(&self) -> Span {
        match self {
            DeleteTarget::Name(name) => name.span,
            DeleteTarget::Label(label) => label.span,
            DeleteTarget::Path(path) => path.span,
        }
    }
}

impl fmt::Display for DeleteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteTarget::Name(name) => write!(f, "{name}"),
            DeleteTarget::Label(label) => write!(f, "&{}", label.label),
            DeleteTarget::Path(path) => write!(f, "&{{{path}}}"),
        }
    }
}

/// `/delete-node/ target;`
#[derive(Debug, Clone)]
pub struct DeleteNode {
    pub id: AstId,
    pub keyword: Span,
    pub target: DeleteTarget,
    pub span: Span,
}

/// `/delete-property/ name;`
#[derive(Debug, Clone)]
pub struct DeleteProperty {
    pub id: AstId,
    pub keyword: Span,
    pub name: Spanned<Name>,
    pub span: Span,
}

/// `/include/ "file"`, `#include "file"` or `#include <file>`.
#[derive(Debug, Clone)]
pub struct Include {
    pub path: Spanned<String>,
    /// Quoted includes also search the including file's directory.
    pub quoted: bool,
    pub span: Span,
}

/// A borrowed view of any element of the tree, for position lookups.
#[derive(Debug, Clone, Copy)]
pub enum AstNode<'a> {
    Statement(&'a Statement),
    NodeName(&'a NodeName),
    Label(&'a LabelAssign),
    LabelRef(&'a LabelRef),
    PathRef(&'a PathRef),
    PropertyName(&'a Spanned<Name>),
    Value(&'a Value),
    Cell(&'a Cell),
    /// A directive keyword such as `/delete-node/`.
    Keyword(Span),
}

impl<'a> AstNode<'a> {
    pub fn span(&self) -> Span {
        match self {
            AstNode::Statement(statement) => statement.span(),
            AstNode::NodeName(name) => name.span,
            AstNode::Label(label) => label.span,
            AstNode::LabelRef(label) => label.span,
            AstNode::PathRef(path) => path.span,
            AstNode::PropertyName(name) => name.span(),
            AstNode::Value(value) => value.span(),
            AstNode::Cell(cell) => cell.span(),
            AstNode::Keyword(span) => *span,
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<AstNode<'a>> {
        match *self {
            AstNode::Statement(Statement::Node(block)) => {
                let mut children: Vec<_> = block.labels.iter().map(AstNode::Label).collect();
                match &block.kind {
                    NodeKind::Root(slash) => children.push(AstNode::Keyword(*slash)),
                    NodeKind::Child(name) => children.push(AstNode::NodeName(name)),
                    NodeKind::Ref(RefTarget::Label(label)) => children.push(AstNode::LabelRef(label)),
                    NodeKind::Ref(RefTarget::Path(path)) => children.push(AstNode::PathRef(path)),
                }
                children.extend(block.body.iter().map(AstNode::Statement));
                children
            }
            AstNode::Statement(Statement::Property(property)) => {
                let mut children: Vec<_> = property.labels.iter().map(AstNode::Label).collect();
                children.push(AstNode::PropertyName(&property.name));
                children.extend(property.values.iter().map(AstNode::Value));
                children
            }
            AstNode::Statement(Statement::DeleteNode(delete)) => {
                let target = match &delete.target {
                    DeleteTarget::Name(name) => AstNode::NodeName(name),
                    DeleteTarget::Label(label) => AstNode::LabelRef(label),
                    DeleteTarget::Path(path) => AstNode::PathRef(path),
                };
                vec![AstNode::Keyword(delete.keyword), target]
            }
            AstNode::Statement(Statement::DeleteProperty(delete)) => {
                vec![
                    AstNode::Keyword(delete.keyword),
                    AstNode::PropertyName(&delete.name),
                ]
            }
            AstNode::Value(Value::Cells(cells)) => cells.cells.iter().map(AstNode::Cell).collect(),
            AstNode::Value(Value::LabelRef(label)) | AstNode::Cell(Cell::LabelRef(label)) => {
                vec![AstNode::LabelRef(label)]
            }
            AstNode::Value(Value::PathRef(path)) | AstNode::Cell(Cell::PathRef(path)) => {
                vec![AstNode::PathRef(path)]
            }
            AstNode::PathRef(path) => path.segments.iter().map(AstNode::NodeName).collect(),
            _ => Vec::new(),
        }
    }
}

/// Parse a cell number: hexadecimal with `0x`, octal with a leading `0`,
/// decimal otherwise. C integer suffixes are ignored.
pub fn parse_number(text: &str) -> Option<u64> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok();
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return u64::from_str_radix(&digits[1..], 8).ok();
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use dtlink_core::span::LineIndex;

    use super::*;

    fn span(text: &str) -> Span {
        LineIndex::new(text).span(FileId::default(), 0..text.len())
    }

    #[test]
    fn test_node_name_with_address() {
        let name = NodeName::parse("serial@4000c000", span("serial@4000c000"));
        assert_eq!(name.name, "serial");
        assert_eq!(name.address, Some(0x4000_c000));
        assert_eq!(name.to_string(), "serial@4000c000");
    }

    #[test]
    fn test_node_name_without_address() {
        let name = NodeName::parse("chosen", span("chosen"));
        assert_eq!(name.name, "chosen");
        assert_eq!(name.address, None);
    }

    #[test]
    fn test_node_name_with_compound_unit() {
        let name = NodeName::parse("ethernet@0,1", span("ethernet@0,1"));
        assert_eq!(name.name, "ethernet@0,1");
        assert_eq!(name.address, None);
    }

    #[test]
    fn test_node_name_address_normalises() {
        let a = NodeName::parse("cpu@0", span("cpu@0"));
        let b = NodeName::parse("cpu@00", span("cpu@00"));
        assert!(a.matches(b.name, b.address));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("0x10"), Some(16));
        assert_eq!(parse_number("0X1f"), Some(31));
        assert_eq!(parse_number("010"), Some(8));
        assert_eq!(parse_number("0"), Some(0));
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("42UL"), Some(42));
        assert_eq!(parse_number("GIC_SPI"), None);
    }

    #[test]
    fn test_path_ref_display() {
        let root = PathRef {
            id: AstId::default(),
            segments: Vec::new(),
            span: span("/"),
        };
        assert_eq!(root.to_string(), "/");

        let nested = PathRef {
            id: AstId::default(),
            segments: vec![
                NodeName::parse("soc", span("soc")),
                NodeName::parse("uart@1000", span("uart@1000")),
            ],
            span: span("/soc/uart@1000"),
        };
        assert_eq!(nested.to_string(), "/soc/uart@1000");
    }
}
