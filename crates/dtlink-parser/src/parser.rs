//! Parser for devicetree source tokens.
//!
//! This module transforms a token stream from the [`lexer`](super::lexer),
//! with whitespace and comments already removed, into the [`ast`](super::ast)
//! tree. The public entry point is [`build_source_file`].
//!
//! Parsing recovers at statement granularity: a statement that fails to
//! parse is reported and skipped up to the next `;` at its own nesting depth,
//! and parsing resumes with the following statement in the same block.

use winnow::{
    Parser as _,
    combinator::{cut_err, opt, repeat},
    error::{ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use dtlink_core::{
    identifier::Name,
    span::{FileId, Position, Span, Spanned},
};

use crate::{
    ast::{
        AstId, Cell, Cells, DeleteNode, DeleteProperty, DeleteTarget, Include, LabelAssign,
        LabelRef, NodeBlock, NodeKind, NodeName, PathRef, PropertyDef, RefTarget, SourceFile,
        Statement, Value, parse_number,
    },
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    tokens::{PositionedToken, Token},
};

/// Context type for parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Description of what was expected
    Label(&'static str),
}

type Input<'src> = DtsTokenSlice<'src>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;
/// Type alias for winnow TokenSlice with our positioned tokens
type DtsTokenSlice<'src> = TokenSlice<'src, PositionedToken<'src>>;

/// Diagnostics and end-of-input location shared by the recovering parsers.
struct ParseState {
    diagnostics: DiagnosticCollector,
    eof: Span,
}

/// How far error recovery may skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    TopLevel,
    /// Inside a node body; recovery stops in front of the closing `}`.
    Nested,
}

/// Helper to create a Backtrack error carrying an expectation
fn expected(label: &'static str) -> ErrMode<ContextError<Context>> {
    let mut e = ContextError::new();
    e.push(Context::Label(label));
    ErrMode::Backtrack(e)
}

/// Look at the next token without consuming it.
fn peek<'src>(input: &mut Input<'src>) -> Option<&'src PositionedToken<'src>> {
    let checkpoint = input.checkpoint();
    let token = input.next_token();
    input.reset(&checkpoint);
    token
}

fn peek_is<'src>(input: &mut Input<'src>, pred: impl Fn(&Token<'src>) -> bool) -> bool {
    peek(input).is_some_and(|token| pred(&token.token))
}

/// Consume one token matching `pred`, returning its span.
fn token<'src>(
    input: &mut Input<'src>,
    label: &'static str,
    pred: impl Fn(&Token<'src>) -> bool,
) -> IResult<Span> {
    any.verify_map(|token: &PositionedToken<'src>| pred(&token.token).then_some(token.span))
        .context(Context::Label(label))
        .parse_next(input)
}

fn semicolon<'src>(input: &mut Input<'src>) -> IResult<Span> {
    token(input, "`;`", |t| matches!(t, Token::Semicolon))
}

fn comma<'src>(input: &mut Input<'src>) -> IResult<Span> {
    token(input, "`,`", |t| matches!(t, Token::Comma))
}

fn equals<'src>(input: &mut Input<'src>) -> IResult<Span> {
    token(input, "`=`", |t| matches!(t, Token::Equals))
}

fn left_brace<'src>(input: &mut Input<'src>) -> IResult<Span> {
    token(input, "`{`", |t| matches!(t, Token::LeftBrace))
}

fn right_brace<'src>(input: &mut Input<'src>) -> IResult<Span> {
    token(input, "`}`", |t| matches!(t, Token::RightBrace))
}

/// Parse a word token with span preservation
fn word<'src>(input: &mut Input<'src>) -> IResult<Spanned<&'src str>> {
    any.verify_map(|token: &PositionedToken<'src>| match &token.token {
        Token::Word(word) => Some(Spanned::new(*word, token.span)),
        _ => None,
    })
    .context(Context::Label("name"))
    .parse_next(input)
}

fn label_assign<'src>(input: &mut Input<'src>) -> IResult<LabelAssign> {
    any.verify_map(|token: &PositionedToken<'src>| match &token.token {
        Token::Label(label) => Some(LabelAssign {
            name: Name::new(label),
            span: token.span,
        }),
        _ => None,
    })
    .context(Context::Label("label"))
    .parse_next(input)
}

fn labels<'src>(input: &mut Input<'src>) -> IResult<Vec<LabelAssign>> {
    repeat(0.., label_assign).parse_next(input)
}

fn make_label_ref(label: &str, span: Span) -> LabelRef {
    LabelRef {
        id: AstId::default(),
        label: Name::new(label),
        span,
    }
}

/// Split the payload of a `&{...}` token into node name segments.
fn make_path_ref(path: &str, span: Span) -> PathRef {
    let text = format!("&{{{path}}}");
    let mut segments = Vec::new();
    let mut offset = 2;
    for segment in path.split('/') {
        if !segment.is_empty() {
            let segment_span = span.subspan(&text, offset..offset + segment.len());
            segments.push(NodeName::parse(segment, segment_span));
        }
        offset += segment.len() + 1;
    }
    PathRef {
        id: AstId::default(),
        segments,
        span,
    }
}

fn label_ref<'src>(input: &mut Input<'src>) -> IResult<LabelRef> {
    any.verify_map(|token: &PositionedToken<'src>| match &token.token {
        Token::LabelRef(label) => Some(make_label_ref(label, token.span)),
        _ => None,
    })
    .context(Context::Label("label reference"))
    .parse_next(input)
}

fn path_ref<'src>(input: &mut Input<'src>) -> IResult<PathRef> {
    any.verify_map(|token: &PositionedToken<'src>| match &token.token {
        Token::PathRef(path) => Some(make_path_ref(path, token.span)),
        _ => None,
    })
    .context(Context::Label("path reference"))
    .parse_next(input)
}

/// Parse one cell inside `<...>`.
fn cell<'src>(input: &mut Input<'src>) -> IResult<Cell> {
    any.verify_map(|token: &PositionedToken<'src>| match &token.token {
        Token::Word(word) => Some(match parse_number(word) {
            Some(number) => Cell::Number(Spanned::new(number, token.span)),
            None => Cell::Symbol(Spanned::new(Name::new(word), token.span)),
        }),
        Token::LabelRef(label) => Some(Cell::LabelRef(make_label_ref(label, token.span))),
        Token::PathRef(path) => Some(Cell::PathRef(make_path_ref(path, token.span))),
        _ => None,
    })
    .context(Context::Label("cell"))
    .parse_next(input)
}

/// Parse `<cell cell ...>`
fn cells<'src>(input: &mut Input<'src>) -> IResult<Value> {
    let open = token(input, "`<`", |t| matches!(t, Token::LeftAngle))?;

    cut_err(|input: &mut Input<'src>| {
        let cells: Vec<Cell> = repeat(0.., cell).parse_next(input)?;
        let close = token(input, "`>`", |t| matches!(t, Token::RightAngle))?;
        Ok(Value::Cells(Cells {
            cells,
            span: open.union(close),
        }))
    })
    .parse_next(input)
}

/// Parse one word of a byte string: an even number of hex digits.
fn hex_bytes<'src>(input: &mut Input<'src>) -> IResult<Vec<u8>> {
    any.verify_map(|token: &PositionedToken<'src>| match &token.token {
        Token::Word(word) if word.len() % 2 == 0 => (0..word.len())
            .step_by(2)
            .map(|i| {
                word.get(i..i + 2)
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            })
            .collect::<Option<Vec<u8>>>(),
        _ => None,
    })
    .context(Context::Label("hex byte"))
    .parse_next(input)
}

/// Parse `[de ad be ef]`
fn bytes<'src>(input: &mut Input<'src>) -> IResult<Value> {
    let open = token(input, "`[`", |t| matches!(t, Token::LeftBracket))?;

    cut_err(|input: &mut Input<'src>| {
        let chunks: Vec<Vec<u8>> = repeat(0.., hex_bytes).parse_next(input)?;
        let close = token(input, "`]`", |t| matches!(t, Token::RightBracket))?;
        Ok(Value::Bytes(Spanned::new(
            chunks.concat(),
            open.union(close),
        )))
    })
    .parse_next(input)
}

fn string_value<'src>(input: &mut Input<'src>) -> IResult<Value> {
    any.verify_map(|token: &PositionedToken<'src>| match &token.token {
        Token::StringLiteral(text) => Some(Value::String(Spanned::new(text.clone(), token.span))),
        _ => None,
    })
    .context(Context::Label("string"))
    .parse_next(input)
}

/// Parse one property value
fn value<'src>(input: &mut Input<'src>) -> IResult<Value> {
    match peek(input).map(|token| &token.token) {
        Some(Token::StringLiteral(_)) => string_value(input),
        Some(Token::LeftAngle) => cells(input),
        Some(Token::LeftBracket) => bytes(input),
        Some(Token::LabelRef(_)) => label_ref(input).map(Value::LabelRef),
        Some(Token::PathRef(_)) => path_ref(input).map(Value::PathRef),
        _ => Err(expected("property value")),
    }
}

/// Parse `value, value, ...`
fn values<'src>(input: &mut Input<'src>) -> IResult<Vec<Value>> {
    let mut values = vec![value(input)?];
    while opt(comma).parse_next(input)?.is_some() {
        values.push(value(input)?);
    }
    Ok(values)
}

/// Parse `name;` or `name = values;` after any labels.
fn property<'src>(input: &mut Input<'src>, labels: Vec<LabelAssign>) -> IResult<Statement> {
    let name = word(input)?;
    let values = if opt(equals).parse_next(input)?.is_some() {
        values(input)?
    } else {
        Vec::new()
    };
    let end = semicolon(input)?;

    let start = labels.first().map_or(name.span(), |label| label.span);
    Ok(Statement::Property(PropertyDef {
        id: AstId::default(),
        labels,
        name: name.map(|text| Name::new(text)),
        values,
        span: start.union(end),
    }))
}

/// Parse `/delete-node/ target;`
fn delete_node<'src>(input: &mut Input<'src>) -> IResult<Statement> {
    let keyword = token(input, "`/delete-node/`", |t| matches!(t, Token::DeleteNode))?;

    let target = match peek(input).map(|token| &token.token) {
        Some(Token::Word(_)) => {
            let name = word(input)?;
            DeleteTarget::Name(NodeName::parse(name.inner(), name.span()))
        }
        Some(Token::LabelRef(_)) => DeleteTarget::Label(label_ref(input)?),
        Some(Token::PathRef(_)) => DeleteTarget::Path(path_ref(input)?),
        _ => return Err(expected("node name or reference")),
    };
    let end = semicolon(input)?;

    Ok(Statement::DeleteNode(DeleteNode {
        id: AstId::default(),
        keyword,
        target,
        span: keyword.union(end),
    }))
}

/// Parse `/delete-property/ name;`
fn delete_property<'src>(input: &mut Input<'src>) -> IResult<Statement> {
    let keyword = token(input, "`/delete-property/`", |t| {
        matches!(t, Token::DeleteProperty)
    })?;
    let name = word(input)?;
    let end = semicolon(input)?;

    Ok(Statement::DeleteProperty(DeleteProperty {
        id: AstId::default(),
        keyword,
        name: name.map(|text| Name::new(text)),
        span: keyword.union(end),
    }))
}

/// Parse `{ statements } ;` and build the block.
///
/// A missing `;` after the closing brace is reported but keeps the block.
fn node_block<'src>(
    input: &mut Input<'src>,
    state: &mut ParseState,
    kind: NodeKind,
    labels: Vec<LabelAssign>,
    start: Span,
) -> IResult<Statement> {
    left_brace(input)?;
    let body = statements(input, state, Scope::Nested);
    let close = right_brace(input)?;

    let end = match opt(semicolon).parse_next(input)? {
        Some(end) => end,
        None => {
            state.diagnostics.emit(
                Diagnostic::error("expected `;` after node")
                    .with_code(ErrorCode::E100)
                    .with_label(close, "node ends here")
                    .with_help("terminate node definitions with `};`"),
            );
            close
        }
    };

    let start = labels.first().map_or(start, |label| label.span);
    Ok(Statement::Node(NodeBlock {
        id: AstId::default(),
        kind,
        labels,
        body,
        span: start.union(end),
    }))
}

/// Parse one statement: a node, a property or a delete.
fn statement<'src>(input: &mut Input<'src>, state: &mut ParseState) -> IResult<Statement> {
    if peek_is(input, |t| matches!(t, Token::DeleteNode)) {
        return delete_node(input);
    }
    if peek_is(input, |t| matches!(t, Token::DeleteProperty)) {
        return delete_property(input);
    }

    let labels = labels(input)?;
    let Some(next) = peek(input) else {
        return Err(expected("node or property"));
    };

    match &next.token {
        Token::Slash => {
            let slash = token(input, "`/`", |t| matches!(t, Token::Slash))?;
            node_block(input, state, NodeKind::Root(slash), labels, slash)
        }
        Token::LabelRef(_) => {
            let target = label_ref(input)?;
            let start = target.span;
            node_block(
                input,
                state,
                NodeKind::Ref(RefTarget::Label(target)),
                labels,
                start,
            )
        }
        Token::PathRef(_) => {
            let target = path_ref(input)?;
            let start = target.span;
            node_block(
                input,
                state,
                NodeKind::Ref(RefTarget::Path(target)),
                labels,
                start,
            )
        }
        Token::Word(_) => {
            let checkpoint = input.checkpoint();
            let name = word(input)?;
            if peek_is(input, |t| matches!(t, Token::LeftBrace)) {
                let node_name = NodeName::parse(name.inner(), name.span());
                node_block(input, state, NodeKind::Child(node_name), labels, name.span())
            } else {
                input.reset(&checkpoint);
                property(input, labels)
            }
        }
        _ => Err(expected("node or property")),
    }
}

/// Skip the rest of a malformed statement.
///
/// Stops after the next `;` at depth 0. Inside a node body it also stops in
/// front of the `}` that closes the body.
fn recover<'src>(input: &mut Input<'src>, scope: Scope) {
    let mut depth = 0usize;
    loop {
        let checkpoint = input.checkpoint();
        let Some(token) = input.next_token() else {
            return;
        };
        match token.token {
            Token::LeftBrace => depth += 1,
            Token::RightBrace if depth > 0 => depth -= 1,
            Token::RightBrace if scope == Scope::Nested => {
                input.reset(&checkpoint);
                return;
            }
            Token::Semicolon if depth == 0 => return,
            _ => {}
        }
    }
}

/// Convert a winnow error at the current input position into a diagnostic.
fn convert_error(
    error: ErrMode<ContextError<Context>>,
    found: Option<&PositionedToken<'_>>,
    eof: Span,
) -> Diagnostic {
    let expected = match &error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e.context().find_map(|ctx| match ctx {
            Context::Label(label) => Some(*label),
        }),
        ErrMode::Incomplete(_) => None,
    }
    .unwrap_or("a statement");

    match found {
        Some(token) => Diagnostic::error(format!("expected {expected}, found `{}`", token.token))
            .with_code(ErrorCode::E100)
            .with_label(token.span, "unexpected token")
            .with_help("the rest of this statement is skipped"),
        None => Diagnostic::error(format!("unexpected end of input, expected {expected}"))
            .with_code(ErrorCode::E101)
            .with_label(eof, "incomplete")
            .with_help("check for an unclosed `{`"),
    }
}

/// Parse statements until the end of input or, when nested, a closing `}`.
fn statements<'src>(input: &mut Input<'src>, state: &mut ParseState, scope: Scope) -> Vec<Statement> {
    let mut statements = Vec::new();
    loop {
        match peek(input).map(|token| &token.token) {
            None => break,
            Some(Token::RightBrace) if scope == Scope::Nested => break,
            Some(_) => {}
        }

        let checkpoint = input.checkpoint();
        match statement(input, state) {
            Ok(statement) => statements.push(statement),
            Err(error) => {
                let diagnostic = convert_error(error, peek(input), state.eof);
                state.diagnostics.emit(diagnostic);
                input.reset(&checkpoint);
                recover(input, scope);
            }
        }
    }
    statements
}

/// The span of an include path closed by one delimiter at the end of the
/// token `span`.
fn include_path_span(span: Span, path: &str) -> Span {
    let end = span.end().saturating_sub(1);
    let start = end.saturating_sub(path.len());
    let line = span.end_pos().line;
    let end_column = span.end_pos().column.saturating_sub(1);
    let start_column = end_column.saturating_sub(path.chars().count() as u32);
    Span::new(
        span.file(),
        start..end,
        Position::new(line, start_column),
        Position::new(line, end_column),
    )
}

/// Parse the top level: directives, includes and statements.
fn top_level<'src>(input: &mut Input<'src>, state: &mut ParseState) -> (Vec<Statement>, Vec<Include>) {
    let mut statements = Vec::new();
    let mut includes = Vec::new();

    while let Some(next) = peek(input) {
        let checkpoint = input.checkpoint();
        let result = match &next.token {
            Token::DtsVersion | Token::Plugin => {
                input.next_token();
                semicolon(input).map(|_| ())
            }
            Token::MemReserve => {
                input.next_token();
                (word, word, semicolon).void().parse_next(input)
            }
            Token::Include => {
                input.next_token();
                any.verify_map(|token: &PositionedToken<'src>| match &token.token {
                    Token::StringLiteral(path) => Some(Include {
                        path: Spanned::new(path.clone(), include_path_span(token.span, path)),
                        quoted: true,
                        span: next.span.union(token.span),
                    }),
                    _ => None,
                })
                .context(Context::Label("include path"))
                .parse_next(input)
                .map(|include| includes.push(include))
            }
            Token::HashInclude { path, quoted } => {
                input.next_token();
                includes.push(Include {
                    path: Spanned::new((*path).to_string(), include_path_span(next.span, path)),
                    quoted: *quoted,
                    span: next.span,
                });
                Ok(())
            }
            _ => statement(input, state).map(|statement| statements.push(statement)),
        };

        if let Err(error) = result {
            let diagnostic = convert_error(error, peek(input), state.eof);
            state.diagnostics.emit(diagnostic);
            input.reset(&checkpoint);
            recover(input, Scope::TopLevel);
        }
    }
    (statements, includes)
}

/// Build a source file from tokens with trivia removed.
///
/// Never fails; every syntax error becomes a diagnostic and the statement it
/// occurred in is left out of the tree.
pub fn build_source_file<'src>(
    tokens: &'src [PositionedToken<'src>],
    file: FileId,
) -> (SourceFile, Vec<Diagnostic>) {
    let eof = tokens.last().map(|token| token.span).unwrap_or_default();
    let mut state = ParseState {
        diagnostics: DiagnosticCollector::new(),
        eof,
    };
    let mut input = TokenSlice::new(tokens);

    let (statements, includes) = top_level(&mut input, &mut state);
    (
        SourceFile::new(file, statements, includes),
        state.diagnostics.finish(),
    )
}

#[cfg(test)]
mod tests {
    use dtlink_core::span::LineIndex;

    use super::*;
    use crate::lexer::tokenize;

    fn parse_tokens(source: &str) -> Vec<PositionedToken<'_>> {
        let index = LineIndex::new(source);
        let (tokens, diagnostics) = tokenize(source, FileId::default(), &index);
        assert!(diagnostics.is_empty(), "lexer errors: {diagnostics:?}");
        tokens.into_iter().filter(|t| !t.is_trivia()).collect()
    }

    #[test]
    fn test_word() {
        let tokens = parse_tokens("compatible");
        let mut slice = TokenSlice::new(&tokens);
        let result = word.parse_next(&mut slice).unwrap();
        assert_eq!(*result.inner(), "compatible");
    }

    #[test]
    fn test_cells() {
        let tokens = parse_tokens("<0x10 &gic GIC_SPI>");
        let mut slice = TokenSlice::new(&tokens);
        let Value::Cells(cells) = cells.parse_next(&mut slice).unwrap() else {
            panic!("expected cells");
        };
        assert_eq!(cells.cells.len(), 3);
        assert!(matches!(&cells.cells[0], Cell::Number(n) if *n.inner() == 16));
        assert!(matches!(&cells.cells[1], Cell::LabelRef(l) if l.label == "gic"));
        assert!(matches!(&cells.cells[2], Cell::Symbol(s) if *s.inner() == "GIC_SPI"));
    }

    #[test]
    fn test_bytes() {
        let tokens = parse_tokens("[de ad beef]");
        let mut slice = TokenSlice::new(&tokens);
        let Value::Bytes(bytes) = bytes.parse_next(&mut slice).unwrap() else {
            panic!("expected bytes");
        };
        assert_eq!(bytes.inner(), &vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_bytes_rejects_odd_digits() {
        let tokens = parse_tokens("[abc]");
        let mut slice = TokenSlice::new(&tokens);
        assert!(matches!(
            bytes.parse_next(&mut slice),
            Err(ErrMode::Cut(_))
        ));
    }

    #[test]
    fn test_path_ref_segments() {
        let source = "&{/soc/uart@1000}";
        let tokens = parse_tokens(source);
        let mut slice = TokenSlice::new(&tokens);
        let path = path_ref.parse_next(&mut slice).unwrap();

        assert_eq!(path.segments.len(), 2);
        assert_eq!(path.segments[1].name, "uart");
        assert_eq!(path.segments[1].address, Some(0x1000));
        assert_eq!(&source[path.segments[0].span.range()], "soc");
        assert_eq!(&source[path.segments[1].span.range()], "uart@1000");
    }

    #[test]
    fn test_recover_stops_before_closing_brace() {
        let tokens = parse_tokens("a = ; }");
        let mut slice = TokenSlice::new(&tokens);
        recover(&mut slice, Scope::Nested);
        assert!(matches!(
            peek(&mut slice).map(|t| &t.token),
            Some(Token::RightBrace)
        ));
    }

    #[test]
    fn test_recover_skips_nested_blocks() {
        let tokens = parse_tokens("x { y; }; z;");
        let mut slice = TokenSlice::new(&tokens);
        recover(&mut slice, Scope::TopLevel);
        assert!(matches!(
            peek(&mut slice).map(|t| &t.token),
            Some(Token::Word("z"))
        ));
    }
}
