//! Lexical analyzer for devicetree source text.
//!
//! The lexer converts source text into a stream of [`Token`]s for parsing.
//! It handles whitespace, comments, string literals, directives, labels,
//! references and punctuation.
//!
//! The public entry point is [`tokenize`], which performs error-recovering
//! lexical analysis and collects all diagnostics in a single pass.

use std::ops::Range;

use winnow::{
    Parser as _,
    combinator::{alt, cut_err, delimited, preceded, repeat, terminated},
    error::{ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{any, literal, none_of, take_till, take_until, take_while},
};

use dtlink_core::span::{FileId, LineIndex};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    tokens::{PositionedToken, Token},
};

/// Rich diagnostic information for lexer errors.
///
/// Attached to winnow errors via `.context()`; the reported span runs from
/// `start` to the position where lexing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<LexerDiagnostic>>;

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ',' | '.' | '_' | '+' | '-' | '?' | '#' | '@')
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse an escape sequence inside a string literal.
///
/// Unknown escapes keep the escaped character as is.
fn string_escape(input: &mut Input<'_>) -> IResult<char> {
    preceded('\\', any)
        .map(|c| match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other,
        })
        .parse_next(input)
}

/// Parse a double quoted string literal.
fn string_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let string_char = none_of(['"', '\\', '\n']);
    let string_content =
        repeat(0.., alt((string_escape, string_char))).fold(String::new, |mut acc, ch| {
            acc.push(ch);
            acc
        });

    let start = input.current_token_start();

    '"'.parse_next(input)
        .map_err(|_: ErrMode<ContextError<LexerDiagnostic>>| {
            ErrMode::Backtrack(ContextError::new())
        })?;

    cut_err(terminated(string_content, '"'))
        .context(LexerDiagnostic {
            code: ErrorCode::E001,
            message: "unterminated string literal",
            help: Some("add closing `\"` before the end of the line"),
            start,
        })
        .parse_next(input)
        .map(Token::StringLiteral)
}

/// Parse line comment starting with '//'
fn line_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded("//", take_while(0.., |c| c != '\n'))
        .map(Token::LineComment)
        .parse_next(input)
}

/// Parse a `/* ... */` comment, which may span lines.
fn block_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let start = input.current_token_start();
    preceded(
        "/*",
        cut_err(terminated(take_until(0.., "*/"), "*/")).context(LexerDiagnostic {
            code: ErrorCode::E003,
            message: "unterminated block comment",
            help: Some("close the comment with `*/`"),
            start,
        }),
    )
    .map(Token::BlockComment)
    .parse_next(input)
}

/// Parse `/name/` directives.
fn directive<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        literal("/delete-property/").value(Token::DeleteProperty),
        literal("/delete-node/").value(Token::DeleteNode),
        literal("/memreserve/").value(Token::MemReserve),
        literal("/include/").value(Token::Include),
        literal("/dts-v1/").value(Token::DtsVersion),
        literal("/plugin/").value(Token::Plugin),
    ))
    .parse_next(input)
}

/// Parse a C preprocessor style `#include` with its argument.
fn hash_include<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let quoted = delimited('"', take_till(0.., ['"', '\n']), '"').map(|path| (path, true));
    let angled = delimited('<', take_till(0.., ['>', '\n']), '>').map(|path| (path, false));

    preceded(
        ("#include", take_while(1.., [' ', '\t'])),
        alt((quoted, angled)),
    )
    .map(|(path, quoted)| Token::HashInclude { path, quoted })
    .parse_next(input)
}

/// Parse `&{/path}`.
fn path_ref<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let start = input.current_token_start();
    preceded(
        "&{",
        cut_err(terminated(take_till(0.., ['}', '\n']), '}')).context(LexerDiagnostic {
            code: ErrorCode::E004,
            message: "unterminated path reference",
            help: Some("close the path with `}`"),
            start,
        }),
    )
    .map(Token::PathRef)
    .parse_next(input)
}

/// Parse `&label`.
fn label_ref<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded('&', take_while(1.., is_label_char))
        .map(Token::LabelRef)
        .parse_next(input)
}

/// Parse a label definition `name:`.
fn label<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    terminated(
        take_while(1.., is_label_char).verify(|s: &str| {
            s.chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        }),
        ':',
    )
    .map(Token::Label)
    .parse_next(input)
}

/// Parse a word. A leading `,` is the value separator, never part of a word.
fn word<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., is_word_char)
        .verify(|text: &str| !text.starts_with(','))
        .map(Token::Word)
        .parse_next(input)
}

/// Parse single character tokens
fn single_char_token<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        '/'.value(Token::Slash),
        '{'.value(Token::LeftBrace),
        '}'.value(Token::RightBrace),
        '<'.value(Token::LeftAngle),
        '>'.value(Token::RightAngle),
        '['.value(Token::LeftBracket),
        ']'.value(Token::RightBracket),
        ';'.value(Token::Semicolon),
        ','.value(Token::Comma),
        '='.value(Token::Equals),
    ))
    .parse_next(input)
}

/// Parse whitespace (spaces, tabs, etc. but not newlines)
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., |c: char| c.is_whitespace() && c != '\n')
        .value(Token::Whitespace)
        .parse_next(input)
}

/// Parse newline
fn newline<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    '\n'.value(Token::Newline).parse_next(input)
}

/// Parse a single token, returning it with its byte range.
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<(Token<'a>, Range<usize>)> {
    let start = input.current_token_start();

    let token = alt((
        line_comment,      // Must come before directive and '/'
        block_comment,     // Must come before directive and '/'
        string_literal,    // Must come before any single char
        directive,         // Must come before '/'
        hash_include,      // Must come before word ('#' is a word char)
        path_ref,          // Must come before label_ref
        label_ref,         // '&' alone is not a token
        label,             // Must come before word
        word,              // Must come before single chars
        single_char_token, // Single character tokens
        newline,           // Must come before whitespace
        whitespace,        // General whitespace
    ))
    .parse_next(input)?;

    let end = input.current_token_start();
    Ok((token, start..end))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a, 'i> {
    file: FileId,
    index: &'i LineIndex<'i>,
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
}

impl<'a, 'i> Lexer<'a, 'i> {
    fn new(file: FileId, index: &'i LineIndex<'i>) -> Self {
        Self {
            file,
            index,
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Tokenize the input, collecting tokens and errors.
    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            match positioned_token(&mut input) {
                Ok((token, range)) => {
                    let span = self.index.span(self.file, range);
                    self.tokens.push(PositionedToken::new(token, span));
                }
                Err(e) => {
                    let error_pos = input.current_token_start();
                    let diagnostic = self.convert_err_mode(e, error_pos);
                    self.diagnostics.emit(diagnostic);

                    // Skip a single character and try again.
                    if !input.is_empty() {
                        input.next_token();
                    }
                }
            }
        }
    }

    fn finish(self) -> (Vec<PositionedToken<'a>>, Vec<Diagnostic>) {
        (self.tokens, self.diagnostics.finish())
    }

    /// Convert an ErrMode and error position to a Diagnostic.
    ///
    /// Falls back to E002 (unexpected character) if no diagnostic context is
    /// attached to the error.
    fn convert_err_mode(
        &self,
        err: ErrMode<ContextError<LexerDiagnostic>>,
        error_pos: usize,
    ) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(LexerDiagnostic {
            code,
            message,
            help,
            start,
        }) = context_error.context().next()
        {
            let span = self.index.span(self.file, *start..error_pos);
            let mut diag = Diagnostic::error(*message)
                .with_code(*code)
                .with_label(span, code.description());
            if let Some(h) = help {
                diag = diag.with_help(*h);
            }
            return diag;
        }

        let span = self
            .index
            .span(self.file, error_pos..error_pos.saturating_add(1));
        Diagnostic::error("unexpected character")
            .with_code(ErrorCode::E002)
            .with_label(span, ErrorCode::E002.description())
    }
}

/// Tokenize `source` as file `file`, collecting every lexical error.
///
/// Never fails: characters that cannot start a token are reported and
/// skipped, so the returned tokens cover everything else.
pub fn tokenize<'a>(
    source: &'a str,
    file: FileId,
    index: &LineIndex<'_>,
) -> (Vec<PositionedToken<'a>>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(file, index);
    lexer.tokenize(LocatingSlice::new(source));
    lexer.finish()
}
