use std::fmt;

use winnow::stream::Location;

use dtlink_core::span::Span;

/// Token types for devicetree source
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // Directives
    DtsVersion,     // /dts-v1/
    Plugin,         // /plugin/
    MemReserve,     // /memreserve/
    Include,        // /include/
    DeleteNode,     // /delete-node/
    DeleteProperty, // /delete-property/

    /// `#include "file"` or `#include <file>`, argument included.
    HashInclude {
        path: &'src str,
        quoted: bool,
    },

    // Literals and names
    StringLiteral(String),
    /// Node names, property names, numbers and byte strings share one
    /// character class; the parser decides what a word means.
    Word(&'src str),
    /// `name:`; the colon is part of the token.
    Label(&'src str),
    /// `&name`
    LabelRef(&'src str),
    /// `&{/path/to@1}`; the payload is the text between the braces.
    PathRef(&'src str),

    // Punctuation
    Slash,        // /
    LeftBrace,    // {
    RightBrace,   // }
    LeftAngle,    // <
    RightAngle,   // >
    LeftBracket,  // [
    RightBracket, // ]
    Semicolon,    // ;
    Comma,        // ,
    Equals,       // =

    // Comments
    LineComment(&'src str),  // // comment
    BlockComment(&'src str), // /* comment */

    // Whitespace
    Whitespace,
    Newline,
}

impl Token<'_> {
    /// Whitespace and comments, which the parser never sees.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::Whitespace | Token::Newline | Token::LineComment(_) | Token::BlockComment(_)
        )
    }
}

/// A token with position information for winnow integration
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self { token, span }
    }
}

impl<'src> std::ops::Deref for PositionedToken<'src> {
    type Target = Token<'src>;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl fmt::Display for PositionedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.token.fmt(f)
    }
}

impl Location for PositionedToken<'_> {
    fn previous_token_end(&self) -> usize {
        self.span.start()
    }

    fn current_token_start(&self) -> usize {
        self.span.start()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::DtsVersion => write!(f, "/dts-v1/"),
            Token::Plugin => write!(f, "/plugin/"),
            Token::MemReserve => write!(f, "/memreserve/"),
            Token::Include => write!(f, "/include/"),
            Token::DeleteNode => write!(f, "/delete-node/"),
            Token::DeleteProperty => write!(f, "/delete-property/"),
            Token::HashInclude { path, quoted: true } => write!(f, "#include \"{path}\""),
            Token::HashInclude {
                path,
                quoted: false,
            } => write!(f, "#include <{path}>"),

            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Word(word) => write!(f, "{word}"),
            Token::Label(label) => write!(f, "{label}:"),
            Token::LabelRef(label) => write!(f, "&{label}"),
            Token::PathRef(path) => write!(f, "&{{{path}}}"),

            Token::Slash => write!(f, "/"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftAngle => write!(f, "<"),
            Token::RightAngle => write!(f, ">"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Equals => write!(f, "="),

            Token::LineComment(comment) => write!(f, "//{comment}"),
            Token::BlockComment(comment) => write!(f, "/*{comment}*/"),
            Token::Whitespace => write!(f, " "),
            Token::Newline => write!(f, "\\n"),
        }
    }
}
