//! Error codes for the dtlink diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Parser and include errors
//! - `E4xx` - Linker errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    ///
    /// A string was opened with a quote but never closed on the same line.
    E001,

    /// Unexpected character.
    ///
    /// A character was encountered that cannot start any devicetree token.
    E002,

    /// Unterminated block comment.
    ///
    /// A `/*` comment was never closed with `*/`.
    E003,

    /// Unterminated path reference.
    ///
    /// A `&{` path reference was never closed with `}`.
    E004,

    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    ///
    /// The parser encountered a token it did not expect at this position.
    E100,

    /// Incomplete input.
    ///
    /// The input ended unexpectedly before a complete construct was parsed.
    E101,

    /// Unresolved include.
    ///
    /// An include directive names a file that was not found in the including
    /// file's directory nor on any include path.
    E102,

    // =========================================================================
    // Linker Errors (E4xx)
    // =========================================================================
    /// Duplicate node name.
    ///
    /// Two sibling node definitions in the same block share a name and
    /// address with no delete in between.
    E400,

    /// Label already in use.
    ///
    /// One label text is bound to more than one distinct node or property.
    E401,

    /// Unable to resolve reference.
    ///
    /// A label or path reference in a reference block, a delete or a property
    /// value has no target.
    E402,

    /// Node does not exist.
    ///
    /// A `/delete-node/` by name targets a node that is not a child of the
    /// enclosing node.
    E403,

    /// Property does not exist.
    ///
    /// A `/delete-property/` targets a property that is not set on the
    /// enclosing node.
    E404,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Lexer errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            // Parser errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            // Linker errors
            ErrorCode::E400 => "E400",
            ErrorCode::E401 => "E401",
            ErrorCode::E402 => "E402",
            ErrorCode::E403 => "E403",
            ErrorCode::E404 => "E404",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Lexer errors
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "unterminated block comment",
            ErrorCode::E004 => "unterminated path reference",
            // Parser errors
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            ErrorCode::E102 => "unresolved include",
            // Linker errors
            ErrorCode::E400 => "duplicate node name",
            ErrorCode::E401 => "label already in use",
            ErrorCode::E402 => "unable to resolve reference",
            ErrorCode::E403 => "node does not exist",
            ErrorCode::E404 => "property does not exist",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
