//! # dtlink Parser
//!
//! Parser for devicetree source (`.dts` / `.dtsi`). This crate turns source
//! text into the [`ast::SourceFile`] tree the dtlink linker consumes, and
//! owns the diagnostic types shared by every dtlink phase.
//!
//! ## Usage
//!
//! ```
//! # use dtlink_core::span::FileId;
//! # use dtlink_parser::{ast::Statement, parse};
//! let source = r#"
//!     /dts-v1/;
//!     / {
//!         uart0: serial@1000 {
//!             status = "okay";
//!         };
//!     };
//!     &uart0 { status = "disabled"; };
//! "#;
//!
//! let parsed = parse(source, FileId::default());
//! assert!(parsed.diagnostics.is_empty());
//! assert_eq!(parsed.ast.statements.len(), 2);
//! assert!(matches!(parsed.ast.statements[0], Statement::Node(_)));
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
mod parser;
pub mod tokens;

use log::debug;

use dtlink_core::span::{FileId, LineIndex};

use ast::SourceFile;
use error::{Diagnostic, ParseError};

/// The result of parsing one file: a tree, possibly partial, and every
/// lexical and syntax diagnostic found on the way.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub ast: SourceFile,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedFile {
    /// Whether any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity().is_error())
    }

    /// The tree if parsing produced no errors.
    pub fn into_result(self) -> Result<SourceFile, ParseError> {
        if self.has_errors() {
            Err(ParseError::new(self.diagnostics))
        } else {
            Ok(self.ast)
        }
    }
}

/// Parse devicetree source text belonging to `file`.
///
/// This never fails as a whole:
///
/// 1. **Tokenize** - characters that cannot start a token are reported and skipped
/// 2. **Parse** - malformed statements are reported and left out of the tree
pub fn parse(source: &str, file: FileId) -> ParsedFile {
    let index = LineIndex::new(source);

    // Step 1: Tokenize
    let (tokens, mut diagnostics) = lexer::tokenize(source, file, &index);
    let tokens: Vec<_> = tokens
        .into_iter()
        .filter(|token| !token.is_trivia())
        .collect();

    // Step 2: Parse
    let (ast, parse_diagnostics) = parser::build_source_file(&tokens, file);
    diagnostics.extend(parse_diagnostics);

    debug!(
        file:% = file,
        tokens = tokens.len(),
        statements = ast.statements.len(),
        includes = ast.includes.len(),
        diagnostics = diagnostics.len();
        "Parsed source file"
    );

    ParsedFile { ast, diagnostics }
}
