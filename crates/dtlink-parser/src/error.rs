//! Error and diagnostic system for dtlink.
//!
//! This module provides:
//! - Error codes for documentation and searchability
//! - Multiple labeled spans, possibly across files
//! - Severity levels
//! - A diagnostic collector for accumulating multiple errors
//!
//! # Overview
//!
//! The error system is built around the [`Diagnostic`] type, which represents
//! a single error or warning with an optional error code, any number of source
//! locations, and help text. Neither the parser nor the linker ever stops at
//! the first problem; both hand back every diagnostic they produced. Callers
//! that want an all-or-nothing result wrap them in a [`ParseError`].
//!
//! # Example
//!
//! ```
//! # use dtlink_core::span::{FileId, LineIndex};
//! # use dtlink_parser::error::{Diagnostic, ErrorCode};
//! let index = LineIndex::new("/ { a {}; a {}; };");
//! let first = index.span(FileId::default(), 4..5);
//! let second = index.span(FileId::default(), 10..11);
//!
//! let diag = Diagnostic::error("node `a` is defined twice in this block")
//!     .with_code(ErrorCode::E400)
//!     .with_label(second, "duplicate definition")
//!     .with_secondary_label(first, "first defined here");
//! assert_eq!(diag.labels().len(), 2);
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
