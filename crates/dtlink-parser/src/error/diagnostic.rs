//! The core diagnostic type for the dtlink error system.
//!
//! A [`Diagnostic`] represents a single error or warning with optional
//! error code, multiple labeled source spans, and help text.

use std::fmt;

use dtlink_core::span::Span;

use crate::error::{ErrorCode, Label, Severity};

/// A rich diagnostic message with source location information.
///
/// # Example
///
/// ```text
/// error[E401]: label `uart` is already in use
///   --> board.dts:12:1
///    |
/// 12 | uart: serial@1000 {
///    | ^^^^ label defined here
///    |
///   --> soc.dtsi:40:2
///    |
/// 40 |     uart: serial@2000 {
///    |     ---- also defined here
///    |
///    = help: labels must be unique across the whole tree
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    message: String,
    labels: Vec<Label>,
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Create a diagnostic with an explicit severity.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            help: None,
        }
    }

    /// Get the severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the error code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Get the primary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get all labels attached to this diagnostic.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// The span of the first primary label, if any.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|label| label.is_primary())
            .map(Label::span)
    }

    /// Get the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Add a primary label to this diagnostic.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    /// Add a secondary label to this diagnostic.
    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Replace the severity, keeping everything else.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // "error[E001]: message" or "error: message"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use dtlink_core::span::{FileId, LineIndex};

    use super::*;

    fn span(range: std::ops::Range<usize>) -> Span {
        LineIndex::new("/ { a {}; a {}; };").span(FileId::default(), range)
    }

    #[test]
    fn test_diagnostic_new() {
        let diag = Diagnostic::new(Severity::Error, "test error");

        assert!(diag.severity().is_error());
        assert_eq!(diag.message(), "test error");
        assert!(diag.code().is_none());
        assert!(diag.labels().is_empty());
        assert!(diag.primary_span().is_none());
        assert!(diag.help().is_none());
    }

    #[test]
    fn test_diagnostic_builder_chain() {
        let diag = Diagnostic::error("node `a` is defined twice in this block")
            .with_code(ErrorCode::E400)
            .with_secondary_label(span(4..5), "first defined here")
            .with_label(span(10..11), "duplicate definition")
            .with_help("rename one of the nodes or merge their bodies");

        assert_eq!(diag.code(), Some(ErrorCode::E400));
        assert_eq!(diag.labels().len(), 2);
        assert!(diag.labels()[0].is_secondary());
        assert_eq!(diag.primary_span().map(|s| s.start()), Some(10));
        assert_eq!(
            diag.help(),
            Some("rename one of the nodes or merge their bodies")
        );
    }

    #[test]
    fn test_diagnostic_display_with_code() {
        let diag = Diagnostic::error("property `status` does not exist").with_code(ErrorCode::E404);
        assert_eq!(diag.to_string(), "error[E404]: property `status` does not exist");
    }

    #[test]
    fn test_diagnostic_display_without_code() {
        let diag = Diagnostic::warning("include not found");
        assert_eq!(diag.to_string(), "warning: include not found");
    }

    #[test]
    fn test_with_severity() {
        let diag = Diagnostic::warning("include not found").with_severity(Severity::Error);
        assert!(diag.severity().is_error());
    }
}
