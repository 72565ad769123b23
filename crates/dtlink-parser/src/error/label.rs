//! Labeled source spans for diagnostic messages.

use dtlink_core::span::Span;

/// A labeled span in source code.
///
/// # Primary vs Secondary Labels
///
/// - **Primary labels** mark the main location of an error or warning.
/// - **Secondary labels** point at related locations, such as the other
///   definitions of a label that is used twice. Spans carry their file, so a
///   secondary label may point into a different file than the primary one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    span: Span,
    message: String,
    is_primary: bool,
}

impl Label {
    /// Create a new primary label.
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            is_primary: true,
        }
    }

    /// Create a new secondary label.
    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            is_primary: false,
        }
    }

    /// Get the span this label applies to.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Get the label message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a primary label.
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Check if this is a secondary label.
    pub fn is_secondary(&self) -> bool {
        !self.is_primary
    }
}

#[cfg(test)]
mod tests {
    use dtlink_core::span::{FileId, LineIndex};

    use super::*;

    #[test]
    fn test_primary_label() {
        let span = LineIndex::new("/delete-node/ foo;").span(FileId::default(), 14..17);
        let label = Label::primary(span, "not found");

        assert_eq!(label.span().start(), 14);
        assert_eq!(label.span().end(), 17);
        assert_eq!(label.message(), "not found");
        assert!(label.is_primary());
        assert!(!label.is_secondary());
    }

    #[test]
    fn test_secondary_label_in_other_file() {
        let span = LineIndex::new("l: a {};").span(FileId::new(3), 0..1);
        let label = Label::secondary(span, "also used here");

        assert_eq!(label.span().file(), FileId::new(3));
        assert!(label.is_secondary());
    }
}
