//! Linker issues.
//!
//! The resolver records format-agnostic [`Issue`]s. A renderer turns them
//! into [`Diagnostic`]s with [`Issue::to_diagnostic`].

use std::fmt;

use dtlink_core::span::Span;
use dtlink_parser::error::{Diagnostic, ErrorCode, Severity};

/// The linker's issue taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// Two sibling node definitions in one block share `(name, address)`.
    DuplicateNodeName,
    /// A label is bound to more than one owner.
    LabelAlreadyInUse,
    /// A label or path reference has no target.
    UnableToResolveChildNode,
    /// `/delete-node/` names a node absent from its scope.
    NodeDoesNotExist,
    /// `/delete-property/` names a property absent from its node.
    PropertyDoesNotExist,
}

impl IssueKind {
    pub fn code(self) -> ErrorCode {
        match self {
            IssueKind::DuplicateNodeName => ErrorCode::E400,
            IssueKind::LabelAlreadyInUse => ErrorCode::E401,
            IssueKind::UnableToResolveChildNode => ErrorCode::E402,
            IssueKind::NodeDoesNotExist => ErrorCode::E403,
            IssueKind::PropertyDoesNotExist => ErrorCode::E404,
        }
    }

    /// Every linker issue is an error.
    pub fn severity(self) -> Severity {
        Severity::Error
    }

    fn message(self, subject: &str) -> String {
        match self {
            IssueKind::DuplicateNodeName => format!("duplicate node name `{subject}`"),
            IssueKind::LabelAlreadyInUse => format!("label `{subject}` is already in use"),
            IssueKind::UnableToResolveChildNode => format!("unable to resolve `{subject}`"),
            IssueKind::NodeDoesNotExist => format!("node `{subject}` does not exist"),
            IssueKind::PropertyDoesNotExist => format!("property `{subject}` does not exist"),
        }
    }

    fn primary_message(self) -> &'static str {
        match self {
            IssueKind::DuplicateNodeName => "defined again here",
            IssueKind::LabelAlreadyInUse => "first assigned here",
            IssueKind::UnableToResolveChildNode => "unresolved reference",
            IssueKind::NodeDoesNotExist => "no such node in this scope",
            IssueKind::PropertyDoesNotExist => "no such property on this node",
        }
    }

    fn related_message(self) -> &'static str {
        match self {
            IssueKind::DuplicateNodeName => "first defined here",
            IssueKind::LabelAlreadyInUse => "also assigned here",
            _ => "related",
        }
    }

    fn help(self) -> Option<&'static str> {
        match self {
            IssueKind::DuplicateNodeName => {
                Some("merge the two bodies or give the nodes distinct unit addresses")
            }
            IssueKind::LabelAlreadyInUse => Some("labels must be unique across the whole tree"),
            IssueKind::UnableToResolveChildNode => {
                Some("check that the label or path is defined in this file or an earlier one")
            }
            IssueKind::NodeDoesNotExist | IssueKind::PropertyDoesNotExist => None,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueKind::DuplicateNodeName => "DUPLICATE_NODE_NAME",
            IssueKind::LabelAlreadyInUse => "LABEL_ALREADY_IN_USE",
            IssueKind::UnableToResolveChildNode => "UNABLE_TO_RESOLVE_CHILD_NODE",
            IssueKind::NodeDoesNotExist => "NODE_DOES_NOT_EXIST",
            IssueKind::PropertyDoesNotExist => "PROPERTY_DOES_NOT_EXIST",
        };
        f.write_str(name)
    }
}

/// One semantic issue found by a resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    kind: IssueKind,
    span: Span,
    severity: Severity,
    related: Vec<Span>,
    args: Vec<String>,
}

impl Issue {
    /// Create an issue at `span`; `subject` is the first message argument.
    pub fn new(kind: IssueKind, span: Span, subject: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            severity: kind.severity(),
            related: Vec::new(),
            args: vec![subject.into()],
        }
    }

    pub fn with_related(mut self, related: impl IntoIterator<Item = Span>) -> Self {
        self.related.extend(related);
        self
    }

    pub fn kind(&self) -> IssueKind {
        self.kind
    }

    /// Primary location.
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn related(&self) -> &[Span] {
        &self.related
    }

    /// Message template arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn message(&self) -> String {
        let subject = self.args.first().map(String::as_str).unwrap_or_default();
        self.kind.message(subject)
    }

    /// Render into a [`Diagnostic`]: the primary location becomes the
    /// primary label, related locations become secondary labels.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diagnostic = Diagnostic::new(self.severity, self.message())
            .with_code(self.kind.code())
            .with_label(self.span, self.kind.primary_message());
        for span in &self.related {
            diagnostic = diagnostic.with_secondary_label(*span, self.kind.related_message());
        }
        if let Some(help) = self.kind.help() {
            diagnostic = diagnostic.with_help(help);
        }
        diagnostic
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.span, self.message())
    }
}

#[cfg(test)]
mod tests {
    use dtlink_core::span::{FileId, LineIndex};

    use super::*;

    fn spans(text: &str) -> (Span, Span) {
        let index = LineIndex::new(text);
        (
            index.span(FileId::default(), 0..2),
            index.span(FileId::default(), 3..5),
        )
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(IssueKind::DuplicateNodeName.code(), ErrorCode::E400);
        assert_eq!(IssueKind::LabelAlreadyInUse.code(), ErrorCode::E401);
        assert_eq!(IssueKind::UnableToResolveChildNode.code(), ErrorCode::E402);
        assert_eq!(IssueKind::NodeDoesNotExist.code(), ErrorCode::E403);
        assert_eq!(IssueKind::PropertyDoesNotExist.code(), ErrorCode::E404);
    }

    #[test]
    fn test_message_uses_first_argument() {
        let (first, _) = spans("L1 L1");
        let issue = Issue::new(IssueKind::LabelAlreadyInUse, first, "L1");
        assert_eq!(issue.message(), "label `L1` is already in use");
        assert_eq!(issue.args(), ["L1"]);
        assert!(issue.severity().is_error());
    }

    #[test]
    fn test_to_diagnostic() {
        let (first, second) = spans("L1 L1");
        let issue =
            Issue::new(IssueKind::LabelAlreadyInUse, first, "L1").with_related([second]);
        let diagnostic = issue.to_diagnostic();

        assert_eq!(diagnostic.code(), Some(ErrorCode::E401));
        assert_eq!(diagnostic.primary_span(), Some(first));
        assert_eq!(diagnostic.labels().len(), 2);
        assert!(diagnostic.labels()[1].is_secondary());
        assert_eq!(diagnostic.labels()[1].span(), second);
        assert!(diagnostic.help().is_some());
    }

    #[test]
    fn test_display() {
        let (first, _) = spans("ab cd");
        let issue = Issue::new(IssueKind::PropertyDoesNotExist, first, "status");
        assert_eq!(
            issue.to_string(),
            "PROPERTY_DOES_NOT_EXIST at file#0:1:1: property `status` does not exist"
        );
    }
}
