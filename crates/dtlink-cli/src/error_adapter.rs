//! Error adapter for converting dtlink diagnostics and errors to miette.
//!
//! This module bridges the library's diagnostic and error types and
//! miette's graphical report rendering used in the CLI.
//!
//! # Multiple files
//!
//! Each diagnostic is rendered against the file of its primary label. Labels
//! pointing into other files are not drawn; their locations are listed in
//! the help text instead.

use std::fmt;

use miette::{
    Diagnostic as MietteDiagnostic, LabeledSpan, NamedSource, Severity as MietteSeverity,
    SourceSpan,
};

use dtlink::{
    Context, DtLinkError, SourceProvider,
    span::{FileId, Span},
};
use dtlink_parser::error::Diagnostic;

/// Adapter for a single dtlink diagnostic.
///
/// This adapter wraps a single [`Diagnostic`] together with the text of the
/// file its primary label points into.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    file: Option<FileId>,
    src: Option<NamedSource<String>>,
    elsewhere: Vec<String>,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create an adapter rendering `diag` against `src`, the text of the
    /// file named `name`.
    pub fn new(diag: &'a Diagnostic, name: &str, src: &str) -> Self {
        Self {
            diag,
            file: anchor_file(diag),
            src: Some(NamedSource::new(name, src.to_string())),
            elsewhere: Vec::new(),
        }
    }

    /// Create an adapter for `diag`, looking its source text up in `context`.
    pub fn from_context<P: SourceProvider>(diag: &'a Diagnostic, context: &Context<P>) -> Self {
        let file = anchor_file(diag);
        let src = file.and_then(|file| {
            let path = context.source_map().path(file)?;
            let text = context.text(file)?;
            Some(NamedSource::new(path.display().to_string(), text.to_string()))
        });
        let elsewhere = diag
            .labels()
            .iter()
            .filter(|label| Some(label.span().file()) != file)
            .map(|label| {
                let location = describe(context, label.span());
                format!("{}: {location}", label.message())
            })
            .collect();
        Self {
            diag,
            file,
            src,
            elsewhere,
        }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .field("file", &self.file)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn severity(&self) -> Option<MietteSeverity> {
        if self.diag.severity().is_error() {
            Some(MietteSeverity::Error)
        } else {
            Some(MietteSeverity::Warning)
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let mut lines: Vec<String> = self.diag.help().map(str::to_string).into_iter().collect();
        lines.extend(self.elsewhere.iter().cloned());
        if lines.is_empty() {
            return None;
        }
        Some(Box::new(lines.join("\n")))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.src.as_ref().map(|src| src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.src.as_ref()?;
        let file = self.file?;
        let labels: Vec<LabeledSpan> = self
            .diag
            .labels()
            .iter()
            .filter(|label| label.span().file() == file)
            .map(|label| {
                let span = span_to_miette(label.span());
                let message = Some(label.message().to_string());
                if label.is_primary() {
                    LabeledSpan::new_primary_with_span(message, span)
                } else {
                    LabeledSpan::new_with_span(message, span)
                }
            })
            .collect();
        if labels.is_empty() {
            return None;
        }
        Some(Box::new(labels.into_iter()))
    }
}

/// Adapter for [`DtLinkError`], which carries no source location.
pub struct ErrorAdapter<'a>(pub &'a DtLinkError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            DtLinkError::Io(_) => "dtlink::io",
            DtLinkError::SourceUnavailable { .. } => "dtlink::source",
            DtLinkError::Config(_) => "dtlink::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            DtLinkError::SourceUnavailable { .. } => {
                "check the path and the configured common files"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

/// A reportable item that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// An error without source location.
    Error(ErrorAdapter<'a>),
}

impl Reportable<'_> {
    /// Whether this item counts as an error rather than a warning.
    pub fn is_error(&self) -> bool {
        match self {
            Reportable::Diagnostic(d) => d.diag.severity().is_error(),
            Reportable::Error(_) => true,
        }
    }
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<MietteSeverity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a [`DtLinkError`] into a list of reportable errors.
pub fn to_reportables(err: &DtLinkError) -> Vec<Reportable<'_>> {
    vec![Reportable::Error(ErrorAdapter(err))]
}

/// Pair every diagnostic with its source text from `context`.
pub fn diagnostic_reportables<'a, P: SourceProvider>(
    context: &Context<P>,
    diagnostics: &'a [Diagnostic],
) -> Vec<Reportable<'a>> {
    diagnostics
        .iter()
        .map(|d| Reportable::Diagnostic(DiagnosticAdapter::from_context(d, context)))
        .collect()
}

/// The file a diagnostic is drawn against: its primary label's, or its first
/// label's when none is primary.
fn anchor_file(diag: &Diagnostic) -> Option<FileId> {
    diag.primary_span()
        .or_else(|| diag.labels().first().map(|label| label.span()))
        .map(|span| span.file())
}

fn describe<P: SourceProvider>(context: &Context<P>, span: Span) -> String {
    match context.source_map().path(span.file()) {
        Some(path) => format!("{}:{}", path.display(), span.start_pos()),
        None => span.to_string(),
    }
}

/// Convert a dtlink [`Span`] to a miette [`SourceSpan`].
fn span_to_miette(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

#[cfg(test)]
mod tests {
    use std::io;

    use dtlink::{MemorySources, config::AppConfig, span::LineIndex};
    use dtlink_parser::error::ErrorCode;

    use super::*;

    const SOURCE: &str = "/ { a { }; a { }; };";

    fn span(file: u32, range: std::ops::Range<usize>) -> Span {
        LineIndex::new(SOURCE).span(FileId::new(file), range)
    }

    #[test]
    fn test_single_diagnostic() {
        let diag = Diagnostic::error("duplicate node name `a`")
            .with_code(ErrorCode::E400)
            .with_label(span(0, 11..12), "defined again here")
            .with_help("merge the two blocks");

        let adapter = DiagnosticAdapter::new(&diag, "board.dts", SOURCE);
        assert_eq!(adapter.to_string(), "duplicate node name `a`");
        assert_eq!(adapter.code().unwrap().to_string(), "E400");
        assert_eq!(adapter.help().unwrap().to_string(), "merge the two blocks");
        assert_eq!(adapter.severity(), Some(MietteSeverity::Error));
        assert!(adapter.source_code().is_some());
    }

    #[test]
    fn test_primary_flag_on_labels() {
        let diag = Diagnostic::error("error with labels")
            .with_label(span(0, 11..12), "primary")
            .with_secondary_label(span(0, 4..5), "secondary");

        let adapter = DiagnosticAdapter::new(&diag, "board.dts", SOURCE);

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert_eq!(labels[0].label(), Some("primary"));
        assert!(!labels[1].primary());
        assert_eq!(labels[1].offset(), 4);
    }

    #[test]
    fn test_warning_severity() {
        let diag = Diagnostic::warning("unable to resolve include `x.dtsi`")
            .with_label(span(0, 0..1), "not found");

        let adapter = DiagnosticAdapter::new(&diag, "board.dts", SOURCE);
        assert_eq!(adapter.severity(), Some(MietteSeverity::Warning));
        assert!(!Reportable::Diagnostic(adapter).is_error());
    }

    #[test]
    fn test_labels_in_other_files_move_to_help() {
        let sources = MemorySources::new()
            .with_file("soc.dtsi", "/ { l: a { }; };")
            .with_file("board.dts", "#include \"soc.dtsi\"\n/ { l: b { }; };");
        let mut context = dtlink::Context::new("board.dts", sources, AppConfig::default());
        context.runtime().unwrap();
        let diagnostics = context.diagnostics();
        assert_eq!(diagnostics.len(), 1);

        let reportables = diagnostic_reportables(&context, &diagnostics);
        let Reportable::Diagnostic(adapter) = &reportables[0] else {
            panic!("Expected Diagnostic");
        };

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert!(labels[0].primary());
        let help = adapter.help().unwrap().to_string();
        assert!(help.contains("board.dts:2:5"), "{help}");
    }

    #[test]
    fn test_unknown_file_has_no_labels() {
        let diag = Diagnostic::error("lost").with_label(span(7, 0..1), "here");
        let context = dtlink::Context::new("board.dts", MemorySources::new(), AppConfig::default());

        let adapter = DiagnosticAdapter::from_context(&diag, &context);
        assert!(adapter.source_code().is_none());
        assert!(adapter.labels().is_none());
    }

    #[test]
    fn test_error_adapter_codes() {
        let err = DtLinkError::source_unavailable(
            "board.dts",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 1);
        assert!(reportables[0].is_error());
        assert_eq!(reportables[0].code().unwrap().to_string(), "dtlink::source");

        let err = DtLinkError::Config("bad".to_string());
        assert_eq!(ErrorAdapter(&err).code().unwrap().to_string(), "dtlink::config");
    }
}
