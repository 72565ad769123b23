//! dtlink CLI library
//!
//! This module contains the core CLI logic: it resolves a devicetree source
//! file with its includes and reports every diagnostic of the pass.

pub mod error_adapter;
pub mod tree;

mod args;
mod config;

pub use args::Args;

use std::sync::Arc;

use log::info;

use dtlink::{Context, DtLinkError, FsSources, runtime::Runtime};
use dtlink_parser::error::Diagnostic;

use tree::TreeDump;

/// The result of checking one root file.
#[derive(Debug)]
pub struct Outcome {
    /// The context the root file was resolved in; holds the source text
    /// diagnostics are rendered against.
    pub context: Context<FsSources>,
    pub runtime: Arc<Runtime>,
    pub diagnostics: Vec<Diagnostic>,
    warnings_as_errors: bool,
}

impl Outcome {
    pub fn errors(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity().is_error())
            .count()
    }

    pub fn warnings(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity().is_warning())
            .count()
    }

    /// Whether the run should exit with a failing status.
    pub fn failed(&self) -> bool {
        self.errors() > 0 || (self.warnings_as_errors && self.warnings() > 0)
    }

    /// The resolved tree in source syntax.
    pub fn tree(&self) -> String {
        TreeDump::new(&self.runtime, self.context.source_map()).to_string()
    }
}

/// Run the dtlink CLI application
///
/// This function loads the configuration, resolves the input file together
/// with its includes and the configured common files, and collects the
/// diagnostics of the pass.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `DtLinkError` for:
/// - Configuration loading errors
/// - Source files that cannot be read
pub fn run(args: &Args) -> Result<Outcome, DtLinkError> {
    info!(input_path = args.input; "Checking devicetree source");

    let config = config::resolve_config(args)?;
    let warnings_as_errors = config.diagnostics().warnings_as_errors();

    let mut context = Context::new(&args.input, FsSources, config);
    let runtime = context.runtime()?;
    let diagnostics = context.diagnostics();

    let outcome = Outcome {
        context,
        runtime,
        diagnostics,
        warnings_as_errors,
    };
    info!(
        files = outcome.context.ordered_files().len(),
        errors = outcome.errors(),
        warnings = outcome.warnings();
        "Check finished"
    );
    Ok(outcome)
}
