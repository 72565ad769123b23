//! Configuration types for dtlink contexts.
//!
//! All types implement [`serde::Deserialize`]; every section and field is
//! optional in the source document.
//!
//! - [`AppConfig`] - Top-level configuration.
//! - [`ContextConfig`] - Include search paths and shared files.
//! - [`DiagnosticsConfig`] - What the linker reports.
//!
//! # Example
//!
//! ```
//! # use dtlink::config::AppConfig;
//! let config = AppConfig::default();
//! assert!(config.diagnostics().report_unresolved_values());
//! assert!(config.context().include_paths().is_empty());
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    context: ContextConfig,

    #[serde(default)]
    diagnostics: DiagnosticsConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(context: ContextConfig, diagnostics: DiagnosticsConfig) -> Self {
        Self {
            context,
            diagnostics,
        }
    }

    /// Returns the context configuration.
    pub fn context(&self) -> &ContextConfig {
        &self.context
    }

    /// Returns the context configuration for extension, e.g. by CLI flags.
    pub fn context_mut(&mut self) -> &mut ContextConfig {
        &mut self.context
    }

    /// Returns the diagnostics configuration.
    pub fn diagnostics(&self) -> &DiagnosticsConfig {
        &self.diagnostics
    }
}

/// The `[context]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextConfig {
    /// Directories searched for `#include` targets, in order.
    #[serde(default)]
    include_paths: Vec<PathBuf>,

    /// Files resolved before the root file of every context, in order.
    #[serde(default)]
    common: Vec<PathBuf>,
}

impl ContextConfig {
    /// Creates a new [`ContextConfig`].
    ///
    /// # Arguments
    ///
    /// * `include_paths` - Directories searched for includes.
    /// * `common` - Files prepended to every context.
    pub fn new(include_paths: Vec<PathBuf>, common: Vec<PathBuf>) -> Self {
        Self {
            include_paths,
            common,
        }
    }

    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    pub fn common(&self) -> &[PathBuf] {
        &self.common
    }

    /// Appends an include search directory.
    pub fn add_include_path(&mut self, path: impl AsRef<Path>) {
        self.include_paths.push(path.as_ref().to_path_buf());
    }

    /// Appends a common file.
    pub fn add_common(&mut self, path: impl AsRef<Path>) {
        self.common.push(path.as_ref().to_path_buf());
    }
}

/// The `[diagnostics]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsConfig {
    /// Report property-value references still unresolved when a pass ends.
    #[serde(default = "default_true")]
    report_unresolved_values: bool,

    /// Treat warnings as errors when deciding a failing exit status.
    #[serde(default)]
    warnings_as_errors: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            report_unresolved_values: true,
            warnings_as_errors: false,
        }
    }
}

impl DiagnosticsConfig {
    /// Creates a new [`DiagnosticsConfig`].
    pub fn new(report_unresolved_values: bool, warnings_as_errors: bool) -> Self {
        Self {
            report_unresolved_values,
            warnings_as_errors,
        }
    }

    pub fn report_unresolved_values(&self) -> bool {
        self.report_unresolved_values
    }

    pub fn warnings_as_errors(&self) -> bool {
        self.warnings_as_errors
    }
}
