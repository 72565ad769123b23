//! The revaluation driver.
//!
//! A [`Context`] is a root file plus its transitive includes plus the
//! configured common files. It owns the parsed files and the current
//! [`Runtime`]; every revaluation runs a full resolution pass from scratch
//! and swaps in the new runtime only once the pass has completed.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info};

use dtlink_core::{
    source::SourceMap,
    span::{FileId, Span},
};
use dtlink_parser::{
    ParsedFile,
    error::{Diagnostic, ErrorCode},
};

use crate::{
    config::AppConfig,
    error::DtLinkError,
    issue::Issue,
    resolver,
    runtime::Runtime,
    source::{SourceProvider, resolve_include},
};

/// One loaded source file.
#[derive(Debug)]
struct Loaded {
    text: Arc<str>,
    parsed: Arc<ParsedFile>,
}

/// State collected while walking the include graph of one pass.
#[derive(Debug, Default)]
struct IncludeWalk {
    visited: HashSet<FileId>,
    files: Vec<Arc<ParsedFile>>,
    links: HashMap<FileId, Vec<(Span, PathBuf)>>,
    diagnostics: Vec<Diagnostic>,
}

/// A root file, everything it pulls in, and the latest resolved graph.
///
/// # Examples
///
/// ```
/// # use dtlink::{Context, MemorySources, config::AppConfig};
/// let sources = MemorySources::new()
///     .with_file("soc.dtsi", "/ { uart0: serial@1000 { }; };")
///     .with_file("board.dts", "#include \"soc.dtsi\"\n&uart0 { status = \"okay\"; };");
/// let mut context = Context::new("board.dts", sources, AppConfig::default());
///
/// let runtime = context.runtime().unwrap();
/// assert_eq!(context.ordered_files().len(), 2);
/// assert!(context.diagnostics().is_empty());
///
/// let uart = runtime.label("uart0").unwrap();
/// assert!(runtime.node(uart).property("status").is_some());
/// ```
#[derive(Debug)]
pub struct Context<P: SourceProvider> {
    root: PathBuf,
    provider: P,
    config: AppConfig,
    sources: SourceMap,
    loaded: HashMap<FileId, Loaded>,
    include_links: HashMap<FileId, Vec<(Span, PathBuf)>>,
    include_diagnostics: Vec<Diagnostic>,
    runtime: Option<Arc<Runtime>>,
    generation: u64,
}

impl<P: SourceProvider> Context<P> {
    /// Create a context for `root`. Nothing is read until the first
    /// [`Context::runtime`] or [`Context::revaluate`].
    pub fn new(root: impl Into<PathBuf>, provider: P, config: AppConfig) -> Self {
        Self {
            root: root.into(),
            provider,
            config,
            sources: SourceMap::new(),
            loaded: HashMap::new(),
            include_links: HashMap::new(),
            include_diagnostics: Vec::new(),
            runtime: None,
            generation: 0,
        }
    }

    /// The root file.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Mutable access to the provider, e.g. to update an editor buffer.
    /// Call [`Context::revaluate`] with the changed path afterwards.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.sources
    }

    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.sources.lookup(path)
    }

    /// The text `file` was last parsed from.
    pub fn text(&self, file: FileId) -> Option<&str> {
        self.loaded.get(&file).map(|loaded| loaded.text.as_ref())
    }

    /// The latest completed runtime, without triggering a pass.
    pub fn current(&self) -> Option<Arc<Runtime>> {
        self.runtime.clone()
    }

    /// The latest runtime, running the first pass if there is none yet.
    ///
    /// # Errors
    ///
    /// Returns [`DtLinkError::SourceUnavailable`] when a file of the context
    /// cannot be read.
    pub fn runtime(&mut self) -> Result<Arc<Runtime>, DtLinkError> {
        match &self.runtime {
            Some(runtime) => Ok(Arc::clone(runtime)),
            None => self.rebuild(),
        }
    }

    /// Re-run resolution after `changed` was modified, or after any file
    /// was modified when `changed` is `None`.
    ///
    /// On error the previous runtime stays current.
    pub fn revaluate(&mut self, changed: Option<&Path>) -> Result<Arc<Runtime>, DtLinkError> {
        match changed {
            Some(path) => {
                if let Some(file) = self.sources.lookup(path) {
                    self.loaded.remove(&file);
                }
            }
            None => self.loaded.clear(),
        }
        self.rebuild()
    }

    /// Whether `path` took part in the latest pass.
    pub fn contains(&self, path: &Path) -> bool {
        let Some(file) = self.sources.lookup(path) else {
            return false;
        };
        self.runtime
            .as_ref()
            .is_some_and(|runtime| runtime.file_rank(file).is_some())
    }

    /// Paths of the latest pass in resolution order.
    pub fn ordered_files(&self) -> Vec<PathBuf> {
        let Some(runtime) = &self.runtime else {
            return Vec::new();
        };
        runtime
            .file_order()
            .into_iter()
            .filter_map(|file| self.sources.path(file).map(Path::to_path_buf))
            .collect()
    }

    /// Every diagnostic of the latest pass: syntax errors per file in
    /// resolution order, unresolved includes, then linker issues.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let Some(runtime) = &self.runtime else {
            return Vec::new();
        };
        let mut diagnostics: Vec<Diagnostic> = runtime
            .file_order()
            .into_iter()
            .filter_map(|file| runtime.parsed(file))
            .flat_map(|parsed| parsed.diagnostics.iter().cloned())
            .collect();
        diagnostics.extend(self.include_diagnostics.iter().cloned());
        diagnostics.extend(runtime.issues().iter().map(Issue::to_diagnostic));
        diagnostics
    }

    /// Every resolved include of `path`: the span of the include path and
    /// the file it names.
    pub fn include_links(&self, path: &Path) -> Vec<(Span, PathBuf)> {
        self.sources
            .lookup(path)
            .and_then(|file| self.include_links.get(&file))
            .cloned()
            .unwrap_or_default()
    }

    fn rebuild(&mut self) -> Result<Arc<Runtime>, DtLinkError> {
        let generation = self.generation + 1;
        info!(root:? = self.root, generation; "Revaluating context");

        let mut walk = IncludeWalk::default();
        for common in self.config.context().common().to_vec() {
            self.visit(&common, &mut walk)?;
        }
        let root = self.root.clone();
        self.visit(&root, &mut walk)?;

        let files = walk.files.len();
        let runtime = Arc::new(resolver::resolve(
            walk.files,
            self.config.diagnostics(),
            generation,
        ));

        self.generation = generation;
        self.include_links = walk.links;
        self.include_diagnostics = walk.diagnostics;
        self.runtime = Some(Arc::clone(&runtime));

        info!(generation, files, issues = runtime.issues().len(); "Context ready");
        Ok(runtime)
    }

    /// Post-order include walk: a file comes after everything it includes.
    /// Files already visited, cycles included, are skipped.
    fn visit(&mut self, path: &Path, walk: &mut IncludeWalk) -> Result<(), DtLinkError> {
        let file = self.sources.intern(path);
        if !walk.visited.insert(file) {
            return Ok(());
        }
        let parsed = self.load(file, path)?;

        for include in &parsed.ast.includes {
            let target = resolve_include(
                &self.provider,
                path,
                include,
                self.config.context().include_paths(),
            );
            match target {
                Some(target) => {
                    walk.links
                        .entry(file)
                        .or_default()
                        .push((include.path.span(), target.clone()));
                    self.visit(&target, walk)?;
                }
                None => walk.diagnostics.push(
                    Diagnostic::warning(format!(
                        "unable to resolve include `{}`",
                        include.path.inner()
                    ))
                    .with_code(ErrorCode::E102)
                    .with_label(include.path.span(), "not found in any include path"),
                ),
            }
        }

        walk.files.push(parsed);
        Ok(())
    }

    fn load(&mut self, file: FileId, path: &Path) -> Result<Arc<ParsedFile>, DtLinkError> {
        if let Some(loaded) = self.loaded.get(&file) {
            return Ok(Arc::clone(&loaded.parsed));
        }
        let text: Arc<str> = self
            .provider
            .read(path)
            .map_err(|err| DtLinkError::source_unavailable(path, err))?
            .into();
        let parsed = Arc::new(dtlink_parser::parse(&text, file));
        debug!(
            path:? = path,
            file:% = file,
            diagnostics = parsed.diagnostics.len();
            "Loaded source file"
        );
        self.loaded.insert(
            file,
            Loaded {
                text,
                parsed: Arc::clone(&parsed),
            },
        );
        Ok(parsed)
    }
}
