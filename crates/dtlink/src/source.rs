//! Source providers and include resolution.
//!
//! A [`SourceProvider`] is how a context reads files. [`FsSources`] reads
//! from disk; [`MemorySources`] serves text held in memory, such as unsaved
//! editor buffers or test fixtures.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use log::trace;

use dtlink_parser::ast::Include;

/// Read access to source files.
pub trait SourceProvider {
    /// Read the whole text of `path`.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Whether `path` names a readable file.
    fn exists(&self, path: &Path) -> bool;
}

/// Reads files from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSources;

impl SourceProvider for FsSources {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Serves files from memory.
///
/// # Examples
///
/// ```
/// # use std::path::Path;
/// # use dtlink::source::{MemorySources, SourceProvider};
/// let mut sources = MemorySources::new().with_file("board.dts", "/ { };");
/// assert!(sources.exists(Path::new("board.dts")));
///
/// sources.insert("board.dts", "/ { model = \"x\"; };");
/// assert_eq!(sources.read(Path::new("board.dts")).unwrap(), "/ { model = \"x\"; };");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    files: HashMap<PathBuf, String>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, builder style.
    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }

    pub fn remove(&mut self, path: &Path) -> Option<String> {
        self.files.remove(path)
    }
}

impl SourceProvider for MemorySources {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no in-memory source for `{}`", path.display()),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}

/// Find the file an include names.
///
/// Quoted includes look next to `including` first; every include then tries
/// `include_paths` in order. Absolute include paths are taken as they are.
pub fn resolve_include(
    provider: &impl SourceProvider,
    including: &Path,
    include: &Include,
    include_paths: &[PathBuf],
) -> Option<PathBuf> {
    let target = Path::new(include.path.inner());
    if target.is_absolute() {
        return provider.exists(target).then(|| target.to_path_buf());
    }

    let sibling = include
        .quoted
        .then(|| including.parent().map(|dir| dir.join(target)))
        .flatten();
    let found = sibling
        .into_iter()
        .chain(include_paths.iter().map(|dir| dir.join(target)))
        .find(|candidate| provider.exists(candidate));

    trace!(
        include = include.path.inner().as_str(),
        found:? = found;
        "Resolved include"
    );
    found
}
