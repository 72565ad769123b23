//! File identity registry.
//!
//! A [`SourceMap`] hands out one stable [`FileId`] per path for the lifetime
//! of a context, so that ids stay valid across revaluations even when the
//! include order changes.

use std::path::{Path, PathBuf};

use log::trace;

use crate::span::FileId;

#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    paths: Vec<PathBuf>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `path`, registering it on first sight.
    pub fn intern(&mut self, path: &Path) -> FileId {
        if let Some(id) = self.lookup(path) {
            return id;
        }
        let id = FileId::new(self.paths.len() as u32);
        trace!(path = path.display().to_string(), file:% = id; "Registered source file");
        self.paths.push(path.to_path_buf());
        id
    }

    /// Returns the id for `path` if it was registered.
    pub fn lookup(&self, path: &Path) -> Option<FileId> {
        self.paths
            .iter()
            .position(|known| known == path)
            .map(|idx| FileId::new(idx as u32))
    }

    /// Returns the path registered for `file`.
    pub fn path(&self, file: FileId) -> Option<&Path> {
        self.paths.get(file.index() as usize).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut map = SourceMap::new();
        let board = map.intern(Path::new("board.dts"));
        let soc = map.intern(Path::new("soc.dtsi"));

        assert_ne!(board, soc);
        assert_eq!(map.intern(Path::new("board.dts")), board);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_lookup_and_path() {
        let mut map = SourceMap::new();
        assert!(map.is_empty());

        let id = map.intern(Path::new("a/b.dtsi"));
        assert_eq!(map.lookup(Path::new("a/b.dtsi")), Some(id));
        assert_eq!(map.lookup(Path::new("missing.dtsi")), None);
        assert_eq!(map.path(id), Some(Path::new("a/b.dtsi")));
        assert_eq!(map.path(FileId::new(9)), None);
    }
}
