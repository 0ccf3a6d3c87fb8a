//! Per-run analysis context
//!
//! One `RunContext` is created per invocation and passed to every component;
//! there is no process-wide state. It owns the resolved configuration and the
//! lazily populated file-content and declaration-index caches. Entries are
//! never invalidated within a run: a run operates on one snapshot of the
//! working tree with no concurrent writers assumed.
//!
//! The crate is single-threaded and fully synchronous, so plain `RefCell`
//! interior mutability is sufficient.

use crate::config::ResolvedConfig;
use crate::index::FileIndex;
use crate::paths;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub struct RunContext {
    config: ResolvedConfig,
    contents: RefCell<HashMap<PathBuf, Option<Rc<str>>>>,
    indexes: RefCell<HashMap<PathBuf, Rc<FileIndex>>>,
}

impl RunContext {
    pub fn new(config: ResolvedConfig) -> Self {
        RunContext {
            config,
            contents: RefCell::new(HashMap::new()),
            indexes: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Read a file through the per-run cache.
    ///
    /// An unreadable file warns once and yields `None` on this and every
    /// later lookup — the file is simply excluded from the analysis, which
    /// may under-report dependents if it was significant.
    pub fn content(&self, path: &Path) -> Option<Rc<str>> {
        if let Some(entry) = self.contents.borrow().get(path) {
            return entry.clone();
        }
        let entry = match std::fs::read_to_string(path) {
            Ok(text) => Some(Rc::from(text.as_str())),
            Err(e) => {
                eprintln!("warning: skipping unreadable file {}: {}", path.display(), e);
                None
            }
        };
        self.contents
            .borrow_mut()
            .insert(path.to_path_buf(), entry.clone());
        entry
    }

    /// Declaration index for a file, built once per run.
    ///
    /// Unreadable files contribute an empty index (non-fatal).
    pub fn index(&self, path: &Path) -> Rc<FileIndex> {
        if let Some(index) = self.indexes.borrow().get(path) {
            return Rc::clone(index);
        }
        let index = Rc::new(match self.content(path) {
            Some(source) => FileIndex::parse(path.to_path_buf(), &source),
            None => FileIndex::empty(path.to_path_buf()),
        });
        self.indexes
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&index));
        index
    }

    /// Module key of a file relative to the project root.
    pub fn module_key(&self, path: &Path) -> String {
        paths::module_key(&self.config.project_root, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use tempfile::TempDir;

    fn context_for(dir: &TempDir) -> RunContext {
        RunContext::new(ResolvedConfig::defaults(dir.path()).unwrap())
    }

    #[test]
    fn test_content_is_cached() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        std::fs::write(&file, "const a = 1;\n").unwrap();

        let ctx = context_for(&dir);
        let first = ctx.content(&file).unwrap();
        // Mutating the file mid-run must not be observed
        std::fs::write(&file, "const b = 2;\n").unwrap();
        let second = ctx.content(&file).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unreadable_file_yields_none() {
        let dir = TempDir::new().unwrap();
        let ctx = context_for(&dir);
        assert!(ctx.content(&dir.path().join("missing.ts")).is_none());
        assert!(ctx.index(&dir.path().join("missing.ts")).is_empty());
    }

    #[test]
    fn test_index_matches_content() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        std::fs::write(&file, "const a = 1;\nfunction go() {}\n").unwrap();

        let ctx = context_for(&dir);
        let index = ctx.index(&file);
        assert_eq!(index.declarations.len(), 2);
        assert!(index.find("go").is_some());
    }
}
