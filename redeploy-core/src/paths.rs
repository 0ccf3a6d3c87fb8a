//! Path normalization and module-specifier resolution
//!
//! All cross-file comparisons in the reference graph go through the
//! *module key*: a project-root-relative, extension-stripped, forward-slash
//! path with a trailing `/index` segment collapsed. This makes `./x`,
//! `./x.ts`, and `./x/index` resolve to the same key.
//!
//! Global invariants:
//! - Resolution is purely lexical; the filesystem is never consulted
//! - Non-relative specifiers (bare package names) resolve to `None`

use std::path::{Component, Path, PathBuf};

/// Source extensions stripped when computing module keys.
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Lexically normalize a path (resolve `..` and `.` without hitting the filesystem).
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for c in path.components() {
        match c {
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else {
                    components.push(c);
                }
            }
            Component::CurDir => {}
            other => components.push(other),
        }
    }
    components.iter().collect()
}

/// Compute the module key for a file: root-relative, forward slashes,
/// known source extension stripped, trailing `/index` collapsed.
pub fn module_key(root: &Path, path: &Path) -> String {
    let normalized = normalize_lexically(path);
    let rel = normalized.strip_prefix(root).unwrap_or(&normalized);

    let mut key = rel.to_string_lossy().replace('\\', "/");
    if let Some(ext) = rel.extension().and_then(|e| e.to_str()) {
        if SOURCE_EXTENSIONS.contains(&ext) {
            key.truncate(key.len() - ext.len() - 1);
        }
    }
    if key.ends_with("/index") {
        let collapsed = key.len() - "/index".len();
        key.truncate(collapsed);
    }
    key
}

/// Resolve a module specifier written in `from` against that file's directory.
///
/// Returns `None` for bare (package) specifiers — those are external to the
/// project and never produce a graph edge.
pub fn resolve_specifier(from: &Path, specifier: &str) -> Option<PathBuf> {
    if !specifier.starts_with("./") && !specifier.starts_with("../") {
        return None;
    }
    let dir = from.parent().unwrap_or(Path::new("."));
    Some(normalize_lexically(&dir.join(specifier)))
}

/// Root-relative display form of a path (forward slashes).
pub fn display_rel(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
