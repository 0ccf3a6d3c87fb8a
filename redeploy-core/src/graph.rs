//! Reverse file-reference lookup
//!
//! Given a target file, finds every other file whose text references it
//! through one of four shapes: static `import … from`, dynamic `import()`,
//! `require()`, and re-exports (wildcard or named list). Module specifiers
//! are resolved relative to the referencing file's directory and compared as
//! normalized module keys, so `./x`, `./x.ts`, and `./x/index` all hit the
//! same target.
//!
//! Global invariants:
//! - No duplicates in the result
//! - Bare (package) specifiers never produce an edge
//! - Unreadable candidates are skipped, not fatal

use crate::context::RunContext;
use crate::paths;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// How a file references another file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefKind {
    StaticImport,
    DynamicImport,
    Require,
    ReExportStar,
    ReExportNamed(Vec<String>),
}

/// Re-export information attached to a referencing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReExport {
    /// `export * from '…'` — forwards every declaration.
    Star,
    /// `export { a, b } from '…'` — forwards only the listed names.
    Named(Vec<String>),
}

/// One file that references the target.
#[derive(Debug, Clone)]
pub struct ReferencingFile {
    pub path: PathBuf,
    pub re_export: Option<ReExport>,
}

fn star_re_export_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"export\s*\*\s*(?:as\s+[A-Za-z_$][A-Za-z0-9_$]*\s+)?from\s*['"]([^'"]+)['"]"#).unwrap())
}

fn named_re_export_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"export\s+(?:type\s+)?\{([^}]*)\}\s*from\s*['"]([^'"]+)['"]"#).unwrap()
    })
}

fn static_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:import|from)\s*['"]([^'"]+)['"]"#).unwrap())
}

fn dynamic_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"import\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap())
}

fn require_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap())
}

/// Parse the inside of a named re-export list.
///
/// `foo, bar as baz, type Qux` yields the *source* names `foo`, `bar`,
/// `Qux` — aliases are invisible to downstream textual matching.
fn parse_named_exports(list: &str) -> Vec<String> {
    list.split(',')
        .filter_map(|item| {
            let item = item.trim();
            let item = item.strip_prefix("type ").unwrap_or(item).trim();
            let name: String = item
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            (!name.is_empty()).then_some(name)
        })
        .collect()
}

/// Extract every in-project reference written in `source`, tagged by kind.
///
/// Specifiers are resolved relative to `file` and returned as resolved
/// paths; bare package specifiers are dropped.
pub fn scan_references(file: &Path, source: &str) -> Vec<(RefKind, PathBuf)> {
    let mut refs = Vec::new();

    for caps in star_re_export_re().captures_iter(source) {
        if let Some(resolved) = paths::resolve_specifier(file, &caps[1]) {
            refs.push((RefKind::ReExportStar, resolved));
        }
    }
    for caps in named_re_export_re().captures_iter(source) {
        if let Some(resolved) = paths::resolve_specifier(file, &caps[2]) {
            refs.push((RefKind::ReExportNamed(parse_named_exports(&caps[1])), resolved));
        }
    }
    for caps in static_import_re().captures_iter(source) {
        if let Some(resolved) = paths::resolve_specifier(file, &caps[1]) {
            refs.push((RefKind::StaticImport, resolved));
        }
    }
    for caps in dynamic_import_re().captures_iter(source) {
        if let Some(resolved) = paths::resolve_specifier(file, &caps[1]) {
            refs.push((RefKind::DynamicImport, resolved));
        }
    }
    for caps in require_re().captures_iter(source) {
        if let Some(resolved) = paths::resolve_specifier(file, &caps[1]) {
            refs.push((RefKind::Require, resolved));
        }
    }

    refs
}

/// Find every file in `files` that references `target`.
///
/// A wildcard re-export wins over a named one for the same candidate; a
/// candidate that both re-exports and imports the target is reported as a
/// re-exporter (its declarations are still scanned by the impact engine).
pub fn find_referencing_files(
    target: &Path,
    files: &[PathBuf],
    ctx: &RunContext,
) -> Vec<ReferencingFile> {
    let target_key = ctx.module_key(target);
    let mut result = Vec::new();

    for candidate in files {
        if candidate == target {
            continue;
        }
        let Some(source) = ctx.content(candidate) else {
            continue;
        };

        let mut star = false;
        let mut named: Vec<String> = Vec::new();
        let mut plain = false;

        for (kind, resolved) in scan_references(candidate, &source) {
            if ctx.module_key(&resolved) != target_key {
                continue;
            }
            match kind {
                RefKind::ReExportStar => star = true,
                RefKind::ReExportNamed(names) => named.extend(names),
                RefKind::StaticImport | RefKind::DynamicImport | RefKind::Require => plain = true,
            }
        }

        let re_export = if star {
            Some(ReExport::Star)
        } else if !named.is_empty() {
            Some(ReExport::Named(named))
        } else if plain {
            None
        } else {
            continue;
        };

        result.push(ReferencingFile {
            path: candidate.clone(),
            re_export,
        });
    }

    result
}
