//! Source file discovery
//!
//! Collects the TypeScript/JavaScript files under the configured source
//! directories. Results are sorted for deterministic traversal order.

use crate::config::ResolvedConfig;
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Check if a file is a supported source file
///
/// Supported extensions: .ts, .tsx, .mts, .cts, .js, .jsx, .mjs, .cjs.
/// TypeScript declaration files (.d.ts) are excluded.
pub fn is_supported_source_file(filename: &str) -> bool {
    if filename.ends_with(".d.ts") {
        return false;
    }
    matches!(
        Path::new(filename).extension().and_then(|e| e.to_str()),
        Some("ts" | "tsx" | "mts" | "cts" | "js" | "jsx" | "mjs" | "cjs")
    )
}

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.')
        || name == "node_modules"
        || name == "dist"
        || name == "build"
        || name == "out"
        || name == "coverage"
}

/// Collect all supported source files under the configured source directories.
///
/// A configured directory that does not exist is skipped with a warning —
/// the project may simply not have been scaffolded with the conventional
/// layout. Output is sorted and free of duplicates.
pub fn collect_source_files(config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for dir in &config.source_dirs {
        if !dir.is_dir() {
            eprintln!("warning: source directory not found: {}", dir.display());
            continue;
        }
        collect_recursive(dir, config, &mut files)?;
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn collect_recursive(
    dir: &Path,
    config: &ResolvedConfig,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry_result in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry_result?;
        let path = entry.path();
        let metadata = std::fs::symlink_metadata(&path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;

        if metadata.is_symlink() {
            continue;
        }

        if metadata.is_dir() {
            if let Some(name) = path.file_name().and_then(|n: &OsStr| n.to_str()) {
                if is_skipped_dir(name) {
                    continue;
                }
            }
            collect_recursive(&path, config, files)?;
        } else if metadata.is_file() {
            if let Some(filename) = path.file_name().and_then(|n: &OsStr| n.to_str()) {
                if is_supported_source_file(filename) && config.should_include(&path) {
                    files.push(path);
                }
            }
        }
    }

    Ok(())
}
