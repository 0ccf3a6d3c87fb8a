//! Git subprocess invocations
//!
//! Retrieves the working-tree diff and the untracked-file list for a
//! project. Each phase is a single blocking invocation; a non-zero exit is
//! a hard, unretried failure surfaced verbatim to the caller.
//!
//! Uses git CLI directly (no libgit2) for portability.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Execute a git command in a specific directory and return the stdout
fn git_at(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .context("failed to invoke git")?;

    if !output.status.success() {
        anyhow::bail!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Unified diff of the working tree (staged and unstaged) against HEAD.
///
/// Zero context lines, so every hunk start line points at an actually
/// changed line. Paths are reported relative to the project root.
pub fn diff_against_head(project_root: &Path) -> Result<String> {
    git_at(
        project_root,
        &["diff", "HEAD", "--no-color", "--no-ext-diff", "--relative", "--unified=0"],
    )
}

/// Untracked files from `git status --porcelain` (`?? <path>` lines),
/// returned as paths relative to the reporting root.
pub fn untracked_files(project_root: &Path) -> Result<Vec<PathBuf>> {
    let output = git_at(
        project_root,
        &["status", "--porcelain", "--untracked-files=all", "--no-renames"],
    )?;
    Ok(parse_untracked(&output))
}

/// Parse porcelain status output, keeping only `?? ` entries.
pub fn parse_untracked(status: &str) -> Vec<PathBuf> {
    status
        .lines()
        .filter_map(|line| line.strip_prefix("?? "))
        .map(|path| PathBuf::from(path.trim_matches('"')))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_untracked() {
        let status = " M src/changed.ts\n?? src/new.ts\n?? src/other/added.js\nA  staged.ts\n";
        assert_eq!(
            parse_untracked(status),
            vec![PathBuf::from("src/new.ts"), PathBuf::from("src/other/added.js")]
        );
    }

    #[test]
    fn test_parse_untracked_unquotes() {
        let status = "?? \"src/spaced name.ts\"\n";
        assert_eq!(parse_untracked(status), vec![PathBuf::from("src/spaced name.ts")]);
    }

    #[test]
    fn test_git_failure_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        // Not a git repository: the subprocess fails and the error is
        // surfaced rather than swallowed.
        assert!(diff_against_head(dir.path()).is_err());
    }
}
