//! Changed-declaration location
//!
//! Turns version-control output into *seeds*: the declarations directly
//! touched by the current edits. Three sources are combined:
//!
//! 1. Hunk-based mapping — each hunk's new-file start line is converted to a
//!    byte offset via cumulative line lengths, then mapped onto the
//!    enclosing declaration.
//! 2. Added-line scan — a bounded lookahead over the `+` lines after each
//!    hunk header catches newly inserted declaration headers (which make
//!    the position-based match unreliable and therefore supersede it) and
//!    object-literal property edits, which become composite
//!    `Object.property` seeds for finer-grained impact matching.
//! 3. Untracked files — fully indexed; every declaration is a seed.
//!
//! The diff parser accepts exactly the unified-hunk grammar and fails
//! loudly on anything else; silent under-reporting would surface as a
//! missed redeployment.

use crate::context::RunContext;
use crate::git;
use crate::index::{self, FileIndex};
use anyhow::{bail, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A changed declaration; the entry point for impact propagation.
///
/// A property-level seed uses the composite name `Object.property`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Seed {
    pub file: PathBuf,
    pub name: String,
}

impl Seed {
    pub fn new(file: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Seed {
            file: file.into(),
            name: name.into(),
        }
    }

    /// The declaration name: for `KEYS.A` this is `KEYS`.
    pub fn base_name(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    pub fn is_property(&self) -> bool {
        self.name.contains('.')
    }
}

/// How many added lines after each hunk header are scanned for inserted
/// declaration headers and property edits.
const ADDED_LINE_LOOKAHEAD: usize = 10;

fn hunk_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap())
}

fn property_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s+["']?([A-Za-z_$][A-Za-z0-9_$]*)["']?\s*:"#).unwrap()
    })
}

fn object_literal_head_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:export\s+)?(?:const|let|var)\s+[A-Za-z_$][A-Za-z0-9_$]*\s*(?::[^=\n]*?)?=\s*\{").unwrap()
    })
}

/// Compute the full changed-seed set for the current working tree.
///
/// Runs one diff and one status invocation; either failing is fatal for
/// the run with no partial result.
pub fn compute_changed_seeds(ctx: &RunContext, files: &[PathBuf]) -> Result<Vec<Seed>> {
    let root = &ctx.config().project_root;
    let diff = git::diff_against_head(root)?;
    let mut seeds = seeds_from_diff(&diff, ctx, files)?;
    let untracked = git::untracked_files(root)?;
    seeds.extend(seeds_from_untracked(&untracked, ctx, files));
    Ok(dedup_seeds(seeds))
}

/// Parse unified-diff text into seeds.
///
/// Files outside the project's source set are ignored (their hunks still
/// have to parse); text that is not unified-diff grammar is an error.
pub fn seeds_from_diff(diff: &str, ctx: &RunContext, files: &[PathBuf]) -> Result<Vec<Seed>> {
    let project: HashSet<&Path> = files.iter().map(|p| p.as_path()).collect();
    let root = ctx.config().project_root.clone();
    let lines: Vec<&str> = diff.lines().collect();

    let mut seeds = Vec::new();
    let mut current: Option<PathBuf> = None;
    let mut saw_file_header = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if let Some(rest) = line.strip_prefix("+++ ") {
            saw_file_header = true;
            current = parse_new_file_path(rest, &root)?
                .filter(|path| project.contains(path.as_path()));
            i += 1;
        } else if line.starts_with("@@") {
            if !saw_file_header {
                bail!("malformed diff: hunk header before any file header: {:?}", line);
            }
            let new_start = parse_hunk_header(line)?;
            let body_start = i + 1;
            let mut end = body_start;
            while end < lines.len() && is_hunk_body(lines[end]) {
                end += 1;
            }
            if let Some(ref file) = current {
                seeds.extend(hunk_seeds(file, new_start, &lines[body_start..end], ctx));
            }
            i = end;
        } else if is_file_metadata(line) {
            i += 1;
        } else {
            bail!("malformed diff: unrecognized line: {:?}", line);
        }
    }

    Ok(dedup_seeds(seeds))
}

/// Seeds for untracked files: a new file is fully dirty, so every
/// declaration in it becomes a seed.
pub fn seeds_from_untracked(
    untracked: &[PathBuf],
    ctx: &RunContext,
    files: &[PathBuf],
) -> Vec<Seed> {
    let project: HashSet<&Path> = files.iter().map(|p| p.as_path()).collect();
    let root = &ctx.config().project_root;

    let mut seeds = Vec::new();
    for rel in untracked {
        let joined = if rel.is_absolute() {
            rel.clone()
        } else {
            root.join(rel)
        };
        // Porcelain paths are repo-root-relative; when the project root sits
        // deeper in the repository, fall back to a suffix match against the
        // discovered source set.
        let path = if project.contains(joined.as_path()) {
            joined
        } else if let Some(found) = files.iter().find(|f| f.ends_with(rel)) {
            found.clone()
        } else {
            continue;
        };
        let index = ctx.index(&path);
        for decl in &index.declarations {
            seeds.push(Seed::new(path.clone(), decl.name.clone()));
        }
    }
    seeds
}

/// `b/<path>` or `/dev/null` after a `+++ ` prefix.
fn parse_new_file_path(rest: &str, root: &Path) -> Result<Option<PathBuf>> {
    let rest = rest.trim_end().trim_matches('"');
    if rest == "/dev/null" {
        return Ok(None);
    }
    match rest.strip_prefix("b/") {
        Some(path) => Ok(Some(root.join(path))),
        None => bail!("malformed diff: unrecognized file header: {:?}", rest),
    }
}

/// Extract the new-file start line from a `@@ -a,b +c,d @@` header.
fn parse_hunk_header(line: &str) -> Result<usize> {
    let caps = hunk_header_re()
        .captures(line)
        .ok_or_else(|| anyhow::anyhow!("malformed diff: bad hunk header: {:?}", line))?;
    caps[3]
        .parse::<usize>()
        .map_err(|e| anyhow::anyhow!("malformed diff: bad hunk start in {:?}: {}", line, e))
}

fn is_hunk_body(line: &str) -> bool {
    line.starts_with('+') || line.starts_with('-') || line.starts_with(' ') || line.starts_with('\\')
}

fn is_file_metadata(line: &str) -> bool {
    const PREFIXES: &[&str] = &[
        "diff --git",
        "index ",
        "--- ",
        "old mode",
        "new mode",
        "deleted file mode",
        "new file mode",
        "similarity index",
        "dissimilarity index",
        "rename from",
        "rename to",
        "copy from",
        "copy to",
        "Binary files",
        "GIT binary patch",
    ];
    PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Byte offset of the start of a 1-based line number (clamped to EOF).
fn offset_of_line(source: &str, line_no: usize) -> usize {
    if line_no <= 1 {
        return 0;
    }
    let mut offset = 0;
    for (count, line) in source.split_inclusive('\n').enumerate() {
        if count + 1 == line_no {
            break;
        }
        offset += line.len();
    }
    offset.min(source.len())
}

/// Seeds contributed by one hunk.
fn hunk_seeds(file: &Path, new_start: usize, body: &[&str], ctx: &RunContext) -> Vec<Seed> {
    let index = ctx.index(file);
    let content = ctx.content(file);

    // Position-based candidate: hunk start line → offset → declaration.
    let positional = content.as_ref().and_then(|src| {
        let offset = offset_of_line(src, new_start);
        index
            .declaration_at(offset)
            .map(|decl| Seed::new(file, decl.name.clone()))
    });

    let mut seeds = Vec::new();
    let mut superseded = false;
    let mut line_no = new_start;
    let mut scanned = 0;

    for raw in body {
        if scanned >= ADDED_LINE_LOOKAHEAD {
            break;
        }
        if let Some(text) = raw.strip_prefix('+') {
            scanned += 1;
            if let Some(m) = index::match_top_level(text) {
                // An inserted declaration shifts every later offset, so a
                // resolved header beats the position-based match.
                if index.find(&m.name).is_some() {
                    seeds.push(Seed::new(file, m.name));
                    superseded = true;
                }
            } else if let Some(caps) = property_line_re().captures(text) {
                if let Some(ref src) = content {
                    let offset = offset_of_line(src, line_no);
                    if let Some(seed) = property_seed(&index, src, offset, &caps[1], file) {
                        seeds.push(seed);
                        superseded = true;
                    }
                }
            }
            line_no += 1;
        } else if raw.starts_with(' ') {
            line_no += 1;
        }
    }

    if !superseded {
        seeds.extend(positional);
    }
    seeds
}

/// Build an `Object.property` seed when the edited line sits inside a
/// top-level object-literal assignment, after its opening brace.
fn property_seed(
    index: &FileIndex,
    source: &str,
    offset: usize,
    property: &str,
    file: &Path,
) -> Option<Seed> {
    let decl_idx = index.index_at(offset)?;
    let block = index.block_text(decl_idx, source);
    object_literal_head_re().find(block)?;

    let (block_start, _) = index.block_range(decl_idx);
    let brace = block_start + block.find('{')?;
    if offset <= brace {
        return None;
    }

    let object = &index.declarations[decl_idx].name;
    Some(Seed::new(file, format!("{}.{}", object, property)))
}

fn dedup_seeds(seeds: Vec<Seed>) -> Vec<Seed> {
    let mut seen = HashSet::new();
    seeds
        .into_iter()
        .filter(|s| seen.insert((s.file.clone(), s.name.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::context::RunContext;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn context_for(dir: &TempDir) -> RunContext {
        RunContext::new(ResolvedConfig::defaults(dir.path()).unwrap())
    }

    #[test]
    fn test_seed_base_name() {
        let seed = Seed::new("a.ts", "KEYS.A");
        assert_eq!(seed.base_name(), "KEYS");
        assert!(seed.is_property());
        let plain = Seed::new("a.ts", "handler");
        assert_eq!(plain.base_name(), "handler");
        assert!(!plain.is_property());
    }

    #[test]
    fn test_offset_of_line() {
        let src = "one\ntwo\nthree\n";
        assert_eq!(offset_of_line(src, 1), 0);
        assert_eq!(offset_of_line(src, 2), 4);
        assert_eq!(offset_of_line(src, 3), 8);
        assert_eq!(offset_of_line(src, 99), src.len());
    }

    #[test]
    fn test_hunk_maps_to_enclosing_declaration() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "src/a.ts",
            "export function first() {\n  one();\n}\nexport function second() {\n  two();\n}\n",
        );
        let ctx = context_for(&dir);
        let diff = "\
diff --git a/src/a.ts b/src/a.ts
index 0000000..1111111 100644
--- a/src/a.ts
+++ b/src/a.ts
@@ -5,1 +5,1 @@
-  old();
+  two();
";
        let seeds = seeds_from_diff(diff, &ctx, &[file.clone()]).unwrap();
        assert_eq!(seeds, vec![Seed::new(file, "second")]);
    }

    #[test]
    fn test_inserted_declaration_supersedes_positional() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "src/a.ts",
            "export function fresh() {\n  go();\n}\nexport function stale() {\n  stop();\n}\n",
        );
        let ctx = context_for(&dir);
        // Purely additive hunk inserting `fresh` at the top: the positional
        // match would blame whatever now sits at line 1, but the header scan
        // resolves the real insertion.
        let diff = "\
diff --git a/src/a.ts b/src/a.ts
index 0000000..1111111 100644
--- a/src/a.ts
+++ b/src/a.ts
@@ -0,0 +1,3 @@
+export function fresh() {
+  go();
+}
";
        let seeds = seeds_from_diff(diff, &ctx, &[file.clone()]).unwrap();
        assert_eq!(seeds, vec![Seed::new(file, "fresh")]);
    }

    #[test]
    fn test_property_edit_yields_composite_seed() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "src/keys.ts",
            "export const KEYS = {\n  A: \"a\",\n  B: \"b\",\n};\n",
        );
        let ctx = context_for(&dir);
        let diff = "\
diff --git a/src/keys.ts b/src/keys.ts
index 0000000..1111111 100644
--- a/src/keys.ts
+++ b/src/keys.ts
@@ -2,1 +2,1 @@
-  A: \"old\",
+  A: \"a\",
";
        let seeds = seeds_from_diff(diff, &ctx, &[file.clone()]).unwrap();
        assert_eq!(seeds, vec![Seed::new(file, "KEYS.A")]);
    }

    #[test]
    fn test_property_line_outside_object_falls_back() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "src/a.ts",
            "export function pick(x: number) {\n  switch (x) {\n    case 1:\n      return 1;\n  }\n}\n",
        );
        let ctx = context_for(&dir);
        // `case 1:` looks like a property line but its enclosing declaration
        // is a function, not an object literal.
        let diff = "\
diff --git a/src/a.ts b/src/a.ts
index 0000000..1111111 100644
--- a/src/a.ts
+++ b/src/a.ts
@@ -3,1 +3,1 @@
-    case 0:
+    case 1:
";
        let seeds = seeds_from_diff(diff, &ctx, &[file.clone()]).unwrap();
        assert_eq!(seeds, vec![Seed::new(file, "pick")]);
    }

    #[test]
    fn test_malformed_hunk_header_fails() {
        let dir = TempDir::new().unwrap();
        let ctx = context_for(&dir);
        let diff = "\
diff --git a/src/a.ts b/src/a.ts
--- a/src/a.ts
+++ b/src/a.ts
@@ -x +y @@
";
        assert!(seeds_from_diff(diff, &ctx, &[]).is_err());
    }

    #[test]
    fn test_unrecognized_line_fails() {
        let dir = TempDir::new().unwrap();
        let ctx = context_for(&dir);
        assert!(seeds_from_diff("this is not a diff\n", &ctx, &[]).is_err());
    }

    #[test]
    fn test_hunk_before_file_header_fails() {
        let dir = TempDir::new().unwrap();
        let ctx = context_for(&dir);
        assert!(seeds_from_diff("@@ -1,1 +1,1 @@\n-a\n+b\n", &ctx, &[]).is_err());
    }

    #[test]
    fn test_empty_diff_is_empty() {
        let dir = TempDir::new().unwrap();
        let ctx = context_for(&dir);
        assert_eq!(seeds_from_diff("", &ctx, &[]).unwrap(), Vec::<Seed>::new());
    }

    #[test]
    fn test_out_of_project_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let ctx = context_for(&dir);
        let diff = "\
diff --git a/README.md b/README.md
index 0000000..1111111 100644
--- a/README.md
+++ b/README.md
@@ -1,1 +1,1 @@
-old
+new
";
        assert_eq!(seeds_from_diff(diff, &ctx, &[]).unwrap(), Vec::<Seed>::new());
    }

    #[test]
    fn test_untracked_file_fully_seeded() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "src/new.ts",
            "export const a = onCall(() => {});\nexport const b = onRequest(() => {});\n",
        );
        let ctx = context_for(&dir);
        let seeds = seeds_from_untracked(&[PathBuf::from("src/new.ts")], &ctx, &[file.clone()]);
        assert_eq!(
            seeds,
            vec![Seed::new(file.clone(), "a"), Seed::new(file, "b")]
        );
    }

    #[test]
    fn test_untracked_outside_project_ignored() {
        let dir = TempDir::new().unwrap();
        let ctx = context_for(&dir);
        let seeds = seeds_from_untracked(&[PathBuf::from("notes.txt")], &ctx, &[]);
        assert!(seeds.is_empty());
    }

    #[test]
    fn test_seeds_are_deduplicated() {
        let seeds = dedup_seeds(vec![
            Seed::new("a.ts", "x"),
            Seed::new("a.ts", "x"),
            Seed::new("a.ts", "y"),
        ]);
        assert_eq!(seeds.len(), 2);
    }
}
