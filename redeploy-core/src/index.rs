//! Top-level declaration extraction
//!
//! Builds an ordered index of the named declarations in a source file, each
//! with the byte offset where it starts. A declaration's *block* is the
//! half-open span from its own offset to the next declaration's offset (or
//! end of file for the last one).
//!
//! Detection is textual: an ordered rule table of line-anchored patterns,
//! evaluated first-hit-wins, plus naive brace tracking for class bodies.
//! Class methods, properties, and constructors are indexed as declarations
//! in their own right, which truncates the enclosing class's block at the
//! member's offset. Code inside template literals or block comments can
//! fool the scanner; that imprecision is accepted in exchange for not
//! needing a compiler front end.
//!
//! Global invariants:
//! - Output is sorted ascending by offset, offsets strictly increasing
//! - Only variable declarations with an initializer are captured

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

/// A named top-level declaration (or class member) and its start offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub start: usize,
}

/// Ordered declaration index for one file. Built once per run, immutable.
#[derive(Debug, Clone)]
pub struct FileIndex {
    pub path: PathBuf,
    pub declarations: Vec<Declaration>,
    source_len: usize,
}

/// Result of matching a line against the top-level rule table.
pub(crate) struct TopLevelMatch {
    pub name: String,
    pub is_class: bool,
}

struct DeclRule {
    re: Regex,
    is_class: bool,
}

/// Top-level declaration rules, evaluated in order; first hit wins.
fn top_level_rules() -> &'static [DeclRule] {
    static RULES: OnceLock<Vec<DeclRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let rule = |pattern: &str, is_class: bool| DeclRule {
            re: Regex::new(pattern).unwrap(),
            is_class,
        };
        vec![
            // function declarations (incl. async, generators, export default)
            rule(
                r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][A-Za-z0-9_$]*)",
                false,
            ),
            // class declarations
            rule(
                r"^(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][A-Za-z0-9_$]*)",
                true,
            ),
            // interfaces
            rule(r"^(?:export\s+)?interface\s+([A-Za-z_$][A-Za-z0-9_$]*)", false),
            // type aliases
            rule(
                r"^(?:export\s+)?type\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*(?:<[^>]*>)?\s*=",
                false,
            ),
            // enums (incl. const enums)
            rule(
                r"^(?:export\s+)?(?:const\s+)?enum\s+([A-Za-z_$][A-Za-z0-9_$]*)",
                false,
            ),
            // variable declarations with an initializer
            rule(
                r"^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*(?::[^=\n]*?)?=",
                false,
            ),
            // module-style assignment exports
            rule(r"^(?:module\.)?exports\.([A-Za-z_$][A-Za-z0-9_$]*)\s*=", false),
        ]
    })
}

/// Class member rules: constructor, then methods, then properties.
fn member_rules() -> &'static [Regex] {
    static RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            Regex::new(r"^\s+(constructor)\s*\(").unwrap(),
            Regex::new(
                r"^\s+(?:(?:public|private|protected|static|readonly|abstract|override|async)\s+)*(?:get\s+|set\s+|\*\s*)?([A-Za-z_$][A-Za-z0-9_$]*)\s*(?:<[^>]*>)?\s*\(",
            )
            .unwrap(),
            Regex::new(
                r"^\s+(?:(?:public|private|protected|static|readonly|abstract|override|declare)\s+)*([A-Za-z_$][A-Za-z0-9_$]*)[?!]?\s*[:=]",
            )
            .unwrap(),
        ]
    })
}

/// Identifiers that look like member heads but are statement keywords.
const MEMBER_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "new", "typeof", "await", "yield",
    "function", "default", "case", "else", "do", "throw",
];

/// Match a line against the top-level rule table.
pub(crate) fn match_top_level(line: &str) -> Option<TopLevelMatch> {
    for rule in top_level_rules() {
        if let Some(caps) = rule.re.captures(line) {
            return Some(TopLevelMatch {
                name: caps[1].to_string(),
                is_class: rule.is_class,
            });
        }
    }
    None
}

fn match_class_member(line: &str) -> Option<String> {
    for rule in member_rules() {
        if let Some(caps) = rule.captures(line) {
            let name = &caps[1];
            if MEMBER_KEYWORDS.contains(&name) {
                continue;
            }
            return Some(name.to_string());
        }
    }
    None
}

/// Brace delta for one line, ignoring everything after a `//` comment.
fn brace_delta(line: &str) -> i32 {
    let code = match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    };
    let mut delta = 0;
    for c in code.chars() {
        match c {
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

impl FileIndex {
    /// Parse a file's source text into an ordered declaration index.
    pub fn parse(path: PathBuf, source: &str) -> FileIndex {
        let mut declarations = Vec::new();
        let mut offset = 0usize;
        let mut depth = 0i32;
        let mut in_class = false;

        for line in source.split_inclusive('\n') {
            let start = offset;
            offset += line.len();
            let start_depth = depth;

            if start_depth == 0 {
                if let Some(m) = match_top_level(line) {
                    declarations.push(Declaration { name: m.name, start });
                    in_class = m.is_class;
                } else {
                    let trimmed = line.trim();
                    if !trimmed.is_empty()
                        && !trimmed.starts_with('{')
                        && !trimmed.starts_with('}')
                        && !trimmed.starts_with("//")
                    {
                        in_class = false;
                    }
                }
            } else if in_class && start_depth == 1 {
                if let Some(name) = match_class_member(line) {
                    declarations.push(Declaration { name, start });
                }
            }

            depth = (depth + brace_delta(line)).max(0);
            if in_class && depth == 0 && start_depth > 0 {
                in_class = false;
            }
        }

        FileIndex {
            path,
            declarations,
            source_len: source.len(),
        }
    }

    /// Empty index for an unreadable file.
    pub fn empty(path: PathBuf) -> FileIndex {
        FileIndex {
            path,
            declarations: Vec::new(),
            source_len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Index of the first declaration with the given name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.declarations.iter().position(|d| d.name == name)
    }

    /// Half-open block span of the declaration at `idx`: from its own start
    /// to the next declaration's start, or end of file for the last one.
    pub fn block_range(&self, idx: usize) -> (usize, usize) {
        let start = self.declarations[idx].start;
        let end = self
            .declarations
            .get(idx + 1)
            .map(|d| d.start)
            .unwrap_or(self.source_len);
        (start, end)
    }

    /// Block text of the declaration at `idx` within `source`.
    ///
    /// `source` must be the same text the index was built from.
    pub fn block_text<'s>(&self, idx: usize, source: &'s str) -> &'s str {
        let (start, end) = self.block_range(idx);
        &source[start.min(source.len())..end.min(source.len())]
    }

    /// Locate the declaration index for a byte offset: an exact start-offset
    /// match wins (a declaration inserted exactly at a hunk start), otherwise
    /// the declaration whose block span contains the offset.
    pub fn index_at(&self, offset: usize) -> Option<usize> {
        if let Some(i) = self.declarations.iter().position(|d| d.start == offset) {
            return Some(i);
        }
        let idx = self
            .declarations
            .partition_point(|d| d.start < offset)
            .checked_sub(1)?;
        let (_, end) = self.block_range(idx);
        (offset < end).then_some(idx)
    }

    /// Declaration form of [`FileIndex::index_at`].
    pub fn declaration_at(&self, offset: usize) -> Option<&Declaration> {
        self.index_at(offset).map(|i| &self.declarations[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> FileIndex {
        FileIndex::parse(PathBuf::from("test.ts"), source)
    }

    fn names(index: &FileIndex) -> Vec<&str> {
        index.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_extracts_basic_declarations() {
        let src = "\
export function handler(req: Request) {\n\
  return req;\n\
}\n\
const LIMIT = 10;\n\
export interface User {\n\
  id: string;\n\
}\n\
type Alias = string;\n\
enum Color { Red, Green }\n\
exports.legacy = function () {};\n";
        let index = parse(src);
        assert_eq!(
            names(&index),
            vec!["handler", "LIMIT", "User", "Alias", "Color", "legacy"]
        );
    }

    #[test]
    fn test_offsets_strictly_increasing() {
        let src = "const a = 1;\nconst b = 2;\nconst c = 3;\n";
        let index = parse(src);
        let offsets: Vec<usize> = index.declarations.iter().map(|d| d.start).collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_variable_without_initializer_ignored() {
        let src = "let pending;\nconst ready = true;\n";
        let index = parse(src);
        assert_eq!(names(&index), vec!["ready"]);
    }

    #[test]
    fn test_class_members_are_declarations() {
        let src = "\
export class Store {\n\
  private items: string[] = [];\n\
  constructor(limit: number) {\n\
    this.limit = limit;\n\
  }\n\
  add(item: string) {\n\
    this.items.push(item);\n\
  }\n\
}\n";
        let index = parse(src);
        assert_eq!(names(&index), vec!["Store", "items", "constructor", "add"]);
    }

    #[test]
    fn test_member_truncates_class_block() {
        let src = "\
class Store {\n\
  add(item) {}\n\
}\n";
        let index = parse(src);
        let store = index.find("Store").unwrap();
        let add = index.find("add").unwrap();
        let (_, store_end) = index.block_range(store);
        assert_eq!(store_end, index.declarations[add].start);
    }

    #[test]
    fn test_nested_braces_do_not_create_members() {
        let src = "\
function outer() {\n\
  if (x) {\n\
    inner();\n\
  }\n\
}\n\
const after = 1;\n";
        let index = parse(src);
        assert_eq!(names(&index), vec!["outer", "after"]);
    }

    #[test]
    fn test_block_text_spans_to_next_declaration() {
        let src = "const a = {\n  key: 1,\n};\nconst b = 2;\n";
        let index = parse(src);
        let a = index.find("a").unwrap();
        assert_eq!(index.block_text(a, src), "const a = {\n  key: 1,\n};\n");
    }

    #[test]
    fn test_last_block_extends_to_eof() {
        let src = "const a = 1;\nconst b = {\n  x: 2,\n};\n";
        let index = parse(src);
        let b = index.find("b").unwrap();
        assert_eq!(index.block_text(b, src), "const b = {\n  x: 2,\n};\n");
    }

    #[test]
    fn test_declaration_at_exact_match() {
        let src = "const a = 1;\nconst b = 2;\n";
        let index = parse(src);
        let b_start = index.declarations[1].start;
        assert_eq!(index.declaration_at(b_start).unwrap().name, "b");
    }

    #[test]
    fn test_declaration_at_containing_span() {
        let src = "function f() {\n  body();\n}\nconst g = 1;\n";
        let index = parse(src);
        // offset inside f's body
        assert_eq!(index.declaration_at(20).unwrap().name, "f");
    }

    #[test]
    fn test_declaration_at_before_first_is_none() {
        let src = "// leading comment\nconst a = 1;\n";
        let index = parse(src);
        assert!(index.declaration_at(0).is_none());
    }

    #[test]
    fn test_exports_assignment() {
        let src = "exports.sendMail = onCall(async (req) => {});\nmodule.exports.other = 1;\n";
        let index = parse(src);
        assert_eq!(names(&index), vec!["sendMail", "other"]);
    }
}
