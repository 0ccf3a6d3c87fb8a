//! Deployment name resolution
//!
//! The entrypoint aggregation file groups deployable functions:
//! `exports.user = require('./src/user')` publishes every trigger declared
//! in `src/user` under the `user-` prefix, while wildcard re-exports and
//! declarations living directly in the entrypoint publish bare names.
//! Files the entrypoint never mentions follow the newer, unprefixed
//! convention and also resolve to bare names.

use crate::context::RunContext;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

fn group_assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^(?:module\.)?exports\.([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*require\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
        )
        .unwrap()
    })
}

/// Maps discovered endpoints to their final deployment identifiers.
pub struct DeploymentNamer {
    entry_key: String,
    prefixes: HashMap<String, String>,
}

impl DeploymentNamer {
    /// Scan the entrypoint once and build the path-key → group-prefix map.
    ///
    /// A missing or unreadable entrypoint degrades to all-bare resolution —
    /// the newer convention needs no aggregation file.
    pub fn from_entrypoint(ctx: &RunContext) -> Self {
        let entrypoint = ctx.config().entrypoint.clone();
        let entry_key = ctx.module_key(&entrypoint);
        let mut prefixes = HashMap::new();

        match ctx.content(&entrypoint) {
            Some(source) => {
                for caps in group_assignment_re().captures_iter(&source) {
                    if let Some(resolved) = crate::paths::resolve_specifier(&entrypoint, &caps[2]) {
                        prefixes.insert(ctx.module_key(&resolved), caps[1].to_string());
                    }
                }
                // `export * from …` lines register no prefix: those
                // declarations deploy under their bare names.
            }
            None => {
                eprintln!(
                    "warning: entrypoint not readable, deploy names will be unprefixed: {}",
                    entrypoint.display()
                );
            }
        }

        DeploymentNamer { entry_key, prefixes }
    }

    /// Resolve the deployment name for a declaration in `file`.
    pub fn resolve(&self, file: &Path, name: &str, ctx: &RunContext) -> String {
        let key = ctx.module_key(file);
        if key == self.entry_key {
            return name.to_string();
        }
        match self.prefixes.get(&key) {
            Some(prefix) => format!("{}-{}", prefix, name),
            None => name.to_string(),
        }
    }
}
