//! Configuration file support for Redeploy
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.redeployrc.json` in project root
//! 3. `redeploy.config.json` in project root
//! 4. `"redeploy"` key in `package.json`
//!
//! All fields are optional. A missing config file is not an error: analysis
//! degrades to the conventional layout (`src/` sources, `index.ts`
//! entrypoint), since unprefixed deploy-name resolution can still proceed.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default exclude patterns applied when no config is specified
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/*.test.ts",
    "**/*.test.js",
    "**/*.spec.ts",
    "**/*.spec.js",
    "**/node_modules/**",
    "**/__tests__/**",
    "**/__mocks__/**",
    "**/dist/**",
    "**/build/**",
];

/// Entrypoint filenames tried in order when none is configured
const DEFAULT_ENTRYPOINTS: &[&str] = &["index.ts", "index.js"];

/// Redeploy configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedeployConfig {
    /// Directories scanned for source files, relative to the project root
    /// (default: `src`, falling back to the project root itself)
    #[serde(default)]
    pub source_dirs: Vec<String>,

    /// The aggregation entrypoint file, relative to the project root
    /// (default: `index.ts`, then `index.js`)
    #[serde(default)]
    pub entrypoint: Option<String>,

    /// Glob patterns for files to include (default: all supported extensions)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns for files to exclude (default: test files, node_modules, dist)
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl RedeployConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        for dir in &self.source_dirs {
            if dir.is_empty() {
                anyhow::bail!("source_dirs entries must not be empty");
            }
            if Path::new(dir).is_absolute() {
                anyhow::bail!("source_dirs must be project-relative (got {})", dir);
            }
        }

        if let Some(ref entry) = self.entrypoint {
            if entry.is_empty() {
                anyhow::bail!("entrypoint must not be empty");
            }
            if Path::new(entry).is_absolute() {
                anyhow::bail!("entrypoint must be project-relative (got {})", entry);
            }
        }

        // Globs must compile
        for pattern in self.include.iter().chain(self.exclude.iter()) {
            Glob::new(pattern)
                .with_context(|| format!("invalid glob pattern: {}", pattern))?;
        }

        Ok(())
    }
}

/// Resolved configuration with absolute paths and compiled glob patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Absolute project root
    pub project_root: PathBuf,
    /// Absolute source directories to scan
    pub source_dirs: Vec<PathBuf>,
    /// Absolute path of the aggregation entrypoint (may not exist on disk;
    /// deploy-name resolution then degrades to bare names)
    pub entrypoint: PathBuf,
    /// Compiled include patterns (empty means include all)
    pub include: Option<GlobSet>,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Conventional defaults for a project root with no config file.
    pub fn defaults(project_root: &Path) -> Result<Self> {
        Self::from_config(project_root, &RedeployConfig::default(), None)
    }

    /// Resolve a parsed config file against a project root.
    fn from_config(
        project_root: &Path,
        config: &RedeployConfig,
        config_path: Option<PathBuf>,
    ) -> Result<Self> {
        config.validate()?;

        let source_dirs = if config.source_dirs.is_empty() {
            let src = project_root.join("src");
            if src.is_dir() {
                vec![src]
            } else {
                vec![project_root.to_path_buf()]
            }
        } else {
            config
                .source_dirs
                .iter()
                .map(|d| project_root.join(d))
                .collect()
        };

        let entrypoint = match config.entrypoint {
            Some(ref entry) => project_root.join(entry),
            None => DEFAULT_ENTRYPOINTS
                .iter()
                .map(|name| project_root.join(name))
                .find(|p| p.is_file())
                .unwrap_or_else(|| project_root.join(DEFAULT_ENTRYPOINTS[0])),
        };

        let include = if config.include.is_empty() {
            None
        } else {
            Some(build_globset(&config.include)?)
        };

        let exclude = if config.exclude.is_empty() {
            build_globset(&DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect::<Vec<_>>())?
        } else {
            build_globset(&config.exclude)?
        };

        Ok(ResolvedConfig {
            project_root: project_root.to_path_buf(),
            source_dirs,
            entrypoint,
            include,
            exclude,
            config_path,
        })
    }

    /// Check whether a file passes the include/exclude filters.
    ///
    /// Patterns are matched against the project-root-relative path.
    pub fn should_include(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.project_root).unwrap_or(path);

        if self.exclude.is_match(rel) {
            return false;
        }
        match self.include {
            Some(ref include) => include.is_match(rel),
            None => true,
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            Glob::new(pattern).with_context(|| format!("invalid glob pattern: {}", pattern))?,
        );
    }
    builder.build().context("failed to compile glob patterns")
}

/// Load and resolve configuration for a project root.
///
/// `explicit_path` (from the CLI) must exist and parse; the discovered
/// locations are optional and fall through to defaults.
pub fn load_and_resolve(
    project_root: &Path,
    explicit_path: Option<&Path>,
) -> Result<ResolvedConfig> {
    if let Some(path) = explicit_path {
        let config = read_config_file(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?;
        return ResolvedConfig::from_config(project_root, &config, Some(path.to_path_buf()));
    }

    for name in [".redeployrc.json", "redeploy.config.json"] {
        let candidate = project_root.join(name);
        if candidate.is_file() {
            let config = read_config_file(&candidate)
                .with_context(|| format!("failed to load config: {}", candidate.display()))?;
            return ResolvedConfig::from_config(project_root, &config, Some(candidate));
        }
    }

    // `"redeploy"` key inside package.json
    let package_json = project_root.join("package.json");
    if package_json.is_file() {
        if let Some(config) = read_package_json_key(&package_json)? {
            return ResolvedConfig::from_config(project_root, &config, Some(package_json));
        }
    }

    ResolvedConfig::defaults(project_root)
}

fn read_config_file(path: &Path) -> Result<RedeployConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: RedeployConfig =
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?;
    Ok(config)
}

fn read_package_json_key(path: &Path) -> Result<Option<RedeployConfig>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?;

    match value.get("redeploy") {
        Some(section) => {
            let config: RedeployConfig = serde_json::from_value(section.clone())
                .with_context(|| format!("invalid \"redeploy\" section in {}", path.display()))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_src_dir() {
        let dir = TempDir::new().unwrap();
        let resolved = ResolvedConfig::defaults(dir.path()).unwrap();
        assert_eq!(resolved.source_dirs, vec![dir.path().to_path_buf()]);
        assert_eq!(resolved.entrypoint, dir.path().join("index.ts"));
        assert!(resolved.config_path.is_none());
    }

    #[test]
    fn test_defaults_prefer_src_and_existing_entrypoint() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("index.js"), "").unwrap();
        let resolved = ResolvedConfig::defaults(dir.path()).unwrap();
        assert_eq!(resolved.source_dirs, vec![dir.path().join("src")]);
        assert_eq!(resolved.entrypoint, dir.path().join("index.js"));
    }

    #[test]
    fn test_load_rc_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".redeployrc.json"),
            r#"{"source_dirs": ["functions/src"], "entrypoint": "functions/index.ts"}"#,
        )
        .unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert_eq!(resolved.source_dirs, vec![dir.path().join("functions/src")]);
        assert_eq!(resolved.entrypoint, dir.path().join("functions/index.ts"));
        assert!(resolved.config_path.is_some());
    }

    #[test]
    fn test_package_json_key() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name": "fns", "redeploy": {"source_dirs": ["lib"]}}"#,
        )
        .unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert_eq!(resolved.source_dirs, vec![dir.path().join("lib")]);
    }

    #[test]
    fn test_validate_rejects_absolute_source_dir() {
        let config = RedeployConfig {
            source_dirs: vec!["/abs/path".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let config = RedeployConfig {
            exclude: vec!["src/[".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_include_applies_excludes() {
        let dir = TempDir::new().unwrap();
        let resolved = ResolvedConfig::defaults(dir.path()).unwrap();
        assert!(resolved.should_include(&dir.path().join("src/user.ts")));
        assert!(!resolved.should_include(&dir.path().join("src/user.test.ts")));
        assert!(!resolved.should_include(&dir.path().join("node_modules/pkg/x.ts")));
    }

    #[test]
    fn test_deny_unknown_fields() {
        let parsed: Result<RedeployConfig, _> =
            serde_json::from_str(r#"{"sourceDirs": ["src"]}"#);
        assert!(parsed.is_err());
    }
}
