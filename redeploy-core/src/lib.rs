//! Redeploy core library - dependency-impact analysis for cloud function deployments
//!
//! Given the uncommitted edits in a TypeScript/JavaScript cloud-functions
//! project, determines the minimal set of deployable trigger functions that
//! must be redeployed.

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Single-threaded, fully synchronous; no parallelism, no async
// - No process-wide mutable state; all caches live in a per-run context
// - Deterministic traversal order must be explicit
// - Identical input yields byte-for-byte identical output
// - Dependent matching is textual by design: false positives are accepted,
//   false negatives on genuine textual references are not

pub mod changes;
pub mod config;
pub mod context;
pub mod discover;
pub mod engine;
pub mod git;
pub mod graph;
pub mod index;
pub mod naming;
pub mod paths;
pub mod report;
pub mod triggers;

pub use changes::Seed;
pub use config::{load_and_resolve, ResolvedConfig};
pub use context::RunContext;
pub use engine::ImpactEngine;
pub use naming::DeploymentNamer;
pub use report::{render_json, render_text, sort_endpoints, Endpoint};

use anyhow::Result;
use std::collections::HashSet;

/// Everything one analysis run produces.
pub struct AnalysisOutcome {
    /// The changed declarations the propagation started from.
    pub seeds: Vec<Seed>,
    /// Deployable functions affected by those changes, sorted.
    pub endpoints: Vec<Endpoint>,
}

/// Run the full pipeline against the project's working tree:
/// discovery → change location → impact propagation → deployment naming.
pub fn analyze_changes(config: ResolvedConfig) -> Result<AnalysisOutcome> {
    let ctx = RunContext::new(config);
    analyze_with_context(&ctx)
}

/// Same as [`analyze_changes`], against an existing per-run context.
pub fn analyze_with_context(ctx: &RunContext) -> Result<AnalysisOutcome> {
    let files = discover::collect_source_files(ctx.config())?;
    let seeds = changes::compute_changed_seeds(ctx, &files)?;
    let hits = ImpactEngine::new(ctx, &files).run(&seeds);
    let endpoints = resolve_endpoints(ctx, hits);
    Ok(AnalysisOutcome { seeds, endpoints })
}

/// Map trigger hits to final endpoint records.
///
/// The deploy-name set accumulator collapses duplicate names: two hits that
/// resolve to the same deployment identifier are one deployment.
pub fn resolve_endpoints(ctx: &RunContext, hits: Vec<engine::TriggerHit>) -> Vec<Endpoint> {
    let namer = DeploymentNamer::from_entrypoint(ctx);
    let root = ctx.config().project_root.clone();

    let mut seen_names = HashSet::new();
    let mut endpoints = Vec::new();
    for hit in hits {
        let deploy_name = namer.resolve(&hit.file, &hit.name, ctx);
        if !seen_names.insert(deploy_name.clone()) {
            continue;
        }
        endpoints.push(Endpoint {
            name: hit.name,
            file: paths::display_rel(&root, &hit.file),
            deploy_name,
            trigger_kind: hit.kind.as_str().to_string(),
            version: hit.version.as_str().to_string(),
        });
    }

    sort_endpoints(endpoints)
}
