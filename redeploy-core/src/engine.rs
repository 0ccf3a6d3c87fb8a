//! Impact propagation
//!
//! Memoized recursive traversal from changed seeds through the reverse
//! reference graph, accumulating every declaration that is transitively
//! affected and recording the ones that register deployable triggers.
//!
//! Dependent detection is textual: a declaration is a dependent when its
//! block text contains the seed's name as a literal substring (the full
//! `Object.property` string for property-level seeds). This accepts false
//! positives — name collisions in comments, strings, or unrelated
//! identifiers — in exchange for no false negatives on genuine textual
//! references. Do not replace it with strict symbol resolution.
//!
//! Global invariants:
//! - Each (file, name) key is analyzed at most once per run
//! - Re-entering an in-progress key is a cycle, not a fault
//! - The endpoint set only grows and is deduplicated by (file, name)

use crate::changes::Seed;
use crate::context::RunContext;
use crate::graph::{self, ReExport};
use crate::triggers::{self, TriggerKind, TriggerVersion};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Analysis state for one (file, name) key.
#[derive(Debug, Clone)]
enum AnalysisState {
    /// On the current recursion path; re-entry means a cycle was reached.
    InProgress,
    /// Finished, with the direct dependents that were discovered.
    Done(Vec<Seed>),
}

/// A declaration recognized as a deployable trigger during propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerHit {
    pub file: PathBuf,
    pub name: String,
    pub kind: TriggerKind,
    pub version: TriggerVersion,
}

/// One propagation run. Records and the endpoint accumulator live and die
/// with the instance; nothing persists across runs.
pub struct ImpactEngine<'a> {
    ctx: &'a RunContext,
    files: &'a [PathBuf],
    records: HashMap<(PathBuf, String), AnalysisState>,
    hits: Vec<TriggerHit>,
    seen_hits: HashSet<(PathBuf, String)>,
}

impl<'a> ImpactEngine<'a> {
    pub fn new(ctx: &'a RunContext, files: &'a [PathBuf]) -> Self {
        ImpactEngine {
            ctx,
            files,
            records: HashMap::new(),
            hits: Vec::new(),
            seen_hits: HashSet::new(),
        }
    }

    /// Propagate from every seed and return the accumulated trigger hits.
    pub fn run(mut self, seeds: &[Seed]) -> Vec<TriggerHit> {
        for seed in seeds {
            self.analyze(seed);
        }
        self.hits
    }

    /// Direct dependents recorded for a finished key, if analyzed.
    pub fn dependents_of(&self, seed: &Seed) -> Option<&[Seed]> {
        match self.records.get(&(seed.file.clone(), seed.name.clone())) {
            Some(AnalysisState::Done(dependents)) => Some(dependents),
            _ => None,
        }
    }

    fn analyze(&mut self, seed: &Seed) {
        let key = (seed.file.clone(), seed.name.clone());
        if self.records.contains_key(&key) {
            // Done → memoized; InProgress → cycle through the reverse
            // graph (e.g. two same-file declarations calling each other).
            return;
        }
        self.records.insert(key.clone(), AnalysisState::InProgress);

        self.record_if_endpoint(seed);

        let dependents = self.direct_dependents(seed);
        for dependent in &dependents {
            self.analyze(dependent);
        }

        self.records.insert(key, AnalysisState::Done(dependents));
    }

    /// If the seed's declaration block registers a trigger, record it once.
    fn record_if_endpoint(&mut self, seed: &Seed) {
        let index = self.ctx.index(&seed.file);
        let Some(decl_idx) = index.find(seed.base_name()) else {
            return;
        };
        let Some(source) = self.ctx.content(&seed.file) else {
            return;
        };
        let block = index.block_text(decl_idx, &source);
        let Some(m) = triggers::classify(block) else {
            return;
        };

        let name = seed.base_name().to_string();
        if self.seen_hits.insert((seed.file.clone(), name.clone())) {
            self.hits.push(TriggerHit {
                file: seed.file.clone(),
                name,
                kind: m.kind,
                version: m.version,
            });
        }
    }

    /// Direct dependents of a seed: declarations in referencing files (and
    /// in the seed's own file, for same-file call chains) whose block text
    /// contains the seed's name, plus synthetic seeds for matching
    /// re-exports.
    fn direct_dependents(&self, seed: &Seed) -> Vec<Seed> {
        let refs = graph::find_referencing_files(&seed.file, self.files, self.ctx);

        let mut dependents = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |dependents: &mut Vec<Seed>, s: Seed| {
            if seen.insert((s.file.clone(), s.name.clone())) {
                dependents.push(s);
            }
        };

        // Re-exports are resolved first: a wildcard forwards any seed, a
        // named list forwards only listed names, and a non-matching named
        // re-export must not create a dependent.
        for reference in &refs {
            match &reference.re_export {
                Some(ReExport::Star) => {
                    push(&mut dependents, Seed::new(reference.path.clone(), seed.name.clone()));
                }
                Some(ReExport::Named(names)) => {
                    if names.iter().any(|n| n == seed.base_name()) {
                        push(
                            &mut dependents,
                            Seed::new(reference.path.clone(), seed.name.clone()),
                        );
                    }
                }
                None => {}
            }
        }

        // Block scan over every candidate, including the seed's own file.
        let candidates = refs
            .iter()
            .map(|r| &r.path)
            .chain(std::iter::once(&seed.file));
        for candidate in candidates {
            let index = self.ctx.index(candidate);
            let Some(source) = self.ctx.content(candidate) else {
                continue;
            };
            for (decl_idx, decl) in index.declarations.iter().enumerate() {
                // The seed's own declaration is not its own dependent; all
                // *other* same-file declarations still participate.
                if *candidate == seed.file && decl.name == seed.name {
                    continue;
                }
                if index.block_text(decl_idx, &source).contains(&seed.name) {
                    push(
                        &mut dependents,
                        Seed::new(candidate.clone(), decl.name.clone()),
                    );
                }
            }
        }

        dependents
    }
}
