//! Deployable trigger classification
//!
//! Pure, stateless detection of trigger registration calls in a block of
//! source text. No I/O. Same input always produces the same output.
//!
//! Two generations of the deployment API coexist. Most trigger call-names
//! are unique to one generation; `onCall` and `onRequest` exist in both and
//! are disambiguated by call shape: a namespaced method chain
//! (`functions.https.onCall(…)`) is first-generation, a bare call
//! (`onCall(…)`) is second-generation.
//!
//! Matching is an ordered rule table, first hit wins:
//! 1. first-generation-only call-names
//! 2. second-generation-only call-names
//! 3. shared names, namespaced shape
//! 4. shared names, bare shape

use regex::Regex;
use std::sync::OnceLock;

/// Deployment API generation of a matched trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerVersion {
    Gen1,
    Gen2,
}

impl TriggerVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerVersion::Gen1 => "v1",
            TriggerVersion::Gen2 => "v2",
        }
    }
}

/// Call shape of a matched trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Registered through a namespaced method chain (`ns.category.name(…)`).
    Namespaced,
    /// Registered through a bare call (`name(…)`).
    Bare,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Namespaced => "namespaced-call",
            TriggerKind::Bare => "bare-call",
        }
    }
}

/// A positive classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    /// The trigger call-name that matched.
    pub call: &'static str,
    pub kind: TriggerKind,
    pub version: TriggerVersion,
}

/// Call-names unique to the first-generation API.
const GEN1_CALLS: &[&str] = &[
    "onCreate",
    "onUpdate",
    "onDelete",
    "onWrite",
    "onRun",
    "onFinalize",
    "onArchive",
    "onMetadataUpdated",
    "onPublish",
];

/// Call-names unique to the second-generation API.
const GEN2_CALLS: &[&str] = &[
    "onDocumentCreated",
    "onDocumentUpdated",
    "onDocumentDeleted",
    "onDocumentWritten",
    "onValueCreated",
    "onValueUpdated",
    "onValueDeleted",
    "onValueWritten",
    "onObjectFinalized",
    "onObjectArchived",
    "onObjectDeleted",
    "onObjectMetadataUpdated",
    "onMessagePublished",
    "onSchedule",
    "onTaskDispatched",
    "onCustomEventPublished",
];

/// Call-names present in both generations, disambiguated by call shape.
const SHARED_CALLS: &[&str] = &["onCall", "onRequest"];

struct TriggerRule {
    call: &'static str,
    kind: TriggerKind,
    version: TriggerVersion,
    re: Regex,
}

/// The compiled rule table, in match-precedence order.
fn rules() -> &'static [TriggerRule] {
    static RULES: OnceLock<Vec<TriggerRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let mut rules = Vec::new();
        for call in GEN1_CALLS {
            rules.push(TriggerRule {
                call,
                kind: TriggerKind::Namespaced,
                version: TriggerVersion::Gen1,
                re: Regex::new(&format!(r"\b{}\s*\(", call)).unwrap(),
            });
        }
        for call in GEN2_CALLS {
            rules.push(TriggerRule {
                call,
                kind: TriggerKind::Bare,
                version: TriggerVersion::Gen2,
                re: Regex::new(&format!(r"\b{}\s*\(", call)).unwrap(),
            });
        }
        for call in SHARED_CALLS {
            rules.push(TriggerRule {
                call,
                kind: TriggerKind::Namespaced,
                version: TriggerVersion::Gen1,
                re: Regex::new(&format!(
                    r"[A-Za-z_$][A-Za-z0-9_$]*\s*\.\s*[A-Za-z_$][A-Za-z0-9_$]*\s*\.\s*{}\s*\(",
                    call
                ))
                .unwrap(),
            });
        }
        for call in SHARED_CALLS {
            rules.push(TriggerRule {
                call,
                kind: TriggerKind::Bare,
                version: TriggerVersion::Gen2,
                re: Regex::new(&format!(r"(?:^|[^.A-Za-z0-9_$]){}\s*\(", call)).unwrap(),
            });
        }
        rules
    })
}

/// Classify a declaration block: does it register a deployable trigger?
///
/// Total and deterministic; unmatched text returns `None`.
pub fn classify(block: &str) -> Option<TriggerMatch> {
    rules().iter().find(|rule| rule.re.is_match(block)).map(|rule| TriggerMatch {
        call: rule.call,
        kind: rule.kind,
        version: rule.version,
    })
}
