//! Endpoint reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use serde::{Deserialize, Serialize};

/// One deployable function that must be redeployed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Endpoint {
    /// Declaration name in the source file.
    pub name: String,
    /// Project-root-relative source file path.
    pub file: String,
    /// Final deployment identifier (possibly group-prefixed).
    pub deploy_name: String,
    /// Call shape the trigger was registered with.
    pub trigger_kind: String,
    /// Deployment API generation.
    pub version: String,
}

/// Sort endpoints deterministically by (file, name).
pub fn sort_endpoints(mut endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
    endpoints.sort_by(|a, b| a.file.cmp(&b.file).then_with(|| a.name.cmp(&b.name)));
    endpoints
}

/// Render endpoints as a text table
pub fn render_text(endpoints: &[Endpoint]) -> String {
    if endpoints.is_empty() {
        return "No functions need redeployment.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<28} {:<8} {:<16} {:<30} {}\n",
        "DEPLOY", "VERSION", "KIND", "FILE", "FUNCTION"
    ));
    for endpoint in endpoints {
        output.push_str(&format!(
            "{:<28} {:<8} {:<16} {:<30} {}\n",
            truncate_or_pad(&endpoint.deploy_name, 28),
            endpoint.version,
            endpoint.trigger_kind,
            truncate_or_pad(&endpoint.file, 30),
            endpoint.name,
        ));
    }
    output
}

/// Render endpoints as JSON output
pub fn render_json(endpoints: &[Endpoint]) -> String {
    serde_json::to_string_pretty(endpoints).unwrap_or_else(|_| "[]".to_string())
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.len() > width {
        format!("{}...", &s[..width.saturating_sub(3)])
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(name: &str, file: &str) -> Endpoint {
        Endpoint {
            name: name.to_string(),
            file: file.to_string(),
            deploy_name: name.to_string(),
            trigger_kind: "bare-call".to_string(),
            version: "v2".to_string(),
        }
    }

    #[test]
    fn test_sort_is_deterministic() {
        let endpoints = vec![
            endpoint("b", "src/z.ts"),
            endpoint("a", "src/z.ts"),
            endpoint("c", "src/a.ts"),
        ];
        let sorted = sort_endpoints(endpoints);
        let order: Vec<(&str, &str)> = sorted
            .iter()
            .map(|e| (e.file.as_str(), e.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("src/a.ts", "c"), ("src/z.ts", "a"), ("src/z.ts", "b")]
        );
    }

    #[test]
    fn test_render_text_empty() {
        assert_eq!(render_text(&[]), "No functions need redeployment.\n");
    }

    #[test]
    fn test_render_text_contains_fields() {
        let text = render_text(&[endpoint("greet", "src/fns.ts")]);
        assert!(text.contains("greet"));
        assert!(text.contains("src/fns.ts"));
        assert!(text.contains("v2"));
    }

    #[test]
    fn test_render_json_round_trips() {
        let endpoints = vec![endpoint("greet", "src/fns.ts")];
        let json = render_json(&endpoints);
        let parsed: Vec<Endpoint> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, endpoints);
    }

    #[test]
    fn test_json_uses_snake_case_fields() {
        let json = render_json(&[endpoint("greet", "src/fns.ts")]);
        assert!(json.contains("\"deploy_name\""));
        assert!(json.contains("\"trigger_kind\""));
    }
}
