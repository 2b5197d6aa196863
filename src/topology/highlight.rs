//! Search and problem highlighting
//!
//! Both modes reduce to a set of highlighted node ids; everything else is
//! dimmed while that set is non-empty.

use super::graph::GraphNode;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightMode {
    #[default]
    None,
    Search,
    Problem,
}

/// Derived per-frame highlight decision
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightState {
    pub mode: HighlightMode,
    pub highlighted: HashSet<String>,
    /// Dim everything outside `highlighted`
    pub dim_others: bool,
}

impl HighlightState {
    pub fn none() -> Self {
        Self::default()
    }

    fn with(mode: HighlightMode, ids: impl IntoIterator<Item = String>) -> Self {
        let highlighted: HashSet<String> = ids.into_iter().collect();
        if highlighted.is_empty() {
            return Self::none();
        }
        Self {
            mode,
            highlighted,
            dim_others: true,
        }
    }

    pub fn search(matches: &[String]) -> Self {
        Self::with(HighlightMode::Search, matches.iter().cloned())
    }

    pub fn problem(failed: &[String]) -> Self {
        Self::with(HighlightMode::Problem, failed.iter().cloned())
    }

    pub fn is_active(&self) -> bool {
        self.mode != HighlightMode::None
    }

    pub fn is_highlighted(&self, id: &str) -> bool {
        self.highlighted.contains(id)
    }

    pub fn is_dimmed(&self, id: &str) -> bool {
        self.dim_others && !self.highlighted.contains(id)
    }
}

/// Normalize a raw search box value; `None` when it matches nothing
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Ids of nodes whose name or kind label contains the query, in input order
pub fn search_matches(nodes: &[GraphNode], query: &str) -> Vec<String> {
    let Some(needle) = normalize_query(query) else {
        return Vec::new();
    };
    nodes
        .iter()
        .filter(|n| {
            n.display_name.to_lowercase().contains(&needle) || n.kind.label().contains(&needle)
        })
        .map(|n| n.id.clone())
        .collect()
}

/// Ids of nodes in a failed health state, in input order
pub fn problem_ids(nodes: &[GraphNode]) -> Vec<String> {
    nodes
        .iter()
        .filter(|n| n.is_failed())
        .map(|n| n.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::graph::{HealthState, NodeKind};

    fn nodes() -> Vec<GraphNode> {
        vec![
            GraphNode::new("c1", NodeKind::Connector, "Billing-DB"),
            GraphNode::new("t1", NodeKind::Template, "web-app"),
            GraphNode::new("u1", NodeKind::Unit, "acme-billing").with_health(HealthState::Failed),
            GraphNode::new("a1", NodeKind::Artifact, "acme-svc"),
            GraphNode::new("o1", NodeKind::Unmanaged, "stale"),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        assert_eq!(search_matches(&nodes(), "BILLING"), vec!["c1", "u1"]);
        assert_eq!(search_matches(&nodes(), "  acme "), vec!["u1", "a1"]);
    }

    #[test]
    fn test_search_matches_kind_label() {
        assert_eq!(search_matches(&nodes(), "templ"), vec!["t1"]);
        assert_eq!(search_matches(&nodes(), "Unmanaged"), vec!["o1"]);
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        assert!(search_matches(&nodes(), "").is_empty());
        assert!(search_matches(&nodes(), "   ").is_empty());
        assert!(!HighlightState::search(&[]).is_active());
    }

    #[test]
    fn test_problem_state_dims_others() {
        let failed = problem_ids(&nodes());
        assert_eq!(failed, vec!["u1"]);

        let state = HighlightState::problem(&failed);
        assert_eq!(state.mode, HighlightMode::Problem);
        assert!(state.is_highlighted("u1"));
        assert!(!state.is_dimmed("u1"));
        assert!(state.is_dimmed("c1"));
    }

    #[test]
    fn test_no_failures_means_no_highlight() {
        let state = HighlightState::problem(&[]);
        assert_eq!(state, HighlightState::none());
        assert!(!state.is_dimmed("c1"));
    }
}
