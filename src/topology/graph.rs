//! Topology Graph Data Structures
//!
//! The flat node/edge snapshot served by the orchestration backend, plus the
//! parent map derived from its edges.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// The five kinds of object shown on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Top-level connector to an external data source
    #[serde(alias = "hub")]
    Connector,
    /// Resource definition owned by a connector
    #[serde(alias = "form")]
    Template,
    /// One instantiated record of a template
    #[serde(alias = "node")]
    Unit,
    /// Concrete managed object produced by a unit
    #[serde(alias = "resource")]
    Artifact,
    /// Object no longer tied to any live unit
    #[serde(alias = "orphan")]
    Unmanaged,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Connector,
        NodeKind::Template,
        NodeKind::Unit,
        NodeKind::Artifact,
        NodeKind::Unmanaged,
    ];

    /// Label used for badges and matched by search
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Connector => "connector",
            NodeKind::Template => "template",
            NodeKind::Unit => "unit",
            NodeKind::Artifact => "artifact",
            NodeKind::Unmanaged => "unmanaged",
        }
    }

    /// Hierarchy level, `None` for unmanaged objects
    pub fn level(&self) -> Option<usize> {
        match self {
            NodeKind::Connector => Some(0),
            NodeKind::Template => Some(1),
            NodeKind::Unit => Some(2),
            NodeKind::Artifact => Some(3),
            NodeKind::Unmanaged => None,
        }
    }

    /// Whether the node carries an expand/collapse chevron
    pub fn is_expandable(&self) -> bool {
        matches!(
            self,
            NodeKind::Connector | NodeKind::Template | NodeKind::Unit
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Reported health of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum HealthState {
    Ready,
    #[default]
    Pending,
    Failed,
    Skipped,
}

impl HealthState {
    /// Parse a backend status string, unknown values read as pending
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ready" => HealthState::Ready,
            "failed" => HealthState::Failed,
            "skipped" => HealthState::Skipped,
            _ => HealthState::Pending,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthState::Ready => "ready",
            HealthState::Pending => "pending",
            HealthState::Failed => "failed",
            HealthState::Skipped => "skipped",
        }
    }
}

impl From<String> for HealthState {
    fn from(s: String) -> Self {
        HealthState::from_str(&s)
    }
}

/// Desired/ready/failed counters reported for connectors and templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub desired: u64,
    pub ready: u64,
    pub failed: u64,
}

/// Policy flags and orphan provenance attached to a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphaned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphaned_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphaned_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_node_namespace: Option<String>,

    /// Keys the viewer has no dedicated field for
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NodeMetadata {
    /// Flatten into label/value pairs for the detail panel
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let known = [
            ("Creation policy", &self.creation_policy),
            ("Deletion policy", &self.deletion_policy),
            ("Conflict policy", &self.conflict_policy),
            ("Orphaned at", &self.orphaned_at),
            ("Orphaned reason", &self.orphaned_reason),
            ("Original unit", &self.original_node),
            ("Original namespace", &self.original_node_namespace),
        ];
        for (label, value) in known {
            if let Some(v) = value {
                out.push((label.to_string(), v.clone()));
            }
        }
        for (key, value) in &self.extra {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.push((key.clone(), text));
        }
        out
    }
}

/// A node as delivered by the data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: NodeKind,

    #[serde(rename = "name")]
    pub display_name: String,

    #[serde(rename = "namespace", default)]
    pub namespace_label: String,

    #[serde(rename = "status", default)]
    pub health: HealthState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,

    /// Informational only; structure comes from edges
    #[serde(rename = "children", default, skip_serializing_if = "Vec::is_empty")]
    pub child_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NodeMetadata>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            display_name: name.into(),
            namespace_label: String::new(),
            health: HealthState::default(),
            metrics: None,
            child_ids: Vec::new(),
            metadata: None,
        }
    }

    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = health;
        self
    }

    pub fn with_metrics(mut self, desired: u64, ready: u64, failed: u64) -> Self {
        self.metrics = Some(Metrics {
            desired,
            ready,
            failed,
        });
        self
    }

    pub fn is_failed(&self) -> bool {
        self.health == HealthState::Failed
    }
}

/// Directed structural edge: `from` is the parent of `to`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(alias = "source")]
    pub from: String,
    #[serde(alias = "target")]
    pub to: String,
}

impl GraphEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// One full refresh worth of graph data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl TopologySnapshot {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Resolve a node's listed children, skipping ids not in this snapshot
    pub fn children_of(&self, id: &str) -> Vec<&GraphNode> {
        match self.node(id) {
            Some(node) => node
                .child_ids
                .iter()
                .filter_map(|child| self.node(child))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Node totals per kind, in hierarchy order
    pub fn kind_counts(&self) -> Vec<(NodeKind, usize)> {
        NodeKind::ALL
            .iter()
            .map(|kind| (*kind, self.nodes.iter().filter(|n| n.kind == *kind).count()))
            .collect()
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.is_failed())
            .map(|n| n.id.clone())
            .collect()
    }
}

/// An edge that tried to give a node a second parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateParent {
    pub child: String,
    pub kept: String,
    pub rejected: String,
}

/// Child to parent mapping derived from the edge list.
///
/// An edge is honoured only when both endpoints exist, neither is unmanaged,
/// and the parent sits on a strictly higher level than the child. The first
/// qualifying edge for a child wins; later claims are kept as diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentMap {
    parent_of: HashMap<String, String>,
    duplicates: Vec<DuplicateParent>,
    ignored: usize,
}

impl ParentMap {
    pub fn build(nodes: &[GraphNode], edges: &[GraphEdge]) -> Self {
        let kinds: HashMap<&str, NodeKind> =
            nodes.iter().map(|n| (n.id.as_str(), n.kind)).collect();

        let mut map = ParentMap::default();
        for edge in edges {
            let levels = match (kinds.get(edge.from.as_str()), kinds.get(edge.to.as_str())) {
                (Some(parent), Some(child)) => parent.level().zip(child.level()),
                _ => None,
            };
            match levels {
                Some((parent, child)) if parent < child => {}
                _ => {
                    map.ignored += 1;
                    continue;
                }
            }

            match map.parent_of.get(&edge.to) {
                Some(existing) if existing == &edge.from => {}
                Some(existing) => {
                    warn!(
                        "Node {} already has parent {}, ignoring edge from {}",
                        edge.to, existing, edge.from
                    );
                    map.duplicates.push(DuplicateParent {
                        child: edge.to.clone(),
                        kept: existing.clone(),
                        rejected: edge.from.clone(),
                    });
                }
                None => {
                    map.parent_of.insert(edge.to.clone(), edge.from.clone());
                }
            }
        }
        map
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.parent_of.get(id).map(String::as_str)
    }

    /// Ancestors from the direct parent up to the root
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent.to_string());
            current = parent;
        }
        chain
    }

    pub fn duplicates(&self) -> &[DuplicateParent] {
        &self.duplicates
    }

    /// Edges dropped for dangling endpoints or level violations
    pub fn ignored_edges(&self) -> usize {
        self.ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TopologySnapshot {
        TopologySnapshot::new(
            vec![
                GraphNode::new("c1", NodeKind::Connector, "crm"),
                GraphNode::new("t1", NodeKind::Template, "web"),
                GraphNode::new("u1", NodeKind::Unit, "acme").with_health(HealthState::Failed),
                GraphNode::new("a1", NodeKind::Artifact, "deploy"),
                GraphNode::new("o1", NodeKind::Unmanaged, "stale-svc"),
            ],
            vec![
                GraphEdge::new("c1", "t1"),
                GraphEdge::new("t1", "u1"),
                GraphEdge::new("u1", "a1"),
            ],
        )
    }

    #[test]
    fn test_decode_backend_json() {
        let json = r#"{
            "nodes": [
                {"id": "hub-1", "type": "hub", "name": "crm", "namespace": "ops",
                 "status": "ready", "children": ["form-1"],
                 "metrics": {"desired": 3, "ready": 2, "failed": 1}},
                {"id": "form-1", "type": "form", "name": "web", "status": "weird"},
                {"id": "orphan-1", "type": "orphan", "name": "old",
                 "metadata": {"orphanedReason": "RemovedFromTemplate", "kind": "Service"}}
            ],
            "edges": [{"source": "hub-1", "target": "form-1"}]
        }"#;
        let snapshot: TopologySnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.nodes[0].kind, NodeKind::Connector);
        assert_eq!(snapshot.nodes[0].metrics.unwrap().ready, 2);
        assert_eq!(snapshot.nodes[1].health, HealthState::Pending);
        assert_eq!(snapshot.nodes[2].kind, NodeKind::Unmanaged);
        assert_eq!(snapshot.edges[0], GraphEdge::new("hub-1", "form-1"));

        let meta = snapshot.nodes[2].metadata.as_ref().unwrap();
        assert_eq!(meta.orphaned_reason.as_deref(), Some("RemovedFromTemplate"));
        assert!(meta
            .entries()
            .contains(&("kind".to_string(), "Service".to_string())));
    }

    #[test]
    fn test_parent_map_ancestors() {
        let snapshot = sample();
        let parents = ParentMap::build(&snapshot.nodes, &snapshot.edges);

        assert_eq!(parents.parent("a1"), Some("u1"));
        assert_eq!(parents.ancestors("a1"), vec!["u1", "t1", "c1"]);
        assert!(parents.ancestors("c1").is_empty());
    }

    #[test]
    fn test_parent_map_first_edge_wins() {
        let mut snapshot = sample();
        snapshot
            .nodes
            .push(GraphNode::new("t2", NodeKind::Template, "api"));
        snapshot.edges.push(GraphEdge::new("t2", "u1"));

        let parents = ParentMap::build(&snapshot.nodes, &snapshot.edges);
        assert_eq!(parents.parent("u1"), Some("t1"));
        assert_eq!(parents.duplicates().len(), 1);
        assert_eq!(parents.duplicates()[0].rejected, "t2");
    }

    #[test]
    fn test_parent_map_ignores_bad_edges() {
        let mut snapshot = sample();
        snapshot.edges.push(GraphEdge::new("missing", "a1"));
        snapshot.edges.push(GraphEdge::new("a1", "c1"));
        snapshot.edges.push(GraphEdge::new("u1", "o1"));

        let parents = ParentMap::build(&snapshot.nodes, &snapshot.edges);
        assert_eq!(parents.ignored_edges(), 3);
        assert_eq!(parents.parent("c1"), None);
        assert_eq!(parents.parent("o1"), None);
    }

    #[test]
    fn test_snapshot_helpers() {
        let mut snapshot = sample();
        snapshot.nodes[0].child_ids = vec!["t1".into(), "gone".into()];

        let children = snapshot.children_of("c1");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "t1");
        assert_eq!(snapshot.failed_ids(), vec!["u1"]);
        assert_eq!(snapshot.kind_counts()[4], (NodeKind::Unmanaged, 1));
    }
}
