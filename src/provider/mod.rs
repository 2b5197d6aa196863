//! Graph data providers
//!
//! A [`TopologySource`] fetches one snapshot; [`TopologyFeed`] polls a source
//! on a background thread and hands results to the UI thread.

pub mod file;
pub mod http;
pub mod poller;

pub use file::FileTopologySource;
pub use http::HttpTopologySource;
pub use poller::{FeedUpdate, PollInterval, TopologyFeed};

use crate::config::StudioConfig;
use crate::topology::TopologySnapshot;
use std::sync::Arc;

/// Provider failures, each with a message fit for an inline error banner
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Non-success HTTP reply
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Body was not a topology document
    #[error("invalid topology data: {0}")]
    Decode(String),

    /// Local snapshot file could not be read
    #[error("I/O error: {0}")]
    Io(String),
}

impl ProviderError {
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::Status { status, message } => {
                format!("Topology service returned {}: {}", status, message)
            }
            ProviderError::Transport(e) => format!("Could not reach the topology service ({})", e),
            ProviderError::Decode(e) => format!("Received topology data could not be read ({})", e),
            ProviderError::Io(e) => format!("Could not read the snapshot file ({})", e),
        }
    }
}

/// Something that can produce a topology snapshot on demand.
///
/// Implementations block; the feed calls them off the UI thread.
pub trait TopologySource: Send + Sync {
    fn fetch(&self, namespace: Option<&str>) -> Result<TopologySnapshot, ProviderError>;

    /// Short description for logs and the status bar
    fn describe(&self) -> String;
}

/// Pick the source a config asks for: a snapshot file if set, otherwise HTTP
pub fn source_from_config(config: &StudioConfig) -> Result<Arc<dyn TopologySource>, ProviderError> {
    match &config.snapshot_file {
        Some(path) => Ok(Arc::new(FileTopologySource::new(path.clone()))),
        None => Ok(Arc::new(HttpTopologySource::new(
            &config.api_url,
            config.request_timeout(),
        )?)),
    }
}

/// Keep only nodes in `namespace`, and edges between kept nodes
pub fn scope_to_namespace(snapshot: TopologySnapshot, namespace: Option<&str>) -> TopologySnapshot {
    let Some(ns) = namespace.filter(|ns| !ns.is_empty()) else {
        return snapshot;
    };
    let nodes: Vec<_> = snapshot
        .nodes
        .into_iter()
        .filter(|n| n.namespace_label == ns)
        .collect();
    let kept: std::collections::HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let edges = snapshot
        .edges
        .into_iter()
        .filter(|e| kept.contains(e.from.as_str()) && kept.contains(e.to.as_str()))
        .collect();
    TopologySnapshot { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{GraphEdge, GraphNode, NodeKind};

    #[test]
    fn test_user_messages() {
        let err = ProviderError::Status {
            status: 503,
            message: "cluster unavailable".into(),
        };
        assert_eq!(
            err.user_message(),
            "Topology service returned 503: cluster unavailable"
        );
        assert!(ProviderError::Transport("timed out".into())
            .user_message()
            .contains("timed out"));
    }

    #[test]
    fn test_scope_to_namespace() {
        let mut a = GraphNode::new("c1", NodeKind::Connector, "crm");
        a.namespace_label = "ops".into();
        let mut b = GraphNode::new("t1", NodeKind::Template, "web");
        b.namespace_label = "ops".into();
        let mut c = GraphNode::new("t2", NodeKind::Template, "other");
        c.namespace_label = "dev".into();
        let snapshot = TopologySnapshot::new(
            vec![a, b, c],
            vec![GraphEdge::new("c1", "t1"), GraphEdge::new("c1", "t2")],
        );

        let scoped = scope_to_namespace(snapshot.clone(), Some("ops"));
        assert_eq!(scoped.nodes.len(), 2);
        assert_eq!(scoped.edges, vec![GraphEdge::new("c1", "t1")]);
        assert_eq!(scope_to_namespace(snapshot.clone(), None), snapshot);
        assert_eq!(scope_to_namespace(snapshot.clone(), Some("")), snapshot);
    }

    #[test]
    fn test_source_from_config() {
        let mut config = StudioConfig::default();
        assert_eq!(
            source_from_config(&config).unwrap().describe(),
            "http://localhost:8080/api/v1"
        );
        config.snapshot_file = Some("demos/sample_topology.json".into());
        assert_eq!(
            source_from_config(&config).unwrap().describe(),
            "demos/sample_topology.json"
        );
    }
}
