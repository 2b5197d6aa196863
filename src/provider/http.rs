//! Topology service client over HTTP

use super::{ProviderError, TopologySource};
use crate::topology::TopologySnapshot;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("topology-studio/", env!("CARGO_PKG_VERSION"));

/// Error body returned by the service on failure
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Fetches `GET {base_url}/topology[?namespace=..]`
pub struct HttpTopologySource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTopologySource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn topology_url(&self) -> String {
        format!("{}/topology", self.base_url)
    }
}

impl TopologySource for HttpTopologySource {
    fn fetch(&self, namespace: Option<&str>) -> Result<TopologySnapshot, ProviderError> {
        let mut request = self.client.get(self.topology_url());
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            request = request.query(&[("namespace", ns)]);
        }

        log::debug!("GET {} (namespace: {:?})", self.topology_url(), namespace);
        let response = request
            .send()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let reason = status.canonical_reason().unwrap_or("Unknown");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: error_message(&body, reason),
            });
        }

        let body = response
            .text()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        decode_snapshot(&body)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Parse a topology document
pub fn decode_snapshot(body: &str) -> Result<TopologySnapshot, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Pick the most useful message out of a failed response body
pub fn error_message(body: &str, reason: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if !parsed.error.trim().is_empty() {
            return parsed.error;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.len() > 200 || trimmed.starts_with('<') {
        reason.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::NodeKind;

    #[test]
    fn test_topology_url_trims_slash() {
        let source = HttpTopologySource::new("http://localhost:8080/api/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(source.topology_url(), "http://localhost:8080/api/v1/topology");
        assert_eq!(source.describe(), "http://localhost:8080/api/v1");
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error":"namespace not found"}"#, "Not Found"),
            "namespace not found"
        );
        assert_eq!(error_message("", "Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message("<html>oops</html>", "Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message("plain failure", "Internal Server Error"), "plain failure");
    }

    #[test]
    fn test_decode_backend_document() {
        let body = r#"{
            "nodes": [
                {"id": "h1", "type": "hub", "name": "crm", "namespace": "ops", "status": "ready",
                 "children": ["f1"]},
                {"id": "f1", "type": "form", "name": "webapp", "status": "failed",
                 "metrics": {"desired": 3, "ready": 2, "failed": 1}},
                {"id": "o1", "type": "orphan", "name": "leftover", "status": "skipped",
                 "metadata": {"orphaned": true, "orphanedReason": "node deleted"}}
            ],
            "edges": [{"source": "h1", "target": "f1"}]
        }"#;
        let snapshot = decode_snapshot(body).unwrap();
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.nodes[0].kind, NodeKind::Connector);
        assert_eq!(snapshot.nodes[2].kind, NodeKind::Unmanaged);
        assert!(snapshot.nodes[1].is_failed());
        assert_eq!(snapshot.edges[0].from, "h1");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_snapshot("not json"), Err(ProviderError::Decode(_))));
    }
}
