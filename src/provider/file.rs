//! Snapshot file source, used for offline viewing and demos

use super::{scope_to_namespace, ProviderError, TopologySource};
use crate::topology::TopologySnapshot;
use std::path::{Path, PathBuf};

/// Re-reads a JSON snapshot file on every fetch
pub struct FileTopologySource {
    path: PathBuf,
}

impl FileTopologySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TopologySource for FileTopologySource {
    fn fetch(&self, namespace: Option<&str>) -> Result<TopologySnapshot, ProviderError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ProviderError::Io(format!("{}: {}", self.path.display(), e)))?;
        let snapshot = super::http::decode_snapshot(&content)?;
        Ok(scope_to_namespace(snapshot, namespace))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
