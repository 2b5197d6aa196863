//! Topology Studio - interactive orchestration topology explorer
//!
//! Provides the topology canvas (layout, viewport, rendering, interaction),
//! graph data providers, and the shared config and theme.

pub mod config;
pub mod provider;
pub mod theme;
pub mod topology;

// Re-export commonly used types
pub use config::{ConfigError, StudioConfig};
pub use provider::{
    source_from_config, FeedUpdate, FileTopologySource, HttpTopologySource, PollInterval,
    ProviderError, TopologyFeed, TopologySource,
};
pub use theme::{Theme, ThemeChoice};
pub use topology::{
    GraphEdge, GraphNode, HealthState, NodeKind, TopologyCanvas, TopologyEvent, TopologyPalette,
    TopologySnapshot, TopologyView,
};
