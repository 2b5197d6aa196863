//! Topology Visualization Module
//!
//! Interactive canvas for the connector/template/unit/artifact hierarchy:
//! - Deterministic column layout with expand/collapse
//! - Pan/zoom viewport with fit-to-content and focus
//! - Search and problem highlighting with match navigation
//! - Immediate-mode rendering onto an egui painter

pub mod graph;
pub mod highlight;
pub mod interaction;
pub mod layout;
pub mod palette;
pub mod renderer;
pub mod view;
pub mod viewport;

pub use graph::{
    DuplicateParent, GraphEdge, GraphNode, HealthState, Metrics, NodeKind, NodeMetadata, ParentMap,
    TopologySnapshot,
};
pub use highlight::{HighlightMode, HighlightState};
pub use interaction::{ClickRegion, DetailRequest, InteractionState, TopologyEvent};
pub use layout::{compute_layout, layout_bounds, LayoutConfig, LayoutNode};
pub use palette::TopologyPalette;
pub use renderer::{render, TopologyCanvas};
pub use view::{FrameState, TopologyView};
pub use viewport::Viewport;
