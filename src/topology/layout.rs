//! Hierarchical Column Layout
//!
//! Places connectors, templates, units and artifacts in one column per level,
//! walking the derived parent map top to bottom. Children of an expanded node
//! start level with their parent; collapsed branches are still emitted, hidden
//! and stacked at the collapsed ancestor's Y, so every input node has exactly
//! one layout entry. Unmanaged objects get their own rightmost column.

use super::graph::{GraphEdge, GraphNode, NodeKind, ParentMap};
use eframe::egui::{Pos2, Rect, Vec2};
use std::collections::{HashMap, HashSet};

/// Width of the expand/collapse strip on the left of expandable nodes
pub const CHEVRON_ZONE_WIDTH: f32 = 28.0;

/// Geometry constants for the column layout
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Top-left of the first connector
    pub origin: Pos2,
    /// Horizontal distance between hierarchy columns
    pub level_spacing: f32,
    /// Extra gap between the artifact column and the unmanaged column
    pub unmanaged_gap: f32,
    pub connector_size: Vec2,
    pub template_size: Vec2,
    pub unit_size: Vec2,
    pub artifact_size: Vec2,
    pub unmanaged_size: Vec2,
    /// Row advance for connectors and templates
    pub card_spacing: f32,
    pub unit_spacing: f32,
    pub artifact_spacing: f32,
    pub unmanaged_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin: Pos2::new(80.0, 60.0),
            level_spacing: 220.0,
            unmanaged_gap: 80.0,
            connector_size: Vec2::new(200.0, 64.0),
            template_size: Vec2::new(200.0, 64.0),
            unit_size: Vec2::new(180.0, 48.0),
            artifact_size: Vec2::new(160.0, 32.0),
            unmanaged_size: Vec2::new(180.0, 40.0),
            card_spacing: 100.0,
            unit_spacing: 70.0,
            artifact_spacing: 40.0,
            unmanaged_spacing: 52.0,
        }
    }
}

impl LayoutConfig {
    pub fn node_size(&self, kind: NodeKind) -> Vec2 {
        match kind {
            NodeKind::Connector => self.connector_size,
            NodeKind::Template => self.template_size,
            NodeKind::Unit => self.unit_size,
            NodeKind::Artifact => self.artifact_size,
            NodeKind::Unmanaged => self.unmanaged_size,
        }
    }

    pub fn row_spacing(&self, kind: NodeKind) -> f32 {
        match kind {
            NodeKind::Connector | NodeKind::Template => self.card_spacing,
            NodeKind::Unit => self.unit_spacing,
            NodeKind::Artifact => self.artifact_spacing,
            NodeKind::Unmanaged => self.unmanaged_spacing,
        }
    }

    /// Left edge of the column a kind is drawn in
    pub fn column_x(&self, kind: NodeKind) -> f32 {
        match kind.level() {
            Some(level) => self.origin.x + level as f32 * self.level_spacing,
            None => self.origin.x + 4.0 * self.level_spacing + self.unmanaged_gap,
        }
    }
}

/// A graph node with its computed world-space placement
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub node: GraphNode,
    /// World-space top-left corner
    pub pos: Pos2,
    pub size: Vec2,
    /// False when some ancestor is collapsed
    pub visible: bool,
}

impl LayoutNode {
    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.pos, self.size)
    }

    pub fn center(&self) -> Pos2 {
        self.pos + self.size / 2.0
    }

    /// Inclusive containment, matching the canvas hit area
    pub fn contains(&self, point: Pos2) -> bool {
        let rect = self.rect();
        point.x >= rect.min.x
            && point.x <= rect.max.x
            && point.y >= rect.min.y
            && point.y <= rect.max.y
    }

    /// The expand/collapse strip, if this kind has one
    pub fn chevron_rect(&self) -> Option<Rect> {
        if !self.node.kind.is_expandable() {
            return None;
        }
        Some(Rect::from_min_size(
            self.pos,
            Vec2::new(CHEVRON_ZONE_WIDTH, self.size.y),
        ))
    }
}

/// Lay out a snapshot with the default geometry
pub fn compute_layout(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    expanded: &HashSet<String>,
) -> Vec<LayoutNode> {
    let parents = ParentMap::build(nodes, edges);
    layout_with_parents(nodes, &parents, expanded, &LayoutConfig::default())
}

/// Lay out against an already derived parent map
pub fn layout_with_parents(
    nodes: &[GraphNode],
    parents: &ParentMap,
    expanded: &HashSet<String>,
    config: &LayoutConfig,
) -> Vec<LayoutNode> {
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, node) in nodes.iter().enumerate() {
        if let Some(parent) = parents.parent(&node.id) {
            children.entry(parent).or_default().push(idx);
        }
    }

    let mut walker = Walker {
        nodes,
        children,
        expanded,
        config,
        placed: vec![false; nodes.len()],
        out: Vec::with_capacity(nodes.len()),
    };

    let mut cursor = config.origin.y;

    // Connectors first, then anything else that ended up without a parent
    for kind in [
        NodeKind::Connector,
        NodeKind::Template,
        NodeKind::Unit,
        NodeKind::Artifact,
    ] {
        for (idx, node) in nodes.iter().enumerate() {
            if node.kind == kind && parents.parent(&node.id).is_none() {
                cursor = walker.place(idx, cursor, true);
            }
        }
    }

    let mut orphan_y = config.origin.y;
    for (idx, node) in nodes.iter().enumerate() {
        if node.kind == NodeKind::Unmanaged {
            walker.emit(idx, orphan_y, true);
            orphan_y += config.unmanaged_spacing;
        }
    }

    walker.out
}

struct Walker<'a> {
    nodes: &'a [GraphNode],
    children: HashMap<&'a str, Vec<usize>>,
    expanded: &'a HashSet<String>,
    config: &'a LayoutConfig,
    placed: Vec<bool>,
    out: Vec<LayoutNode>,
}

impl<'a> Walker<'a> {
    /// Place a node and its subtree at `y`, returning the next free Y
    fn place(&mut self, idx: usize, y: f32, visible: bool) -> f32 {
        if !self.emit(idx, y, visible) {
            return y;
        }

        let node = &self.nodes[idx];
        let kids = self.children.get(node.id.as_str()).cloned().unwrap_or_default();
        let spacing = self.config.row_spacing(node.kind);

        if visible && !kids.is_empty() && self.expanded.contains(&node.id) {
            let mut child_y = y;
            for kid in kids {
                child_y = self.place(kid, child_y, true);
            }
            (y + spacing).max(child_y)
        } else {
            for kid in kids {
                self.place(kid, y, false);
            }
            if visible {
                y + spacing
            } else {
                y
            }
        }
    }

    fn emit(&mut self, idx: usize, y: f32, visible: bool) -> bool {
        if self.placed[idx] {
            return false;
        }
        self.placed[idx] = true;

        let node = &self.nodes[idx];
        self.out.push(LayoutNode {
            node: node.clone(),
            pos: Pos2::new(self.config.column_x(node.kind), y),
            size: self.config.node_size(node.kind),
            visible,
        });
        true
    }
}

/// Bounding box of the visible nodes
pub fn layout_bounds(nodes: &[LayoutNode]) -> Option<Rect> {
    nodes
        .iter()
        .filter(|n| n.visible)
        .map(LayoutNode::rect)
        .reduce(|acc, r| acc.union(r))
}

pub fn find_layout_node<'a>(nodes: &'a [LayoutNode], id: &str) -> Option<&'a LayoutNode> {
    nodes.iter().find(|n| n.node.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::graph::HealthState;

    fn expanded(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    /// c1 -> {t1 -> {u1, u2, u3}, t2 -> {u4}}, u1 -> a1, plus one unmanaged object
    fn fixture() -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let nodes = vec![
            GraphNode::new("c1", NodeKind::Connector, "crm"),
            GraphNode::new("t1", NodeKind::Template, "web"),
            GraphNode::new("t2", NodeKind::Template, "worker"),
            GraphNode::new("u1", NodeKind::Unit, "acme"),
            GraphNode::new("u2", NodeKind::Unit, "globex"),
            GraphNode::new("u3", NodeKind::Unit, "initech").with_health(HealthState::Failed),
            GraphNode::new("u4", NodeKind::Unit, "hooli"),
            GraphNode::new("a1", NodeKind::Artifact, "deployment"),
            GraphNode::new("o1", NodeKind::Unmanaged, "old-svc"),
        ];
        let edges = vec![
            GraphEdge::new("c1", "t1"),
            GraphEdge::new("c1", "t2"),
            GraphEdge::new("t1", "u1"),
            GraphEdge::new("t1", "u2"),
            GraphEdge::new("t1", "u3"),
            GraphEdge::new("t2", "u4"),
            GraphEdge::new("u1", "a1"),
        ];
        (nodes, edges)
    }

    fn get<'a>(layout: &'a [LayoutNode], id: &str) -> &'a LayoutNode {
        find_layout_node(layout, id).unwrap()
    }

    #[test]
    fn test_expanded_template_shows_units() {
        let (nodes, edges) = fixture();
        let layout = compute_layout(&nodes, &edges, &expanded(&["c1", "t1"]));

        for id in ["u1", "u2", "u3"] {
            assert!(get(&layout, id).visible, "{id} should be visible");
        }
        assert!(!get(&layout, "u4").visible);
        assert!(!get(&layout, "a1").visible);

        let min_y = layout
            .iter()
            .filter(|n| n.node.kind != NodeKind::Unmanaged)
            .map(|n| n.pos.y)
            .fold(f32::MAX, f32::min);
        assert_eq!(get(&layout, "c1").pos.y, min_y);
    }

    #[test]
    fn test_every_node_emitted_once() {
        let (nodes, edges) = fixture();
        for set in [
            expanded(&[]),
            expanded(&["c1"]),
            expanded(&["c1", "t1", "t2", "u1"]),
            expanded(&["t1", "u1"]),
        ] {
            let layout = compute_layout(&nodes, &edges, &set);
            assert_eq!(layout.len(), nodes.len());
            let ids: HashSet<&str> = layout.iter().map(|n| n.id()).collect();
            assert_eq!(ids.len(), nodes.len());
        }
    }

    #[test]
    fn test_visibility_follows_ancestors() {
        let (nodes, edges) = fixture();
        let parents = ParentMap::build(&nodes, &edges);
        let set = expanded(&["c1", "u1"]);
        let layout = compute_layout(&nodes, &edges, &set);

        for entry in &layout {
            let expected = parents
                .ancestors(entry.id())
                .iter()
                .all(|a| set.contains(a));
            assert_eq!(entry.visible, expected, "visibility of {}", entry.id());
        }
    }

    #[test]
    fn test_collapsed_descendants_stack_at_ancestor() {
        let (nodes, edges) = fixture();
        let layout = compute_layout(&nodes, &edges, &expanded(&["c1"]));

        let t1 = get(&layout, "t1");
        for id in ["u1", "u2", "u3", "a1"] {
            let entry = get(&layout, id);
            assert!(!entry.visible);
            assert_eq!(entry.pos.y, t1.pos.y);
        }
        let config = LayoutConfig::default();
        assert_eq!(get(&layout, "u1").pos.x, config.column_x(NodeKind::Unit));
        assert_eq!(get(&layout, "a1").pos.x, config.column_x(NodeKind::Artifact));
    }

    #[test]
    fn test_toggle_keeps_relative_order() {
        let (nodes, edges) = fixture();
        let open = compute_layout(&nodes, &edges, &expanded(&["c1", "t1"]));
        let closed = compute_layout(&nodes, &edges, &expanded(&["c1"]));

        let order = |layout: &[LayoutNode]| {
            let mut ids: Vec<(f32, String)> = ["u1", "u2", "u3"]
                .iter()
                .map(|id| (get(layout, id).pos.y, id.to_string()))
                .collect();
            ids.sort_by(|a, b| a.0.total_cmp(&b.0));
            ids.into_iter().map(|(_, id)| id).collect::<Vec<_>>()
        };
        assert_eq!(order(&open), vec!["u1", "u2", "u3"]);
        // Stacked at one Y, the stable sort keeps input order
        assert_eq!(order(&closed), vec!["u1", "u2", "u3"]);
    }

    #[test]
    fn test_siblings_do_not_overlap() {
        let (nodes, edges) = fixture();
        let layout = compute_layout(&nodes, &edges, &expanded(&["c1", "t1", "t2", "u1"]));
        let visible: Vec<&LayoutNode> = layout.iter().filter(|n| n.visible).collect();

        for (i, a) in visible.iter().enumerate() {
            for b in &visible[i + 1..] {
                assert!(
                    !a.rect().intersects(b.rect()),
                    "{} overlaps {}",
                    a.id(),
                    b.id()
                );
            }
        }
    }

    #[test]
    fn test_unmanaged_column() {
        let (mut nodes, edges) = fixture();
        nodes.push(GraphNode::new("o2", NodeKind::Unmanaged, "old-cm"));
        let layout = compute_layout(&nodes, &edges, &expanded(&[]));

        let o1 = get(&layout, "o1");
        let o2 = get(&layout, "o2");
        assert!(o1.visible && o2.visible);
        assert_eq!(o1.pos, Pos2::new(1040.0, 60.0));
        assert_eq!(o2.pos.y - o1.pos.y, 52.0);
        assert!(layout
            .iter()
            .filter(|n| n.node.kind != NodeKind::Unmanaged)
            .all(|n| n.rect().max.x < o1.pos.x));
    }

    #[test]
    fn test_dangling_edges_become_roots() {
        let nodes = vec![
            GraphNode::new("c1", NodeKind::Connector, "crm"),
            GraphNode::new("u9", NodeKind::Unit, "stray"),
        ];
        let edges = vec![GraphEdge::new("missing", "u9")];
        let layout = compute_layout(&nodes, &edges, &HashSet::new());

        assert_eq!(layout.len(), 2);
        let stray = get(&layout, "u9");
        assert!(stray.visible);
        assert!(stray.pos.y > get(&layout, "c1").pos.y);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let (nodes, edges) = fixture();
        let set = expanded(&["c1", "t1", "u1"]);
        assert_eq!(
            compute_layout(&nodes, &edges, &set),
            compute_layout(&nodes, &edges, &set)
        );
    }

    #[test]
    fn test_empty_and_bounds() {
        assert!(compute_layout(&[], &[], &HashSet::new()).is_empty());
        assert!(layout_bounds(&[]).is_none());

        let (nodes, edges) = fixture();
        let layout = compute_layout(&nodes, &edges, &expanded(&[]));
        let bounds = layout_bounds(&layout).unwrap();
        assert_eq!(bounds.min, Pos2::new(80.0, 60.0));
        assert_eq!(bounds.max.x, 1040.0 + 180.0);
    }

    #[test]
    fn test_chevron_zone() {
        let (nodes, edges) = fixture();
        let layout = compute_layout(&nodes, &edges, &expanded(&["c1", "t1", "u1"]));

        let c1 = get(&layout, "c1");
        let zone = c1.chevron_rect().unwrap();
        assert_eq!(zone.width(), CHEVRON_ZONE_WIDTH);
        assert_eq!(zone.height(), c1.size.y);
        assert!(get(&layout, "a1").chevron_rect().is_none());
        assert!(get(&layout, "o1").chevron_rect().is_none());
    }
}
