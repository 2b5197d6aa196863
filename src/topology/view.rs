//! Topology view pipeline
//!
//! Ties the snapshot, layout cache, viewport and interaction state together.
//! State setters only mark the layout dirty; [`TopologyView::prepare_frame`]
//! recomputes it at most once before the frame is painted.

use super::graph::{NodeKind, ParentMap, TopologySnapshot};
use super::highlight::HighlightState;
use super::interaction::{
    hit_test, ClickRegion, DetailRequest, GestureEnd, InteractionState, PointerTracker,
    TopologyEvent,
};
use super::layout::{find_layout_node, layout_bounds, layout_with_parents, LayoutConfig, LayoutNode};
use super::viewport::{Viewport, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT};
use eframe::egui::{Pos2, Vec2};
use log::{debug, info};
use std::sync::Arc;

/// Everything the renderer needs for one frame
pub struct FrameState<'a> {
    pub layout: &'a [LayoutNode],
    pub snapshot: &'a TopologySnapshot,
    pub viewport: Viewport,
    pub interaction: &'a InteractionState,
    pub highlight: HighlightState,
}

pub struct TopologyView {
    snapshot: Arc<TopologySnapshot>,
    parents: ParentMap,
    config: LayoutConfig,

    layout: Vec<LayoutNode>,
    layout_dirty: bool,
    laid_out_revision: u64,

    viewport: Viewport,
    viewport_size: Vec2,
    /// Node count the viewport was last fitted for
    fitted_count: Option<usize>,
    /// Last focus request already applied to the viewport
    applied_focus: u64,

    interaction: InteractionState,
    pointer: PointerTracker,
    events: Vec<TopologyEvent>,
}

impl Default for TopologyView {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyView {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            snapshot: Arc::new(TopologySnapshot::default()),
            parents: ParentMap::default(),
            config,
            layout: Vec::new(),
            layout_dirty: true,
            laid_out_revision: 0,
            viewport: Viewport::default(),
            viewport_size: Vec2::ZERO,
            fitted_count: None,
            applied_focus: 0,
            interaction: InteractionState::new(),
            pointer: PointerTracker::default(),
            events: Vec::new(),
        }
    }

    // -- data -------------------------------------------------------------

    /// Swap in a fresh snapshot, keeping expansion, selection and viewport
    pub fn apply_snapshot(&mut self, snapshot: TopologySnapshot) {
        self.parents = ParentMap::build(&snapshot.nodes, &snapshot.edges);
        if self.parents.ignored_edges() > 0 {
            debug!(
                "Ignored {} edges with unknown or out-of-order endpoints",
                self.parents.ignored_edges()
            );
        }
        self.snapshot = Arc::new(snapshot);
        self.interaction
            .refresh_data(&self.snapshot.nodes, &self.parents);

        if let Some(selected) = self.interaction.selected().map(str::to_string) {
            if self.snapshot.node(&selected).is_none() {
                info!("Selected node {} disappeared after refresh", selected);
                self.interaction.clear_selection();
                self.events.push(TopologyEvent::SelectionCleared);
            }
        }
        if let Some(hovered) = self.interaction.hovered().map(str::to_string) {
            if self.snapshot.node(&hovered).is_none() {
                self.interaction.set_hovered(None);
            }
        }
        self.layout_dirty = true;
    }

    pub fn snapshot(&self) -> &Arc<TopologySnapshot> {
        &self.snapshot
    }

    pub fn parents(&self) -> &ParentMap {
        &self.parents
    }

    // -- frame pipeline ---------------------------------------------------

    /// Bring layout and viewport up to date for a canvas of `size`.
    ///
    /// Returns `None` while the surface has no area.
    pub fn prepare_frame(&mut self, size: Vec2) -> Option<FrameState<'_>> {
        if !(size.x > 0.0 && size.y > 0.0) {
            return None;
        }
        self.viewport_size = size;
        self.relayout_if_needed();

        let count = self.snapshot.nodes.len();
        if count == 0 {
            self.fitted_count = None;
        } else if self.fitted_count != Some(count) {
            if let Some(bounds) = layout_bounds(&self.layout) {
                self.viewport.fit_to_content(bounds, size);
                self.fitted_count = Some(count);
                debug!("Fitted viewport to {} nodes at {}%", count, self.viewport.percent());
            }
        }

        if self.interaction.focus_serial() != self.applied_focus {
            self.applied_focus = self.interaction.focus_serial();
            if let Some(node) = self
                .interaction
                .focused_id()
                .and_then(|id| find_layout_node(&self.layout, id))
                .filter(|n| n.visible)
            {
                self.viewport.focus_on(node.center(), size);
            }
        }

        Some(FrameState {
            layout: &self.layout,
            snapshot: &self.snapshot,
            viewport: self.viewport,
            interaction: &self.interaction,
            highlight: self.interaction.highlight(),
        })
    }

    fn relayout_if_needed(&mut self) {
        let revision = self.interaction.expansion_revision();
        if !self.layout_dirty && revision == self.laid_out_revision {
            return;
        }
        self.layout = layout_with_parents(
            &self.snapshot.nodes,
            &self.parents,
            self.interaction.expanded(),
            &self.config,
        );
        self.layout_dirty = false;
        self.laid_out_revision = revision;
    }

    pub fn layout(&mut self) -> &[LayoutNode] {
        self.relayout_if_needed();
        &self.layout
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn is_panning(&self) -> bool {
        self.pointer.is_panning()
    }

    // -- pointer input (canvas-local screen coordinates) -------------------

    pub fn pointer_down(&mut self, pos: Pos2) {
        self.pointer.press(pos);
    }

    pub fn pointer_move(&mut self, pos: Pos2) {
        if self.pointer.is_pressed() {
            if let Some(delta) = self.pointer.motion(pos) {
                self.viewport.pan(delta);
            }
            return;
        }
        self.update_hover(pos);
    }

    pub fn pointer_up(&mut self, pos: Pos2) {
        if let GestureEnd::Click(at) = self.pointer.release(pos) {
            self.click(at);
        }
        self.update_hover(pos);
    }

    /// Pointer left the surface: end any gesture and drop hover
    pub fn pointer_leave(&mut self) {
        self.pointer.cancel();
        if self.interaction.set_hovered(None) {
            self.events.push(TopologyEvent::HoverChanged {
                id: None,
                kind: None,
            });
        }
    }

    /// Wheel notch at `pos`; positive `delta_y` zooms in
    pub fn wheel(&mut self, pos: Pos2, delta_y: f32) {
        if delta_y == 0.0 {
            return;
        }
        let factor = if delta_y > 0.0 {
            WHEEL_ZOOM_IN
        } else {
            WHEEL_ZOOM_OUT
        };
        self.viewport.zoom_at(pos, factor);
    }

    fn hit(&mut self, pos: Pos2) -> Option<(String, NodeKind, ClickRegion)> {
        let world = self.viewport.screen_to_world(pos);
        self.relayout_if_needed();
        hit_test(&self.layout, world).map(|(idx, region)| {
            let node = &self.layout[idx].node;
            (node.id.clone(), node.kind, region)
        })
    }

    fn update_hover(&mut self, pos: Pos2) {
        let hit = self.hit(pos);
        let id = hit.as_ref().map(|(id, _, _)| id.as_str());
        if self.interaction.set_hovered(id) {
            self.events.push(TopologyEvent::HoverChanged {
                id: id.map(str::to_string),
                kind: hit.as_ref().map(|(_, kind, _)| *kind),
            });
        }
    }

    fn click(&mut self, pos: Pos2) {
        let Some((id, kind, region)) = self.hit(pos) else {
            return;
        };
        self.events.push(TopologyEvent::NodeClicked {
            id: id.clone(),
            kind,
            region,
        });

        match region {
            ClickRegion::Chevron => {
                let expanded = self.interaction.toggle_expansion(&id);
                self.events.push(TopologyEvent::ExpansionToggled { id, kind, expanded });
            }
            ClickRegion::Body => self.select(&id),
        }
    }

    // -- host commands ----------------------------------------------------

    pub fn select(&mut self, id: &str) {
        if let Some(node) = self.snapshot.node(id) {
            let request = DetailRequest {
                node: node.clone(),
                snapshot: Arc::clone(&self.snapshot),
            };
            self.interaction.select(id);
            self.events.push(TopologyEvent::NodeSelected(request));
        }
    }

    pub fn clear_selection(&mut self) {
        if self.interaction.clear_selection() {
            self.events.push(TopologyEvent::SelectionCleared);
        }
    }

    pub fn toggle_expansion(&mut self, id: &str) {
        if let Some(kind) = self.snapshot.node(id).map(|n| n.kind) {
            if kind.is_expandable() {
                let expanded = self.interaction.toggle_expansion(id);
                self.events.push(TopologyEvent::ExpansionToggled {
                    id: id.to_string(),
                    kind,
                    expanded,
                });
            }
        }
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.interaction
            .set_search_query(query, &self.snapshot.nodes, &self.parents);
    }

    pub fn clear_search(&mut self) {
        self.interaction.clear_search();
    }

    pub fn next_match(&mut self) {
        self.interaction.next_match(&self.parents);
    }

    pub fn previous_match(&mut self) {
        self.interaction.previous_match(&self.parents);
    }

    pub fn set_problem_mode(&mut self, active: bool) {
        self.interaction.set_problem_mode(active, &self.parents);
    }

    pub fn toggle_problem_mode(&mut self) {
        self.interaction.toggle_problem_mode(&self.parents);
    }

    pub fn expand_all(&mut self) {
        self.interaction.expand_all(&self.snapshot.nodes);
    }

    pub fn collapse_all(&mut self) {
        self.interaction.collapse_all();
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in(self.viewport_size);
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out(self.viewport_size);
    }

    /// Recenter on all visible content at the last known canvas size
    pub fn fit_to_content(&mut self) {
        self.relayout_if_needed();
        if let Some(bounds) = layout_bounds(&self.layout) {
            self.viewport.fit_to_content(bounds, self.viewport_size);
        }
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<TopologyEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::graph::{GraphEdge, GraphNode, HealthState};

    const SIZE: Vec2 = Vec2::new(1200.0, 800.0);

    fn snapshot() -> TopologySnapshot {
        TopologySnapshot::new(
            vec![
                GraphNode::new("c1", NodeKind::Connector, "crm"),
                GraphNode::new("t1", NodeKind::Template, "web"),
                GraphNode::new("u1", NodeKind::Unit, "acme"),
                GraphNode::new("u2", NodeKind::Unit, "globex"),
                GraphNode::new("a1", NodeKind::Artifact, "svc"),
            ],
            vec![
                GraphEdge::new("c1", "t1"),
                GraphEdge::new("t1", "u1"),
                GraphEdge::new("t1", "u2"),
                GraphEdge::new("u1", "a1"),
            ],
        )
    }

    fn loaded() -> TopologyView {
        let mut view = TopologyView::new();
        view.apply_snapshot(snapshot());
        view.prepare_frame(SIZE);
        view
    }

    fn screen_of(view: &mut TopologyView, id: &str, offset: Vec2) -> Pos2 {
        let vp = view.viewport();
        let node = find_layout_node(view.layout(), id).unwrap().clone();
        vp.world_to_screen(node.pos + offset)
    }

    #[test]
    fn test_zero_size_short_circuits() {
        let mut view = TopologyView::new();
        view.apply_snapshot(snapshot());
        assert!(view.prepare_frame(Vec2::ZERO).is_none());
        assert_eq!(view.viewport(), Viewport::default());
    }

    #[test]
    fn test_refresh_preserves_view_state() {
        let mut view = loaded();
        view.toggle_expansion("c1");
        view.toggle_expansion("t1");
        view.toggle_expansion("u1");
        view.viewport_mut().pan(Vec2::new(-130.0, 45.0));
        view.viewport_mut().zoom_at(Pos2::new(300.0, 200.0), 1.1);
        view.prepare_frame(SIZE);
        let before = view.viewport();

        let mut refreshed = snapshot();
        refreshed.nodes[3].health = HealthState::Failed;
        view.apply_snapshot(refreshed);
        view.prepare_frame(SIZE);

        assert_eq!(view.viewport(), before);
        assert_eq!(view.interaction().expanded().len(), 3);
        for id in ["c1", "t1", "u1"] {
            assert!(view.interaction().is_expanded(id));
        }
    }

    #[test]
    fn test_node_count_change_refits() {
        let mut view = loaded();
        view.viewport_mut().pan(Vec2::new(500.0, 500.0));
        let panned = view.viewport();

        let mut grown = snapshot();
        grown
            .nodes
            .push(GraphNode::new("c2", NodeKind::Connector, "erp"));
        view.apply_snapshot(grown);
        view.prepare_frame(SIZE);
        assert_ne!(view.viewport(), panned);
    }

    #[test]
    fn test_refit_after_empty_snapshot() {
        let mut view = loaded();
        let fitted = view.viewport();
        view.viewport_mut().pan(Vec2::new(-300.0, 120.0));

        view.apply_snapshot(TopologySnapshot::default());
        view.prepare_frame(SIZE);
        view.apply_snapshot(snapshot());
        view.prepare_frame(SIZE);
        assert_eq!(view.viewport(), fitted);
    }

    #[test]
    fn test_chevron_click_toggles_and_body_click_selects() {
        let mut view = loaded();
        let chevron = screen_of(&mut view, "c1", Vec2::new(10.0, 20.0));
        view.pointer_down(chevron);
        view.pointer_up(chevron);
        assert!(view.interaction().is_expanded("c1"));

        let body = screen_of(&mut view, "c1", Vec2::new(120.0, 20.0));
        view.pointer_down(body);
        view.pointer_up(body);
        assert_eq!(view.interaction().selected(), Some("c1"));

        let events = view.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            TopologyEvent::ExpansionToggled { id, expanded: true, .. } if id == "c1"
        )));
        let detail = events.iter().find_map(|e| match e {
            TopologyEvent::NodeSelected(req) => Some(req.clone()),
            _ => None,
        });
        let detail = detail.unwrap();
        assert_eq!(detail.node.id, "c1");
        assert_eq!(detail.snapshot.nodes.len(), 5);
        assert!(view.drain_events().is_empty());
    }

    #[test]
    fn test_drag_pans_without_clicking() {
        let mut view = loaded();
        let start = screen_of(&mut view, "c1", Vec2::new(10.0, 20.0));
        let before = view.viewport();

        view.pointer_down(start);
        view.pointer_move(start + Vec2::new(30.0, 0.0));
        view.pointer_move(start + Vec2::new(60.0, 10.0));
        view.pointer_up(start + Vec2::new(60.0, 10.0));

        assert_eq!(view.viewport().offset, before.offset + Vec2::new(60.0, 10.0));
        assert!(!view.interaction().is_expanded("c1"));
    }

    #[test]
    fn test_hover_events() {
        let mut view = loaded();
        let over = screen_of(&mut view, "c1", Vec2::new(100.0, 20.0));
        view.pointer_move(over);
        view.pointer_move(over + Vec2::new(1.0, 0.0));
        assert_eq!(view.interaction().hovered(), Some("c1"));
        view.pointer_leave();
        assert_eq!(view.interaction().hovered(), None);

        let hovers = view
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, TopologyEvent::HoverChanged { .. }))
            .count();
        assert_eq!(hovers, 2);
    }

    #[test]
    fn test_wheel_zoom_is_anchored() {
        let mut view = loaded();
        let anchor = Pos2::new(321.0, 123.0);
        let world = view.viewport().screen_to_world(anchor);
        view.wheel(anchor, 1.0);
        view.wheel(anchor, 1.0);
        view.wheel(anchor, -1.0);
        let after = view.viewport().screen_to_world(anchor);
        assert!((world - after).length() < 1e-3);
    }

    #[test]
    fn test_search_focus_reveals_and_centers() {
        let mut view = loaded();
        view.set_search_query("svc");
        let frame = view.prepare_frame(SIZE).unwrap();
        let a1 = find_layout_node(frame.layout, "a1").unwrap();
        assert!(a1.visible);
        let center = frame.viewport.world_to_screen(a1.center());
        assert!((center - Pos2::new(600.0, 400.0)).length() < 1e-3);
        assert!(frame.viewport.scale >= 1.0);
        assert!(frame.highlight.is_highlighted("a1"));

        // Panning afterwards is not undone by later frames
        view.viewport_mut().pan(Vec2::new(40.0, 0.0));
        let panned = view.viewport();
        view.prepare_frame(SIZE);
        assert_eq!(view.viewport(), panned);
    }

    #[test]
    fn test_selection_dropped_when_node_disappears() {
        let mut view = loaded();
        view.select("u2");
        view.drain_events();

        let mut shrunk = snapshot();
        shrunk.nodes.retain(|n| n.id != "u2");
        view.apply_snapshot(shrunk);
        assert_eq!(view.interaction().selected(), None);
        assert!(view
            .drain_events()
            .iter()
            .any(|e| matches!(e, TopologyEvent::SelectionCleared)));
    }
}
