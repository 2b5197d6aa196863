//! Interaction & highlight state
//!
//! Owns expansion, selection, hover, search and problem mode. All mutation
//! goes through methods here so the search/problem exclusivity and the
//! ancestor auto-expansion are enforced in one place.

use super::graph::{GraphNode, NodeKind, ParentMap, TopologySnapshot};
use super::highlight::{normalize_query, problem_ids, search_matches, HighlightState};
use super::layout::LayoutNode;
use eframe::egui::{Pos2, Vec2};
use std::collections::HashSet;
use std::sync::Arc;

/// Pointer travel (screen px) after which a press becomes a pan
pub const CLICK_SLOP: f32 = 4.0;

/// Which part of a node a click landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRegion {
    /// Expand/collapse strip of an expandable node
    Chevron,
    /// Anywhere else on the node
    Body,
}

/// Payload for the detail drawer
#[derive(Debug, Clone)]
pub struct DetailRequest {
    pub node: GraphNode,
    /// Snapshot the node came from, for resolving children
    pub snapshot: Arc<TopologySnapshot>,
}

impl DetailRequest {
    pub fn children(&self) -> Vec<&GraphNode> {
        self.snapshot.children_of(&self.node.id)
    }
}

/// Notifications for the host application, drained once per frame
#[derive(Debug, Clone)]
pub enum TopologyEvent {
    NodeClicked {
        id: String,
        kind: NodeKind,
        region: ClickRegion,
    },
    ExpansionToggled {
        id: String,
        kind: NodeKind,
        expanded: bool,
    },
    HoverChanged {
        id: Option<String>,
        kind: Option<NodeKind>,
    },
    NodeSelected(DetailRequest),
    SelectionCleared,
}

/// Topmost visible node under a world point, and the region hit
pub fn hit_test(layout: &[LayoutNode], world: Pos2) -> Option<(usize, ClickRegion)> {
    layout
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, n)| n.visible)
        .find(|(_, n)| n.contains(world))
        .map(|(idx, n)| {
            let region = match n.chevron_rect() {
                Some(zone) if world.x < zone.max.x => ClickRegion::Chevron,
                _ => ClickRegion::Body,
            };
            (idx, region)
        })
}

/// How a pointer press ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEnd {
    Click(Pos2),
    Pan,
    None,
}

/// Distinguishes click from drag for a single pointer press
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerTracker {
    press: Option<Pos2>,
    last: Option<Pos2>,
    panning: bool,
}

impl PointerTracker {
    pub fn press(&mut self, pos: Pos2) {
        self.press = Some(pos);
        self.last = Some(pos);
        self.panning = false;
    }

    /// Returns the pan delta once the press has turned into a drag
    pub fn motion(&mut self, pos: Pos2) -> Option<Vec2> {
        let start = self.press?;
        let last = self.last.unwrap_or(start);
        self.last = Some(pos);
        if !self.panning && (pos - start).length() > CLICK_SLOP {
            self.panning = true;
            return Some(pos - start);
        }
        if self.panning {
            Some(pos - last)
        } else {
            None
        }
    }

    pub fn release(&mut self, pos: Pos2) -> GestureEnd {
        let outcome = match self.press {
            Some(_) if self.panning => GestureEnd::Pan,
            Some(_) => GestureEnd::Click(pos),
            None => GestureEnd::None,
        };
        self.cancel();
        outcome
    }

    pub fn cancel(&mut self) {
        self.press = None;
        self.last = None;
        self.panning = false;
    }

    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }
}

/// User-driven view state that survives data refreshes
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    expanded: HashSet<String>,
    selected: Option<String>,
    hovered: Option<String>,
    search_query: String,
    focused_match: usize,
    problem_mode: bool,

    matches: Vec<String>,
    failed: Vec<String>,

    /// Bumped whenever `expanded` changes
    expansion_revision: u64,
    /// Bumped whenever navigation asks for the focused node to be centered
    focus_serial: u64,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    // -- accessors --------------------------------------------------------

    pub fn expanded(&self) -> &HashSet<String> {
        &self.expanded
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn problem_mode(&self) -> bool {
        self.problem_mode
    }

    pub fn problem_count(&self) -> usize {
        self.failed.len()
    }

    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn focused_match_index(&self) -> usize {
        self.focused_match
    }

    pub fn expansion_revision(&self) -> u64 {
        self.expansion_revision
    }

    pub fn focus_serial(&self) -> u64 {
        self.focus_serial
    }

    /// Nodes Enter/Shift+Enter step through: failures in problem mode, else matches
    fn targets(&self) -> &[String] {
        if self.problem_mode {
            &self.failed
        } else {
            &self.matches
        }
    }

    pub fn target_count(&self) -> usize {
        self.targets().len()
    }

    /// 1-based position of the focused target, for "i/n" badges
    pub fn focused_match_position(&self) -> Option<usize> {
        if self.targets().is_empty() {
            None
        } else {
            Some(self.focused_match + 1)
        }
    }

    pub fn focused_id(&self) -> Option<&str> {
        self.targets().get(self.focused_match).map(String::as_str)
    }

    pub fn highlight(&self) -> HighlightState {
        if self.problem_mode && !self.failed.is_empty() {
            HighlightState::problem(&self.failed)
        } else if !self.matches.is_empty() {
            HighlightState::search(&self.matches)
        } else {
            HighlightState::none()
        }
    }

    // -- data refresh -----------------------------------------------------

    /// Recompute derived sets after the node list was replaced
    pub fn refresh_data(&mut self, nodes: &[GraphNode], parents: &ParentMap) {
        let previous_focus = self.focused_id().map(str::to_string);
        let previously_failed: HashSet<String> = self.failed.drain(..).collect();

        self.matches = search_matches(nodes, &self.search_query);
        self.failed = problem_ids(nodes);

        let count = self.target_count();
        if count == 0 {
            self.focused_match = 0;
        } else if self.focused_match >= count {
            self.focused_match = count - 1;
        }

        if self.problem_mode {
            let newly_failed: Vec<String> = self
                .failed
                .iter()
                .filter(|id| !previously_failed.contains(*id))
                .cloned()
                .collect();
            for id in &newly_failed {
                self.expand_ancestors(id, parents);
            }
        }
        let current_focus = self.focused_id().map(str::to_string);
        if current_focus != previous_focus {
            if let Some(id) = current_focus {
                self.expand_ancestors(&id, parents);
                self.focus_serial += 1;
            }
        }
    }

    // -- expansion --------------------------------------------------------

    pub fn toggle_expansion(&mut self, id: &str) -> bool {
        let now_expanded = if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        };
        self.expansion_revision += 1;
        now_expanded
    }

    /// Expand every ancestor of `id`; existing entries are left alone
    pub fn expand_ancestors(&mut self, id: &str, parents: &ParentMap) {
        let mut changed = false;
        for ancestor in parents.ancestors(id) {
            changed |= self.expanded.insert(ancestor);
        }
        if changed {
            self.expansion_revision += 1;
        }
    }

    fn expand_problem_ancestors(&mut self, parents: &ParentMap) {
        let failed = self.failed.clone();
        for id in &failed {
            self.expand_ancestors(id, parents);
        }
    }

    /// Add every connector and template to the expansion set
    pub fn expand_all(&mut self, nodes: &[GraphNode]) {
        let mut changed = false;
        for node in nodes {
            if matches!(node.kind, NodeKind::Connector | NodeKind::Template) {
                changed |= self.expanded.insert(node.id.clone());
            }
        }
        if changed {
            self.expansion_revision += 1;
        }
    }

    pub fn collapse_all(&mut self) {
        if !self.expanded.is_empty() {
            self.expanded.clear();
            self.expansion_revision += 1;
        }
    }

    // -- selection & hover ------------------------------------------------

    pub fn select(&mut self, id: &str) {
        self.selected = Some(id.to_string());
    }

    pub fn clear_selection(&mut self) -> bool {
        self.selected.take().is_some()
    }

    /// Returns true when the hovered node changed
    pub fn set_hovered(&mut self, id: Option<&str>) -> bool {
        if self.hovered.as_deref() == id {
            return false;
        }
        self.hovered = id.map(str::to_string);
        true
    }

    // -- search -----------------------------------------------------------

    /// Replace the query; a non-empty query switches problem mode off
    pub fn set_search_query(&mut self, query: &str, nodes: &[GraphNode], parents: &ParentMap) {
        if query == self.search_query {
            return;
        }
        self.search_query = query.to_string();
        if self.problem_mode {
            if normalize_query(query).is_none() {
                self.matches.clear();
                return;
            }
            self.problem_mode = false;
        }
        self.matches = search_matches(nodes, query);
        self.focused_match = 0;
        self.focus_current(parents);
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.matches.clear();
        if !self.problem_mode {
            self.focused_match = 0;
        }
    }

    pub fn next_match(&mut self, parents: &ParentMap) -> Option<&str> {
        let count = self.target_count();
        if count == 0 {
            return None;
        }
        self.focused_match = (self.focused_match + 1) % count;
        self.focus_current(parents);
        self.focused_id()
    }

    pub fn previous_match(&mut self, parents: &ParentMap) -> Option<&str> {
        let count = self.target_count();
        if count == 0 {
            return None;
        }
        self.focused_match = if self.focused_match == 0 {
            count - 1
        } else {
            self.focused_match - 1
        };
        self.focus_current(parents);
        self.focused_id()
    }

    fn focus_current(&mut self, parents: &ParentMap) {
        if let Some(id) = self.focused_id().map(str::to_string) {
            self.expand_ancestors(&id, parents);
            self.focus_serial += 1;
        }
    }

    // -- problem mode -----------------------------------------------------

    /// Turning problem mode on clears the search and reveals every failure
    pub fn set_problem_mode(&mut self, active: bool, parents: &ParentMap) {
        if active == self.problem_mode {
            return;
        }
        self.problem_mode = active;
        self.focused_match = 0;
        if active {
            self.search_query.clear();
            self.matches.clear();
            self.expand_problem_ancestors(parents);
            self.focus_current(parents);
        }
    }

    pub fn toggle_problem_mode(&mut self, parents: &ParentMap) {
        self.set_problem_mode(!self.problem_mode, parents);
    }
}
