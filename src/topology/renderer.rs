//! Topology canvas renderer
//!
//! Paints one prepared frame with an egui [`Painter`]: background, curved
//! edges, the unmanaged section label, then every visible node in layout
//! order with its dimming, glow, body and highlight ring. Nothing is cached
//! between calls. [`TopologyCanvas`] wraps it as a widget and feeds pointer
//! input back into the [`TopologyView`].

use super::graph::{NodeKind, HealthState};
use super::highlight::HighlightMode;
use super::layout::{LayoutNode, CHEVRON_ZONE_WIDTH};
use super::palette::{fade, StatusColors, TopologyPalette, DIM_ALPHA};
use super::view::{FrameState, TopologyView};
use super::viewport::Viewport;
use eframe::egui::{
    self, epaint, Align2, Color32, CursorIcon, FontId, Painter, Pos2, Rect, Rounding, Sense,
    Shape, Stroke, Vec2,
};
use std::collections::HashMap;

/// Label above the unmanaged column
pub const UNMANAGED_SECTION_LABEL: &str = "Unmanaged objects";

/// Scaled font sizes below this are not drawn
const MIN_LEGIBLE_FONT: f32 = 3.0;

const CARD_RADIUS: f32 = 12.0;
const UNIT_RADIUS: f32 = 8.0;
const ARTIFACT_RADIUS: f32 = 6.0;
const RING_MARGIN: f32 = 4.0;

/// World -> canvas pixel mapping for one frame
#[derive(Clone, Copy)]
struct Projector {
    origin: Vec2,
    viewport: Viewport,
}

impl Projector {
    fn pos(&self, world: Pos2) -> Pos2 {
        self.viewport.world_to_screen(world) + self.origin
    }

    fn rect(&self, world: Rect) -> Rect {
        Rect::from_min_max(self.pos(world.min), self.pos(world.max))
    }

    fn len(&self, world: f32) -> f32 {
        world * self.viewport.scale
    }

    fn font(&self, size: f32) -> Option<FontId> {
        let scaled = self.len(size);
        (scaled >= MIN_LEGIBLE_FONT).then(|| FontId::monospace(scaled))
    }
}

/// Per-node drawing flags
#[derive(Clone, Copy)]
struct NodeLook {
    selected: bool,
    hovered: bool,
    highlighted: bool,
    expanded: bool,
    alpha: f32,
}

impl NodeLook {
    fn c(&self, color: Color32) -> Color32 {
        fade(color, self.alpha)
    }

    fn emphasized(&self) -> bool {
        self.selected || self.highlighted
    }
}

/// Paint a full frame into `canvas`
pub fn render(painter: &Painter, canvas: Rect, frame: &FrameState<'_>, palette: &TopologyPalette) {
    let painter = painter.with_clip_rect(canvas);
    painter.rect_filled(canvas, 0.0, palette.canvas_bg);

    let proj = Projector {
        origin: canvas.min.to_vec2(),
        viewport: frame.viewport,
    };

    draw_edges(&painter, &proj, frame, palette);

    if let Some(first) = frame
        .layout
        .iter()
        .find(|n| n.visible && n.kind() == NodeKind::Unmanaged)
    {
        draw_section_label(&painter, &proj, first.pos, palette);
    }

    let cull = canvas.expand(proj.len(40.0));
    let mode = frame.highlight.mode;
    for node in frame.layout.iter().filter(|n| n.visible) {
        if !cull.intersects(proj.rect(node.rect())) {
            continue;
        }
        let id = node.id();
        let dimmed = frame.highlight.is_dimmed(id);
        let look = NodeLook {
            selected: frame.interaction.selected() == Some(id),
            hovered: frame.interaction.hovered() == Some(id),
            highlighted: frame.highlight.is_highlighted(id),
            expanded: frame.interaction.is_expanded(id),
            alpha: if dimmed { DIM_ALPHA } else { 1.0 },
        };
        draw_node(&painter, &proj, node, look, mode, palette);

        if look.highlighted && !dimmed {
            if let Some(ring) = palette.ring(mode) {
                let radius = if node.kind() == NodeKind::Artifact {
                    8.0
                } else {
                    CARD_RADIUS
                };
                let outline = rounded_rect_path(
                    proj.rect(node.rect().expand(RING_MARGIN)),
                    proj.len(radius + 2.0),
                );
                painter.extend(Shape::dashed_line(
                    &outline,
                    Stroke::new(proj.len(ring.width), ring.color),
                    proj.len(ring.dash),
                    proj.len(ring.gap),
                ));
            }
        }
    }
}

fn draw_edges(painter: &Painter, proj: &Projector, frame: &FrameState<'_>, palette: &TopologyPalette) {
    let by_id: HashMap<&str, &LayoutNode> = frame.layout.iter().map(|n| (n.id(), n)).collect();
    let stroke = Stroke::new(proj.len(1.5), palette.edge);

    for edge in &frame.snapshot.edges {
        let (Some(from), Some(to)) = (by_id.get(edge.from.as_str()), by_id.get(edge.to.as_str()))
        else {
            continue;
        };
        if !from.visible || !to.visible {
            continue;
        }

        let start = Pos2::new(from.rect().max.x, from.center().y);
        let end = Pos2::new(to.rect().min.x, to.center().y);
        let mid_x = start.x + (end.x - start.x) * 0.5;
        let points = [
            proj.pos(start),
            proj.pos(Pos2::new(mid_x, start.y)),
            proj.pos(Pos2::new(mid_x, end.y)),
            proj.pos(end),
        ];
        painter.add(epaint::CubicBezierShape::from_points_stroke(
            points,
            false,
            Color32::TRANSPARENT,
            stroke,
        ));
        painter.circle_filled(
            proj.pos(end - Vec2::new(2.0, 0.0)),
            proj.len(3.0),
            palette.edge_marker,
        );
    }
}

fn draw_section_label(painter: &Painter, proj: &Projector, anchor: Pos2, palette: &TopologyPalette) {
    let Some(font) = proj.font(11.0) else {
        return;
    };
    let text_pos = anchor - Vec2::new(0.0, 32.0);
    let galley = painter.layout_no_wrap(
        UNMANAGED_SECTION_LABEL.to_string(),
        font.clone(),
        palette.section_text,
    );
    let text_width = galley.size().x / proj.viewport.scale;
    let pill = Rect::from_min_size(
        text_pos - Vec2::new(10.0, 10.0),
        Vec2::new(text_width + 20.0, 24.0),
    );
    painter.rect(
        proj.rect(pill),
        proj.len(8.0),
        palette.section_fill,
        Stroke::new(1.0, palette.section_border),
    );
    painter.text(
        proj.pos(text_pos + Vec2::new(0.0, 2.0)),
        Align2::LEFT_CENTER,
        UNMANAGED_SECTION_LABEL,
        font,
        palette.section_text,
    );
}

fn draw_node(
    painter: &Painter,
    proj: &Projector,
    node: &LayoutNode,
    look: NodeLook,
    mode: HighlightMode,
    palette: &TopologyPalette,
) {
    let radius = match node.kind() {
        NodeKind::Connector | NodeKind::Template => CARD_RADIUS,
        NodeKind::Unit | NodeKind::Unmanaged => UNIT_RADIUS,
        NodeKind::Artifact => ARTIFACT_RADIUS,
    };
    let rect = proj.rect(node.rect());

    let glow = palette.glow(mode, look.highlighted, look.selected, look.hovered);
    let shadow = epaint::Shadow {
        offset: Vec2::new(0.0, proj.len(glow.offset_y)),
        blur: proj.len(glow.blur),
        spread: 0.0,
        color: look.c(glow.color),
    };
    painter.add(shadow.as_shape(rect, proj.len(radius)));

    let colors = palette.status(node.node.health);
    match node.kind() {
        NodeKind::Connector | NodeKind::Template => {
            draw_card(painter, proj, node, rect, colors, look, palette)
        }
        NodeKind::Unit => draw_unit(painter, proj, node, rect, colors, look, palette),
        NodeKind::Artifact => draw_artifact(painter, proj, node, rect, colors, look, palette),
        NodeKind::Unmanaged => draw_unmanaged(painter, proj, node, rect, look, palette),
    }
}

fn border_stroke(proj: &Projector, look: NodeLook, colors: StatusColors, idle: Color32, width: f32) -> Stroke {
    if look.emphasized() {
        Stroke::new(proj.len(width), look.c(colors.accent))
    } else if look.hovered {
        Stroke::new(proj.len(1.0), look.c(colors.border))
    } else {
        Stroke::new(proj.len(1.0), look.c(idle))
    }
}

/// Left chevron strip shared by cards and units
fn draw_chevron_strip(
    painter: &Painter,
    proj: &Projector,
    rect: Rect,
    radius: f32,
    inset: f32,
    glyph: f32,
    colors: StatusColors,
    look: NodeLook,
) {
    let strip_w = proj.len(CHEVRON_ZONE_WIDTH);
    let strip = Rect::from_min_size(rect.min, Vec2::new(strip_w, rect.height()));
    let r = proj.len(radius);
    painter.rect_filled(
        strip,
        Rounding {
            nw: r,
            sw: r,
            ne: 0.0,
            se: 0.0,
        },
        look.c(colors.bg),
    );
    painter.line_segment(
        [
            Pos2::new(strip.max.x, rect.min.y + proj.len(inset)),
            Pos2::new(strip.max.x, rect.max.y - proj.len(inset)),
        ],
        Stroke::new(proj.len(1.0), look.c(colors.border)),
    );

    let c = strip.center();
    let s = proj.len(glyph);
    let points = if look.expanded {
        vec![
            Pos2::new(c.x - s, c.y - s / 2.0),
            Pos2::new(c.x + s, c.y - s / 2.0),
            Pos2::new(c.x, c.y + s / 2.0),
        ]
    } else {
        vec![
            Pos2::new(c.x - s / 2.0, c.y - s),
            Pos2::new(c.x + s / 2.0, c.y),
            Pos2::new(c.x - s / 2.0, c.y + s),
        ]
    };
    painter.add(Shape::convex_polygon(points, look.c(colors.text), Stroke::NONE));
}

fn draw_card(
    painter: &Painter,
    proj: &Projector,
    node: &LayoutNode,
    rect: Rect,
    colors: StatusColors,
    look: NodeLook,
    palette: &TopologyPalette,
) {
    let r = proj.len(CARD_RADIUS);
    painter.rect_filled(rect, r, look.c(palette.card_fill));
    draw_chevron_strip(painter, proj, rect, CARD_RADIUS, 8.0, 5.0, colors, look);
    painter.rect_stroke(rect, r, border_stroke(proj, look, colors, palette.card_border, 2.0));

    let (x, y, w, h) = (node.pos.x, node.pos.y, node.size.x, node.size.y);
    let content_x = x + CHEVRON_ZONE_WIDTH + 8.0;

    if let Some(font) = proj.font(9.0) {
        let badge = node.kind().label().to_uppercase();
        let galley = painter.layout_no_wrap(badge.clone(), font.clone(), colors.text);
        let badge_w = galley.size().x / proj.viewport.scale;
        let badge_rect = Rect::from_min_size(Pos2::new(content_x, y + 10.0), Vec2::new(badge_w + 12.0, 18.0));
        painter.rect_filled(proj.rect(badge_rect), proj.len(4.0), look.c(colors.bg));
        painter.text(
            proj.pos(Pos2::new(content_x + 6.0, y + 19.0)),
            Align2::LEFT_CENTER,
            badge,
            font,
            look.c(colors.text),
        );
    }

    if let Some(font) = proj.font(12.0) {
        let reserved = if node.node.metrics.is_some() { 70.0 } else { 16.0 };
        let name = fit_text(painter, proj, &node.node.display_name, &font, w - CHEVRON_ZONE_WIDTH - reserved);
        painter.text(
            proj.pos(Pos2::new(content_x, y + h - 18.0)),
            Align2::LEFT_CENTER,
            name,
            font,
            look.c(palette.name_text),
        );
    }

    if let (Some(metrics), Some(font)) = (node.node.metrics, proj.font(10.0)) {
        let text = format!("{}/{}", metrics.ready, metrics.desired);
        let galley = painter.layout_no_wrap(text.clone(), font.clone(), colors.text);
        let text_w = galley.size().x / proj.viewport.scale;
        let pill = Rect::from_min_size(
            Pos2::new(x + w - text_w - 20.0, y + h - 28.0),
            Vec2::new(text_w + 12.0, 20.0),
        );
        painter.rect_filled(proj.rect(pill), proj.len(4.0), look.c(colors.bg));
        painter.text(
            proj.pos(Pos2::new(x + w - 14.0, y + h - 17.0)),
            Align2::RIGHT_CENTER,
            text,
            font,
            look.c(colors.text),
        );
    }
}

fn draw_unit(
    painter: &Painter,
    proj: &Projector,
    node: &LayoutNode,
    rect: Rect,
    colors: StatusColors,
    look: NodeLook,
    palette: &TopologyPalette,
) {
    let r = proj.len(UNIT_RADIUS);
    painter.rect_filled(rect, r, look.c(palette.card_fill));
    draw_chevron_strip(painter, proj, rect, UNIT_RADIUS, 6.0, 4.0, colors, look);
    painter.rect_stroke(rect, r, border_stroke(proj, look, colors, palette.card_border, 2.0));

    let (x, cy, w) = (node.pos.x, node.center().y, node.size.x);
    painter.circle_filled(
        proj.pos(Pos2::new(x + CHEVRON_ZONE_WIDTH + 12.0, cy)),
        proj.len(5.0),
        look.c(colors.accent),
    );

    if let Some(font) = proj.font(11.0) {
        let name = fit_text(painter, proj, &node.node.display_name, &font, w - CHEVRON_ZONE_WIDTH - 32.0);
        painter.text(
            proj.pos(Pos2::new(x + CHEVRON_ZONE_WIDTH + 24.0, cy)),
            Align2::LEFT_CENTER,
            name,
            font,
            look.c(palette.name_text),
        );
    }
}

fn draw_artifact(
    painter: &Painter,
    proj: &Projector,
    node: &LayoutNode,
    rect: Rect,
    colors: StatusColors,
    look: NodeLook,
    palette: &TopologyPalette,
) {
    painter.rect(
        rect,
        proj.len(ARTIFACT_RADIUS),
        look.c(palette.card_fill),
        border_stroke(proj, look, colors, palette.card_border, 1.5),
    );

    let (x, cy, w) = (node.pos.x, node.center().y, node.size.x);
    painter.circle_filled(proj.pos(Pos2::new(x + 10.0, cy)), proj.len(3.0), look.c(colors.accent));

    if let Some(font) = proj.font(10.0) {
        let name = fit_text(painter, proj, &node.node.display_name, &font, w - 24.0);
        painter.text(
            proj.pos(Pos2::new(x + 20.0, cy)),
            Align2::LEFT_CENTER,
            name,
            font,
            look.c(palette.artifact_text),
        );
    }
}

fn draw_unmanaged(
    painter: &Painter,
    proj: &Projector,
    node: &LayoutNode,
    rect: Rect,
    look: NodeLook,
    palette: &TopologyPalette,
) {
    let r = proj.len(UNIT_RADIUS);
    painter.rect_filled(rect, r, look.c(palette.unmanaged_fill));

    let (color, width) = if look.emphasized() {
        (palette.unmanaged_border_selected, 2.0)
    } else if look.hovered {
        (palette.unmanaged_border_hover, 1.0)
    } else {
        (palette.unmanaged_border, 1.0)
    };
    painter.extend(Shape::dashed_line(
        &rounded_rect_path(rect, r),
        Stroke::new(proj.len(width), look.c(color)),
        proj.len(6.0),
        proj.len(4.0),
    ));

    let (x, cy, w) = (node.pos.x, node.center().y, node.size.x);
    if let Some(font) = proj.font(11.0) {
        painter.text(
            proj.pos(Pos2::new(x + 14.0, cy)),
            Align2::CENTER_CENTER,
            "⚠",
            font,
            look.c(palette.unmanaged_glyph),
        );
    }
    if let Some(font) = proj.font(10.0) {
        let name = fit_text(painter, proj, &node.node.display_name, &font, w - 36.0);
        painter.text(
            proj.pos(Pos2::new(x + 28.0, cy)),
            Align2::LEFT_CENTER,
            name,
            font,
            look.c(palette.status(HealthState::Pending).text),
        );
    }
}

/// Truncate to a world-space width using the actual font metrics
fn fit_text(painter: &Painter, proj: &Projector, text: &str, font: &FontId, max_world_width: f32) -> String {
    let max = proj.len(max_world_width);
    truncate_to_width(text, max, |s| {
        painter
            .layout_no_wrap(s.to_string(), font.clone(), Color32::WHITE)
            .size()
            .x
    })
}

/// Shorten `text` with a trailing ellipsis until `measure` fits `max_width`
pub fn truncate_to_width(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> String {
    if measure(text) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    loop {
        let candidate: String = chars.iter().collect::<String>() + "…";
        if chars.is_empty() || measure(&candidate) <= max_width {
            return candidate;
        }
        chars.pop();
    }
}

/// Closed outline of a rounded rectangle, for dashed strokes
pub fn rounded_rect_path(rect: Rect, radius: f32) -> Vec<Pos2> {
    let r = radius.min(rect.width() / 2.0).min(rect.height() / 2.0).max(0.0);
    const SEGMENTS: usize = 6;

    let corners = [
        (Pos2::new(rect.max.x - r, rect.min.y + r), -90.0_f32),
        (Pos2::new(rect.max.x - r, rect.max.y - r), 0.0),
        (Pos2::new(rect.min.x + r, rect.max.y - r), 90.0),
        (Pos2::new(rect.min.x + r, rect.min.y + r), 180.0),
    ];

    let mut points = Vec::with_capacity(4 * (SEGMENTS + 1) + 1);
    for (center, start) in corners {
        for step in 0..=SEGMENTS {
            let angle = (start + 90.0 * step as f32 / SEGMENTS as f32).to_radians();
            points.push(center + Vec2::new(angle.cos(), angle.sin()) * r);
        }
    }
    if let Some(first) = points.first().copied() {
        points.push(first);
    }
    points
}

/// Interactive canvas widget over a [`TopologyView`]
pub struct TopologyCanvas<'a> {
    view: &'a mut TopologyView,
    palette: &'a TopologyPalette,
}

impl<'a> TopologyCanvas<'a> {
    pub fn new(view: &'a mut TopologyView, palette: &'a TopologyPalette) -> Self {
        Self { view, palette }
    }

    pub fn show(mut self, ui: &mut egui::Ui) -> egui::Response {
        let size = ui.available_size();
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let rect = response.rect;
        let controls = controls_rect(rect);

        self.handle_input(ui, &response, controls);

        if let Some(frame) = self.view.prepare_frame(rect.size()) {
            render(&painter, rect, &frame, self.palette);
        }

        self.draw_controls(ui, controls);

        let cursor = if self.view.is_panning() {
            Some(CursorIcon::Grabbing)
        } else if self.view.interaction().hovered().is_some() {
            Some(CursorIcon::PointingHand)
        } else if response.hovered() {
            Some(CursorIcon::Grab)
        } else {
            None
        };
        if let Some(icon) = cursor {
            ui.ctx().set_cursor_icon(icon);
        }

        response
    }

    fn handle_input(&mut self, ui: &mut egui::Ui, response: &egui::Response, controls: Rect) {
        let rect = response.rect;
        let (hover_pos, pressed, released, scroll) = ui.input(|i| {
            (
                i.pointer.hover_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.raw_scroll_delta.y,
            )
        });

        let over_canvas = hover_pos
            .map(|p| rect.contains(p) && !controls.contains(p))
            .unwrap_or(false);
        let local = hover_pos.map(|p| p - rect.min.to_vec2());

        match local {
            Some(pos) if over_canvas || self.view.is_panning() => {
                if pressed && over_canvas {
                    self.view.pointer_down(pos);
                }
                if released {
                    self.view.pointer_up(pos);
                } else {
                    self.view.pointer_move(pos);
                }
            }
            _ => {
                if released || self.view.interaction().hovered().is_some() {
                    self.view.pointer_leave();
                }
            }
        }

        if over_canvas && scroll != 0.0 {
            if let Some(pos) = local {
                self.view.wheel(pos, scroll);
            }
            ui.input_mut(|i| {
                i.smooth_scroll_delta = Vec2::ZERO;
                i.raw_scroll_delta = Vec2::ZERO;
            });
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui, controls: Rect) {
        let button = Vec2::splat(28.0);
        let plus = Rect::from_min_size(controls.min, button);
        let minus = Rect::from_min_size(controls.min + Vec2::new(34.0, 0.0), button);
        let label = Rect::from_min_max(controls.min + Vec2::new(68.0, 0.0), controls.max);

        if ui
            .put(plus, egui::Button::new("+"))
            .on_hover_text("Zoom in")
            .clicked()
        {
            self.view.zoom_in();
        }
        if ui
            .put(minus, egui::Button::new("−"))
            .on_hover_text("Zoom out")
            .clicked()
        {
            self.view.zoom_out();
        }

        ui.painter().rect(
            label,
            6.0,
            self.palette.control_fill,
            Stroke::new(1.0, self.palette.card_border),
        );
        ui.painter().text(
            label.center(),
            Align2::CENTER_CENTER,
            format!("{}%", self.view.viewport().percent()),
            FontId::monospace(11.0),
            self.palette.control_text,
        );
    }
}

/// Bottom-right overlay area for the zoom buttons and percentage
fn controls_rect(canvas: Rect) -> Rect {
    let size = Vec2::new(130.0, 28.0);
    Rect::from_min_size(canvas.max - size - Vec2::splat(16.0), size)
}
