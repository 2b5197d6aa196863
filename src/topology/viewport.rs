//! Pan/zoom transform for the topology canvas.
//!
//! Screen coordinates here are relative to the canvas' top-left corner;
//! the widget subtracts its rect origin before calling in.

use eframe::egui::{Pos2, Rect, Vec2};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 3.0;

/// Padding kept around content by [`Viewport::fit_to_content`]
pub const FIT_PADDING: f32 = 60.0;

/// Zoom step for the +/- buttons
pub const BUTTON_ZOOM_IN: f32 = 1.2;
pub const BUTTON_ZOOM_OUT: f32 = 0.8;

/// Zoom step per wheel notch
pub const WHEEL_ZOOM_IN: f32 = 1.1;
pub const WHEEL_ZOOM_OUT: f32 = 0.9;

/// Affine world -> screen transform: `screen = world * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub offset: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

impl Viewport {
    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        Pos2::new(
            world.x * self.scale + self.offset.x,
            world.y * self.scale + self.offset.y,
        )
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        Pos2::new(
            (screen.x - self.offset.x) / self.scale,
            (screen.y - self.offset.y) / self.scale,
        )
    }

    pub fn world_rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.world_to_screen(rect.min), self.world_to_screen(rect.max))
    }

    /// Scale by `factor` keeping the world point under `anchor` fixed
    pub fn zoom_at(&mut self, anchor: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let world = self.screen_to_world(anchor);
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        self.offset = Vec2::new(
            anchor.x - world.x * self.scale,
            anchor.y - world.y * self.scale,
        );
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    pub fn zoom_in(&mut self, viewport_size: Vec2) {
        self.zoom_at((viewport_size / 2.0).to_pos2(), BUTTON_ZOOM_IN);
    }

    pub fn zoom_out(&mut self, viewport_size: Vec2) {
        self.zoom_at((viewport_size / 2.0).to_pos2(), BUTTON_ZOOM_OUT);
    }

    /// Fit `bounds` plus padding into the viewport, never zooming past 1.0
    pub fn fit_to_content(&mut self, bounds: Rect, viewport_size: Vec2) {
        if !is_usable(viewport_size) || !bounds.is_finite() || bounds.is_negative() {
            return;
        }
        let content = bounds.size() + Vec2::splat(FIT_PADDING * 2.0);
        let fit = (viewport_size.x / content.x)
            .min(viewport_size.y / content.y)
            .min(1.0);
        self.scale = fit.clamp(MIN_SCALE, MAX_SCALE);
        self.center_on(bounds.center(), viewport_size);
    }

    /// Center on a world point at no less than 100% zoom
    pub fn focus_on(&mut self, target: Pos2, viewport_size: Vec2) {
        if !is_usable(viewport_size) {
            return;
        }
        self.scale = self.scale.max(1.0).min(MAX_SCALE);
        self.center_on(target, viewport_size);
    }

    fn center_on(&mut self, target: Pos2, viewport_size: Vec2) {
        self.offset = viewport_size / 2.0 - target.to_vec2() * self.scale;
    }

    /// Zoom level as a whole percentage for display
    pub fn percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }
}

fn is_usable(size: Vec2) -> bool {
    size.x > 0.0 && size.y > 0.0 && size.is_finite()
}
