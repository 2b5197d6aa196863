//! Application chrome themes for egui

use eframe::egui::{self, Color32, Rounding, Stroke};
use serde::{Deserialize, Serialize};

/// Which built-in theme to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Light,
    Dark,
}

impl ThemeChoice {
    pub fn theme(&self) -> Theme {
        match self {
            ThemeChoice::Light => Theme::light(),
            ThemeChoice::Dark => Theme::dark(),
        }
    }
}

/// Shadcn slate inspired theme
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub bg: Color32,
    pub panel_bg: Color32,
    pub canvas_bg: Color32,
    pub input_bg: Color32,

    pub fg: Color32,
    pub fg_dim: Color32,
    pub fg_bright: Color32,

    pub accent: Color32,
    pub accent_dim: Color32,

    pub success: Color32,
    pub warning: Color32,
    pub error: Color32,
    pub error_bg: Color32,

    pub border: Color32,
    pub selection: Color32,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            bg: Color32::from_rgb(2, 6, 23),           // #020617
            panel_bg: Color32::from_rgb(15, 23, 42),   // #0f172a
            canvas_bg: Color32::from_rgb(9, 14, 31),   // #090e1f
            input_bg: Color32::from_rgb(30, 41, 59),   // #1e293b

            fg: Color32::from_rgb(226, 232, 240),      // #e2e8f0
            fg_dim: Color32::from_rgb(148, 163, 184),  // #94a3b8
            fg_bright: Color32::from_rgb(248, 250, 252), // #f8fafc

            accent: Color32::from_rgb(45, 212, 191),   // #2dd4bf
            accent_dim: Color32::from_rgb(19, 78, 74), // #134e4a

            success: Color32::from_rgb(45, 212, 191),  // #2dd4bf
            warning: Color32::from_rgb(251, 191, 36),  // #fbbf24
            error: Color32::from_rgb(248, 113, 113),   // #f87171
            error_bg: Color32::from_rgb(69, 10, 10),   // #450a0a

            border: Color32::from_rgb(51, 65, 85),     // #334155
            selection: Color32::from_rgb(19, 78, 74),  // #134e4a
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color32::from_rgb(255, 255, 255),      // #ffffff
            panel_bg: Color32::from_rgb(248, 250, 252), // #f8fafc
            canvas_bg: Color32::from_rgb(250, 250, 250), // #fafafa
            input_bg: Color32::from_rgb(255, 255, 255), // #ffffff

            fg: Color32::from_rgb(15, 23, 42),         // #0f172a
            fg_dim: Color32::from_rgb(100, 116, 139),  // #64748b
            fg_bright: Color32::from_rgb(2, 6, 23),    // #020617

            accent: Color32::from_rgb(13, 148, 136),   // #0d9488
            accent_dim: Color32::from_rgb(204, 251, 241), // #ccfbf1

            success: Color32::from_rgb(13, 148, 136),  // #0d9488
            warning: Color32::from_rgb(217, 119, 6),   // #d97706
            error: Color32::from_rgb(220, 38, 38),     // #dc2626
            error_bg: Color32::from_rgb(254, 242, 242), // #fef2f2

            border: Color32::from_rgb(226, 232, 240),  // #e2e8f0
            selection: Color32::from_rgb(204, 251, 241), // #ccfbf1
        }
    }

    pub fn is_light(&self) -> bool {
        let luma = 0.299 * self.bg.r() as f32 + 0.587 * self.bg.g() as f32 + 0.114 * self.bg.b() as f32;
        luma > 128.0
    }

    /// Install these colors into the egui context
    pub fn apply(&self, ctx: &egui::Context) {
        let mut visuals = if self.is_light() {
            egui::Visuals::light()
        } else {
            egui::Visuals::dark()
        };

        visuals.panel_fill = self.panel_bg;
        visuals.window_fill = self.bg;
        visuals.extreme_bg_color = self.input_bg;
        visuals.faint_bg_color = self.panel_bg;
        visuals.override_text_color = Some(self.fg);
        visuals.hyperlink_color = self.accent;
        visuals.selection.bg_fill = self.selection;
        visuals.selection.stroke = Stroke::new(1.0, self.accent);
        visuals.error_fg_color = self.error;
        visuals.warn_fg_color = self.warning;

        visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, self.border);
        visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, self.border);
        visuals.widgets.inactive.rounding = Rounding::same(6.0);
        visuals.widgets.hovered.rounding = Rounding::same(6.0);
        visuals.widgets.active.rounding = Rounding::same(6.0);
        visuals.window_rounding = Rounding::same(8.0);

        ctx.set_visuals(visuals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_detection() {
        assert!(Theme::light().is_light());
        assert!(!Theme::dark().is_light());
        assert_eq!(ThemeChoice::Dark.theme(), Theme::dark());
    }

    #[test]
    fn test_choice_serde() {
        let choice: ThemeChoice = serde_json::from_str("\"dark\"").unwrap();
        assert_eq!(choice, ThemeChoice::Dark);
        assert_eq!(serde_json::to_string(&ThemeChoice::Light).unwrap(), "\"light\"");
    }
}
