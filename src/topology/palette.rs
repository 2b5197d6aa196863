//! Canvas colors for the topology view
//!
//! Health colors, highlight glows and rings, derived from the app [`Theme`].

use super::graph::HealthState;
use super::highlight::HighlightMode;
use crate::theme::Theme;
use eframe::egui::Color32;

/// Opacity multiplier for nodes outside the highlighted set
pub const DIM_ALPHA: f32 = 0.25;

/// Four-tone color set for one health state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusColors {
    /// Dots and selection border
    pub accent: Color32,
    /// Badge and chevron strip fill
    pub bg: Color32,
    pub text: Color32,
    pub border: Color32,
}

/// Glow drawn behind a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub color: Color32,
    pub blur: f32,
    pub offset_y: f32,
}

/// Dashed ring drawn around highlighted nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub color: Color32,
    pub width: f32,
    pub dash: f32,
    pub gap: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopologyPalette {
    pub canvas_bg: Color32,
    pub card_fill: Color32,
    pub card_border: Color32,
    pub name_text: Color32,
    pub artifact_text: Color32,

    pub ready: StatusColors,
    pub pending: StatusColors,
    pub failed: StatusColors,
    pub skipped: StatusColors,

    pub edge: Color32,
    pub edge_marker: Color32,

    pub unmanaged_fill: Color32,
    pub unmanaged_border: Color32,
    pub unmanaged_border_hover: Color32,
    pub unmanaged_border_selected: Color32,
    pub unmanaged_glyph: Color32,

    pub section_fill: Color32,
    pub section_border: Color32,
    pub section_text: Color32,

    pub shadow: Color32,
    pub search_glow: Color32,
    pub problem_glow: Color32,
    pub search_ring: Color32,
    pub problem_ring: Color32,

    pub control_fill: Color32,
    pub control_text: Color32,
}

impl TopologyPalette {
    pub fn from_theme(theme: &Theme) -> Self {
        if theme.is_light() {
            Self::light(theme)
        } else {
            Self::dark(theme)
        }
    }

    fn light(theme: &Theme) -> Self {
        Self {
            canvas_bg: theme.canvas_bg,
            card_fill: Color32::WHITE,
            card_border: Color32::from_rgb(226, 232, 240), // #e2e8f0
            name_text: Color32::from_rgb(15, 23, 42),      // #0f172a
            artifact_text: Color32::from_rgb(71, 85, 105), // #475569

            ready: StatusColors {
                accent: Color32::from_rgb(13, 148, 136),  // #0d9488
                bg: Color32::from_rgb(240, 253, 250),     // #f0fdfa
                text: Color32::from_rgb(15, 118, 110),    // #0f766e
                border: Color32::from_rgb(153, 246, 228), // #99f6e4
            },
            pending: StatusColors {
                accent: Color32::from_rgb(217, 119, 6),   // #d97706
                bg: Color32::from_rgb(255, 251, 235),     // #fffbeb
                text: Color32::from_rgb(180, 83, 9),      // #b45309
                border: Color32::from_rgb(253, 230, 138), // #fde68a
            },
            failed: StatusColors {
                accent: Color32::from_rgb(220, 38, 38),   // #dc2626
                bg: Color32::from_rgb(254, 242, 242),     // #fef2f2
                text: Color32::from_rgb(185, 28, 28),     // #b91c1c
                border: Color32::from_rgb(254, 202, 202), // #fecaca
            },
            skipped: StatusColors {
                accent: Color32::from_rgb(100, 116, 139), // #64748b
                bg: Color32::from_rgb(248, 250, 252),     // #f8fafc
                text: Color32::from_rgb(71, 85, 105),     // #475569
                border: Color32::from_rgb(226, 232, 240), // #e2e8f0
            },

            edge: Color32::from_rgb(209, 213, 219),        // #d1d5db
            edge_marker: Color32::from_rgb(156, 163, 175), // #9ca3af

            unmanaged_fill: Color32::from_rgb(255, 251, 235),   // #fffbeb
            unmanaged_border: Color32::from_rgb(253, 230, 138), // #fde68a
            unmanaged_border_hover: Color32::from_rgb(252, 211, 77), // #fcd34d
            unmanaged_border_selected: Color32::from_rgb(217, 119, 6), // #d97706
            unmanaged_glyph: Color32::from_rgb(217, 119, 6),

            section_fill: Color32::from_rgb(254, 243, 199),   // #fef3c7
            section_border: Color32::from_rgb(252, 211, 77),  // #fcd34d
            section_text: Color32::from_rgb(146, 64, 14),     // #92400e

            shadow: Color32::from_black_alpha(20),
            search_glow: Color32::from_rgba_unmultiplied(13, 148, 136, 128),
            problem_glow: Color32::from_rgba_unmultiplied(220, 38, 38, 153),
            search_ring: Color32::from_rgb(13, 148, 136),
            problem_ring: Color32::from_rgb(220, 38, 38),

            control_fill: theme.bg,
            control_text: theme.fg,
        }
    }

    fn dark(theme: &Theme) -> Self {
        Self {
            canvas_bg: theme.canvas_bg,
            card_fill: Color32::from_rgb(15, 23, 42),      // #0f172a
            card_border: Color32::from_rgb(51, 65, 85),    // #334155
            name_text: Color32::from_rgb(241, 245, 249),   // #f1f5f9
            artifact_text: Color32::from_rgb(203, 213, 225), // #cbd5e1

            ready: StatusColors {
                accent: Color32::from_rgb(45, 212, 191),  // #2dd4bf
                bg: Color32::from_rgb(19, 78, 74),        // #134e4a
                text: Color32::from_rgb(153, 246, 228),   // #99f6e4
                border: Color32::from_rgb(17, 94, 89),    // #115e59
            },
            pending: StatusColors {
                accent: Color32::from_rgb(251, 191, 36),  // #fbbf24
                bg: Color32::from_rgb(69, 26, 3),         // #451a03
                text: Color32::from_rgb(253, 230, 138),   // #fde68a
                border: Color32::from_rgb(146, 64, 14),   // #92400e
            },
            failed: StatusColors {
                accent: Color32::from_rgb(248, 113, 113), // #f87171
                bg: Color32::from_rgb(69, 10, 10),        // #450a0a
                text: Color32::from_rgb(254, 202, 202),   // #fecaca
                border: Color32::from_rgb(153, 27, 27),   // #991b1b
            },
            skipped: StatusColors {
                accent: Color32::from_rgb(148, 163, 184), // #94a3b8
                bg: Color32::from_rgb(30, 41, 59),        // #1e293b
                text: Color32::from_rgb(203, 213, 225),   // #cbd5e1
                border: Color32::from_rgb(51, 65, 85),    // #334155
            },

            edge: Color32::from_rgb(71, 85, 105),          // #475569
            edge_marker: Color32::from_rgb(100, 116, 139), // #64748b

            unmanaged_fill: Color32::from_rgb(41, 26, 5),
            unmanaged_border: Color32::from_rgb(146, 64, 14),
            unmanaged_border_hover: Color32::from_rgb(217, 119, 6),
            unmanaged_border_selected: Color32::from_rgb(251, 191, 36),
            unmanaged_glyph: Color32::from_rgb(251, 191, 36),

            section_fill: Color32::from_rgb(69, 26, 3),
            section_border: Color32::from_rgb(146, 64, 14),
            section_text: Color32::from_rgb(253, 230, 138),

            shadow: Color32::from_black_alpha(90),
            search_glow: Color32::from_rgba_unmultiplied(45, 212, 191, 110),
            problem_glow: Color32::from_rgba_unmultiplied(248, 113, 113, 140),
            search_ring: Color32::from_rgb(45, 212, 191),
            problem_ring: Color32::from_rgb(248, 113, 113),

            control_fill: theme.panel_bg,
            control_text: theme.fg,
        }
    }

    pub fn status(&self, health: HealthState) -> StatusColors {
        match health {
            HealthState::Ready => self.ready,
            HealthState::Pending => self.pending,
            HealthState::Failed => self.failed,
            HealthState::Skipped => self.skipped,
        }
    }

    /// Glow for a node; highlight glows win over selection/hover shadows
    pub fn glow(&self, mode: HighlightMode, highlighted: bool, selected: bool, hovered: bool) -> Glow {
        if highlighted {
            match mode {
                HighlightMode::Problem => {
                    return Glow {
                        color: self.problem_glow,
                        blur: 20.0,
                        offset_y: 0.0,
                    }
                }
                HighlightMode::Search => {
                    return Glow {
                        color: self.search_glow,
                        blur: 16.0,
                        offset_y: 0.0,
                    }
                }
                HighlightMode::None => {}
            }
        }
        Glow {
            color: self.shadow,
            blur: if selected {
                12.0
            } else if hovered {
                8.0
            } else {
                4.0
            },
            offset_y: if selected { 4.0 } else { 2.0 },
        }
    }

    pub fn ring(&self, mode: HighlightMode) -> Option<Ring> {
        match mode {
            HighlightMode::Problem => Some(Ring {
                color: self.problem_ring,
                width: 3.5,
                dash: 8.0,
                gap: 4.0,
            }),
            HighlightMode::Search => Some(Ring {
                color: self.search_ring,
                width: 3.0,
                dash: 6.0,
                gap: 4.0,
            }),
            HighlightMode::None => None,
        }
    }
}

/// Scale a color's opacity, used for dimmed nodes
pub fn fade(color: Color32, alpha: f32) -> Color32 {
    if alpha >= 1.0 {
        color
    } else {
        color.gamma_multiply(alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_and_search_are_distinct() {
        let palette = TopologyPalette::from_theme(&Theme::light());
        let problem = palette.ring(HighlightMode::Problem).unwrap();
        let search = palette.ring(HighlightMode::Search).unwrap();
        assert_ne!(problem.color, search.color);
        assert_ne!(problem.dash, search.dash);
        assert!(palette.ring(HighlightMode::None).is_none());

        let glow = palette.glow(HighlightMode::Problem, true, false, false);
        assert_eq!(glow.blur, 20.0);
        assert_ne!(glow.color, palette.glow(HighlightMode::Search, true, false, false).color);
    }

    #[test]
    fn test_shadow_grows_with_attention() {
        let palette = TopologyPalette::from_theme(&Theme::dark());
        let idle = palette.glow(HighlightMode::None, false, false, false);
        let hovered = palette.glow(HighlightMode::None, false, false, true);
        let selected = palette.glow(HighlightMode::Search, false, true, true);
        assert!(idle.blur < hovered.blur && hovered.blur < selected.blur);
        assert_eq!(selected.offset_y, 4.0);
    }

    #[test]
    fn test_status_lookup_and_fade() {
        let palette = TopologyPalette::from_theme(&Theme::light());
        assert_eq!(palette.status(HealthState::Failed).accent, Color32::from_rgb(220, 38, 38));
        assert_eq!(fade(Color32::WHITE, 1.0), Color32::WHITE);
        assert!(fade(Color32::WHITE, DIM_ALPHA).a() < 255);
    }
}
