//! Topology Studio - native explorer for orchestration topologies
//!
//! Polls the topology service (or a snapshot file) and shows the
//! connector → template → unit → artifact hierarchy on an interactive canvas.

use eframe::egui::{self, Color32, CursorIcon, Key, RichText, Stroke, Vec2};
use std::time::{Duration, Instant};
use topology_studio::config::StudioConfig;
use topology_studio::provider::{source_from_config, FeedUpdate, PollInterval, TopologyFeed};
use topology_studio::theme::Theme;
use topology_studio::topology::{
    DetailRequest, HealthState, TopologyCanvas, TopologyEvent, TopologyPalette,
    TopologyView,
};

/// How often the UI wakes up to poll the feed while idle
const FEED_TICK: Duration = Duration::from_millis(250);

fn main() -> eframe::Result<()> {
    env_logger::init();

    let saved = StudioConfig::load_saved();
    let config = saved.with_env_overrides(|key| std::env::var(key).ok());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0])
            .with_title("Topology Studio"),
        ..Default::default()
    };

    eframe::run_native(
        "Topology Studio",
        options,
        Box::new(|cc| {
            let app = TopologyStudio::new(saved, config);
            app.theme.apply(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
}

struct TopologyStudio {
    /// Settings as stored on disk, written back by `save_config`
    saved: StudioConfig,
    /// `saved` plus environment overrides for this run
    config: StudioConfig,
    theme: Theme,
    palette: TopologyPalette,

    view: TopologyView,
    feed: Option<TopologyFeed>,
    has_data: bool,
    error_banner: Option<String>,

    search_input: String,
    focus_search: bool,
    namespace_input: String,

    detail: Option<DetailRequest>,
}

impl TopologyStudio {
    fn new(saved: StudioConfig, config: StudioConfig) -> Self {
        let theme = config.theme.theme();
        let mut app = Self {
            namespace_input: config.namespace.clone().unwrap_or_default(),
            palette: TopologyPalette::from_theme(&theme),
            theme,
            saved,
            config,
            view: TopologyView::new(),
            feed: None,
            has_data: false,
            error_banner: None,
            search_input: String::new(),
            focus_search: false,
            detail: None,
        };
        app.connect();
        app
    }

    /// (Re)create the feed from the current config
    fn connect(&mut self) {
        match source_from_config(&self.config) {
            Ok(source) => {
                let mut feed = TopologyFeed::new(
                    source,
                    self.config.namespace.clone(),
                    self.config.poll_interval,
                );
                feed.refresh_now();
                self.feed = Some(feed);
            }
            Err(e) => {
                log::warn!("Could not create topology source: {}", e);
                self.error_banner = Some(e.user_message());
            }
        }
    }

    fn retry(&mut self) {
        self.error_banner = None;
        match self.feed.as_mut() {
            Some(feed) => feed.refresh_now(),
            None => self.connect(),
        }
    }

    fn save_config(&self) {
        if let Err(e) = self.saved.save() {
            log::warn!("Failed to save config: {}", e);
        }
    }

    fn poll_feed(&mut self) {
        let Some(feed) = self.feed.as_mut() else {
            return;
        };
        match feed.tick(Instant::now()) {
            Some(FeedUpdate::Loaded(snapshot)) => {
                self.view.apply_snapshot(snapshot);
                self.has_data = true;
                self.error_banner = None;
            }
            Some(FeedUpdate::Failed(e)) => {
                self.error_banner = Some(e.user_message());
            }
            None => {}
        }
    }

    fn handle_events(&mut self) {
        for event in self.view.drain_events() {
            match event {
                TopologyEvent::NodeSelected(request) => self.detail = Some(request),
                TopologyEvent::SelectionCleared => self.detail = None,
                TopologyEvent::NodeClicked { .. }
                | TopologyEvent::ExpansionToggled { .. }
                | TopologyEvent::HoverChanged { .. } => {}
            }
        }
        // Keep the drawer pointed at the latest data for the selected node
        if let Some(detail) = &self.detail {
            if !std::sync::Arc::ptr_eq(&detail.snapshot, self.view.snapshot()) {
                let id = detail.node.id.clone();
                self.view.select(&id);
                for event in self.view.drain_events() {
                    if let TopologyEvent::NodeSelected(request) = event {
                        self.detail = Some(request);
                    }
                }
            }
        }
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui) {
        let theme = self.theme;
        ui.horizontal(|ui| {
            ui.label(RichText::new("TOPOLOGY").size(11.0).color(theme.fg_dim).strong());
            ui.separator();

            // Problems toggle
            let problem_count = self.view.interaction().problem_count();
            let problem_mode = self.view.interaction().problem_mode();
            let label = if problem_count > 0 {
                RichText::new(format!("⚠ Problems {}", problem_count)).color(theme.error)
            } else {
                RichText::new("⚠ Problems").color(theme.fg_dim)
            };
            if ui
                .selectable_label(problem_mode, label)
                .on_hover_text("Highlight failed objects")
                .clicked()
            {
                self.view.toggle_problem_mode();
                if self.view.interaction().problem_mode() {
                    self.search_input.clear();
                }
            }
            if problem_mode && problem_count == 0 {
                ui.label(RichText::new("No problems detected").color(theme.success).size(12.0));
            }

            ui.separator();
            self.show_search(ui);

            ui.separator();
            if ui.button("Expand all").clicked() {
                self.view.expand_all();
            }
            if ui.button("Collapse all").clicked() {
                self.view.collapse_all();
            }
            if ui.button("⤢ Fit").on_hover_text("Fit all visible objects").clicked() {
                self.view.fit_to_content();
            }
            fullscreen_button(ui);

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                self.show_feed_controls(ui);
            });
        });
    }

    fn show_search(&mut self, ui: &mut egui::Ui) {
        let theme = self.theme;
        let response = ui.add(
            egui::TextEdit::singleline(&mut self.search_input)
                .hint_text("🔎 Search name or kind")
                .desired_width(220.0),
        );
        if self.focus_search {
            response.request_focus();
            self.focus_search = false;
        }
        if response.changed() {
            self.view.set_search_query(&self.search_input);
        }

        let (enter, shift, escape) =
            ui.input(|i| (i.key_pressed(Key::Enter), i.modifiers.shift, i.key_pressed(Key::Escape)));
        let editing = response.has_focus() || response.lost_focus();
        if editing && escape {
            self.search_input.clear();
            self.view.clear_search();
        } else if response.lost_focus() && enter {
            if shift {
                self.view.previous_match();
            } else {
                self.view.next_match();
            }
            response.request_focus();
        }

        let interaction = self.view.interaction();
        let navigating = !interaction.search_query().is_empty() || interaction.problem_mode();
        if navigating {
            let total = interaction.target_count();
            let badge = match interaction.focused_match_position() {
                Some(position) if total > 0 => format!("{}/{}", position, total),
                _ => "0 found".to_string(),
            };
            let color = if total == 0 { theme.warning } else { theme.fg_dim };
            ui.label(RichText::new(badge).size(12.0).color(color));

            ui.add_enabled_ui(total > 0, |ui| {
                if ui.small_button("▲").on_hover_text("Previous (Shift+Enter)").clicked() {
                    self.view.previous_match();
                }
                if ui.small_button("▼").on_hover_text("Next (Enter)").clicked() {
                    self.view.next_match();
                }
            });
            if !self.search_input.is_empty() && ui.small_button("✕").clicked() {
                self.search_input.clear();
                self.view.clear_search();
            }
        }

        for (kind, count) in self.view.snapshot().kind_counts() {
            if count > 0 {
                ui.label(
                    RichText::new(format!("{} {}", count, kind.label()))
                        .size(11.0)
                        .color(theme.fg_dim),
                );
            }
        }
    }

    fn show_feed_controls(&mut self, ui: &mut egui::Ui) {
        let theme = self.theme;
        let loading = self.feed.as_ref().map(|f| f.is_loading()).unwrap_or(false);

        let refresh = ui.add_enabled(!loading, egui::Button::new("⟳ Refresh"));
        if refresh.hovered() {
            ui.ctx().set_cursor_icon(CursorIcon::PointingHand);
        }
        if refresh.clicked() {
            self.retry();
        }

        let mut interval = self.config.poll_interval;
        egui::ComboBox::from_id_salt("poll_interval")
            .selected_text(format!("Poll: {}", interval.label()))
            .width(90.0)
            .show_ui(ui, |ui| {
                for option in PollInterval::ALL {
                    ui.selectable_value(&mut interval, option, option.label());
                }
            });
        if interval != self.config.poll_interval {
            self.config.poll_interval = interval;
            self.saved.poll_interval = interval;
            if let Some(feed) = self.feed.as_mut() {
                feed.set_interval(interval);
            }
            self.save_config();
        }

        let ns = ui.add(
            egui::TextEdit::singleline(&mut self.namespace_input)
                .hint_text("all namespaces")
                .desired_width(130.0),
        );
        if ns.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            let namespace = Some(self.namespace_input.trim().to_string()).filter(|s| !s.is_empty());
            if namespace != self.config.namespace {
                self.config.namespace = namespace.clone();
                self.saved.namespace = namespace.clone();
                self.has_data = false;
                if let Some(feed) = self.feed.as_mut() {
                    feed.set_namespace(namespace);
                }
                self.save_config();
            }
        }

        if loading {
            ui.add(egui::Spinner::new().size(14.0));
        }
        ui.label(RichText::new("Namespace").size(11.0).color(theme.fg_dim));
    }

    fn show_error_banner(&mut self, ui: &mut egui::Ui, message: String) {
        let theme = self.theme;
        ui.horizontal(|ui| {
            ui.label(RichText::new("✕").color(theme.error));
            ui.label(RichText::new(message).color(theme.error));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("Dismiss").clicked() {
                    self.error_banner = None;
                }
                if ui.small_button("Retry").clicked() {
                    self.retry();
                }
            });
        });
    }

    fn show_status_bar(&self, ui: &mut egui::Ui) {
        let theme = self.theme;
        ui.horizontal(|ui| {
            if let Some(feed) = &self.feed {
                ui.label(RichText::new(feed.source_description()).size(11.0).color(theme.fg_dim));
                ui.separator();
                let updated = match feed.last_success() {
                    Some(at) => format!("Updated {}", at.format("%H:%M:%S")),
                    None => "Not loaded yet".to_string(),
                };
                ui.label(RichText::new(updated).size(11.0).color(theme.fg_dim));
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    RichText::new(format!("{}%", self.view.viewport().percent()))
                        .size(11.0)
                        .color(theme.fg_dim),
                );
            });
        });
    }

    fn show_detail_panel(&mut self, ui: &mut egui::Ui) {
        let theme = self.theme;
        let Some(detail) = self.detail.clone() else {
            return;
        };
        let node = &detail.node;
        let mut select_child = None;
        let mut close = false;

        ui.horizontal(|ui| {
            ui.label(RichText::new(&node.display_name).size(16.0).strong().color(theme.fg_bright));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("✕").on_hover_text("Close").clicked() {
                    close = true;
                }
            });
        });
        ui.add_space(4.0);

        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("detail_fields")
                .num_columns(2)
                .spacing([12.0, 4.0])
                .show(ui, |ui| {
                    field(ui, theme, "Kind", node.kind.label());
                    field(ui, theme, "ID", &node.id);
                    if !node.namespace_label.is_empty() {
                        field(ui, theme, "Namespace", &node.namespace_label);
                    }
                    ui.label(RichText::new("Status").color(theme.fg_dim));
                    ui.label(RichText::new(node.health.label()).color(health_color(theme, node.health)));
                    ui.end_row();
                    if let Some(m) = node.metrics {
                        field(ui, theme, "Desired", &m.desired.to_string());
                        field(ui, theme, "Ready", &m.ready.to_string());
                        field(ui, theme, "Failed", &m.failed.to_string());
                    }
                });

            if let Some(metadata) = &node.metadata {
                let entries = metadata.entries();
                if !entries.is_empty() {
                    ui.add_space(8.0);
                    ui.label(RichText::new("METADATA").size(11.0).color(theme.fg_dim).strong());
                    egui::Grid::new("detail_metadata")
                        .num_columns(2)
                        .spacing([12.0, 4.0])
                        .show(ui, |ui| {
                            for (key, value) in &entries {
                                field(ui, theme, key, value);
                            }
                        });
                }
            }

            let children = detail.children();
            if !children.is_empty() {
                ui.add_space(8.0);
                ui.label(
                    RichText::new(format!("CHILDREN ({})", children.len()))
                        .size(11.0)
                        .color(theme.fg_dim)
                        .strong(),
                );
                for child in children {
                    ui.horizontal(|ui| {
                        let (dot, _) = ui.allocate_exact_size(Vec2::splat(8.0), egui::Sense::hover());
                        ui.painter()
                            .circle_filled(dot.center(), 4.0, health_color(theme, child.health));
                        let link = ui.link(format!("{} ({})", child.display_name, child.kind.label()));
                        if link.clicked() {
                            select_child = Some(child.id.clone());
                        }
                    });
                }
            }
        });

        if close {
            self.view.clear_selection();
        } else if let Some(id) = select_child {
            self.view.select(&id);
        }
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let theme = self.theme;
        let loading = self.feed.as_ref().map(|f| f.is_loading()).unwrap_or(false);

        if !self.has_data {
            ui.centered_and_justified(|ui| {
                if loading {
                    ui.horizontal_centered(|ui| {
                        ui.add(egui::Spinner::new().size(18.0));
                        ui.label(RichText::new("Loading topology…").color(theme.fg_dim));
                    });
                } else if self.error_banner.is_some() {
                    ui.label(RichText::new("Topology could not be loaded").color(theme.fg_dim));
                } else {
                    ui.label(RichText::new("Waiting for data").color(theme.fg_dim));
                }
            });
            return;
        }

        if self.view.snapshot().is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(
                    RichText::new("No topology objects found in this scope").color(theme.fg_dim),
                );
            });
            return;
        }

        TopologyCanvas::new(&mut self.view, &self.palette).show(ui);
    }
}

/// Toggles the native window between full screen and windowed
fn fullscreen_button(ui: &mut egui::Ui) -> egui::Response {
    let fullscreen = ui.input(|i| i.viewport().fullscreen.unwrap_or(false));
    let hint = if fullscreen { "Exit full screen" } else { "Full screen" };
    let response = ui.selectable_label(fullscreen, "⛶").on_hover_text(hint);
    if response.clicked() {
        ui.ctx()
            .send_viewport_cmd(egui::ViewportCommand::Fullscreen(!fullscreen));
    }
    response
}

fn field(ui: &mut egui::Ui, theme: Theme, key: &str, value: &str) {
    ui.label(RichText::new(key).color(theme.fg_dim));
    ui.label(RichText::new(value).color(theme.fg));
    ui.end_row();
}

fn health_color(theme: Theme, health: HealthState) -> Color32 {
    match health {
        HealthState::Ready => theme.success,
        HealthState::Pending => theme.warning,
        HealthState::Failed => theme.error,
        HealthState::Skipped => theme.fg_dim,
    }
}

impl eframe::App for TopologyStudio {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(feed) = self.feed.as_mut() {
            feed.shutdown();
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_feed();
        ctx.request_repaint_after(FEED_TICK);

        if ctx.input(|i| i.modifiers.command && i.key_pressed(Key::F)) {
            self.focus_search = true;
        }

        let theme = self.theme;

        egui::TopBottomPanel::top("toolbar")
            .frame(
                egui::Frame::none()
                    .fill(theme.bg)
                    .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                    .stroke(Stroke::new(1.0, theme.border)),
            )
            .show(ctx, |ui| {
                self.show_toolbar(ui);
            });

        if let Some(message) = self.error_banner.clone() {
            egui::TopBottomPanel::top("error_banner")
                .frame(
                    egui::Frame::none()
                        .fill(theme.error_bg)
                        .inner_margin(egui::Margin::symmetric(12.0, 6.0)),
                )
                .show(ctx, |ui| {
                    self.show_error_banner(ui, message);
                });
        }

        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(24.0)
            .frame(
                egui::Frame::none()
                    .fill(theme.panel_bg)
                    .inner_margin(egui::Margin::symmetric(12.0, 4.0)),
            )
            .show(ctx, |ui| {
                self.show_status_bar(ui);
            });

        if self.detail.is_some() {
            egui::SidePanel::right("detail_panel")
                .default_width(320.0)
                .width_range(240.0..=520.0)
                .resizable(true)
                .frame(
                    egui::Frame::none()
                        .fill(theme.panel_bg)
                        .inner_margin(egui::Margin::same(12.0)),
                )
                .show(ctx, |ui| {
                    self.show_detail_panel(ui);
                });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(theme.canvas_bg))
            .show(ctx, |ui| {
                self.show_canvas(ui);
            });

        self.handle_events();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ctx: &egui::Context, events: Vec<egui::Event>) -> (egui::FullOutput, egui::Rect) {
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(egui::Pos2::ZERO, Vec2::new(400.0, 300.0))),
            events,
            ..Default::default()
        };
        let mut rect = egui::Rect::NOTHING;
        let output = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                rect = fullscreen_button(ui).rect;
            });
        });
        (output, rect)
    }

    fn click(pos: egui::Pos2, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        }
    }

    #[test]
    fn test_fullscreen_button_sends_viewport_command() {
        let ctx = egui::Context::default();
        let (_, rect) = frame(&ctx, Vec::new());
        let pos = rect.center();

        frame(&ctx, vec![egui::Event::PointerMoved(pos), click(pos, true)]);
        let (output, _) = frame(&ctx, vec![click(pos, false)]);

        let commands = output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .map(|v| v.commands.clone())
            .unwrap_or_default();
        assert!(commands.contains(&egui::ViewportCommand::Fullscreen(true)));
    }
}
