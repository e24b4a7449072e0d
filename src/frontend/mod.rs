//! Frontend module for egui UI
//!
//! This module provides the desktop shell using eframe/egui. It sends
//! commands to the backend through the [`FrontendHandle`] and renders what
//! the backend publishes.
//!
//! # Layout
//!
//! - Menu bar (view options)
//! - Notification banner
//! - Toolbar: device picker, cache capacity, connect, start/stop, save, delete, window size
//! - Four channel charts
//! - Status bar
//!
//! # Polling
//!
//! The app requests a fresh display window every `ui.poll_interval_ms`;
//! responses arrive as [`BackendMessage::Window`](crate::backend::BackendMessage).

mod plot;
pub mod state;
mod status_bar;
pub mod toolbar;
pub mod topics;

pub use plot::{window_points, ChannelPlots};
pub use state::AppAction;
pub use toolbar::ToolbarState;
pub use topics::Topics;

use crate::backend::FrontendHandle;
use crate::config::{clamp_cache_capacity, clamp_window_size, AppConfig, AppState};
use crate::export::default_file_name;
use egui::{Color32, RichText};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Main application state implementing [`eframe::App`]
pub struct MoniApp {
    frontend: FrontendHandle,
    config: AppConfig,
    app_state: AppState,
    topics: Topics,
    toolbar: ToolbarState,
    plots: ChannelPlots,
    poll_interval: Duration,
    last_poll: Instant,
    visuals_dirty: bool,
}

impl MoniApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        frontend: FrontendHandle,
        config: AppConfig,
        app_state: AppState,
    ) -> Self {
        let toolbar = ToolbarState {
            device_name: app_state.last_device_name.clone().unwrap_or_default(),
            cache_capacity: clamp_cache_capacity(app_state.cache_capacity),
            window_size: clamp_window_size(app_state.window_size),
        };

        frontend.set_window_size(toolbar.window_size);
        frontend.refresh_devices();

        Self {
            frontend,
            plots: ChannelPlots::new(config.ui.plot_height),
            poll_interval: Duration::from_millis(config.ui.poll_interval_ms.max(10)),
            config,
            app_state,
            topics: Topics::default(),
            toolbar,
            last_poll: Instant::now(),
            visuals_dirty: false,
        }
    }

    fn process_backend_messages(&mut self) -> bool {
        let messages = self.frontend.drain();
        let had_messages = !messages.is_empty();

        for msg in messages {
            self.topics.apply(msg);
        }

        had_messages
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::Connect {
                device_name,
                cache_capacity,
            } => {
                tracing::info!("Connecting to {} (cache {})", device_name, cache_capacity);
                self.app_state.last_device_name = Some(device_name.clone());
                self.app_state.cache_capacity = cache_capacity;
                self.frontend.connect(device_name, Some(cache_capacity));
            }
            AppAction::Disconnect => self.frontend.disconnect(),
            AppAction::StartMonitoring => self.frontend.start_monitoring(),
            AppAction::StopMonitoring => self.frontend.stop_monitoring(),
            AppAction::SaveData => {
                // Stop ingesting while the user picks a destination
                self.frontend.stop_monitoring();
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("CSV", &["csv"])
                    .set_file_name(default_file_name())
                    .save_file()
                {
                    self.handle_action(AppAction::SaveDataTo(path));
                }
            }
            AppAction::SaveDataTo(path) => self.save_to(path),
            AppAction::DeleteCache => self.frontend.delete_cache(),
            AppAction::RefreshDevices => self.frontend.refresh_devices(),
            AppAction::SetWindowSize(size) => {
                let size = clamp_window_size(size);
                self.app_state.window_size = size;
                self.frontend.set_window_size(size);
                self.frontend.request_window();
            }
            AppAction::SetDarkMode(dark) => {
                self.app_state.dark_mode = dark;
                self.visuals_dirty = true;
            }
        }
    }

    fn save_to(&mut self, path: PathBuf) {
        tracing::info!("Saving data to {:?}", path);
        self.frontend.save_to_file(path);
    }

    fn poll_window(&mut self) {
        if self.last_poll.elapsed() >= self.poll_interval {
            self.frontend.request_window();
            self.last_poll = Instant::now();
        }
    }

    fn render_banner(&mut self, ui: &mut egui::Ui) {
        let Some(banner) = &self.topics.banner else {
            return;
        };
        let (color, icon) = if banner.notification.is_error() {
            (Color32::LIGHT_RED, "⚠")
        } else {
            (Color32::LIGHT_GREEN, "ℹ")
        };
        let mut dismiss = false;
        ui.horizontal(|ui| {
            ui.colored_label(color, RichText::new(format!("{} {}", icon, banner.notification)));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                dismiss = ui.small_button("✕").clicked();
            });
        });
        if dismiss {
            self.topics.banner = None;
        }
    }
}

impl eframe::App for MoniApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_messages = self.process_backend_messages();
        self.topics.expire_banner(Instant::now());
        self.poll_window();

        if self.visuals_dirty {
            ctx.set_visuals(if self.app_state.dark_mode {
                egui::Visuals::dark()
            } else {
                egui::Visuals::light()
            });
            self.visuals_dirty = false;
        }

        if had_messages {
            ctx.request_repaint();
        }
        ctx.request_repaint_after(self.poll_interval);

        let mut actions = Vec::new();

        // Menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("View", |ui| {
                    let mut dark = self.app_state.dark_mode;
                    if ui.checkbox(&mut dark, "Dark mode").changed() {
                        actions.push(AppAction::SetDarkMode(dark));
                        ui.close();
                    }
                });
            });
        });

        if self.topics.banner.is_some() {
            egui::TopBottomPanel::top("notification_banner").show(ctx, |ui| {
                self.render_banner(ui);
            });
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            actions.extend(toolbar::render_toolbar(ui, &self.topics, &mut self.toolbar));
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            status_bar::render_status_bar(ui, &self.topics);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.plots.render(ui, &self.topics.window);
        });

        for action in actions {
            self.handle_action(action);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.frontend.shutdown();

        self.app_state.cache_capacity = self.toolbar.cache_capacity;
        self.app_state.window_size = self.toolbar.window_size;
        if !self.toolbar.device_name.is_empty() {
            self.app_state.last_device_name = Some(self.toolbar.device_name.clone());
        }

        if let Err(e) = self.app_state.save() {
            tracing::warn!("Failed to save app state: {}", e);
        }
        tracing::debug!("Exiting with config {:?}", self.config);
    }
}
