//! Toolbar panel: device picker plus connection, monitoring and data buttons.
//!
//! Sits between the notification banner and the charts.

use egui::{Color32, RichText, Ui};

use crate::config::{MAX_CACHE_CAPACITY, MAX_WINDOW_SIZE, MIN_WINDOW_SIZE};
use crate::frontend::state::AppAction;
use crate::frontend::topics::Topics;
use crate::types::ConnectionStatus;

/// Values edited in the toolbar and kept by the app between frames
#[derive(Debug, Clone, PartialEq)]
pub struct ToolbarState {
    pub device_name: String,
    pub cache_capacity: usize,
    pub window_size: usize,
}

/// Render the main application toolbar.
///
/// Returns the actions to be applied by the app.
pub fn render_toolbar(ui: &mut Ui, topics: &Topics, state: &mut ToolbarState) -> Vec<AppAction> {
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 4.0;

        render_connection_group(ui, topics, state, &mut actions);
        ui.separator();
        render_monitoring_group(ui, topics, &mut actions);
        ui.separator();
        render_data_group(ui, topics, &mut actions);
        ui.separator();
        render_window_group(ui, state, &mut actions);
    });

    actions
}

fn render_connection_group(
    ui: &mut Ui,
    topics: &Topics,
    state: &mut ToolbarState,
    actions: &mut Vec<AppAction>,
) {
    let connected = topics.is_connected();

    ui.add_enabled_ui(!connected, |ui| {
        ui.label("Device:");
        egui::ComboBox::from_id_salt("device_picker")
            .width(140.0)
            .selected_text(if state.device_name.is_empty() {
                "Select device..."
            } else {
                state.device_name.as_str()
            })
            .show_ui(ui, |ui| {
                if topics.devices.is_empty() {
                    ui.label(RichText::new("No devices found").italics());
                }
                for name in &topics.devices {
                    ui.selectable_value(&mut state.device_name, name.clone(), name.as_str());
                }
            });

        if ui.button("⟳").on_hover_text("Refresh device list").clicked() {
            actions.push(AppAction::RefreshDevices);
        }

        ui.label("Cache:");
        ui.add(
            egui::DragValue::new(&mut state.cache_capacity)
                .range(1..=MAX_CACHE_CAPACITY)
                .speed(100.0),
        )
        .on_hover_text("Maximum number of samples kept in memory");
    });

    if connected {
        ui.colored_label(Color32::GREEN, "●");
        let btn = egui::Button::new(RichText::new("Disconnect").color(Color32::WHITE))
            .fill(Color32::from_rgb(50, 120, 50));
        if ui
            .add(btn)
            .on_hover_text("Disconnect and discard recorded data")
            .clicked()
        {
            actions.push(AppAction::Disconnect);
        }
    } else {
        ui.colored_label(Color32::GRAY, "●");
        let can_connect = !state.device_name.trim().is_empty();
        if ui
            .add_enabled(can_connect, egui::Button::new("Connect"))
            .clicked()
        {
            actions.push(AppAction::Connect {
                device_name: state.device_name.trim().to_string(),
                cache_capacity: state.cache_capacity,
            });
        }
    }
}

fn render_monitoring_group(ui: &mut Ui, topics: &Topics, actions: &mut Vec<AppAction>) {
    match topics.connection_status {
        ConnectionStatus::Monitoring => {
            if ui.button("⏸ Stop").clicked() {
                actions.push(AppAction::StopMonitoring);
            }
        }
        ConnectionStatus::Connected => {
            if ui.button("▶ Start").clicked() {
                actions.push(AppAction::StartMonitoring);
            }
        }
        ConnectionStatus::Disconnected => {
            ui.add_enabled(false, egui::Button::new("▶ Start"));
        }
    }
}

fn render_data_group(ui: &mut Ui, topics: &Topics, actions: &mut Vec<AppAction>) {
    let has_data = topics.stats.cache_len > 0;

    if ui
        .add_enabled(has_data, egui::Button::new("💾 Save"))
        .on_hover_text("Pause monitoring and export all samples as CSV")
        .clicked()
    {
        actions.push(AppAction::SaveData);
    }
    if ui
        .add_enabled(has_data, egui::Button::new("🗑 Delete"))
        .on_hover_text("Discard recorded samples")
        .clicked()
    {
        actions.push(AppAction::DeleteCache);
    }
}

fn render_window_group(ui: &mut Ui, state: &mut ToolbarState, actions: &mut Vec<AppAction>) {
    ui.label("Points:");
    let response = ui.add(
        egui::DragValue::new(&mut state.window_size)
            .range(MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE)
            .speed(10.0),
    );
    if response.changed() {
        actions.push(AppAction::SetWindowSize(state.window_size));
    }
}
