//! Status bar at the bottom of the window: connection, cache fill and counters.

use egui::{Color32, RichText, Ui};

use crate::frontend::topics::Topics;
use crate::types::ConnectionStatus;

/// Cache fill level above which the gauge turns yellow
const FILL_WARN_PERCENT: f64 = 80.0;

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, topics: &Topics) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        // === Connection status dot + device ===
        let status_color = match topics.connection_status {
            ConnectionStatus::Monitoring => Color32::GREEN,
            ConnectionStatus::Connected => Color32::YELLOW,
            ConnectionStatus::Disconnected => Color32::GRAY,
        };
        ui.colored_label(status_color, "●");
        let device_display = if topics.device.connected {
            format!(
                "{}: {} ({})",
                topics.connection_status, topics.device.name, topics.device.port
            )
        } else {
            topics.connection_status.to_string()
        };
        ui.label(RichText::new(device_display).small());

        ui.separator();

        // === Cache fill ===
        let stats = &topics.stats;
        let fill = stats.fill_percent();
        let fill_color = if fill >= 100.0 {
            Color32::LIGHT_RED
        } else if fill >= FILL_WARN_PERCENT {
            Color32::YELLOW
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            fill_color,
            RichText::new(format!(
                "Cache: {}/{} ({:.0}%)",
                stats.cache_len, stats.cache_capacity, fill
            ))
            .small(),
        );

        ui.separator();

        ui.label(RichText::new(format!("Stored: {}", stats.frames_stored)).small());

        ui.separator();

        let malformed_color = if stats.frames_malformed > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            malformed_color,
            RichText::new(format!("Malformed: {}", stats.frames_malformed)).small(),
        );

        ui.separator();

        ui.label(RichText::new(format!("Discarded: {}", stats.frames_discarded)).small());

        if stats.frames_dropped > 0 {
            ui.separator();
            ui.colored_label(
                Color32::YELLOW,
                RichText::new(format!("Link dropped: {}", stats.frames_dropped)).small(),
            );
        }

        if stats.dropped_messages > 0 {
            ui.separator();
            ui.colored_label(
                Color32::YELLOW,
                RichText::new(format!("UI dropped: {}", stats.dropped_messages)).small(),
            );
        }
    });
}
