//! Channel charts using egui_plot
//!
//! One chart per channel, stacked vertically. The x axis is the sample index
//! inside the display window, so the newest sample is always at the right
//! edge and a short cache shows up as a flat zero run on the left.

use crate::types::{ChannelWindow, CHANNEL_COUNT, CHANNEL_NAMES};
use egui::{Color32, Ui};
use egui_plot::{Corner, Legend, Line, Plot, PlotPoints};

/// Line colors, one per channel
const CHANNEL_COLORS: [Color32; CHANNEL_COUNT] = [
    Color32::from_rgb(31, 119, 180),
    Color32::from_rgb(255, 127, 14),
    Color32::from_rgb(44, 160, 44),
    Color32::from_rgb(214, 39, 40),
];

/// Chart configuration
#[derive(Debug, Clone)]
pub struct ChannelPlots {
    /// Height of each chart in points
    pub plot_height: f32,
    pub line_width: f32,
    pub show_grid: bool,
}

impl Default for ChannelPlots {
    fn default() -> Self {
        Self {
            plot_height: 160.0,
            line_width: 1.5,
            show_grid: true,
        }
    }
}

impl ChannelPlots {
    pub fn new(plot_height: f32) -> Self {
        Self {
            plot_height,
            ..Default::default()
        }
    }

    /// Render all four channels of the window
    pub fn render(&self, ui: &mut Ui, window: &ChannelWindow) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            for channel in 0..CHANNEL_COUNT {
                self.render_channel(ui, window, channel);
            }
        });
    }

    fn render_channel(&self, ui: &mut Ui, window: &ChannelWindow, channel: usize) {
        let name = CHANNEL_NAMES[channel];
        let plot = Plot::new(name)
            .height(self.plot_height)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .show_axes(true)
            .show_grid(self.show_grid)
            .legend(Legend::default().position(Corner::LeftTop));

        let points = window_points(window.channel(channel));

        plot.show(ui, |plot_ui| {
            if points.is_empty() {
                return;
            }
            let line = Line::new(name, PlotPoints::from(points))
                .color(CHANNEL_COLORS[channel])
                .width(self.line_width);
            plot_ui.line(line);
        });
    }
}

/// `[index, value]` pairs for one channel
pub fn window_points(values: &[f64]) -> Vec<[f64; 2]> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| [i as f64, v])
        .collect()
}
