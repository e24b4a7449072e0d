//! MoniHelper - Main Entry Point
//!
//! Desktop monitor for a four-channel serial measurement instrument.

use anyhow::Context;
use moni_helper::{
    backend::{MoniBackend, PortDriver},
    config::{ensure_app_data_dir, AppConfig, AppState, LOG_DIR},
    frontend::MoniApp,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging();

    tracing::info!("Starting MoniHelper {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_or_default();
    let app_state = AppState::load_or_default();

    let (backend, frontend) = MoniBackend::new(config.clone(), port_driver());
    let stop_handle = backend.stop_handle();
    let backend_handle = std::thread::Builder::new()
        .name("session-coordinator".to_string())
        .spawn(move || backend.run())
        .context("Failed to start backend thread")?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 820.0])
            .with_min_inner_size([720.0, 520.0])
            .with_title("MoniHelper"),
        ..Default::default()
    };

    let dark_mode = app_state.dark_mode;
    let result = eframe::run_native(
        "MoniHelper",
        native_options,
        Box::new(move |cc| {
            if dark_mode {
                cc.egui_ctx.set_visuals(egui::Visuals::dark());
            } else {
                cc.egui_ctx.set_visuals(egui::Visuals::light());
            }
            Ok(Box::new(MoniApp::new(cc, frontend, config, app_state)))
        }),
    );

    // Signal backend to stop and wait for it
    tracing::info!("Shutting down...");
    stop_handle.store(false, std::sync::atomic::Ordering::SeqCst);
    if backend_handle.join().is_err() {
        tracing::error!("Backend thread panicked");
    }

    result.map_err(|e| anyhow::anyhow!("UI error: {}", e))
}

#[cfg(not(feature = "mock-device"))]
fn port_driver() -> Box<dyn PortDriver> {
    Box::new(moni_helper::backend::serial::SystemPorts::new())
}

#[cfg(feature = "mock-device")]
fn port_driver() -> Box<dyn PortDriver> {
    tracing::info!(
        "Using simulated device {} on {}",
        moni_helper::backend::mock_port::DEMO_DEVICE,
        moni_helper::backend::mock_port::DEMO_PORT
    );
    Box::new(moni_helper::backend::mock_port::SimulatedPorts::with_demo_device())
}

/// Console logging plus a daily log file in the app data directory
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,moni_helper=debug"));

    let file_writer = ensure_app_data_dir().ok().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir.join(LOG_DIR), "moni-helper.log");
        tracing_appender::non_blocking(appender)
    });

    match file_writer {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}
