#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod error;
mod modules;
mod settings;
mod style;

use eframe::egui;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = std::env::var("PRISM_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "prism=info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

fn main() -> eframe::Result<()> {
    init_logging();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([950.0, 650.0])
            .with_min_inner_size([640.0, 480.0])
            .with_drag_and_drop(true)
            .with_title("Prism"),
        ..Default::default()
    };

    eframe::run_native(
        "Prism",
        options,
        Box::new(|cc| Ok(Box::new(app::PrismApp::new(cc)))),
    )
}
