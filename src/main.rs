mod app;
mod config;
mod data;
mod gui;
mod log;
mod pipeline;

use app::QensApp;
use config::AppSettings;

fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    ::log::info!("Starting QENS ROI integration v{}", env!("CARGO_PKG_VERSION"));

    let settings = AppSettings::load();
    let (width, height) = settings.window_size;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([width, height])
            .with_min_inner_size([900.0, 600.0])
            .with_title("QENS ROI Integration")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "QENS ROI Integration",
        options,
        Box::new(|cc| Ok(Box::new(QensApp::new(cc, settings)))),
    )
}
