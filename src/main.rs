use anyhow::Context;
use eframe::egui;

use tobacco_dashboard::app::DashboardApp;
use tobacco_dashboard::config::DashboardConfig;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = DashboardConfig::load().context("reading dashboard configuration")?;
    log::info!("Using data directory {}", config.data_dir.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Tobacco Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {e}"))
}
