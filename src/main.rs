use std::path::PathBuf;

use anyhow::Context;
use clap::{Arg, Command};
use eframe::egui;

use plantation_explorer::config::AppSettings;
use plantation_explorer::gui::frontend::ExplorerApp;

fn main() -> anyhow::Result<()> {
    let matches = Command::new("Plantation-Explorer")
        .about("Explore plantation, holder, species and location graphs")
        .arg(Arg::new("backend").long("backend").value_name("URL").help("Dataset and analysis backend base URL"))
        .arg(Arg::new("dataset").long("dataset").value_name("FILE").help("Load a local JSON dataset instead of fetching it"))
        .arg(Arg::new("config").long("config").value_name("FILE").help("Settings file (defaults to the per-user config dir)"))
        .get_matches();

    let mut settings = match matches.get_one::<String>("config") {
        Some(path) => AppSettings::load_from_path(&PathBuf::from(path))
            .with_context(|| format!("reading settings from {}", path))?,
        None => AppSettings::load().unwrap_or_else(|e| {
            eprintln!("[Plantation-Explorer] Ignoring unreadable settings: {}", e);
            AppSettings::default()
        }),
    };
    if let Some(url) = matches.get_one::<String>("backend") {
        settings.backend_url = url.clone();
    }
    if let Some(path) = matches.get_one::<String>("dataset") {
        settings.dataset_path = Some(PathBuf::from(path));
    }

    // RUST_LOG wins over the configured filter
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log_filter.as_str())).init();
    log::info!("backend {}", settings.backend_url);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 710.0])
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Plantation-Explorer",
        options,
        Box::new(move |cc| {
            let mut app = ExplorerApp::new(settings);
            app.start(&cc.egui_ctx);
            Ok(Box::new(app) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| anyhow::anyhow!("GUI exited with error: {}", e))
}
