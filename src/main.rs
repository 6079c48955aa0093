//! Event Timeline Viewer - browse dated events on zoomable timeline rows.

use std::path::PathBuf;

use event_timeline_viewer::core::config::AppSettings;
use event_timeline_viewer::gui::EventTimelineApp;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> eframe::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("event_timeline_viewer=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let initial_file = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = AppSettings::load();
    let (width, height) = settings.window_size.unwrap_or((1280.0, 800.0));

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([width, height])
            .with_min_inner_size([640.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    tracing::info!(file = ?initial_file, "starting viewer");
    eframe::run_native(
        "Event Timeline Viewer",
        options,
        Box::new(move |cc| Ok(Box::new(EventTimelineApp::new(cc, settings, initial_file)))),
    )
}
