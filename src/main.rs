mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use app::SpikeDensityApp;
use clap::Parser;
use eframe::egui;
use spike_density::config::{DEFAULT_STORE_ROOT, DEFAULT_ZONE};
use spike_density::store::{LocalStore, StoreContext};
use state::AppState;

/// Spike density viewer for published multiscale artifacts
#[derive(Parser, Debug)]
#[command(name = "spike-density", version, long_about = None)]
struct Args {
    /// Record URI to open on start (sha256://...)
    uri: Option<String>,

    /// Root directory of the artifact store
    #[arg(long, default_value = DEFAULT_STORE_ROOT)]
    store_root: PathBuf,

    /// Storage zone
    #[arg(long, default_value = DEFAULT_ZONE)]
    zone: String,
}

fn main() -> eframe::Result {
    env_logger::init();
    let args = Args::parse();

    let store = LocalStore::new(&args.store_root, StoreContext::new(&args.zone));
    let mut state = AppState::new(store);
    if let Some(uri) = &args.uri {
        state.open_uri(uri);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Spike Density Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(SpikeDensityApp::new(state)))),
    )
}
