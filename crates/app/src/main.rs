//! La Mesa - restaurant desk attendance
//!
//! Staff sign in and out at the desk terminal; each sign-in opens an
//! attendance record and each sign-out closes it with worked hours.

use std::path::PathBuf;

use clap::Parser;
use lamesa_core::config::{default_config_path, default_data_dir};
use lamesa_core::AppConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod console;
mod state;

/// La Mesa desk terminal
#[derive(Parser, Debug)]
#[command(name = "lamesa")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding the attendance database
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Path to lamesa.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout belongs to the console
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting La Mesa");

    let config_path = match cli.config.map(Ok).unwrap_or_else(default_config_path) {
        Ok(path) => path,
        Err(e) => {
            tracing::error!("Failed to locate config: {}", e);
            std::process::exit(1);
        }
    };
    let config = match AppConfig::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %config_path.display(), "Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let data_dir = match cli.data_dir.map(Ok).unwrap_or_else(default_data_dir) {
        Ok(dir) => dir,
        Err(e) => {
            tracing::error!("Failed to locate data directory: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = match state::AppState::new(&config, &data_dir) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(data_dir = %app_state.data_dir().display(), "Ledger ready");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    if let Err(e) = console::run(&app_state, stdin.lock(), stdout.lock()) {
        tracing::error!("Console I/O failed: {}", e);
        std::process::exit(1);
    }
}
