use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use indicator_engine::config::{self, AppConfig};
use indicator_engine::manager::{IndicatorManager, ManagerSettings};
use indicator_engine::model::Candle;
use indicator_engine::registry::IndicatorRegistry;
use indicator_engine::sink::log::LogSink;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("candle input error")]
    Candles,
    #[display("output error")]
    Output,
}

#[derive(Parser)]
#[command(name = "indicator-engine", about = "Technical indicator engine")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Path to a JSON array of candles
    #[arg(long)]
    candles: String,
    /// Extra indicator to enable (repeatable, aliases allowed)
    #[arg(short = 'i', long = "indicator")]
    indicators: Vec<String>,
    /// Write the indicator configuration back to `chart.state_file`
    #[arg(long)]
    save_state: bool,
}

fn main() {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    let settings = ManagerSettings {
        max_panels: config.chart.max_panels,
    };
    let mut manager = IndicatorManager::new(
        IndicatorRegistry::with_defaults(),
        settings,
        Arc::new(LogSink),
    );

    if let Some(state_file) = &config.chart.state_file {
        load_state(&mut manager, Path::new(state_file));
    }

    for id in config.chart.indicators.iter().chain(&cli.indicators) {
        if let Err(report) = manager.add(id) {
            tracing::warn!(id = %id, error = %report, "indicator not enabled");
        }
    }

    let candles = read_candles(Path::new(&cli.candles))?;
    info!(count = candles.len(), "candles loaded");
    manager
        .update_candle_data(candles)
        .change_context(AppError::Candles)?;

    let snapshots = serde_json::to_string_pretty(&manager.snapshots())
        .change_context(AppError::Output)?;
    println!("{snapshots}");

    if cli.save_state {
        save_state(&manager, &config)?;
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn read_candles(path: &Path) -> Result<Vec<Candle>, Report<AppError>> {
    let content = std::fs::read_to_string(path)
        .change_context(AppError::Candles)
        .attach_with(|| format!("path: {}", path.display()))?;
    serde_json::from_str(&content)
        .change_context(AppError::Candles)
        .attach_with(|| format!("path: {}", path.display()))
}

/// A missing or malformed state file keeps the built-in defaults.
fn load_state(manager: &mut IndicatorManager, path: &Path) {
    match std::fs::read_to_string(path) {
        Ok(json) => {
            if let Err(report) = manager.load_config(&json) {
                tracing::warn!(path = %path.display(), error = %report, "state file ignored");
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no state file, using defaults");
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read state file");
        }
    }
}

fn save_state(manager: &IndicatorManager, config: &AppConfig) -> Result<(), Report<AppError>> {
    let Some(state_file) = &config.chart.state_file else {
        tracing::warn!("--save-state given but chart.state_file is not configured");
        return Ok(());
    };

    let json = manager.export_config().change_context(AppError::Output)?;
    std::fs::write(state_file, json)
        .change_context(AppError::Output)
        .attach_with(|| format!("path: {state_file}"))?;

    info!(path = %state_file, "indicator state saved");
    Ok(())
}
