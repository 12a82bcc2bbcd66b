//! Alert Scanner polls SmartAPI for quotes and option-chain data on a fixed set of
//! symbols. Every result is appended to a local SQLite snapshot log and a short
//! alert per symbol goes to a Telegram chat.
//!
//! Usage example (CLI):
//! ```bash
//! alert_scanner --one-shot
//! alert_scanner --loop --symbols NIFTY,RELIANCE
//! alert_scanner --mock --debug
//! alert_scanner --history NIFTY
//! ```
//!
//! Credentials come from the environment (optionally via `.env`); see `config` for
//! the variable names. Exit codes: 0 on a normal or interrupted run, 2 when broker
//! credentials are missing, 3 when the configured broker client is unavailable.
mod args;
mod broker;
mod config;
mod cycle;
mod http;
mod notifier;
mod schedule;
mod store;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use alert_common::AlertError;
use clap::Parser;
use log::{debug, error, info, warn};

use crate::args::Args;
use crate::config::Config;
use crate::cycle::Scanner;
use crate::http::ReqwestTransport;
use crate::notifier::Notifier;
use crate::store::SnapshotStore;

fn main() -> ExitCode {
    let dotenv = load_dotenv();
    let args = Args::parse();
    init_logger(args.debug);
    if let Some(path) = &dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    let config = match Config::from_env(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return exit_code(e.exit_code());
        }
    };
    if let Some(symbol) = args.history {
        return match print_history(&config, symbol) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Could not read snapshot log: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    info!(
        "Scanning {:?} ({}, {} mode)",
        config.symbols,
        config.broker_api,
        if config.run_loop { "loop" } else { "one-shot" }
    );
    if config.mock {
        info!("Mock mode: no broker calls will be made.");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down scanner...");
            shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!("Could not install Ctrl+C handler: {}", e);
        }
    }

    match run(&config, &shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AlertError::Config(e)) => {
            error!("{}", e);
            exit_code(e.exit_code())
        }
        Err(e) => {
            error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, shutdown: &AtomicBool) -> alert_common::Result<()> {
    let store = SnapshotStore::open(&config.db_path)?;
    info!("Snapshot log ready at {}", store.path().display());
    let transport = ReqwestTransport::new()?;
    let broker = broker::connect(config, transport.clone())?;
    let notifier = Notifier::new(&config.telegram, &transport);
    if !notifier.is_configured() {
        info!("Telegram not configured, alerts will only be logged.");
    }

    Scanner::new(config, broker.as_ref(), &store, &notifier, shutdown).run();
    info!("Snapshot log holds {} records", store.count()?);
    Ok(())
}

fn print_history(config: &Config, symbol: alert_common::Symbol) -> alert_common::Result<()> {
    let store = SnapshotStore::open_existing(&config.db_path)?;
    for snapshot in store.read_by_symbol(&symbol.to_string())? {
        let line = serde_json::json!({
            "id": snapshot.id,
            "symbol": snapshot.symbol,
            "timestamp": snapshot.timestamp.to_rfc3339(),
            "payload": snapshot.payload,
        });
        println!("{line}");
    }
    Ok(())
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn init_logger(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Load the nearest `.env` (current directory first, then ancestors).
/// Returns the file that was applied. Runs before the logger exists.
fn load_dotenv() -> Option<PathBuf> {
    if let Ok(path) = dotenvy::dotenv() {
        return Some(path);
    }
    let path = find_dotenv(&std::env::current_dir().ok()?)?;
    dotenvy::from_path(&path).ok()?;
    Some(path)
}

/// Nearest `.env` strictly above `dir`.
fn find_dotenv(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .skip(1)
        .map(|parent| parent.join(".env"))
        .find(|candidate| candidate.is_file())
}
