//! Command-line arguments for the alert scanner.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use alert_common::Symbol;
use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Run a single scan over all symbols and exit (default).
    #[clap(long, conflicts_with = "run_loop")]
    pub one_shot: bool,

    /// Repeat the scan on every :00:05 and :30:05 wall-clock boundary.
    #[clap(long = "loop")]
    pub run_loop: bool,

    /// Skip broker calls and synthesize deterministic placeholder data.
    #[clap(long)]
    pub mock: bool,

    /// Enable debug logging.
    #[clap(long)]
    pub debug: bool,

    /// Symbols to scan, comma separated. Overrides ALERT_SYMBOLS.
    #[clap(long, value_enum, value_delimiter = ',', ignore_case = true)]
    pub symbols: Vec<Symbol>,

    /// SQLite snapshot log path. Overrides ALERT_DB_FILE.
    #[clap(long)]
    pub db: Option<String>,

    /// Print the stored snapshots for one symbol as JSON lines and exit.
    #[clap(long, value_enum, ignore_case = true, conflicts_with_all = ["run_loop", "mock"])]
    pub history: Option<Symbol>,

    /// Pause between symbols in milliseconds.
    #[clap(long, default_value_t = 1000)]
    pub pause_ms: u64,
}

impl Args {
    /// `true` when the scan should repeat.
    pub fn is_loop(&self) -> bool {
        self.run_loop && !self.one_shot
    }
}
