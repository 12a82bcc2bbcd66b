//! Startup configuration resolved once from CLI flags and the environment.
//!
//! Values are read after `.env` has been loaded. Empty variables count as unset.
//! The resulting `Config` is passed by reference to every component; nothing
//! reads the environment after startup.
use std::path::PathBuf;
use std::time::Duration;

use alert_common::error::ConfigError;
use alert_common::net::{SMARTAPI_BASE_URL, TELEGRAM_API_BASE};
use alert_common::symbols::SymbolParser;
use alert_common::Symbol;

use crate::args::Args;
use crate::broker::BrokerApi;

/// Default snapshot log file.
pub const DEFAULT_DB_FILE: &str = "alerts.db";
/// Minimum sleep between loop cycles.
pub const MIN_CYCLE_SLEEP: Duration = Duration::from_secs(10);

/// SmartAPI login material.
#[derive(Debug, Clone)]
pub struct BrokerCredentials {
    pub api_key: String,
    pub client_code: String,
    pub password: String,
    /// Base32 TOTP secret used to generate the one-time code.
    pub totp_secret: Option<String>,
}

/// Telegram bot settings. Both token and chat id must be present to send.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
}

impl TelegramConfig {
    /// Bot token and chat id, when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.bot_token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat_id)) => Some((token, chat_id)),
            _ => None,
        }
    }
}

/// Fully resolved scanner configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub symbols: Vec<Symbol>,
    pub db_path: PathBuf,
    pub mock: bool,
    pub run_loop: bool,
    pub broker_api: BrokerApi,
    pub broker_base_url: String,
    /// `None` only in mock mode.
    pub credentials: Option<BrokerCredentials>,
    /// Option-chain expiry in `DDMONYYYY` form, e.g. `26DEC2024`.
    pub option_expiry: Option<String>,
    pub telegram: TelegramConfig,
    pub symbol_pause: Duration,
    pub min_cycle_sleep: Duration,
}

impl Config {
    /// Resolve configuration from `args` and the process environment.
    pub fn from_env(args: &Args) -> Result<Self, ConfigError> {
        Self::from_lookup(args, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from `args` and an arbitrary variable lookup.
    pub fn from_lookup<F>(args: &Args, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let symbols = if let Some(symbol) = args.history {
            vec![symbol]
        } else if !args.symbols.is_empty() {
            args.symbols.clone()
        } else if let Some(list) = var("ALERT_SYMBOLS") {
            Symbol::parse_list(&list).map_err(|e| ConfigError::Invalid {
                key: "ALERT_SYMBOLS",
                reason: e.to_string(),
            })?
        } else {
            Symbol::DEFAULT.to_vec()
        };

        let db_path = args
            .db
            .clone()
            .or_else(|| var("ALERT_DB_FILE"))
            .unwrap_or_else(|| DEFAULT_DB_FILE.to_string());

        // Reading the snapshot log back never talks to the broker.
        let (broker_api, credentials) = if args.mock || args.history.is_some() {
            (BrokerApi::Mock, None)
        } else {
            let broker_api = match var("ANGEL_API_SHAPE") {
                Some(shape) => shape
                    .parse::<BrokerApi>()
                    .ok()
                    .filter(|api| *api != BrokerApi::Mock)
                    .ok_or(ConfigError::BrokerUnavailable(shape))?,
                None => BrokerApi::MarketQuote,
            };
            let require = |key: &'static str| var(key).ok_or(ConfigError::MissingCredential(key));
            let credentials = BrokerCredentials {
                api_key: require("ANGEL_API_KEY")?,
                client_code: require("ANGEL_CLIENT_CODE")?,
                password: require("ANGEL_PASSWORD")?,
                totp_secret: var("ANGEL_TOTP_SECRET"),
            };
            (broker_api, Some(credentials))
        };

        Ok(Self {
            symbols,
            db_path: PathBuf::from(db_path),
            mock: args.mock,
            run_loop: args.is_loop(),
            broker_api,
            broker_base_url: var("ANGEL_BASE_URL").unwrap_or_else(|| SMARTAPI_BASE_URL.to_string()),
            credentials,
            option_expiry: var("ALERT_OPTION_EXPIRY").map(|e| e.to_uppercase()),
            telegram: TelegramConfig {
                bot_token: var("TELEGRAM_BOT_TOKEN"),
                chat_id: var("TELEGRAM_CHAT_ID"),
                api_base: var("TELEGRAM_API_BASE").unwrap_or_else(|| TELEGRAM_API_BASE.to_string()),
            },
            symbol_pause: Duration::from_millis(args.pause_ms),
            min_cycle_sleep: MIN_CYCLE_SLEEP,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const LIVE: [(&str, &str); 3] = [
        ("ANGEL_API_KEY", "key"),
        ("ANGEL_CLIENT_CODE", "A123"),
        ("ANGEL_PASSWORD", "1234"),
    ];

    #[test]
    fn mock_mode_needs_no_credentials() {
        let args = Args::parse_from(["alert_scanner", "--mock"]);
        let config = Config::from_lookup(&args, lookup(&[])).unwrap();
        assert_eq!(config.broker_api, BrokerApi::Mock);
        assert!(config.credentials.is_none());
        assert_eq!(config.symbols, Symbol::DEFAULT.to_vec());
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_FILE));
    }

    #[test]
    fn missing_credential_is_reported_by_name() {
        let args = Args::parse_from(["alert_scanner"]);
        let err = Config::from_lookup(&args, lookup(&[("ANGEL_API_KEY", "key")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential("ANGEL_CLIENT_CODE"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let args = Args::parse_from(["alert_scanner"]);
        let mut pairs = LIVE.to_vec();
        pairs[2] = ("ANGEL_PASSWORD", "  ");
        let err = Config::from_lookup(&args, lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential("ANGEL_PASSWORD"));
    }

    #[test]
    fn unknown_api_shape_is_unavailable_broker() {
        let args = Args::parse_from(["alert_scanner"]);
        let mut pairs = LIVE.to_vec();
        pairs.push(("ANGEL_API_SHAPE", "websocket-v3"));
        let err = Config::from_lookup(&args, lookup(&pairs)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn cli_symbols_override_environment() {
        let args = Args::parse_from(["alert_scanner", "--symbols", "SENSEX", "--db", "x.db"]);
        let mut pairs = LIVE.to_vec();
        pairs.push(("ALERT_SYMBOLS", "NIFTY,RELIANCE"));
        pairs.push(("ALERT_DB_FILE", "y.db"));
        let config = Config::from_lookup(&args, lookup(&pairs)).unwrap();
        assert_eq!(config.symbols, vec![Symbol::Sensex]);
        assert_eq!(config.db_path, PathBuf::from("x.db"));
        assert_eq!(config.broker_api, BrokerApi::MarketQuote);
    }

    #[test]
    fn history_mode_needs_no_credentials() {
        let args = Args::parse_from(["alert_scanner", "--history", "nifty"]);
        let config = Config::from_lookup(&args, lookup(&[])).unwrap();
        assert!(config.credentials.is_none());
        assert!(!config.mock);
    }

    #[test]
    fn history_mode_ignores_scan_list() {
        let args = Args::parse_from(["alert_scanner", "--history", "SENSEX"]);
        let config = Config::from_lookup(&args, lookup(&[("ALERT_SYMBOLS", "NIFTY,TCS")])).unwrap();
        assert_eq!(config.symbols, vec![Symbol::Sensex]);
    }

    #[test]
    fn telegram_needs_both_token_and_chat() {
        let args = Args::parse_from(["alert_scanner", "--mock"]);
        let config = Config::from_lookup(&args, lookup(&[("TELEGRAM_BOT_TOKEN", "t")])).unwrap();
        assert!(config.telegram.credentials().is_none());
    }
}
