//! Cycle orchestrator.
//!
//! A cycle logs in once, then walks the configured symbols in order: fetch
//! quote, fetch option chain, append the snapshot, send the alert. A failure
//! on one symbol is logged and the next symbol is processed. If login fails,
//! the whole cycle runs on mock data instead of being skipped.
//!
//! In loop mode cycles repeat on the half-hour schedule from `schedule` until
//! the shutdown flag is raised.
use std::sync::atomic::{AtomicBool, Ordering};

use alert_common::{Result, SnapshotPayload, Symbol};
use chrono::{Local, SecondsFormat, Utc};
use log::{debug, error, info, warn};

use crate::broker::{BrokerClient, MockBroker, Session};
use crate::config::Config;
use crate::notifier::{Delivery, Notifier};
use crate::schedule;
use crate::store::SnapshotStore;

/// What one cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Stored snapshot ids, in scan order.
    pub persisted: Vec<(Symbol, i64)>,
    /// Symbols that could not be stored, with the reason.
    pub failures: Vec<(Symbol, String)>,
    /// Login failed and mock data was used.
    pub used_fallback: bool,
    /// The cycle stopped early on shutdown.
    pub interrupted: bool,
}

/// Drives scan cycles over the configured symbols.
pub struct Scanner<'a> {
    config: &'a Config,
    broker: &'a dyn BrokerClient,
    store: &'a SnapshotStore,
    notifier: &'a Notifier<'a>,
    shutdown: &'a AtomicBool,
}

impl<'a> Scanner<'a> {
    pub fn new(
        config: &'a Config,
        broker: &'a dyn BrokerClient,
        store: &'a SnapshotStore,
        notifier: &'a Notifier<'a>,
        shutdown: &'a AtomicBool,
    ) -> Self {
        Self {
            config,
            broker,
            store,
            notifier,
            shutdown,
        }
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run one cycle in one-shot mode, or cycles until shutdown in loop mode.
    pub fn run(&self) {
        loop {
            info!(
                "Running cycle at {}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
            );
            let report = self.run_cycle();
            info!(
                "Cycle done: {} stored, {} failed{}",
                report.persisted.len(),
                report.failures.len(),
                if report.used_fallback { " (mock fallback)" } else { "" }
            );

            if !self.config.run_loop || report.interrupted || self.stopping() {
                break;
            }

            let now = Local::now().naive_local();
            let next_run = schedule::next_run_after(now);
            let wait = schedule::sleep_until(now, next_run, self.config.min_cycle_sleep);
            info!("Sleeping {}s until next run at {}", wait.as_secs(), next_run);
            if !schedule::sleep_interruptible(wait, self.shutdown) {
                break;
            }
        }
        info!("Scanner stopped");
    }

    /// One full pass over all configured symbols.
    pub fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let fallback = MockBroker;

        let (broker, session): (&dyn BrokerClient, Session) = match self.broker.login() {
            Ok(session) => (self.broker, session),
            Err(e) => {
                warn!(
                    "Could not login via {}: {}; using mock data for this cycle",
                    self.broker.name(),
                    e
                );
                report.used_fallback = true;
                (&fallback, Session::mock())
            }
        };

        for (index, symbol) in self.config.symbols.iter().copied().enumerate() {
            if self.stopping() {
                report.interrupted = true;
                break;
            }
            if index > 0 && !schedule::sleep_interruptible(self.config.symbol_pause, self.shutdown) {
                report.interrupted = true;
                break;
            }

            match self.process_symbol(broker, &session, symbol) {
                Ok(id) => report.persisted.push((symbol, id)),
                Err(e) => {
                    error!("Error for {}: {}", symbol, e);
                    report.failures.push((symbol, e.to_string()));
                }
            }
        }
        report
    }

    fn process_symbol(&self, broker: &dyn BrokerClient, session: &Session, symbol: Symbol) -> Result<i64> {
        let quote = broker.fetch_quote(session, symbol);
        if let Some(e) = &quote.error {
            warn!(
                "{}: quote via {} failed: {}",
                symbol,
                quote.method.as_deref().unwrap_or("<none>"),
                e
            );
        }
        let option_chain = broker.fetch_option_chain(session, symbol);
        if let Some(e) = &option_chain.error {
            warn!(
                "{}: option chain via {} failed: {}",
                symbol,
                option_chain.method.as_deref().unwrap_or("<none>"),
                e
            );
        }

        let payload = SnapshotPayload {
            ltp: quote,
            option_chain,
            mock: broker.is_mock(),
        };
        let id = self.store.append(&symbol.to_string(), &payload)?;

        let text = payload.alert_text();
        info!("{}", text.replace('\n', " | "));
        let delivery = self.notifier.send(&text);
        if let Delivery::Failed(reason) = &delivery {
            debug!("{}: alert dropped, snapshot {} kept ({})", symbol, id, reason);
        }
        if let Some(ack) = delivery.acknowledgment() {
            debug!("{}: telegram ack {}", symbol, ack);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::args::Args;
    use crate::broker::{BrokerApi, SmartApiClient};
    use crate::config::BrokerCredentials;
    use crate::http::stub::StubTransport;
    use crate::http::HttpReply;
    use clap::Parser;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        let args = Args::parse_from(["alert_scanner", "--mock", "--pause-ms", "0"]);
        let mut config = Config::from_lookup(&args, |_: &str| None).unwrap();
        config.db_path = dir.path().join("alerts.db");
        config
    }

    fn live_broker(replies: Vec<Result<HttpReply>>) -> SmartApiClient<StubTransport> {
        SmartApiClient::new(
            StubTransport::with(replies),
            BrokerApi::LtpData,
            "http://broker.test",
            BrokerCredentials {
                api_key: "key".into(),
                client_code: "A123".into(),
                password: "1234".into(),
                totp_secret: None,
            },
            None,
        )
    }

    fn login_ok() -> Result<HttpReply> {
        Ok(HttpReply::new(200, r#"{"status":true,"data":{"jwtToken":"jwt"}}"#))
    }

    #[test]
    fn mock_cycle_stores_one_snapshot_per_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let store = SnapshotStore::open(&config.db_path).unwrap();
        let transport = StubTransport::default();
        let notifier = Notifier::new(&config.telegram, &transport);
        let shutdown = AtomicBool::new(false);
        let broker = MockBroker;

        let report = Scanner::new(&config, &broker, &store, &notifier, &shutdown).run_cycle();

        assert_eq!(report.persisted.len(), config.symbols.len());
        assert!(report.failures.is_empty());
        assert!(!report.used_fallback);
        let ids: Vec<i64> = report.persisted.iter().map(|(_, id)| *id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(store.count().unwrap(), config.symbols.len() as u64);
        assert!(transport.urls().is_empty());

        for symbol in &config.symbols {
            let snapshots = store.read_by_symbol(&symbol.to_string()).unwrap();
            assert_eq!(snapshots.len(), 1);
            let payload: SnapshotPayload = serde_json::from_value(snapshots[0].payload.clone()).unwrap();
            assert!(payload.mock);
            assert_eq!(payload.ltp.symbol, *symbol);
        }
    }

    #[test]
    fn failing_fetches_are_recorded_and_cycle_continues() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let store = SnapshotStore::open(&config.db_path).unwrap();
        let transport = StubTransport::default();
        let notifier = Notifier::new(&config.telegram, &transport);
        let shutdown = AtomicBool::new(false);
        // Login succeeds, every later call hits a dead connection.
        let broker = live_broker(vec![login_ok()]);

        let report = Scanner::new(&config, &broker, &store, &notifier, &shutdown).run_cycle();

        assert_eq!(report.persisted.len(), 4);
        assert!(!report.used_fallback);
        for symbol in &config.symbols {
            let stored = &store.read_by_symbol(&symbol.to_string()).unwrap()[0].payload;
            assert!(stored["ltp"]["error"].as_str().unwrap().contains("connection refused"));
            assert_eq!(stored["ltp"]["method"], "order.getLtpData");
            assert_eq!(stored["option_chain"]["ok"], false);
            assert_eq!(stored["mock"], false);
        }
    }

    #[test]
    fn failed_login_falls_back_to_mock_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let store = SnapshotStore::open(&config.db_path).unwrap();
        let transport = StubTransport::default();
        let notifier = Notifier::new(&config.telegram, &transport);
        let shutdown = AtomicBool::new(false);
        let broker = live_broker(vec![Ok(HttpReply::new(401, "denied"))]);

        let report = Scanner::new(&config, &broker, &store, &notifier, &shutdown).run_cycle();

        assert!(report.used_fallback);
        assert_eq!(report.persisted.len(), 4);
        // Only the login request reached the broker.
        assert_eq!(broker_requests(&broker), 1);
        let stored = &store.read_by_symbol("NIFTY").unwrap()[0].payload;
        assert_eq!(stored["mock"], true);
        assert_eq!(stored["ltp"]["method"], "mock");
    }

    #[test]
    fn alerts_are_sent_per_symbol_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.telegram.bot_token = Some("t".into());
        config.telegram.chat_id = Some("c".into());
        config.symbols = vec![Symbol::Nifty, Symbol::Reliance];
        let store = SnapshotStore::open(&config.db_path).unwrap();
        // First delivery fails, second succeeds; neither affects persistence.
        let transport = StubTransport::with(vec![
            Ok(HttpReply::new(500, "down")),
            Ok(HttpReply::new(200, r#"{"ok":true}"#)),
        ]);
        let notifier = Notifier::new(&config.telegram, &transport);
        let shutdown = AtomicBool::new(false);

        let report = Scanner::new(&config, &MockBroker, &store, &notifier, &shutdown).run_cycle();

        assert_eq!(report.persisted.len(), 2);
        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].body["text"].as_str().unwrap().starts_with("[MOCK] Snapshot: RELIANCE"));
    }

    #[test]
    fn storage_failure_is_isolated_per_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let store = SnapshotStore::open(&config.db_path).unwrap();
        rusqlite::Connection::open(&config.db_path)
            .unwrap()
            .execute_batch("DROP TABLE snapshots;")
            .unwrap();
        let transport = StubTransport::default();
        let notifier = Notifier::new(&config.telegram, &transport);
        let shutdown = AtomicBool::new(false);

        let report = Scanner::new(&config, &MockBroker, &store, &notifier, &shutdown).run_cycle();

        assert!(report.persisted.is_empty());
        assert!(!report.interrupted);
        let failed: Vec<Symbol> = report.failures.iter().map(|(symbol, _)| *symbol).collect();
        assert_eq!(failed, config.symbols);
        assert!(report.failures.iter().all(|(_, reason)| reason.contains("no such table")));
    }

    #[test]
    fn shutdown_stops_before_next_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.symbol_pause = Duration::from_millis(1);
        let store = SnapshotStore::open(&config.db_path).unwrap();
        let transport = StubTransport::default();
        let notifier = Notifier::new(&config.telegram, &transport);
        let shutdown = AtomicBool::new(true);

        let report = Scanner::new(&config, &MockBroker, &store, &notifier, &shutdown).run_cycle();

        assert!(report.interrupted);
        assert!(report.persisted.is_empty());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn one_shot_run_performs_a_single_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let store = SnapshotStore::open(&config.db_path).unwrap();
        let transport = StubTransport::default();
        let notifier = Notifier::new(&config.telegram, &transport);
        let shutdown = AtomicBool::new(false);

        Scanner::new(&config, &MockBroker, &store, &notifier, &shutdown).run();

        assert_eq!(store.count().unwrap(), config.symbols.len() as u64);
    }

    fn broker_requests(broker: &SmartApiClient<StubTransport>) -> usize {
        broker.transport().urls().len()
    }
}
