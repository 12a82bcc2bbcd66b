//! Offline broker that synthesizes deterministic placeholder data.
//!
//! Used for `--mock` runs and as the per-cycle fallback when a live login
//! fails. Payloads have the same keys as live ones; only the values differ.
use alert_common::{OptionChainResult, QuoteResult, Result, Symbol};
use serde_json::{json, Value};

use super::{BrokerClient, Session};

/// Operation name recorded on synthesized results.
pub const MOCK_METHOD: &str = "mock";

/// Strikes listed on each side of the at-the-money strike.
const STRIKES_PER_SIDE: i64 = 2;

#[derive(Debug, Default, Clone, Copy)]
pub struct MockBroker;

impl MockBroker {
    fn strike_step(symbol: Symbol) -> f64 {
        match symbol {
            Symbol::Nifty => 50.0,
            Symbol::Sensex => 100.0,
            Symbol::Reliance => 20.0,
            Symbol::Hdfcbank => 10.0,
        }
    }

    fn volume(symbol: Symbol) -> u64 {
        if symbol.is_index() { 0 } else { 1_000_000 }
    }

    fn chain(symbol: Symbol) -> Value {
        let step = Self::strike_step(symbol);
        let atm = (symbol.reference_price() / step).round() * step;
        let strikes: Vec<Value> = (-STRIKES_PER_SIDE..=STRIKES_PER_SIDE)
            .map(|i| {
                let strike = atm + i as f64 * step;
                json!({
                    "strikePrice": strike,
                    "ce_ltp": (atm - strike).max(0.0) + step,
                    "pe_ltp": (strike - atm).max(0.0) + step,
                })
            })
            .collect();
        Value::Array(strikes)
    }
}

impl BrokerClient for MockBroker {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_mock(&self) -> bool {
        true
    }

    fn login(&self) -> Result<Session> {
        Ok(Session::mock())
    }

    fn fetch_quote(&self, _session: &Session, symbol: Symbol) -> QuoteResult {
        let ltp = symbol.reference_price();
        let volume = Self::volume(symbol);
        QuoteResult::fetched(
            symbol,
            MOCK_METHOD,
            Some(ltp),
            Some(volume),
            json!({ "mock": true, "ltp": ltp, "volume": volume }),
        )
    }

    fn fetch_option_chain(&self, _session: &Session, symbol: Symbol) -> OptionChainResult {
        OptionChainResult::fetched(MOCK_METHOD, Self::chain(symbol))
    }
}
