//! Snapshot payloads persisted once per symbol per cycle.
//!
//! A `SnapshotPayload` bundles the quote and option-chain results fetched for a single
//! symbol. Both results are diagnostic values: a failed call still produces a result,
//! with the failure text under the `error` key, so a payload can always be stored.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::symbols::Symbol;

/// Outcome of a quote fetch for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResult {
    /// Symbol the quote was requested for.
    pub symbol: Symbol,
    /// Last traded price, if one of the known price fields was present.
    pub ltp: Option<f64>,
    /// Traded volume, if one of the known volume fields was present.
    pub volume: Option<u64>,
    /// Broker operation that answered the request.
    pub method: Option<String>,
    /// Raw response body as returned by the broker.
    pub raw: Option<Value>,
    /// Failure description when no operation produced data.
    pub error: Option<String>,
}

impl QuoteResult {
    /// Successful fetch through `method`.
    pub fn fetched(
        symbol: Symbol,
        method: &str,
        ltp: Option<f64>,
        volume: Option<u64>,
        raw: Value,
    ) -> Self {
        Self {
            symbol,
            ltp,
            volume,
            method: Some(method.to_string()),
            raw: Some(raw),
            error: None,
        }
    }

    /// Diagnostic placeholder for a failed fetch.
    pub fn failed(symbol: Symbol, method: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            symbol,
            ltp: None,
            volume: None,
            method: method.map(str::to_string),
            raw: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of an option-chain fetch for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChainResult {
    /// `true` when an operation returned chain data.
    pub ok: bool,
    /// Broker operation that answered the request.
    pub method: Option<String>,
    /// Chain data as returned by the broker.
    pub data: Option<Value>,
    /// Failure description when `ok` is `false`.
    pub error: Option<String>,
}

impl OptionChainResult {
    /// Successful fetch through `method`.
    pub fn fetched(method: &str, data: Value) -> Self {
        Self {
            ok: true,
            method: Some(method.to_string()),
            data: Some(data),
            error: None,
        }
    }

    /// Diagnostic placeholder for a failed or unsupported fetch.
    pub fn failed(method: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            method: method.map(str::to_string),
            data: None,
            error: Some(error.into()),
        }
    }
}

/// JSON blob persisted in the snapshot log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    /// Quote fetch outcome.
    pub ltp: QuoteResult,
    /// Option-chain fetch outcome.
    pub option_chain: OptionChainResult,
    /// `true` when the data was synthesized instead of fetched.
    #[serde(default)]
    pub mock: bool,
}

impl SnapshotPayload {
    /// Human-readable alert text for this payload.
    pub fn alert_text(&self) -> String {
        let ltp = self
            .ltp
            .ltp
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| String::from("None"));
        let prefix = if self.mock { "[MOCK] " } else { "" };
        format!(
            "{}Snapshot: {}\nLTP: {}\nOptionChain_ok: {}\nNote: Check logs for details.",
            prefix, self.ltp.symbol, ltp, self.option_chain.ok
        )
    }
}

/// One persisted record of the snapshot log.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Auto-increment row identifier.
    pub id: i64,
    /// Symbol the record belongs to.
    pub symbol: String,
    /// UTC write time.
    pub timestamp: DateTime<Utc>,
    /// Stored JSON payload.
    pub payload: Value,
}
