//! Broker client adapters.
//!
//! `BrokerClient` is the stable internal interface the orchestrator talks to.
//! Each supported SmartAPI endpoint layout gets its own `BrokerApi` shape,
//! chosen once from configuration:
//!
//! - `market-quote` — FULL-mode market quote first, legacy LTP endpoint second,
//!   option greeks for the chain.
//! - `ltp-data` — legacy LTP endpoint first, market quote second, no chain.
//! - `mock` — no network at all; deterministic placeholder data.
//!
//! Fetches never fail: every error is folded into the returned result so the
//! orchestrator can move on to the next symbol.
use alert_common::{AlertError, ConfigError, OptionChainResult, QuoteResult, Result, Symbol};
use strum_macros::{Display, EnumString};

use crate::config::Config;
use crate::http::ReqwestTransport;

pub mod extract;
pub mod mock;
pub mod otp;
pub mod smart_api;

pub use mock::MockBroker;
pub use smart_api::SmartApiClient;

/// Supported broker API shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum BrokerApi {
    MarketQuote,
    LtpData,
    Mock,
}

/// Authenticated broker session. Opaque outside the adapters.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) jwt_token: String,
    pub(crate) feed_token: Option<String>,
}

impl Session {
    pub(crate) fn mock() -> Self {
        Self {
            jwt_token: String::from("mock"),
            feed_token: None,
        }
    }
}

/// Stable adapter interface used by the cycle orchestrator.
pub trait BrokerClient {
    /// Shape name used in logs.
    fn name(&self) -> &'static str;

    /// `true` when results are synthesized rather than fetched.
    fn is_mock(&self) -> bool {
        false
    }

    fn login(&self) -> Result<Session>;

    fn fetch_quote(&self, session: &Session, symbol: Symbol) -> QuoteResult;

    fn fetch_option_chain(&self, session: &Session, symbol: Symbol) -> OptionChainResult;
}

/// Build the adapter selected by `config` on top of `transport`.
pub fn connect(config: &Config, transport: ReqwestTransport) -> Result<Box<dyn BrokerClient>> {
    if config.broker_api == BrokerApi::Mock {
        return Ok(Box::new(MockBroker));
    }
    let credentials = config
        .credentials
        .clone()
        .ok_or(AlertError::Config(ConfigError::MissingCredential("ANGEL_API_KEY")))?;
    let client = SmartApiClient::new(
        transport,
        config.broker_api,
        &config.broker_base_url,
        credentials,
        config.option_expiry.clone(),
    );
    Ok(Box::new(client))
}
