//! SmartAPI REST adapter.
//!
//! Quote and option-chain fetches probe an ordered list of candidate
//! operations. An operation that answers HTTP 404 is treated as absent on
//! this API version and the next candidate is tried; the first operation that
//! answers at all decides the outcome, and its name is recorded in the result.
use std::collections::BTreeMap;

use alert_common::net::{self, LOGIN_PATH, LTP_DATA_PATH, MARKET_QUOTE_PATH, OPTION_GREEK_PATH};
use alert_common::{AlertError, OptionChainResult, QuoteResult, Result, Symbol};
use log::{debug, info, warn};
use serde_json::{json, Value};

use super::extract::{PRICE, VOLUME};
use super::{otp, BrokerApi, BrokerClient, Session};
use crate::config::BrokerCredentials;
use crate::http::HttpTransport;

/// A single SmartAPI endpoint the adapters know how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    MarketQuote,
    LtpData,
    OptionGreek,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::MarketQuote => "market.quote",
            Operation::LtpData => "order.getLtpData",
            Operation::OptionGreek => "marketData.optionGreek",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            Operation::MarketQuote => MARKET_QUOTE_PATH,
            Operation::LtpData => LTP_DATA_PATH,
            Operation::OptionGreek => OPTION_GREEK_PATH,
        }
    }
}

impl BrokerApi {
    /// Quote candidates, in probe order.
    pub fn quote_operations(&self) -> &'static [Operation] {
        match self {
            BrokerApi::MarketQuote => &[Operation::MarketQuote, Operation::LtpData],
            BrokerApi::LtpData => &[Operation::LtpData, Operation::MarketQuote],
            BrokerApi::Mock => &[],
        }
    }

    /// Option-chain candidates, in probe order.
    pub fn option_chain_operations(&self) -> &'static [Operation] {
        match self {
            BrokerApi::MarketQuote => &[Operation::OptionGreek],
            BrokerApi::LtpData | BrokerApi::Mock => &[],
        }
    }
}

/// Outcome of probing a candidate list.
enum Probe {
    Answered(Operation, Value),
    Failed(Operation, AlertError),
    Unavailable,
}

/// Live SmartAPI client for one API shape.
pub struct SmartApiClient<T> {
    transport: T,
    api: BrokerApi,
    base_url: String,
    credentials: BrokerCredentials,
    option_expiry: Option<String>,
}

impl<T: HttpTransport> SmartApiClient<T> {
    pub fn new(
        transport: T,
        api: BrokerApi,
        base_url: &str,
        credentials: BrokerCredentials,
        option_expiry: Option<String>,
    ) -> Self {
        Self {
            transport,
            api,
            base_url: base_url.to_string(),
            credentials,
            option_expiry,
        }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    fn headers(&self, session: Option<&Session>) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        for (name, value) in [
            ("Accept", "application/json"),
            ("X-UserType", "USER"),
            ("X-SourceID", "WEB"),
            ("X-ClientLocalIP", "127.0.0.1"),
            ("X-ClientPublicIP", "127.0.0.1"),
            ("X-MACAddress", "00:00:00:00:00:00"),
        ] {
            headers.insert(name.to_string(), value.to_string());
        }
        headers.insert("X-PrivateKey".to_string(), self.credentials.api_key.clone());
        if let Some(session) = session {
            headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", session.jwt_token),
            );
        }
        headers
    }

    fn one_time_code(&self) -> String {
        match self.credentials.totp_secret.as_deref() {
            Some(secret) => match otp::current_code(secret) {
                Ok(code) => {
                    debug!("Using generated TOTP");
                    code
                }
                Err(e) => {
                    warn!("TOTP generation failed, logging in without it: {}", e);
                    String::new()
                }
            },
            None => String::new(),
        }
    }

    /// Call one operation. `Ok(None)` means the endpoint does not exist.
    fn call(&self, session: &Session, symbol: Symbol, op: Operation, body: &Value) -> Result<Option<Value>> {
        let url = net::url(&self.base_url, op.path());
        let reply = self
            .transport
            .post_json(&url, &self.headers(Some(session)), body)
            .map_err(|e| AlertError::fetch(&symbol.to_string(), op.name(), e.to_string()))?;

        if reply.status == 404 {
            return Ok(None);
        }
        if !reply.is_success() {
            return Err(AlertError::fetch(
                &symbol.to_string(),
                op.name(),
                format!("HTTP {}: {}", reply.status, reply.body.trim()),
            ));
        }
        let response = reply
            .json()
            .map_err(|e| AlertError::fetch(&symbol.to_string(), op.name(), e.to_string()))?;
        if let Some(message) = rejection(&response) {
            return Err(AlertError::fetch(&symbol.to_string(), op.name(), message));
        }
        Ok(Some(response))
    }

    fn probe(&self, session: &Session, symbol: Symbol, candidates: &[(Operation, Value)]) -> Probe {
        for (op, body) in candidates {
            match self.call(session, symbol, *op, body) {
                Ok(Some(response)) => {
                    debug!("{} answered {} for {}", self.api, op.name(), symbol);
                    return Probe::Answered(*op, response);
                }
                Ok(None) => debug!("{} not available on this API version", op.name()),
                Err(e) => return Probe::Failed(*op, e),
            }
        }
        Probe::Unavailable
    }

    fn quote_body(op: Operation, symbol: Symbol) -> Value {
        match op {
            Operation::LtpData => json!({
                "exchange": symbol.exchange().to_string(),
                "tradingsymbol": symbol.trading_symbol(),
                "symboltoken": symbol.token(),
            }),
            _ => json!({
                "mode": "FULL",
                "exchangeTokens": { (symbol.exchange().to_string()): [symbol.token()] },
            }),
        }
    }
}

/// SmartAPI signals logical failures with `"status": false` and a message.
fn rejection(response: &Value) -> Option<String> {
    if response.get("status") != Some(&Value::Bool(false)) {
        return None;
    }
    let message = response
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("request rejected");
    Some(match response.get("errorcode").and_then(Value::as_str) {
        Some(code) if !code.is_empty() => format!("{message} ({code})"),
        _ => message.to_string(),
    })
}

impl<T: HttpTransport> BrokerClient for SmartApiClient<T> {
    fn name(&self) -> &'static str {
        match self.api {
            BrokerApi::MarketQuote => "smartapi/market-quote",
            BrokerApi::LtpData => "smartapi/ltp-data",
            BrokerApi::Mock => "smartapi/mock",
        }
    }

    fn login(&self) -> Result<Session> {
        let url = net::url(&self.base_url, LOGIN_PATH);
        let body = json!({
            "clientcode": self.credentials.client_code,
            "password": self.credentials.password,
            "totp": self.one_time_code(),
        });
        let reply = self
            .transport
            .post_json(&url, &self.headers(None), &body)
            .map_err(|e| AlertError::Auth(e.to_string()))?;
        if !reply.is_success() {
            return Err(AlertError::Auth(format!("HTTP {}: {}", reply.status, reply.body.trim())));
        }
        let response = reply
            .json()
            .map_err(|e| AlertError::Auth(format!("unreadable login response: {e}")))?;
        if let Some(message) = rejection(&response) {
            return Err(AlertError::Auth(message));
        }
        let jwt_token = response
            .pointer("/data/jwtToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AlertError::Auth("login response carried no jwtToken".into()))?;
        let session = Session {
            jwt_token: jwt_token.trim_start_matches("Bearer ").to_string(),
            feed_token: response
                .pointer("/data/feedToken")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        info!(
            "Login OK for {} (feed token: {})",
            self.credentials.client_code,
            session.feed_token.is_some()
        );
        Ok(session)
    }

    fn fetch_quote(&self, session: &Session, symbol: Symbol) -> QuoteResult {
        let candidates: Vec<(Operation, Value)> = self
            .api
            .quote_operations()
            .iter()
            .map(|op| (*op, Self::quote_body(*op, symbol)))
            .collect();

        match self.probe(session, symbol, &candidates) {
            Probe::Answered(op, response) => {
                let ltp = PRICE.number(&response);
                let volume = VOLUME.count(&response);
                if ltp.is_none() {
                    warn!("{}: {} answered without a known price field", symbol, op.name());
                }
                QuoteResult::fetched(symbol, op.name(), ltp, volume, response)
            }
            Probe::Failed(op, e) => QuoteResult::failed(symbol, Some(op.name()), e.to_string()),
            Probe::Unavailable => QuoteResult::failed(
                symbol,
                None,
                format!("no quote operation available on {}; check API version", self.api),
            ),
        }
    }

    fn fetch_option_chain(&self, session: &Session, symbol: Symbol) -> OptionChainResult {
        let operations = self.api.option_chain_operations();
        if operations.is_empty() {
            return OptionChainResult::failed(
                None,
                format!("no option chain operation on {}", self.api),
            );
        }
        let Some(expiry) = self.option_expiry.as_deref() else {
            return OptionChainResult::failed(
                None,
                "option chain needs an expiry; set ALERT_OPTION_EXPIRY (e.g. 26DEC2024)",
            );
        };
        let candidates: Vec<(Operation, Value)> = operations
            .iter()
            .map(|op| (*op, json!({ "name": symbol.to_string(), "expirydate": expiry })))
            .collect();

        match self.probe(session, symbol, &candidates) {
            Probe::Answered(op, response) => {
                let data = response.get("data").cloned().unwrap_or(response);
                OptionChainResult::fetched(op.name(), data)
            }
            Probe::Failed(op, e) => OptionChainResult::failed(Some(op.name()), e.to_string()),
            Probe::Unavailable => OptionChainResult::failed(
                None,
                format!("no option chain operation answered on {}", self.api),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stub::StubTransport;
    use crate::http::HttpReply;

    fn credentials() -> BrokerCredentials {
        BrokerCredentials {
            api_key: "key".into(),
            client_code: "A123".into(),
            password: "1234".into(),
            totp_secret: None,
        }
    }

    fn client(api: BrokerApi, replies: Vec<Result<HttpReply>>) -> SmartApiClient<StubTransport> {
        SmartApiClient::new(
            StubTransport::with(replies),
            api,
            "http://broker.test",
            credentials(),
            Some("26DEC2024".into()),
        )
    }

    fn session() -> Session {
        Session {
            jwt_token: "jwt".into(),
            feed_token: None,
        }
    }

    #[test]
    fn login_extracts_jwt_and_sends_credentials() {
        let broker = client(
            BrokerApi::MarketQuote,
            vec![Ok(HttpReply::new(
                200,
                r#"{"status":true,"data":{"jwtToken":"Bearer abc","feedToken":"f"}}"#,
            ))],
        );
        let session = broker.login().unwrap();
        assert_eq!(session.jwt_token, "abc");

        let requests = broker.transport.requests.borrow();
        assert!(requests[0].url.ends_with(LOGIN_PATH));
        assert_eq!(requests[0].body["clientcode"], "A123");
        assert_eq!(requests[0].headers["X-PrivateKey"], "key");
        assert!(!requests[0].headers.contains_key("Authorization"));
    }

    #[test]
    fn rejected_login_is_auth_error() {
        let broker = client(
            BrokerApi::MarketQuote,
            vec![Ok(HttpReply::new(
                200,
                r#"{"status":false,"message":"Invalid totp","errorcode":"AB1050"}"#,
            ))],
        );
        match broker.login() {
            Err(AlertError::Auth(message)) => assert_eq!(message, "Invalid totp (AB1050)"),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[test]
    fn absent_operation_falls_through_to_next_candidate() {
        let broker = client(
            BrokerApi::MarketQuote,
            vec![
                Ok(HttpReply::new(404, "Not Found")),
                Ok(HttpReply::new(200, r#"{"status":true,"data":{"ltp":2931.5}}"#)),
            ],
        );
        let quote = broker.fetch_quote(&session(), Symbol::Reliance);
        assert_eq!(quote.method.as_deref(), Some("order.getLtpData"));
        assert_eq!(quote.ltp, Some(2931.5));
        assert!(quote.error.is_none());

        let urls = broker.transport.urls();
        assert!(urls[0].ends_with(MARKET_QUOTE_PATH));
        assert!(urls[1].ends_with(LTP_DATA_PATH));
        let requests = broker.transport.requests.borrow();
        assert_eq!(requests[1].body["symboltoken"], "2885");
        assert_eq!(requests[1].headers["Authorization"], "Bearer jwt");
    }

    #[test]
    fn ltp_shape_probes_legacy_endpoint_first() {
        let broker = client(
            BrokerApi::LtpData,
            vec![Ok(HttpReply::new(200, r#"{"status":true,"data":{"ltp":1500}}"#))],
        );
        let quote = broker.fetch_quote(&session(), Symbol::Hdfcbank);
        assert_eq!(quote.method.as_deref(), Some("order.getLtpData"));
        assert_eq!(broker.transport.urls().len(), 1);
    }

    #[test]
    fn transport_failure_becomes_diagnostic_result() {
        let broker = client(BrokerApi::MarketQuote, vec![]);
        let quote = broker.fetch_quote(&session(), Symbol::Nifty);
        assert_eq!(quote.ltp, None);
        assert_eq!(quote.method.as_deref(), Some("market.quote"));
        let error = quote.error.unwrap();
        assert!(error.contains("NIFTY"));
        assert!(error.contains("connection refused"));
    }

    #[test]
    fn server_error_stops_probing() {
        let broker = client(
            BrokerApi::MarketQuote,
            vec![Ok(HttpReply::new(500, "boom")), Ok(HttpReply::new(200, "{}"))],
        );
        let quote = broker.fetch_quote(&session(), Symbol::Sensex);
        assert!(quote.error.unwrap().contains("HTTP 500"));
        assert_eq!(broker.transport.urls().len(), 1);
    }

    #[test]
    fn every_candidate_absent_reports_unavailable() {
        let broker = client(
            BrokerApi::MarketQuote,
            vec![Ok(HttpReply::new(404, "")), Ok(HttpReply::new(404, ""))],
        );
        let quote = broker.fetch_quote(&session(), Symbol::Sensex);
        assert!(quote.method.is_none());
        assert!(quote.error.unwrap().contains("no quote operation"));
    }

    #[test]
    fn option_chain_uses_expiry_and_unwraps_data() {
        let broker = client(
            BrokerApi::MarketQuote,
            vec![Ok(HttpReply::new(
                200,
                r#"{"status":true,"data":[{"strikePrice":22000,"optionType":"CE"}]}"#,
            ))],
        );
        let chain = broker.fetch_option_chain(&session(), Symbol::Nifty);
        assert!(chain.ok);
        assert_eq!(chain.method.as_deref(), Some("marketData.optionGreek"));
        assert_eq!(chain.data.unwrap()[0]["strikePrice"], 22000);
        let requests = broker.transport.requests.borrow();
        assert_eq!(requests[0].body["name"], "NIFTY");
        assert_eq!(requests[0].body["expirydate"], "26DEC2024");
    }

    #[test]
    fn option_chain_without_expiry_is_not_attempted() {
        let broker = SmartApiClient::new(
            StubTransport::default(),
            BrokerApi::MarketQuote,
            "http://broker.test",
            credentials(),
            None,
        );
        let chain = broker.fetch_option_chain(&session(), Symbol::Nifty);
        assert!(!chain.ok);
        assert!(chain.error.unwrap().contains("ALERT_OPTION_EXPIRY"));
        assert!(broker.transport.urls().is_empty());
    }

    #[test]
    fn ltp_shape_has_no_option_chain() {
        let broker = client(BrokerApi::LtpData, vec![]);
        let chain = broker.fetch_option_chain(&session(), Symbol::Reliance);
        assert!(!chain.ok);
        assert!(chain.method.is_none());
        assert!(broker.transport.urls().is_empty());
    }
}
