//! Blocking HTTP transport shared by the broker adapters and the notifier.
//!
//! Adapters talk to the network only through `HttpTransport`, so tests can
//! replace it with canned replies and mock mode never needs one.
use std::collections::BTreeMap;
use std::time::Duration;

use alert_common::{AlertError, Result};
use log::debug;
use serde_json::Value;

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Minimal POST-only transport contract.
///
/// `Err` means the exchange never completed (connect, timeout, body read).
/// Any status code, including 4xx/5xx, is returned as `Ok`.
pub trait HttpTransport {
    fn post_json(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: &Value,
    ) -> Result<HttpReply>;

    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<HttpReply>;
}

/// Production transport backed by `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("alert_scanner/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    fn finish(response: reqwest::blocking::Response) -> Result<HttpReply> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| AlertError::Format(format!("failed to read response body: {e}")))?;
        Ok(HttpReply::new(status, body))
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: &Value,
    ) -> Result<HttpReply> {
        debug!("POST {}", url);
        let mut builder = self.client.post(url).json(body);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        Self::finish(builder.send()?)
    }

    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<HttpReply> {
        Self::finish(self.client.post(url).form(fields).send()?)
    }
}
