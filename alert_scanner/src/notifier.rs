//! Telegram alert delivery.
//!
//! `send` never fails: an unconfigured notifier skips silently, and transport or
//! API failures are logged and reported as `Delivery::Failed`.
use alert_common::AlertError;
use log::{debug, error, info};
use serde_json::Value;

use crate::config::TelegramConfig;
use crate::http::HttpTransport;

/// Outcome of a single `send`.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Bot token or chat id is unset; nothing was sent.
    Skipped,
    /// Telegram accepted the message; carries its JSON response.
    Sent(Value),
    /// The message could not be delivered.
    Failed(String),
}

impl Delivery {
    /// Delivery acknowledgment, if any.
    pub fn acknowledgment(&self) -> Option<&Value> {
        match self {
            Delivery::Sent(ack) => Some(ack),
            _ => None,
        }
    }
}

/// Sends plain-text alerts to one chat.
pub struct Notifier<'a> {
    config: &'a TelegramConfig,
    transport: &'a dyn HttpTransport,
}

impl<'a> Notifier<'a> {
    pub fn new(config: &'a TelegramConfig, transport: &'a dyn HttpTransport) -> Self {
        Self { config, transport }
    }

    pub fn is_configured(&self) -> bool {
        self.config.credentials().is_some()
    }

    pub fn send(&self, text: &str) -> Delivery {
        let Some((token, chat_id)) = self.config.credentials() else {
            debug!("Telegram not configured, skipping send.");
            return Delivery::Skipped;
        };
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            token
        );

        match self.deliver(&url, chat_id, text) {
            Ok(ack) => {
                info!("Alert delivered to chat {}", chat_id);
                Delivery::Sent(ack)
            }
            Err(e) => {
                error!("Telegram send failed: {}", e);
                Delivery::Failed(e.to_string())
            }
        }
    }

    fn deliver(&self, url: &str, chat_id: &str, text: &str) -> Result<Value, AlertError> {
        let reply = self
            .transport
            .post_form(url, &[("chat_id", chat_id), ("text", text)])
            .map_err(|e| AlertError::Notify(e.to_string()))?;
        if !reply.is_success() {
            return Err(AlertError::Notify(format!(
                "HTTP {}: {}",
                reply.status,
                reply.body.trim()
            )));
        }
        Ok(reply.json().unwrap_or(Value::String(reply.body)))
    }
}
