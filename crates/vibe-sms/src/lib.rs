//! Outbound SMS delivery.
//!
//! `MnotifyGateway` talks to the mNotify bulk SMS HTTP API. `LogGateway`
//! stands in when no API key is configured and `MemoryGateway` records
//! messages for tests.

use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

pub const DEFAULT_MNOTIFY_URL: &str = "https://apps.mnotify.net/smsapi";
pub const DEFAULT_SENDER_ID: &str = "VIBE";

#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Deliver `message` to a single `recipient` phone number.
    async fn send(&self, message: &str, recipient: &str) -> Result<()>;
}

/// Rewrite an international Ghanaian number to its local `0`-prefixed form.
/// Numbers of ten characters or fewer pass through unchanged.
pub fn parse_number(number: &str) -> String {
    if number.len() <= 10 {
        return number.to_string();
    }
    if let Some(rest) = number.strip_prefix("+2330") {
        format!("0{}", rest)
    } else if number.starts_with('+') {
        number.replacen("+233", "0", 1)
    } else if let Some(rest) = number.strip_prefix("233") {
        format!("0{}", rest)
    } else {
        number.to_string()
    }
}

#[derive(Serialize)]
struct MnotifyForm<'a> {
    key: &'a str,
    to: &'a str,
    msg: &'a str,
    sender_id: &'a str,
}

pub struct MnotifyGateway {
    client: Client,
    url: String,
    api_key: String,
    sender_id: String,
}

impl MnotifyGateway {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, sender_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key: api_key.into(),
            sender_id: sender_id.into(),
        }
    }
}

#[async_trait]
impl SmsGateway for MnotifyGateway {
    async fn send(&self, message: &str, recipient: &str) -> Result<()> {
        let to = parse_number(recipient);
        let form = MnotifyForm {
            key: &self.api_key,
            to: &to,
            msg: message,
            sender_id: &self.sender_id,
        };

        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .context("SMS request failed")?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or(serde_json::Value::Null);

        if !status.is_success() {
            return Err(anyhow!("SMS gateway returned {}: {}", status, body));
        }

        debug!("SMS sent to {}: {}", to, body);
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
pub struct LogGateway;

#[async_trait]
impl SmsGateway for LogGateway {
    async fn send(&self, message: &str, recipient: &str) -> Result<()> {
        info!("SMS to {} (not sent, no gateway configured): {}", recipient, message);
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Default)]
pub struct MemoryGateway {
    sent: Mutex<Vec<(String, String)>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(recipient, message)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_to(&self, recipient: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|(to, _)| to == recipient)
            .map(|(_, msg)| msg)
    }
}

#[async_trait]
impl SmsGateway for MemoryGateway {
    async fn send(&self, message: &str, recipient: &str) -> Result<()> {
        self.sent
            .lock()
            .map_err(|e| anyhow!("SMS log lock poisoned: {}", e))?
            .push((recipient.to_string(), message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_numbers_pass_through() {
        assert_eq!(parse_number("0551234567"), "0551234567");
    }

    #[test]
    fn international_forms_become_local() {
        assert_eq!(parse_number("+233551234567"), "0551234567");
        assert_eq!(parse_number("+2330551234567"), "0551234567");
        assert_eq!(parse_number("233551234567"), "0551234567");
    }

    #[test]
    fn other_long_numbers_are_kept() {
        assert_eq!(parse_number("44123456789"), "44123456789");
    }

    #[tokio::test]
    async fn memory_gateway_records_messages() {
        let gateway = MemoryGateway::new();
        gateway.send("hello", "0551234567").await.unwrap();
        gateway.send("again", "0551234567").await.unwrap();

        assert_eq!(gateway.sent().len(), 2);
        assert_eq!(gateway.last_to("0551234567").as_deref(), Some("again"));
        assert_eq!(gateway.last_to("0200000000"), None);
    }
}
