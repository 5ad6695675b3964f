//! Outbound notification delivery.
//!
//! [`TelegramChannel`] posts plain-text messages through the Telegram Bot API.
//! Each call is a single attempt; retrying is left to the caller.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::TelegramConfig;

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Telegram is not configured (set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID)")]
    NotConfigured,

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The Bot API answered with an error status or `ok: false`.
    #[error("Telegram API returned HTTP {status}: {description}")]
    Rejected { status: u16, description: String },
}

/// Delivers a one-shot message to an out-of-band destination.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

// ── TelegramChannel ─────────────────────────────────────────────────────────

pub struct TelegramChannel {
    client: reqwest::Client,
    config: TelegramConfig,
}

#[derive(Deserialize)]
struct BotApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.bot_token.is_some() && self.config.chat_id.is_some()
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let (Some(token), Some(chat_id)) = (&self.config.bot_token, &self.config.chat_id) else {
            return Err(NotifyError::NotConfigured);
        };

        let url = format!("{}{}/sendMessage", self.config.endpoint, token);
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": message,
        });

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();
        let body: BotApiResponse = response.json().await?;

        if !status.is_success() || !body.ok {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: body.description.unwrap_or_else(|| "no description".into()),
            });
        }

        tracing::debug!(chat_id = %chat_id, "Telegram message delivered");
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
