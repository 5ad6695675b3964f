use anyhow::{Context, Result};
use axum::http::HeaderName;

use crate::geo::GeoProvider;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. "sqlite:./outpost.db"
    pub database_url: String,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Proxy header whose value is trusted as the caller's IP address.
    /// `None` when TRUSTED_IP_HEADER is set to an empty string, in which case
    /// only the connection address is used.
    pub trusted_ip_header: Option<HeaderName>,

    /// Largest `hours` value accepted by the record query.
    pub max_lookback_hours: i64,

    /// Which public geolocation API backs the resolver.
    pub geoip_provider: GeoProvider,

    /// Per-request timeout for geolocation lookups, in seconds
    pub geoip_timeout_secs: u64,

    pub telegram: TelegramConfig,
}

/// Credentials for the Telegram Bot API. Both fields must be set for the
/// notification channel to deliver anything.
#[derive(Debug, Clone, Default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    /// Bot API base, the token is appended directly, e.g. "https://api.telegram.org/bot"
    pub endpoint: String,
}

pub const DEFAULT_TRUSTED_IP_HEADER: &str = "CF-Connecting-IP";
pub const DEFAULT_MAX_LOOKBACK_HOURS: i64 = 720;
/// Hard ceiling for RECORDS_MAX_LOOKBACK_HOURS (ten years).
pub const LOOKBACK_HOURS_LIMIT: i64 = 24 * 365 * 10;
pub const DEFAULT_TELEGRAM_ENDPOINT: &str = "https://api.telegram.org/bot";

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let trusted_ip_header = parse_trusted_header(
            &std::env::var("TRUSTED_IP_HEADER")
                .unwrap_or_else(|_| DEFAULT_TRUSTED_IP_HEADER.into()),
        )?;

        let max_lookback_hours = parse_max_lookback(
            &std::env::var("RECORDS_MAX_LOOKBACK_HOURS")
                .unwrap_or_else(|_| DEFAULT_MAX_LOOKBACK_HOURS.to_string()),
        )?;

        let geoip_provider = std::env::var("GEOIP_PROVIDER")
            .unwrap_or_else(|_| "ip-api".into())
            .parse::<GeoProvider>()?;

        let geoip_timeout_secs = std::env::var("GEOIP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "3".into())
            .parse::<u64>()
            .context("GEOIP_TIMEOUT_SECS must be a whole number of seconds")?;

        let telegram = TelegramConfig {
            bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
            chat_id: non_empty_var("TELEGRAM_CHAT_ID"),
            endpoint: std::env::var("TELEGRAM_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_TELEGRAM_ENDPOINT.into()),
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./outpost.db".into()),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            trusted_ip_header,
            max_lookback_hours,
            geoip_provider,
            geoip_timeout_secs,
            telegram,
        })
    }
}

fn parse_max_lookback(raw: &str) -> Result<i64> {
    let hours = raw
        .trim()
        .parse::<i64>()
        .context("RECORDS_MAX_LOOKBACK_HOURS must be an integer")?;

    if !(0..=LOOKBACK_HOURS_LIMIT).contains(&hours) {
        anyhow::bail!("RECORDS_MAX_LOOKBACK_HOURS must be between 0 and {LOOKBACK_HOURS_LIMIT}");
    }
    Ok(hours)
}

/// An empty value disables header trust altogether.
fn parse_trusted_header(raw: &str) -> Result<Option<HeaderName>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let name = HeaderName::try_from(raw)
        .with_context(|| format!("TRUSTED_IP_HEADER '{raw}' is not a valid header name"))?;
    Ok(Some(name))
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trusted_header_is_lowercased_header_name() {
        let name = parse_trusted_header("CF-Connecting-IP").unwrap().unwrap();
        assert_eq!(name.as_str(), "cf-connecting-ip");
    }

    #[test]
    fn max_lookback_within_limit_is_accepted() {
        assert_eq!(parse_max_lookback("720").unwrap(), 720);
        assert_eq!(parse_max_lookback("0").unwrap(), 0);
        assert_eq!(
            parse_max_lookback(&LOOKBACK_HOURS_LIMIT.to_string()).unwrap(),
            LOOKBACK_HOURS_LIMIT
        );
    }

    #[test]
    fn max_lookback_outside_limit_is_rejected() {
        for raw in ["-1", "87601", "100000000000", "9223372036854775807", "a week"] {
            let err = parse_max_lookback(raw).unwrap_err();
            assert!(err.to_string().contains("RECORDS_MAX_LOOKBACK_HOURS"), "{raw}");
        }
    }

    #[test]
    fn blank_trusted_header_disables_trust() {
        assert!(parse_trusted_header("").unwrap().is_none());
        assert!(parse_trusted_header("   ").unwrap().is_none());
    }

    #[test]
    fn invalid_trusted_header_is_rejected() {
        let err = parse_trusted_header("bad header").unwrap_err();
        assert!(err.to_string().contains("TRUSTED_IP_HEADER"));
    }
}
