//! Runtime configuration read from the environment (and `.env`, if present).

use crate::error::{PaymentError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TOSS_BASE_URL: &str = "https://api.tosspayments.com";

/// Settings of the PG HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub secret_key: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Total attempts per request, the first one included.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub max_retry_backoff: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TOSS_BASE_URL.to_string(),
            secret_key: String::new(),
            connect_timeout: Duration::from_millis(10_000),
            read_timeout: Duration::from_millis(30_000),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(200),
            max_retry_backoff: Duration::from_millis(2_000),
        }
    }
}

impl GatewayConfig {
    /// Backoff before retry number `retry` (1-based): doubles each time and
    /// never exceeds `max_retry_backoff`.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.retry_backoff
            .saturating_mul(factor)
            .min(self.max_retry_backoff)
    }
}

/// Topic names and event source of outbound refund events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTopics {
    pub payment_refunded: String,
    pub payment_refund_failed: String,
    pub source: String,
}

impl Default for EventTopics {
    fn default() -> Self {
        Self {
            payment_refunded: "payment-refunded".to_string(),
            payment_refund_failed: "payment-refund-failed".to_string(),
            source: "payment-service".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub topics: EventTopics,
}

impl AppConfig {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset keys keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(default)
        };

        let gateway = GatewayConfig {
            base_url: text("TOSS_BASE_URL", defaults.gateway.base_url)
                .trim_end_matches('/')
                .to_string(),
            secret_key: lookup("TOSS_SECRET_KEY").unwrap_or_default(),
            connect_timeout: millis(
                &lookup,
                "PG_CONNECT_TIMEOUT_MS",
                defaults.gateway.connect_timeout,
            )?,
            read_timeout: millis(&lookup, "PG_READ_TIMEOUT_MS", defaults.gateway.read_timeout)?,
            max_attempts: parsed(&lookup, "PG_MAX_ATTEMPTS", defaults.gateway.max_attempts)?,
            retry_backoff: millis(
                &lookup,
                "PG_RETRY_BACKOFF_MS",
                defaults.gateway.retry_backoff,
            )?,
            max_retry_backoff: millis(
                &lookup,
                "PG_MAX_RETRY_BACKOFF_MS",
                defaults.gateway.max_retry_backoff,
            )?,
        };
        if gateway.max_attempts == 0 {
            return Err(PaymentError::Config(
                "PG_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let topics = EventTopics {
            payment_refunded: text("TOPIC_PAYMENT_REFUNDED", defaults.topics.payment_refunded),
            payment_refund_failed: text(
                "TOPIC_PAYMENT_REFUND_FAILED",
                defaults.topics.payment_refund_failed,
            ),
            source: text("EVENT_SOURCE", defaults.topics.source),
        };

        Ok(Self { gateway, topics })
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| PaymentError::Config(format!("{key}={raw}: {e}"))),
        _ => Ok(default),
    }
}

fn millis<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parsed(lookup, key, default_ms).map(Duration::from_millis)
}
