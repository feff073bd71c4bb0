use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use super::validate_interval;
use crate::constants::MIN_LIFETIME_TO_KEEP_ALIVE_RATIO;
use crate::Error;
use crate::Result;

/// Limits applied when revising client-requested subscription parameters
///
/// # Usage
///
/// ```toml
/// [subscription]
/// min_publishing_interval_ms = 50.0
/// default_keep_alive_count = 10
/// max_subscriptions_per_session = 100
/// ```
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SubscriptionConfig {
    /// Lower bound of the revised publishing interval
    ///
    /// Non-positive requests are revised up to this value.
    /// Default: 50ms
    #[serde(default = "default_min_publishing_interval_ms")]
    pub min_publishing_interval_ms: f64,

    /// Upper bound of the revised publishing interval
    ///
    /// Default: 3_600_000ms (1 hour)
    #[serde(default = "default_max_publishing_interval_ms")]
    pub max_publishing_interval_ms: f64,

    /// Keep-alive count granted when a client requests 0
    #[serde(default = "default_keep_alive_count")]
    pub default_keep_alive_count: u32,

    /// Upper bound of the revised keep-alive count
    #[serde(default = "default_max_keep_alive_count")]
    pub max_keep_alive_count: u32,

    /// Upper bound of the revised lifetime count
    ///
    /// Must be at least 3 × `max_keep_alive_count` so every revised
    /// subscription can honour the lifetime/keep-alive ratio.
    #[serde(default = "default_max_lifetime_count")]
    pub max_lifetime_count: u32,

    /// Live subscriptions one session may own before
    /// CreateSubscription and TransferSubscriptions fail with BadTooManySubscriptions
    #[serde(default = "default_max_subscriptions_per_session")]
    pub max_subscriptions_per_session: usize,

    /// Server cap on notifications per NotificationMessage
    ///
    /// Applied when a client requests 0 ("no limit") or asks for more.
    /// 0 disables the cap.
    #[serde(default = "default_max_notifications_per_publish")]
    pub max_notifications_per_publish: u32,

    /// Sent but unacknowledged messages kept per subscription for Republish
    ///
    /// The oldest message is discarded once the history is full.
    #[serde(default = "default_max_retransmission_queue_size")]
    pub max_retransmission_queue_size: usize,
}

fn default_min_publishing_interval_ms() -> f64 {
    50.0
}
fn default_max_publishing_interval_ms() -> f64 {
    3_600_000.0
}
fn default_keep_alive_count() -> u32 {
    10
}
fn default_max_keep_alive_count() -> u32 {
    10_000
}
fn default_max_lifetime_count() -> u32 {
    30_000
}
fn default_max_subscriptions_per_session() -> usize {
    100
}
fn default_max_notifications_per_publish() -> u32 {
    1000
}
fn default_max_retransmission_queue_size() -> usize {
    32
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            min_publishing_interval_ms: default_min_publishing_interval_ms(),
            max_publishing_interval_ms: default_max_publishing_interval_ms(),
            default_keep_alive_count: default_keep_alive_count(),
            max_keep_alive_count: default_max_keep_alive_count(),
            max_lifetime_count: default_max_lifetime_count(),
            max_subscriptions_per_session: default_max_subscriptions_per_session(),
            max_notifications_per_publish: default_max_notifications_per_publish(),
            max_retransmission_queue_size: default_max_retransmission_queue_size(),
        }
    }
}

impl SubscriptionConfig {
    pub fn validate(&self) -> Result<()> {
        validate_interval(self.min_publishing_interval_ms, "min_publishing_interval_ms")?;
        validate_interval(self.max_publishing_interval_ms, "max_publishing_interval_ms")?;

        if self.max_publishing_interval_ms < self.min_publishing_interval_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "max_publishing_interval_ms ({}) must be >= min_publishing_interval_ms ({})",
                self.max_publishing_interval_ms, self.min_publishing_interval_ms
            ))));
        }

        if self.max_keep_alive_count == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_keep_alive_count must be greater than 0".into(),
            )));
        }

        if self.default_keep_alive_count == 0 || self.default_keep_alive_count > self.max_keep_alive_count {
            return Err(Error::Config(ConfigError::Message(format!(
                "default_keep_alive_count must be between 1 and {}, got {}",
                self.max_keep_alive_count, self.default_keep_alive_count
            ))));
        }

        let required_lifetime = self.max_keep_alive_count.saturating_mul(MIN_LIFETIME_TO_KEEP_ALIVE_RATIO);
        if self.max_lifetime_count < required_lifetime {
            return Err(Error::Config(ConfigError::Message(format!(
                "max_lifetime_count ({}) must be at least {} x max_keep_alive_count ({})",
                self.max_lifetime_count, MIN_LIFETIME_TO_KEEP_ALIVE_RATIO, required_lifetime
            ))));
        }

        if self.max_subscriptions_per_session == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_subscriptions_per_session must be greater than 0".into(),
            )));
        }

        if self.max_retransmission_queue_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_retransmission_queue_size must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}
