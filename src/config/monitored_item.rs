use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use super::validate_interval;
use crate::Error;
use crate::Result;

/// Sampling and queueing limits for monitored items
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MonitoredItemConfig {
    /// Fastest periodic sampling the server grants
    ///
    /// A periodic item modified to a sampling interval of 0 is revised to
    /// this value instead of becoming exception based.
    /// Default: 50ms
    #[serde(default = "default_min_sampling_interval_ms")]
    pub min_sampling_interval_ms: f64,

    /// Slowest periodic sampling the server grants
    #[serde(default = "default_max_sampling_interval_ms")]
    pub max_sampling_interval_ms: f64,

    /// Upper bound of the revised queue size
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: u32,

    /// Items one subscription may hold before creation fails
    /// with BadTooManyMonitoredItems
    #[serde(default = "default_max_monitored_items_per_subscription")]
    pub max_monitored_items_per_subscription: usize,
}

fn default_min_sampling_interval_ms() -> f64 {
    50.0
}
fn default_max_sampling_interval_ms() -> f64 {
    3_600_000.0
}
fn default_max_queue_size() -> u32 {
    1000
}
fn default_max_monitored_items_per_subscription() -> usize {
    10_000
}

impl Default for MonitoredItemConfig {
    fn default() -> Self {
        Self {
            min_sampling_interval_ms: default_min_sampling_interval_ms(),
            max_sampling_interval_ms: default_max_sampling_interval_ms(),
            max_queue_size: default_max_queue_size(),
            max_monitored_items_per_subscription: default_max_monitored_items_per_subscription(),
        }
    }
}

impl MonitoredItemConfig {
    pub fn validate(&self) -> Result<()> {
        validate_interval(self.min_sampling_interval_ms, "min_sampling_interval_ms")?;
        validate_interval(self.max_sampling_interval_ms, "max_sampling_interval_ms")?;

        if self.max_sampling_interval_ms < self.min_sampling_interval_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "max_sampling_interval_ms ({}) must be >= min_sampling_interval_ms ({})",
                self.max_sampling_interval_ms, self.min_sampling_interval_ms
            ))));
        }

        if self.max_queue_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_queue_size must be greater than 0".into(),
            )));
        }

        if self.max_monitored_items_per_subscription == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_monitored_items_per_subscription must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}
