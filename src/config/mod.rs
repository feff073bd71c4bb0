//! Configuration management for the subscription engine.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod limits;
mod monitored_item;
mod publish;
mod subscription;
pub use limits::*;
pub use monitored_item::*;
pub use publish::*;
pub use subscription::*;
use std::env;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONFIG_ENV_PREFIX;
use crate::Error;
use crate::Result;

/// Main configuration container for the subscription engine
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ServerConfig {
    /// Subscription revision limits and retransmission depth
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    /// Monitored item sampling and queue limits
    #[serde(default)]
    pub monitored_item: MonitoredItemConfig,
    /// Publish exchange backpressure
    #[serde(default)]
    pub publish: PublishConfig,
    /// Per-call batch limits
    #[serde(default)]
    pub limits: OperationLimits,
}

impl ServerConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `UA__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so further overrides can be applied with
    /// `with_override_config()`. Callers MUST call `validate()` before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("UA__SUBSCRIPTION__MAX_SUBSCRIPTIONS_PER_SESSION", "20");
    /// let cfg = ServerConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every subsystem and returns the validated instance.
    ///
    /// Cross-section rules are checked last: the publishing interval range
    /// must leave room for sampling at the configured minimum rate.
    pub fn validate(self) -> Result<Self> {
        self.subscription.validate()?;
        self.monitored_item.validate()?;
        self.publish.validate()?;
        self.limits.validate()?;

        if self.monitored_item.max_sampling_interval_ms < self.subscription.min_publishing_interval_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "monitored_item.max_sampling_interval_ms ({}) must not be below subscription.min_publishing_interval_ms ({})",
                self.monitored_item.max_sampling_interval_ms, self.subscription.min_publishing_interval_ms
            ))));
        }
        Ok(self)
    }
}

/// Rejects non-finite or non-positive millisecond values
pub(super) fn validate_interval(
    value: f64,
    name: &str,
) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Config(ConfigError::Message(format!(
            "{name} must be a positive number of milliseconds, got {value}"
        ))));
    }
    Ok(())
}
