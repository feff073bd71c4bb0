use std::time::Duration;

// -
// Subscription

/// First sequence number of every subscription; numbering wraps back to it.
pub(crate) const INITIAL_SEQUENCE_NUMBER: u32 = 1;

/// Revised lifetime count is at least this multiple of the keep-alive count.
pub(crate) const MIN_LIFETIME_TO_KEEP_ALIVE_RATIO: u32 = 3;

// -
// Monitored item

/// The only data encoding accepted besides "none".
pub(crate) const DEFAULT_BINARY_ENCODING: &str = "Default Binary";

// -
// Server loop

/// Upper bound on how long the server loop sleeps when nothing is scheduled.
pub(crate) const IDLE_WAKEUP_INTERVAL: Duration = Duration::from_secs(3600);

// -
// Configuration

pub(crate) const CONFIG_ENV_PREFIX: &str = "UA";
