use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Publish exchange backpressure and actor channel sizing
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PublishConfig {
    /// Publish requests a session may park before the oldest one is
    /// failed with BadTooManyPublishRequests
    #[serde(default = "default_max_publish_requests_in_queue")]
    pub max_publish_requests_in_queue: usize,

    /// Capacity of the bounded channel between handles and the server actor
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_max_publish_requests_in_queue() -> usize {
    100
}
fn default_event_channel_capacity() -> usize {
    1024
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_publish_requests_in_queue: default_max_publish_requests_in_queue(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl PublishConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_publish_requests_in_queue == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_publish_requests_in_queue must be greater than 0".into(),
            )));
        }

        if self.event_channel_capacity == 0 {
            return Err(Error::Config(ConfigError::Message(
                "event_channel_capacity must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}
