use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Batch size limits shared by the subscription and monitored item services
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OperationLimits {
    /// Elements accepted in one SetPublishingMode, DeleteSubscriptions,
    /// TransferSubscriptions, SetMonitoringMode or DeleteMonitoredItems call
    #[serde(default = "default_max_operations_per_call")]
    pub max_operations_per_call: usize,

    /// Elements accepted in one CreateMonitoredItems or ModifyMonitoredItems call
    #[serde(default = "default_max_monitored_items_per_call")]
    pub max_monitored_items_per_call: usize,
}

fn default_max_operations_per_call() -> usize {
    1000
}
fn default_max_monitored_items_per_call() -> usize {
    1000
}

impl Default for OperationLimits {
    fn default() -> Self {
        Self {
            max_operations_per_call: default_max_operations_per_call(),
            max_monitored_items_per_call: default_max_monitored_items_per_call(),
        }
    }
}

impl OperationLimits {
    pub fn validate(&self) -> Result<()> {
        if self.max_operations_per_call == 0 || self.max_monitored_items_per_call == 0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "operation limits must be greater than 0, got max_operations_per_call={} max_monitored_items_per_call={}",
                self.max_operations_per_call, self.max_monitored_items_per_call
            ))));
        }
        Ok(())
    }
}
