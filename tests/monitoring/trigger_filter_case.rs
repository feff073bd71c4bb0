//! Data change trigger: an item filtered on `Status` ignores value changes
//! and reports only status changes.

use ua_subscription_engine::types::{
    AttributeId, DataChangeFilter, DataChangeTrigger, DataValue, MonitoringFilter, StatusCode, Variant,
};
use ua_subscription_engine::Result;

use crate::common::monitor_value;
use crate::common::publish;
use crate::common::reported_values;
use crate::common::start_server;
use crate::common::subscribe;
use crate::common::temperature;

#[tokio::test(start_paused = true)]
async fn test_status_trigger_ignores_value_changes() -> Result<()> {
    let ctx = start_server(Default::default());
    ctx.handle.open_session(1).await?;
    let subscription_id = subscribe(&ctx.handle, 1).await?;
    let filter = MonitoringFilter::DataChange(DataChangeFilter {
        trigger: DataChangeTrigger::Status,
        ..Default::default()
    });
    monitor_value(&ctx.handle, 1, subscription_id, temperature(), filter).await?;

    let initial = publish(&ctx.handle, 1).await?;
    assert_eq!(reported_values(&initial).len(), 1);

    ctx.handle
        .notify_data_change(temperature(), AttributeId::Value, DataValue::new(25.0))
        .await?;
    let quiet = publish(&ctx.handle, 1).await?;
    assert!(quiet.notification_message.is_keep_alive());

    ctx.handle
        .notify_data_change(
            temperature(),
            AttributeId::Value,
            DataValue::new(25.0).with_status(StatusCode::UNCERTAIN),
        )
        .await?;
    let changed = publish(&ctx.handle, 1).await?;
    let values = reported_values(&changed);
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].status, StatusCode::UNCERTAIN);
    assert_eq!(values[0].value, Variant::from(25.0));
    Ok(())
}
