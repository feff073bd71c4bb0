//! Sampling reads complete while the event channel is busy with unrelated
//! pushes; the initial value still reaches the first publish.

use ua_subscription_engine::types::{AttributeId, DataValue, MonitoringFilter, NodeId, Variant};
use ua_subscription_engine::Result;

use crate::common::monitor_value;
use crate::common::publish;
use crate::common::reported_values;
use crate::common::start_server;
use crate::common::subscribe;
use crate::common::temperature;

const PUSHES: usize = 500;

#[tokio::test(start_paused = true)]
async fn test_initial_sample_is_recorded_under_event_load() -> Result<()> {
    let ctx = start_server(Default::default());
    ctx.handle.open_session(1).await?;
    let subscription_id = subscribe(&ctx.handle, 1).await?;

    let flooder = ctx.handle.clone();
    let pushes = tokio::spawn(async move {
        let unwatched = NodeId::string(2, "Boiler.Pressure");
        for reading in 0..PUSHES {
            flooder
                .notify_data_change(unwatched.clone(), AttributeId::Value, DataValue::new(reading as f64))
                .await?;
        }
        Ok::<_, ua_subscription_engine::Error>(())
    });
    monitor_value(&ctx.handle, 1, subscription_id, temperature(), MonitoringFilter::None).await?;

    let first = publish(&ctx.handle, 1).await?;
    let values = reported_values(&first);
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value, Variant::from(20.0));

    pushes.await.expect("pusher task")?;
    Ok(())
}
