//! Orphaned subscriptions survive their session and can be transferred.
//!
//! Scenario:
//!
//! 1. Session 1 monitors the boiler temperature and receives message 1
//!    without acknowledging it.
//! 2. Session 1 closes without deleting its subscriptions.
//! 3. Session 2 transfers the orphan and the temperature changes.
//!
//! Expected Result:
//!
//! - The transfer reports message 1 as still available.
//! - Session 2 receives message 2 and can republish message 1.
//! - Session 1 is gone.

use ua_subscription_engine::types::{
    AttributeId, DataValue, MonitoringFilter, RepublishRequest, StatusCode, TransferSubscriptionsRequest, Variant,
};
use ua_subscription_engine::Result;

use crate::common::monitor_value;
use crate::common::publish;
use crate::common::reported_values;
use crate::common::start_server;
use crate::common::subscribe;
use crate::common::temperature;

#[tokio::test(start_paused = true)]
async fn test_orphan_resumes_on_new_session() -> Result<()> {
    let ctx = start_server(Default::default());
    ctx.handle.open_session(1).await?;
    let subscription_id = subscribe(&ctx.handle, 1).await?;
    monitor_value(&ctx.handle, 1, subscription_id, temperature(), MonitoringFilter::None).await?;
    let first = publish(&ctx.handle, 1).await?;
    assert_eq!(first.notification_message.sequence_number, 1);

    ctx.handle.close_session(1, false).await?;
    ctx.handle.open_session(2).await?;
    let results = ctx
        .handle
        .transfer_subscriptions(
            2,
            TransferSubscriptionsRequest {
                subscription_ids: vec![subscription_id],
                send_initial_values: false,
            },
        )
        .await?;
    assert_eq!(results[0].status_code, StatusCode::GOOD);
    assert_eq!(results[0].available_sequence_numbers, vec![1]);

    ctx.address_space
        .write_value(&temperature(), DataValue::new(21.5))
        .expect("node exists");
    ctx.handle
        .notify_data_change(temperature(), AttributeId::Value, DataValue::new(21.5))
        .await?;

    let resumed = publish(&ctx.handle, 2).await?;
    assert_eq!(resumed.subscription_id, subscription_id);
    assert_eq!(resumed.notification_message.sequence_number, 2);
    assert_eq!(resumed.available_sequence_numbers, vec![1, 2]);
    let values: Vec<Variant> = reported_values(&resumed).into_iter().map(|v| v.value).collect();
    assert_eq!(values, vec![Variant::from(21.5)]);

    let republished = ctx
        .handle
        .republish(
            2,
            RepublishRequest {
                subscription_id,
                retransmit_sequence_number: 1,
            },
        )
        .await?;
    assert_eq!(republished, first.notification_message);

    let closed = publish(&ctx.handle, 1).await;
    assert_eq!(
        closed.err().and_then(|e| e.status_code()),
        Some(StatusCode::BAD_SESSION_ID_INVALID)
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_transfer_between_live_sessions_notifies_previous_owner() -> Result<()> {
    let ctx = start_server(Default::default());
    ctx.handle.open_session(1).await?;
    ctx.handle.open_session(2).await?;
    let subscription_id = subscribe(&ctx.handle, 1).await?;

    ctx.handle
        .transfer_subscriptions(
            2,
            TransferSubscriptionsRequest {
                subscription_ids: vec![subscription_id],
                send_initial_values: true,
            },
        )
        .await?;

    let notice = publish(&ctx.handle, 1).await?;
    assert_eq!(notice.subscription_id, subscription_id);
    assert_eq!(
        notice.notification_message.status_change_code(),
        Some(StatusCode::GOOD_SUBSCRIPTION_TRANSFERRED)
    );

    let keep_alive = publish(&ctx.handle, 2).await?;
    assert_eq!(keep_alive.subscription_id, subscription_id);
    assert!(keep_alive.notification_message.is_keep_alive());
    Ok(())
}
