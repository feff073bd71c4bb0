//! Acknowledgement and republish.
//!
//! Scenario:
//!
//! 1. Session 1 monitors the boiler temperature and receives the initial
//!    value in message 1.
//! 2. Message 1 can be republished while it is unacknowledged.
//! 3. The next publish request acknowledges message 1 and an unknown
//!    sequence number.
//!
//! Expected Result:
//!
//! - Acknowledgement results follow request order.
//! - An acknowledged message is no longer available for republish.

use ua_subscription_engine::types::{MonitoringFilter, RepublishRequest, StatusCode, Variant};
use ua_subscription_engine::Result;

use crate::common::monitor_value;
use crate::common::publish;
use crate::common::publish_with_acks;
use crate::common::reported_values;
use crate::common::start_server;
use crate::common::subscribe;
use crate::common::temperature;

#[tokio::test(start_paused = true)]
async fn test_acknowledged_message_leaves_retransmission_queue() -> Result<()> {
    let ctx = start_server(Default::default());
    ctx.handle.open_session(1).await?;
    let subscription_id = subscribe(&ctx.handle, 1).await?;
    monitor_value(&ctx.handle, 1, subscription_id, temperature(), MonitoringFilter::None).await?;

    let first = publish(&ctx.handle, 1).await?;
    assert_eq!(first.notification_message.sequence_number, 1);
    assert_eq!(first.available_sequence_numbers, vec![1]);
    let values: Vec<Variant> = reported_values(&first).into_iter().map(|v| v.value).collect();
    assert_eq!(values, vec![Variant::from(20.0)]);

    let request = RepublishRequest {
        subscription_id,
        retransmit_sequence_number: 1,
    };
    let republished = ctx.handle.republish(1, request).await?;
    assert_eq!(republished, first.notification_message);

    let next = publish_with_acks(&ctx.handle, 1, &[(subscription_id, 1), (subscription_id, 7)]).await?;
    assert_eq!(
        next.results,
        vec![StatusCode::GOOD, StatusCode::BAD_SEQUENCE_NUMBER_UNKNOWN]
    );
    assert!(next.notification_message.is_keep_alive());
    assert!(next.available_sequence_numbers.is_empty());

    let gone = ctx.handle.republish(1, request).await;
    assert_eq!(
        gone.err().and_then(|e| e.status_code()),
        Some(StatusCode::BAD_MESSAGE_NOT_AVAILABLE)
    );
    Ok(())
}
