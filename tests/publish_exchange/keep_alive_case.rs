//! Keep-alive: a subscription with nothing to report answers a parked
//! publish request once every `max_keep_alive_count` publishing intervals.
//!
//! Scenario:
//!
//! 1. Session 1 creates a subscription (100 ms interval, keep-alive count 3)
//!    without monitored items.
//! 2. The client parks one publish request at a time.
//!
//! Expected Result:
//!
//! - Each request is answered 300 ms after the previous message.
//! - Keep-alives carry the next sequence number without consuming it.

use std::time::Duration;

use tokio::time::Instant;
use ua_subscription_engine::Result;

use crate::common::publish;
use crate::common::start_server;
use crate::common::subscribe;

#[tokio::test(start_paused = true)]
async fn test_idle_subscription_sends_periodic_keep_alives() -> Result<()> {
    let ctx = start_server(Default::default());
    ctx.handle.open_session(1).await?;
    let subscription_id = subscribe(&ctx.handle, 1).await?;

    let started = Instant::now();
    let first = publish(&ctx.handle, 1).await?;
    let first_wait = started.elapsed();

    assert_eq!(first.subscription_id, subscription_id);
    assert!(first.notification_message.is_keep_alive());
    assert_eq!(first.notification_message.sequence_number, 1);
    assert!(first.available_sequence_numbers.is_empty());
    assert!(first_wait >= Duration::from_millis(300) && first_wait < Duration::from_millis(400));

    let resumed = Instant::now();
    let second = publish(&ctx.handle, 1).await?;

    assert!(second.notification_message.is_keep_alive());
    assert_eq!(second.notification_message.sequence_number, 1);
    assert!(resumed.elapsed() < Duration::from_millis(400));
    Ok(())
}
