//! Publish backpressure: a session parks at most
//! `max_publish_requests_in_queue` requests; the oldest one is failed when a
//! newer request overflows the queue.

use ua_subscription_engine::types::StatusCode;
use ua_subscription_engine::{Result, ServerConfig};

use crate::common::publish;
use crate::common::start_server;
use crate::common::subscribe;

#[tokio::test(start_paused = true)]
async fn test_oldest_publish_request_is_evicted() -> Result<()> {
    let mut config = ServerConfig::default();
    config.publish.max_publish_requests_in_queue = 2;
    let ctx = start_server(config);
    ctx.handle.open_session(1).await?;
    subscribe(&ctx.handle, 1).await?;

    // join! polls in order, so the requests reach the server oldest first.
    let (oldest, middle, newest) = tokio::join!(
        publish(&ctx.handle, 1),
        publish(&ctx.handle, 1),
        publish(&ctx.handle, 1)
    );

    assert_eq!(
        oldest.err().and_then(|e| e.status_code()),
        Some(StatusCode::BAD_TOO_MANY_PUBLISH_REQUESTS)
    );
    assert!(middle?.notification_message.is_keep_alive());
    assert!(newest?.notification_message.is_keep_alive());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_publish_without_subscriptions_is_rejected() -> Result<()> {
    let ctx = start_server(Default::default());
    ctx.handle.open_session(1).await?;

    let rejected = publish(&ctx.handle, 1).await;

    assert_eq!(
        rejected.err().and_then(|e| e.status_code()),
        Some(StatusCode::BAD_NO_SUBSCRIPTION)
    );
    Ok(())
}
