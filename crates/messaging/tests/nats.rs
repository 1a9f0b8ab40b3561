//! End-to-end publishing through a real NATS server with JetStream enabled.
//!
//! Run with `NATS_URL=nats://localhost:4222 cargo test -p xm-messaging -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream::stream::StorageType;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::json;
use xm_messaging::{
    DispatcherConfig, EventDispatcher, NatsBrokerConnection, NatsConfig, CONTENT_TYPE_JSON,
};

const WAIT: Duration = Duration::from_secs(5);

fn nats_url() -> String {
    std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string())
}

#[tokio::test]
#[ignore = "Requires NATS server with JetStream"]
async fn dispatched_event_reaches_nats_subject_with_content_type() {
    let url = nats_url();
    let observer = async_nats::connect(url.as_str()).await.unwrap();
    let mut subscriber = observer
        .subscribe("xm_exchange.company.created")
        .await
        .unwrap();
    observer.flush().await.unwrap();

    let broker = NatsBrokerConnection::connect(NatsConfig {
        url,
        ..Default::default()
    })
    .await
    .unwrap();
    let dispatcher = EventDispatcher::start(Arc::new(broker), DispatcherConfig::default())
        .await
        .unwrap();

    let jetstream = async_nats::jetstream::new(observer.clone());
    let mut stream = jetstream.get_stream("XM_EXCHANGE").await.unwrap();
    let info = stream.info().await.unwrap();
    assert!(info.config.subjects.contains(&"xm_exchange.>".to_string()));
    assert_eq!(info.config.storage, StorageType::File);

    dispatcher
        .dispatch_event("company.created", json!({"id": "42"}))
        .await
        .unwrap();

    let message = tokio::time::timeout(WAIT, subscriber.next())
        .await
        .expect("no message within timeout")
        .expect("subscription closed");
    assert_eq!(message.subject.as_str(), "xm_exchange.company.created");
    assert_eq!(message.payload, Bytes::from_static(br#"{"id":"42"}"#));
    let headers = message.headers.expect("message should carry headers");
    assert_eq!(
        headers.get("Content-Type").map(|value| value.as_str()),
        Some(CONTENT_TYPE_JSON)
    );

    assert_eq!(dispatcher.shutdown(WAIT).await, 0);
    let extra = tokio::time::timeout(Duration::from_millis(200), subscriber.next()).await;
    assert!(extra.is_err(), "expected exactly one message");
}
