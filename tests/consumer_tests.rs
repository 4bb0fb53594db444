mod common;

use chrono::Utc;
use serde_json::json;

use formrelay::memory::MemoryIntegrationQueue;
use formrelay::models::IntegrationType;
use formrelay::queue::{consume_once, IntegrationMessage};
use formrelay::store::IntegrationQueue;

use common::Harness;

async fn push(queue: &MemoryIntegrationQueue, message: &IntegrationMessage) {
    queue
        .enqueue(&serde_json::to_value(message).unwrap())
        .await
        .unwrap();
}

fn webhook_message(id: &str) -> IntegrationMessage {
    let integration = common::integration(
        id,
        IntegrationType::Webhook,
        Some(common::webhook_meta("https://example.com/hook")),
    );
    common::message(&integration, common::three_values())
}

#[tokio::test]
async fn empty_queue_claims_nothing() {
    let h = Harness::new().await;

    let claimed = consume_once(h.queue.as_ref(), &h.dispatcher, 10).await.unwrap();

    assert_eq!(claimed, 0);
}

#[tokio::test]
async fn undecodable_payload_is_dropped() {
    let h = Harness::new().await;
    h.queue.enqueue(&json!({ "unexpected": true })).await.unwrap();

    let claimed = consume_once(h.queue.as_ref(), &h.dispatcher, 10).await.unwrap();

    assert_eq!(claimed, 1);
    assert!(h.queue.items().await.is_empty());
    assert!(h.host.instances().await.is_empty());
}

#[tokio::test]
async fn created_skipped_and_duplicate_messages_are_acked() {
    let h = Harness::new().await;
    let mut broken = common::integration("int-2", IntegrationType::Webhook, None);
    broken.meta_data = Some("not json".to_string());

    push(&h.queue, &webhook_message("int-1")).await;
    push(&h.queue, &common::message(&broken, common::three_values())).await;
    push(&h.queue, &webhook_message("int-1")).await;

    let claimed = consume_once(h.queue.as_ref(), &h.dispatcher, 10).await.unwrap();

    assert_eq!(claimed, 3);
    assert!(h.queue.items().await.is_empty());
    assert_eq!(h.host.instances().await.len(), 1);
    assert!(h.host.instance("resp-1-webhook-int-1").await.is_some());
}

#[tokio::test]
async fn failed_creation_is_rescheduled_with_backoff() {
    let h = Harness::new().await;
    h.host.set_unavailable(true);
    push(&h.queue, &webhook_message("int-1")).await;

    let claimed = consume_once(h.queue.as_ref(), &h.dispatcher, 10).await.unwrap();
    assert_eq!(claimed, 1);

    let items = h.queue.items().await;
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.status, "failed");
    assert_eq!(item.attempts, 1);
    assert!(item.last_error.as_deref().unwrap().contains("unavailable"));
    assert!(item.next_retry_at > Utc::now());

    // Not due again until the backoff elapses.
    let claimed = consume_once(h.queue.as_ref(), &h.dispatcher, 10).await.unwrap();
    assert_eq!(claimed, 0);
    assert!(h.host.instances().await.is_empty());
}

#[tokio::test]
async fn batch_size_limits_each_claim() {
    let h = Harness::new().await;
    for id in ["int-1", "int-2", "int-3"] {
        push(&h.queue, &webhook_message(id)).await;
    }

    assert_eq!(consume_once(h.queue.as_ref(), &h.dispatcher, 2).await.unwrap(), 2);
    assert_eq!(h.queue.items().await.len(), 1);
    assert_eq!(consume_once(h.queue.as_ref(), &h.dispatcher, 2).await.unwrap(), 1);
    assert_eq!(h.host.instances().await.len(), 3);
}
