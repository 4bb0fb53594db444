mod common;

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::json;

use formrelay::config::BreakerConfig;
use formrelay::email::MailNotifier;
use formrelay::health::Notifier;
use formrelay::memory::MemoryMailer;
use formrelay::models::IntegrationType;

use common::{Harness, HarnessOptions};

async fn harness_with_webhook(options: HarnessOptions) -> Harness {
    let h = Harness::with_options(options).await;
    h.add_integration(
        "int-1",
        IntegrationType::Webhook,
        Some(json!({ "url": "https://example.com/hook" })),
    )
    .await;
    h
}

#[tokio::test]
async fn integration_survives_up_to_threshold() {
    let h = harness_with_webhook(HarnessOptions::default()).await;

    for _ in 0..4 {
        h.health.record_failure("int-1").await;
    }

    assert!(h.store.contains_integration("int-1").await);
    assert_eq!(h.counters.count("int-1").await, 4);
    assert!(h.notifier.disabled().await.is_empty());
}

#[tokio::test]
async fn fifth_failure_disables_and_notifies_once() {
    let h = harness_with_webhook(HarnessOptions::default()).await;

    for _ in 0..5 {
        h.health.record_failure("int-1").await;
    }

    assert!(!h.store.contains_integration("int-1").await);
    assert_eq!(h.notifier.disabled().await, vec!["int-1".to_string()]);
    assert_eq!(h.counters.count("int-1").await, 0);

    // Late failures of in-flight instances find nothing left to disable.
    for _ in 0..6 {
        h.health.record_failure("int-1").await;
    }
    assert_eq!(h.notifier.disabled().await.len(), 1);
}

#[tokio::test]
async fn concurrent_failures_notify_once() {
    let h = harness_with_webhook(HarnessOptions::default()).await;
    let health = h.health.clone();

    join_all((0..12).map(|_| {
        let health = Arc::clone(&health);
        async move { health.record_failure("int-1").await }
    }))
    .await;

    assert!(!h.store.contains_integration("int-1").await);
    assert_eq!(h.notifier.disabled().await.len(), 1);
}

#[tokio::test]
async fn success_keeps_count_by_default() {
    let h = harness_with_webhook(HarnessOptions::default()).await;

    for _ in 0..3 {
        h.health.record_failure("int-1").await;
    }
    h.health.record_success("int-1").await;

    assert_eq!(h.counters.count("int-1").await, 3);
}

#[tokio::test]
async fn success_resets_count_when_configured() {
    let h = harness_with_webhook(HarnessOptions {
        breaker: BreakerConfig {
            threshold: 4,
            reset_on_success: true,
        },
        ..HarnessOptions::default()
    })
    .await;

    for _ in 0..3 {
        h.health.record_failure("int-1").await;
    }
    h.health.record_success("int-1").await;

    assert_eq!(h.counters.count("int-1").await, 0);
}

#[tokio::test]
async fn custom_threshold_is_honoured() {
    let h = harness_with_webhook(HarnessOptions {
        breaker: BreakerConfig {
            threshold: 1,
            reset_on_success: false,
        },
        ..HarnessOptions::default()
    })
    .await;

    h.health.record_failure("int-1").await;
    assert!(h.store.contains_integration("int-1").await);

    h.health.record_failure("int-1").await;
    assert!(!h.store.contains_integration("int-1").await);
}

#[tokio::test]
async fn owner_is_mailed_when_integration_is_disabled() {
    let h = Harness::new().await;
    let integration = h
        .add_integration(
            "int-1",
            IntegrationType::Spreadsheet,
            Some(common::table_meta("sheet-1")),
        )
        .await;
    h.store
        .set_owner(common::FORM_ID, "owner@example.com", "Signup form")
        .await;

    let mailer = Arc::new(MemoryMailer::new());
    let notifier = MailNotifier::new(h.store.clone(), mailer.clone(), "alerts@example.com");

    notifier.integration_disabled(&integration).await.unwrap();

    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["owner@example.com"]);
    assert_eq!(sent[0].from.as_deref(), Some("alerts@example.com"));
    assert!(sent[0].raw.contains("Subject: Your Google Sheets integration was disabled"));
}

#[tokio::test]
async fn notifier_errors_without_owner() {
    let h = Harness::new().await;
    let integration = h
        .add_integration("int-1", IntegrationType::Webhook, Some(json!({ "url": "https://x.io" })))
        .await;

    let notifier = MailNotifier::new(h.store.clone(), Arc::new(MemoryMailer::new()), "alerts@example.com");

    assert!(notifier.integration_disabled(&integration).await.is_err());
}
