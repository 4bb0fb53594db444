mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

use formrelay::models::IntegrationType;

use common::{Harness, FORM_ID, INTERNAL_TOKEN};

fn url(addr: std::net::SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

fn submission_body() -> Value {
    json!({
        "respondentId": "resp-1",
        "userId": common::USER_ID,
        "values": [
            { "formFieldId": "f1", "value": "Ada", "respondentId": "resp-1", "formId": FORM_ID }
        ],
    })
}

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let addr = common::spawn_app(Harness::new().await.app_state()).await;

    let resp = reqwest::get(url(addr, "/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

// ── Internal auth ───────────────────────────────────────────────

#[tokio::test]
async fn internal_routes_require_token() {
    let addr = common::spawn_app(Harness::new().await.app_state()).await;
    let client = reqwest::Client::new();

    for path in ["submissions", "fanout"] {
        let resp = client
            .post(url(addr, &format!("/internal/forms/{FORM_ID}/{path}")))
            .json(&submission_body())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn internal_routes_reject_wrong_token() {
    let addr = common::spawn_app(Harness::new().await.app_state()).await;

    let resp = reqwest::Client::new()
        .post(url(addr, &format!("/internal/forms/{FORM_ID}/fanout")))
        .bearer_auth("not-the-token")
        .json(&submission_body())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

// ── Submissions ─────────────────────────────────────────────────

#[tokio::test]
async fn submission_enqueues_one_message_per_integration() {
    let h = Harness::new().await;
    for id in ["int-1", "int-2"] {
        h.add_integration(
            id,
            IntegrationType::Webhook,
            Some(common::webhook_meta("https://example.com/hook")),
        )
        .await;
    }
    let queue = h.queue.clone();
    let addr = common::spawn_app(h.app_state()).await;

    let resp = reqwest::Client::new()
        .post(url(addr, &format!("/internal/forms/{FORM_ID}/submissions")))
        .bearer_auth(INTERNAL_TOKEN)
        .json(&submission_body())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["enqueued"], 2);

    let items = queue.items().await;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.status == "pending"));
    assert_eq!(items[0].payload["respondentId"], "resp-1");
}

// ── Fan-out ─────────────────────────────────────────────────────

#[tokio::test]
async fn fan_out_reports_created_instances() {
    let h = Harness::new().await;
    h.add_integration(
        "int-1",
        IntegrationType::Webhook,
        Some(common::webhook_meta("https://example.com/hook")),
    )
    .await;
    let host = h.host.clone();
    let addr = common::spawn_app(h.app_state()).await;

    let resp = reqwest::Client::new()
        .post(url(addr, &format!("/internal/forms/{FORM_ID}/fanout")))
        .bearer_auth(INTERNAL_TOKEN)
        .json(&submission_body())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["created"]["webhook"], 1);
    assert_eq!(body["skipped"], 0);
    assert!(host.instance("resp-1-webhook-int-1").await.is_some());
}

#[tokio::test]
async fn fan_out_rejects_values_from_another_form() {
    let addr = common::spawn_app(Harness::new().await.app_state()).await;

    let resp = reqwest::Client::new()
        .post(url(addr, &format!("/internal/forms/{FORM_ID}/fanout")))
        .bearer_auth(INTERNAL_TOKEN)
        .json(&json!({
            "respondentId": "resp-1",
            "userId": common::USER_ID,
            "values": [
                { "formFieldId": "f1", "value": "x", "respondentId": "resp-1", "formId": "form-2" }
            ],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
