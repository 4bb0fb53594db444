pub mod auth;
pub mod config;
pub mod credentials;
pub mod db;
pub mod destinations;
pub mod email;
pub mod error;
pub mod health;
pub mod memory;
pub mod models;
pub mod queue;
pub mod routes;
pub mod state;
pub mod store;
pub mod worker;
pub mod workflow;

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::credentials::CredentialResolver;
use crate::destinations::{Destinations, MailDelivery, NotionClient, SheetsClient, WebhookClient};
use crate::email::{MailNotifier, Mailer};
use crate::health::HealthTracker;
use crate::queue::Dispatcher;
use crate::state::{AppState, SharedState};
use crate::store::postgres::{PgIntegrationQueue, PgStore, PgWorkflowHost};
use crate::store::redis::RedisHealthStore;
use crate::workflow::{DeliveryWorkflow, Manager, RetryPolicy};

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Wire the production adapters into shared state.
pub fn build_state(
    pool: PgPool,
    config: Config,
    redis: ::redis::Client,
    mailer: Arc<dyn Mailer>,
    client: reqwest::Client,
) -> SharedState {
    let store = Arc::new(PgStore::new(pool.clone()));
    let host = Arc::new(PgWorkflowHost::new(pool.clone()));
    let queue = Arc::new(PgIntegrationQueue::new(pool));

    let notifier_from = config
        .smtp
        .as_ref()
        .map(|smtp| smtp.from.clone())
        .unwrap_or_else(|| "noreply@localhost".to_string());
    let notifier = Arc::new(MailNotifier::new(store.clone(), mailer.clone(), notifier_from));
    let health = Arc::new(HealthTracker::new(
        Arc::new(RedisHealthStore::new(redis)),
        store.clone(),
        notifier,
        config.breaker.clone(),
    ));

    let credentials = Arc::new(CredentialResolver::new(
        store.clone(),
        client.clone(),
        config.google.clone(),
        config.token_cache_ttl,
    ));

    let destinations = Arc::new(Destinations {
        sheets: SheetsClient::new(client.clone(), config.google.sheets_base_url.clone()),
        notion: NotionClient::new(
            client.clone(),
            config.notion.base_url.clone(),
            config.notion.api_version.clone(),
        ),
        webhook: WebhookClient::new(client),
        mail: MailDelivery::new(mailer),
    });

    let workflow = DeliveryWorkflow::new(
        store.clone(),
        credentials,
        destinations,
        health,
        host.clone(),
        RetryPolicy::from_config(&config.retry),
    );

    Arc::new(AppState {
        queue,
        config,
        integrations: store.clone(),
        host: host.clone(),
        dispatcher: Dispatcher::new(host.clone()),
        manager: Manager::new(store, host),
        workflow,
    })
}

pub fn build_app(state: SharedState) -> Router {
    Router::new()
        .merge(routes::internal_routes())
        .merge(routes::health_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
