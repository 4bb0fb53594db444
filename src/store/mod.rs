//! Persistence ports used by the delivery subsystem.
//!
//! Production adapters live in [`postgres`] and [`redis`]; [`crate::memory`]
//! carries in-memory adapters for tests.

pub mod postgres;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Credential, FormField, Integration, IntegrationQueueItem, OwnerContact, ProviderKind,
    WorkflowInstance,
};
use crate::workflow::WorkflowSpec;

#[async_trait]
pub trait IntegrationStore: Send + Sync {
    async fn list_by_form(&self, form_id: &str) -> Result<Vec<Integration>, StoreError>;
    async fn find(&self, id: &str) -> Result<Option<Integration>, StoreError>;
    /// Returns `false` when the integration was already gone.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
    async fn owner_contact(&self, form_id: &str) -> Result<Option<OwnerContact>, StoreError>;
}

#[async_trait]
pub trait FieldStore: Send + Sync {
    async fn list_by_form(&self, form_id: &str) -> Result<Vec<FormField>, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find(
        &self,
        user_id: &str,
        provider: ProviderKind,
    ) -> Result<Option<Credential>, StoreError>;

    async fn update_access_token(
        &self,
        user_id: &str,
        provider: ProviderKind,
        access_token: &str,
    ) -> Result<(), StoreError>;
}

/// Failure counters keyed by integration id.
#[async_trait]
pub trait HealthCounterStore: Send + Sync {
    /// Creates the counter at 1 or increments it, returning the new count.
    async fn increment(&self, integration_id: &str) -> Result<u32, StoreError>;
    async fn reset(&self, integration_id: &str) -> Result<(), StoreError>;
}

/// Creates and leases durable workflow instances.
#[async_trait]
pub trait WorkflowHost: Send + Sync {
    /// Returns `false` when an instance with the same id already exists.
    async fn create(&self, spec: &WorkflowSpec) -> Result<bool, StoreError>;

    /// Returns the number of instances actually created.
    async fn create_batch(&self, specs: &[WorkflowSpec]) -> Result<usize, StoreError>;

    /// Leases a pending instance, or a running one whose lease expired.
    async fn claim_next(&self, lease: Duration) -> Result<Option<WorkflowInstance>, StoreError>;

    async fn complete(&self, id: &str) -> Result<(), StoreError>;

    async fn fail(&self, id: &str, error: &str) -> Result<(), StoreError>;
}

/// Per-step checkpoints of a workflow instance.
#[async_trait]
pub trait StepJournal: Send + Sync {
    async fn load(&self, instance_id: &str, step: &str) -> Result<Option<Value>, StoreError>;
    async fn save(&self, instance_id: &str, step: &str, output: &Value) -> Result<(), StoreError>;
}

/// At-least-once queue of integration messages awaiting dispatch.
#[async_trait]
pub trait IntegrationQueue: Send + Sync {
    async fn enqueue(&self, payload: &Value) -> Result<(), StoreError>;

    /// Claims up to `limit` due messages. A claimed message reappears after the
    /// visibility timeout unless it is acked or rescheduled first.
    async fn claim_batch(&self, limit: i64) -> Result<Vec<IntegrationQueueItem>, StoreError>;

    /// Removes a handled message.
    async fn ack(&self, id: Uuid) -> Result<(), StoreError>;

    /// Reschedules with exponential backoff, or parks the message once its attempts are spent.
    async fn mark_failed(&self, item: &IntegrationQueueItem, error: &str) -> Result<(), StoreError>;
}
