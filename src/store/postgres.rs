//! Postgres adapters over the query functions in [`crate::db`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountStore, FieldStore, IntegrationQueue, IntegrationStore, StepJournal, WorkflowHost};
use crate::db;
use crate::error::StoreError;
use crate::models::{
    Credential, FormField, Integration, IntegrationQueueItem, OwnerContact, ProviderKind,
    WorkflowInstance,
};
use crate::workflow::WorkflowSpec;

/// Form, integration and account lookups.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntegrationStore for PgStore {
    async fn list_by_form(&self, form_id: &str) -> Result<Vec<Integration>, StoreError> {
        Ok(db::integrations::list_by_form(&self.pool, form_id).await?)
    }

    async fn find(&self, id: &str) -> Result<Option<Integration>, StoreError> {
        Ok(db::integrations::find_by_id(&self.pool, id).await?)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(db::integrations::delete(&self.pool, id).await?)
    }

    async fn owner_contact(&self, form_id: &str) -> Result<Option<OwnerContact>, StoreError> {
        Ok(db::integrations::owner_contact(&self.pool, form_id).await?)
    }
}

#[async_trait]
impl FieldStore for PgStore {
    async fn list_by_form(&self, form_id: &str) -> Result<Vec<FormField>, StoreError> {
        Ok(db::form_fields::list_by_form(&self.pool, form_id).await?)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find(
        &self,
        user_id: &str,
        provider: ProviderKind,
    ) -> Result<Option<Credential>, StoreError> {
        Ok(db::accounts::find(&self.pool, user_id, provider.provider_id()).await?)
    }

    async fn update_access_token(
        &self,
        user_id: &str,
        provider: ProviderKind,
        access_token: &str,
    ) -> Result<(), StoreError> {
        Ok(db::accounts::update_access_token(&self.pool, user_id, provider.provider_id(), access_token)
            .await?)
    }
}

/// Durable workflow instances and their step checkpoints.
#[derive(Clone)]
pub struct PgWorkflowHost {
    pool: PgPool,
}

impl PgWorkflowHost {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowHost for PgWorkflowHost {
    async fn create(&self, spec: &WorkflowSpec) -> Result<bool, StoreError> {
        let params = serde_json::to_value(&spec.params)?;
        Ok(db::workflow_instances::create(&self.pool, &spec.id, &params).await?)
    }

    async fn create_batch(&self, specs: &[WorkflowSpec]) -> Result<usize, StoreError> {
        if specs.is_empty() {
            return Ok(0);
        }
        let ids: Vec<String> = specs.iter().map(|s| s.id.clone()).collect();
        let params = specs
            .iter()
            .map(|s| serde_json::to_value(&s.params))
            .collect::<Result<Vec<_>, _>>()?;
        let created = db::workflow_instances::create_batch(&self.pool, &ids, &params).await?;
        Ok(created as usize)
    }

    async fn claim_next(&self, lease: Duration) -> Result<Option<WorkflowInstance>, StoreError> {
        Ok(db::workflow_instances::claim_next(&self.pool, lease.as_secs_f64()).await?)
    }

    async fn complete(&self, id: &str) -> Result<(), StoreError> {
        Ok(db::workflow_instances::mark_done(&self.pool, id).await?)
    }

    async fn fail(&self, id: &str, error: &str) -> Result<(), StoreError> {
        Ok(db::workflow_instances::mark_failed(&self.pool, id, error).await?)
    }
}

#[async_trait]
impl StepJournal for PgWorkflowHost {
    async fn load(&self, instance_id: &str, step: &str) -> Result<Option<Value>, StoreError> {
        Ok(db::workflow_steps::find_output(&self.pool, instance_id, step).await?)
    }

    async fn save(&self, instance_id: &str, step: &str, output: &Value) -> Result<(), StoreError> {
        Ok(db::workflow_steps::save_output(&self.pool, instance_id, step, output).await?)
    }
}

/// The `integration_queue` table.
#[derive(Clone)]
pub struct PgIntegrationQueue {
    pool: PgPool,
}

impl PgIntegrationQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntegrationQueue for PgIntegrationQueue {
    async fn enqueue(&self, payload: &Value) -> Result<(), StoreError> {
        db::integration_queue::enqueue(&self.pool, payload).await?;
        Ok(())
    }

    async fn claim_batch(&self, limit: i64) -> Result<Vec<IntegrationQueueItem>, StoreError> {
        Ok(db::integration_queue::claim_batch(&self.pool, limit).await?)
    }

    async fn ack(&self, id: Uuid) -> Result<(), StoreError> {
        Ok(db::integration_queue::ack(&self.pool, id).await?)
    }

    async fn mark_failed(&self, item: &IntegrationQueueItem, error: &str) -> Result<(), StoreError> {
        Ok(db::integration_queue::mark_failed(
            &self.pool,
            item.id,
            item.attempts,
            item.max_attempts,
            error,
        )
        .await?)
    }
}
