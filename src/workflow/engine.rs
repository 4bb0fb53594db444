//! The generic delivery workflow.
//!
//! `fetch-context -> [fetch-credentials] -> transform-payload -> deliver`,
//! every step checkpointed in the [`StepJournal`] so a resumed instance
//! skips what already completed.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{RetryPolicy, WorkflowParams};
use crate::credentials::{CredentialResolver, ResolvedCredentials};
use crate::destinations::{self, DeliveryReceipt, Destinations, Payload};
use crate::error::DeliveryError;
use crate::health::HealthTracker;
use crate::models::FormField;
use crate::store::{FieldStore, StepJournal};

pub const STEP_FETCH_CONTEXT: &str = "fetch-context";
pub const STEP_FETCH_CREDENTIALS: &str = "fetch-credentials";
pub const STEP_TRANSFORM: &str = "transform-payload";
pub const STEP_DELIVER: &str = "deliver";

pub struct DeliveryWorkflow {
    fields: Arc<dyn FieldStore>,
    credentials: Arc<CredentialResolver>,
    destinations: Arc<Destinations>,
    health: Arc<HealthTracker>,
    journal: Arc<dyn StepJournal>,
    retry: RetryPolicy,
}

impl DeliveryWorkflow {
    pub fn new(
        fields: Arc<dyn FieldStore>,
        credentials: Arc<CredentialResolver>,
        destinations: Arc<Destinations>,
        health: Arc<HealthTracker>,
        journal: Arc<dyn StepJournal>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fields,
            credentials,
            destinations,
            health,
            journal,
            retry,
        }
    }

    /// Run one instance to `Done` (Ok) or `Failed` (Err). Delivery failures are
    /// reported to the health tracker before they are returned; failures of our
    /// own stores are not held against the integration.
    pub async fn run(
        &self,
        instance_id: &str,
        params: &WorkflowParams,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        match self.execute(instance_id, params).await {
            Ok(receipt) => {
                tracing::info!(
                    instance_id,
                    integration_id = %params.integration_id,
                    destination = params.destination.kind(),
                    already_delivered = receipt.already_delivered,
                    "delivery completed"
                );
                self.health.record_success(&params.integration_id).await;
                Ok(receipt)
            }
            Err(error) => {
                tracing::warn!(
                    instance_id,
                    integration_id = %params.integration_id,
                    destination = params.destination.kind(),
                    error = %error,
                    "delivery failed"
                );
                if !matches!(error, DeliveryError::Store(_)) {
                    self.health.record_failure(&params.integration_id).await;
                }
                Err(error)
            }
        }
    }

    async fn execute(
        &self,
        instance_id: &str,
        params: &WorkflowParams,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let field_store = &self.fields;
        let form_id = params.form_id.as_str();
        let fields: Vec<FormField> = self
            .step(instance_id, STEP_FETCH_CONTEXT, move || async move {
                field_store
                    .list_by_form(form_id)
                    .await
                    .map_err(DeliveryError::from)
            })
            .await?;

        let credentials: Option<ResolvedCredentials> = match params.destination.credential_provider() {
            Some(provider) => {
                let resolver = &self.credentials;
                let user_id = params.user_id.as_str();
                Some(
                    self.step(instance_id, STEP_FETCH_CREDENTIALS, move || {
                        resolver.resolve(user_id, provider)
                    })
                    .await?,
                )
            }
            None => None,
        };

        let fields = &fields;
        let payload: Payload = self
            .step(instance_id, STEP_TRANSFORM, move || async move {
                destinations::transform(params, fields)
            })
            .await?;

        let destinations = &self.destinations;
        let payload = &payload;
        let credentials = credentials.as_ref();
        self.step(instance_id, STEP_DELIVER, move || {
            destinations.deliver(params, payload, credentials)
        })
        .await
    }

    /// Run a step under the retry policy unless a checkpoint already holds its output.
    ///
    /// A failed checkpoint write is logged and the output still returned; the
    /// step runs again only if the instance is resumed.
    async fn step<T, F, Fut>(&self, instance_id: &str, step: &str, op: F) -> Result<T, DeliveryError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DeliveryError>>,
    {
        if let Some(saved) = self.journal.load(instance_id, step).await? {
            match serde_json::from_value(saved) {
                Ok(output) => {
                    tracing::debug!(instance_id, step, "step restored from checkpoint");
                    return Ok(output);
                }
                Err(e) => {
                    tracing::warn!(instance_id, step, error = %e, "discarding unreadable checkpoint");
                }
            }
        }

        let output = self.retry.run(step, op).await?;

        match serde_json::to_value(&output) {
            Ok(value) => {
                if let Err(e) = self.journal.save(instance_id, step, &value).await {
                    tracing::warn!(instance_id, step, error = %e, "failed to checkpoint step output");
                }
            }
            Err(e) => {
                tracing::warn!(instance_id, step, error = %e, "failed to encode step output");
            }
        }
        Ok(output)
    }
}
