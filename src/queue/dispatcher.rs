use std::sync::Arc;

use super::{route, IntegrationMessage};
use crate::error::StoreError;
use crate::store::WorkflowHost;

/// What happened to one queue message.
#[derive(Debug)]
pub enum DispatchOutcome {
    Created(String),
    /// An instance with this id already existed; the message was a redelivery.
    Duplicate(String),
    /// Invalid configuration; never retried.
    Skipped(String),
    /// Workflow creation failed; the message should be redelivered.
    Failed(StoreError),
}

/// Turns integration-delivery messages into workflow instances.
pub struct Dispatcher {
    host: Arc<dyn WorkflowHost>,
}

impl Dispatcher {
    pub fn new(host: Arc<dyn WorkflowHost>) -> Self {
        Self { host }
    }

    pub async fn dispatch_batch(&self, messages: &[IntegrationMessage]) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::with_capacity(messages.len());
        for message in messages {
            outcomes.push(self.dispatch(message).await);
        }
        outcomes
    }

    pub async fn dispatch(&self, message: &IntegrationMessage) -> DispatchOutcome {
        let spec = match route(message) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::warn!(
                    integration_id = %message.integration_id,
                    integration_type = %message.integration_type,
                    respondent_id = %message.respondent_id,
                    error = %e,
                    "skipping integration message"
                );
                return DispatchOutcome::Skipped(e.to_string());
            }
        };

        match self.host.create(&spec).await {
            Ok(true) => {
                tracing::debug!(instance_id = %spec.id, "workflow instance created");
                DispatchOutcome::Created(spec.id)
            }
            Ok(false) => {
                tracing::debug!(instance_id = %spec.id, "workflow instance already exists");
                DispatchOutcome::Duplicate(spec.id)
            }
            Err(e) => {
                tracing::error!(instance_id = %spec.id, error = %e, "failed to create workflow instance");
                DispatchOutcome::Failed(e)
            }
        }
    }
}
