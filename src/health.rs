//! Per-integration circuit breaker.
//!
//! Failures are counted per integration id. Once the count exceeds the
//! configured threshold the integration is deleted and its owner notified
//! once. Errors inside the tracker are logged and never propagated.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BreakerConfig;
use crate::error::StoreError;
use crate::models::Integration;
use crate::store::{HealthCounterStore, IntegrationStore};

/// Tells a form owner that one of their integrations was disabled.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn integration_disabled(&self, integration: &Integration) -> Result<(), String>;
}

pub struct HealthTracker {
    counters: Arc<dyn HealthCounterStore>,
    integrations: Arc<dyn IntegrationStore>,
    notifier: Arc<dyn Notifier>,
    config: BreakerConfig,
}

impl HealthTracker {
    pub fn new(
        counters: Arc<dyn HealthCounterStore>,
        integrations: Arc<dyn IntegrationStore>,
        notifier: Arc<dyn Notifier>,
        config: BreakerConfig,
    ) -> Self {
        Self {
            counters,
            integrations,
            notifier,
            config,
        }
    }

    pub async fn record_failure(&self, integration_id: &str) {
        if let Err(e) = self.try_record_failure(integration_id).await {
            tracing::error!(integration_id, error = %e, "failed to record integration failure");
        }
    }

    /// Clears the counter when reset-on-success is enabled; otherwise a no-op.
    pub async fn record_success(&self, integration_id: &str) {
        if !self.config.reset_on_success {
            return;
        }
        if let Err(e) = self.counters.reset(integration_id).await {
            tracing::error!(integration_id, error = %e, "failed to reset integration failure count");
        }
    }

    async fn try_record_failure(&self, integration_id: &str) -> Result<(), StoreError> {
        let count = self.counters.increment(integration_id).await?;
        if count <= self.config.threshold {
            tracing::debug!(integration_id, count, "integration failure recorded");
            return Ok(());
        }

        // Another failure may already have tripped the breaker.
        let Some(integration) = self.integrations.find(integration_id).await? else {
            return Ok(());
        };
        if !self.integrations.delete(integration_id).await? {
            return Ok(());
        }

        tracing::warn!(
            integration_id,
            form_id = %integration.form_id,
            integration_type = %integration.integration_type,
            count,
            "integration disabled after repeated delivery failures"
        );

        if let Err(e) = self.notifier.integration_disabled(&integration).await {
            tracing::error!(integration_id, error = %e, "failed to notify form owner");
        }

        self.counters.reset(integration_id).await
    }
}
