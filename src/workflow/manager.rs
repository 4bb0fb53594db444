use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;

use super::WorkflowSpec;
use crate::error::StoreError;
use crate::queue::{route, IntegrationMessage, SubmissionEvent};
use crate::store::{IntegrationStore, WorkflowHost};

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FanOutReport {
    /// Newly created instances per destination type.
    pub created: BTreeMap<String, usize>,
    /// Integrations whose configuration failed validation.
    pub skipped: usize,
}

impl FanOutReport {
    pub fn total_created(&self) -> usize {
        self.created.values().sum()
    }
}

/// Queue-bypassing entry point: loads a form's integrations directly and
/// batch-creates their workflow instances, one concurrent call per destination type.
pub struct Manager {
    integrations: Arc<dyn IntegrationStore>,
    host: Arc<dyn WorkflowHost>,
}

impl Manager {
    pub fn new(integrations: Arc<dyn IntegrationStore>, host: Arc<dyn WorkflowHost>) -> Self {
        Self { integrations, host }
    }

    pub async fn fan_out(&self, submission: &SubmissionEvent) -> Result<FanOutReport, StoreError> {
        let integrations = self.integrations.list_by_form(&submission.form_id).await?;

        let mut buckets: BTreeMap<&'static str, Vec<WorkflowSpec>> = BTreeMap::new();
        let mut report = FanOutReport::default();

        for integration in &integrations {
            let message = IntegrationMessage::new(integration, submission);
            match route(&message) {
                Ok(spec) => buckets
                    .entry(spec.params.destination.kind())
                    .or_default()
                    .push(spec),
                Err(e) => {
                    tracing::warn!(
                        integration_id = %integration.id,
                        integration_type = %integration.integration_type,
                        error = %e,
                        "skipping integration during fan-out"
                    );
                    report.skipped += 1;
                }
            }
        }

        let results = join_all(buckets.iter().map(|(kind, specs)| async move {
            (*kind, self.host.create_batch(specs).await)
        }))
        .await;

        let mut first_error = None;
        for (kind, result) in results {
            match result {
                Ok(created) => {
                    report.created.insert(kind.to_string(), created);
                }
                Err(e) => {
                    tracing::error!(destination = kind, error = %e, "batch workflow creation failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!(
                    form_id = %submission.form_id,
                    respondent_id = %submission.respondent_id,
                    created = report.total_created(),
                    skipped = report.skipped,
                    "fan-out completed"
                );
                Ok(report)
            }
        }
    }
}
