use super::{IntegrationMessage, SubmissionEvent};
use crate::error::StoreError;
use crate::models::Integration;
use crate::store::{IntegrationQueue, IntegrationStore};

/// One message per integration of the submitted form.
pub fn build_messages(
    integrations: &[Integration],
    submission: &SubmissionEvent,
) -> Vec<IntegrationMessage> {
    integrations
        .iter()
        .filter(|integration| integration.form_id == submission.form_id)
        .map(|integration| IntegrationMessage::new(integration, submission))
        .collect()
}

/// Enqueue delivery messages for an accepted submission. Returns how many were enqueued.
pub async fn enqueue_for_submission(
    queue: &dyn IntegrationQueue,
    integrations: &dyn IntegrationStore,
    submission: &SubmissionEvent,
) -> Result<usize, StoreError> {
    let stored = integrations.list_by_form(&submission.form_id).await?;
    let messages = build_messages(&stored, submission);

    for message in &messages {
        let payload = serde_json::to_value(message)?;
        if let Err(e) = queue.enqueue(&payload).await {
            tracing::error!(
                integration_id = %message.integration_id,
                error = %e,
                "failed to enqueue integration message"
            );
            return Err(e);
        }
    }

    Ok(messages.len())
}
