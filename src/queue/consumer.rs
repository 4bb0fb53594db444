use super::{DispatchOutcome, Dispatcher, IntegrationMessage};
use crate::error::StoreError;
use crate::store::IntegrationQueue;

/// Claim one batch of due messages and dispatch it. Returns the number of messages claimed.
///
/// Handled, skipped and duplicate messages are acked. A message whose instance
/// could not be created is rescheduled; an undecodable one is dropped.
pub async fn consume_once(
    queue: &dyn IntegrationQueue,
    dispatcher: &Dispatcher,
    batch_size: i64,
) -> Result<usize, StoreError> {
    let items = queue.claim_batch(batch_size).await?;
    if items.is_empty() {
        return Ok(0);
    }

    let mut claimed = Vec::with_capacity(items.len());
    for item in &items {
        match serde_json::from_value::<IntegrationMessage>(item.payload.clone()) {
            Ok(message) => claimed.push((item, message)),
            Err(e) => {
                tracing::warn!(queue_item = %item.id, error = %e, "dropping undecodable integration message");
                queue.ack(item.id).await?;
            }
        }
    }

    let messages: Vec<IntegrationMessage> = claimed.iter().map(|(_, m)| m.clone()).collect();
    let outcomes = dispatcher.dispatch_batch(&messages).await;

    for ((item, _), outcome) in claimed.iter().zip(outcomes) {
        match outcome {
            DispatchOutcome::Failed(e) => queue.mark_failed(item, &e.to_string()).await?,
            _ => queue.ack(item.id).await?,
        }
    }

    Ok(items.len())
}
