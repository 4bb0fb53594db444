use sqlx::PgPool;
use uuid::Uuid;

use crate::models::IntegrationQueueItem;

/// Seconds a claimed message stays invisible before it can be claimed again.
pub const VISIBILITY_TIMEOUT_SECS: f64 = 300.0;

pub async fn enqueue(
    pool: &PgPool,
    payload: &serde_json::Value,
) -> Result<IntegrationQueueItem, sqlx::Error> {
    sqlx::query_as::<_, IntegrationQueueItem>(
        "INSERT INTO integration_queue (payload) VALUES ($1) RETURNING *",
    )
    .bind(payload)
    .fetch_one(pool)
    .await
}

/// Atomically claim up to `limit` due messages using SELECT FOR UPDATE SKIP LOCKED.
/// Messages left in 'processing' by a crashed consumer become due again after the visibility timeout.
pub async fn claim_batch(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<IntegrationQueueItem>, sqlx::Error> {
    sqlx::query_as::<_, IntegrationQueueItem>(
        "UPDATE integration_queue
         SET status = 'processing',
             attempts = attempts + 1,
             next_retry_at = now() + make_interval(secs => $2::double precision)
         WHERE id IN (
             SELECT id FROM integration_queue
             WHERE status IN ('pending', 'failed', 'processing')
               AND next_retry_at <= now()
               AND attempts < max_attempts
             ORDER BY next_retry_at ASC
             LIMIT $1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING *",
    )
    .bind(limit)
    .bind(VISIBILITY_TIMEOUT_SECS)
    .fetch_all(pool)
    .await
}

/// Remove a handled message.
pub async fn ack(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM integration_queue WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark as failed with exponential backoff. If max attempts reached, stays 'failed' permanently.
pub async fn mark_failed(
    pool: &PgPool,
    id: Uuid,
    attempts: i32,
    max_attempts: i32,
    error: &str,
) -> Result<(), sqlx::Error> {
    if attempts >= max_attempts {
        sqlx::query(
            "UPDATE integration_queue SET status = 'failed', last_error = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
    } else {
        // Retry with exponential backoff: 2^attempts seconds
        let backoff_secs = 2_i64.pow(attempts.max(0) as u32);
        sqlx::query(
            "UPDATE integration_queue
             SET status = 'failed',
                 last_error = $2,
                 next_retry_at = now() + make_interval(secs => $3::double precision)
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(backoff_secs as f64)
        .execute(pool)
        .await?;
    }
    Ok(())
}
