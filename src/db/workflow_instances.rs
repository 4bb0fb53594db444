use sqlx::PgPool;

use crate::models::WorkflowInstance;

/// Insert unless an instance with this id exists. Returns true if inserted.
pub async fn create(
    pool: &PgPool,
    id: &str,
    params: &serde_json::Value,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO workflow_instances (id, params) VALUES ($1, $2)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(id)
    .bind(params)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Batch insert in one statement; existing ids are skipped. Returns the number inserted.
pub async fn create_batch(
    pool: &PgPool,
    ids: &[String],
    params: &[serde_json::Value],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO workflow_instances (id, params)
         SELECT * FROM UNNEST($1::text[], $2::jsonb[])
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(ids)
    .bind(params)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Lease the oldest pending instance, or a running one whose lease expired.
pub async fn claim_next(
    pool: &PgPool,
    lease_secs: f64,
) -> Result<Option<WorkflowInstance>, sqlx::Error> {
    sqlx::query_as::<_, WorkflowInstance>(
        "UPDATE workflow_instances
         SET status = 'running',
             attempts = attempts + 1,
             leased_until = now() + make_interval(secs => $1::double precision),
             updated_at = now()
         WHERE id = (
             SELECT id FROM workflow_instances
             WHERE status = 'pending'
                OR (status = 'running' AND leased_until <= now())
             ORDER BY created_at ASC
             LIMIT 1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING *",
    )
    .bind(lease_secs)
    .fetch_optional(pool)
    .await
}

pub async fn mark_done(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE workflow_instances
         SET status = 'done', leased_until = NULL, updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(pool: &PgPool, id: &str, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE workflow_instances
         SET status = 'failed', last_error = $2, leased_until = NULL, updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}
