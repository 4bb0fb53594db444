use sqlx::PgPool;

pub async fn find_output(
    pool: &PgPool,
    instance_id: &str,
    step: &str,
) -> Result<Option<serde_json::Value>, sqlx::Error> {
    sqlx::query_scalar::<_, serde_json::Value>(
        "SELECT output FROM workflow_steps WHERE instance_id = $1 AND step = $2",
    )
    .bind(instance_id)
    .bind(step)
    .fetch_optional(pool)
    .await
}

/// Record a completed step. A step completes at most once per instance.
pub async fn save_output(
    pool: &PgPool,
    instance_id: &str,
    step: &str,
    output: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO workflow_steps (instance_id, step, output) VALUES ($1, $2, $3)
         ON CONFLICT (instance_id, step) DO NOTHING",
    )
    .bind(instance_id)
    .bind(step)
    .bind(output)
    .execute(pool)
    .await?;
    Ok(())
}
