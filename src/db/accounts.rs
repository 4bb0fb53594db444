use sqlx::PgPool;

use crate::models::Credential;

pub async fn find(
    pool: &PgPool,
    user_id: &str,
    provider_id: &str,
) -> Result<Option<Credential>, sqlx::Error> {
    sqlx::query_as::<_, Credential>(
        "SELECT user_id, provider_id, access_token, refresh_token
         FROM accounts
         WHERE user_id = $1 AND provider_id = $2",
    )
    .bind(user_id)
    .bind(provider_id)
    .fetch_optional(pool)
    .await
}

pub async fn update_access_token(
    pool: &PgPool,
    user_id: &str,
    provider_id: &str,
    access_token: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE accounts SET access_token = $3, updated_at = now()
         WHERE user_id = $1 AND provider_id = $2",
    )
    .bind(user_id)
    .bind(provider_id)
    .bind(access_token)
    .execute(pool)
    .await?;
    Ok(())
}
