use sqlx::PgPool;

use crate::models::{Integration, OwnerContact};

const COLUMNS: &str = "id, form_id, type, meta_data, owner_id, created_at";

pub async fn list_by_form(pool: &PgPool, form_id: &str) -> Result<Vec<Integration>, sqlx::Error> {
    sqlx::query_as::<_, Integration>(&format!(
        "SELECT {COLUMNS} FROM integrations WHERE form_id = $1 ORDER BY created_at ASC"
    ))
    .bind(form_id)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Integration>, sqlx::Error> {
    sqlx::query_as::<_, Integration>(&format!("SELECT {COLUMNS} FROM integrations WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Returns true if a row was deleted.
pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM integrations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn owner_contact(pool: &PgPool, form_id: &str) -> Result<Option<OwnerContact>, sqlx::Error> {
    sqlx::query_as::<_, OwnerContact>(
        "SELECT u.email, f.name AS form_name
         FROM forms f
         JOIN users u ON f.user_id = u.id
         WHERE f.id = $1",
    )
    .bind(form_id)
    .fetch_optional(pool)
    .await
}
