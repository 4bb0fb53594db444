use sqlx::PgPool;

use crate::models::FormField;

pub async fn list_by_form(pool: &PgPool, form_id: &str) -> Result<Vec<FormField>, sqlx::Error> {
    sqlx::query_as::<_, FormField>(
        r#"SELECT id, label, field_order AS "order"
           FROM form_fields
           WHERE form_id = $1
           ORDER BY field_order ASC"#,
    )
    .bind(form_id)
    .fetch_all(pool)
    .await
}
