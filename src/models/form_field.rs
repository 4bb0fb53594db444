use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    pub label: String,
    pub order: i32,
}

impl FormField {
    /// Stable record key: `order` disambiguates duplicate labels.
    pub fn key(&self) -> String {
        format!("{}_{}", self.order, self.label.trim())
    }
}
