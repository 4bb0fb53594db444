use std::fmt;

use serde::{Deserialize, Serialize};

/// Stored OAuth account for a (user, provider) pair.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Credential {
    pub user_id: String,
    pub provider_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Notion,
}

impl ProviderKind {
    pub fn provider_id(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Notion => "notion",
        }
    }

    /// Google issues short-lived access tokens; Notion tokens do not expire.
    pub fn is_refreshable(&self) -> bool {
        matches!(self, ProviderKind::Google)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_id())
    }
}
