use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored binding of one form to one destination.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: String,
    pub form_id: String,
    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub integration_type: IntegrationType,
    /// Type-specific JSON, validated at dispatch time.
    pub meta_data: Option<String>,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationType {
    Spreadsheet,
    WorkspaceDatabase,
    Webhook,
    Mail,
    MailNotify,
}

impl IntegrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::Spreadsheet => "spreadsheet",
            IntegrationType::WorkspaceDatabase => "workspace-database",
            IntegrationType::Webhook => "webhook",
            IntegrationType::Mail => "mail",
            IntegrationType::MailNotify => "mail-notify",
        }
    }

    /// Human readable destination name used in owner notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            IntegrationType::Spreadsheet => "Google Sheets",
            IntegrationType::WorkspaceDatabase => "Notion",
            IntegrationType::Webhook => "Webhook",
            IntegrationType::Mail | IntegrationType::MailNotify => "Email",
        }
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spreadsheet" => Ok(IntegrationType::Spreadsheet),
            "workspace-database" => Ok(IntegrationType::WorkspaceDatabase),
            "webhook" => Ok(IntegrationType::Webhook),
            "mail" => Ok(IntegrationType::Mail),
            "mail-notify" => Ok(IntegrationType::MailNotify),
            other => Err(format!("unknown integration type: {other}")),
        }
    }
}

impl TryFrom<String> for IntegrationType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Where to send the breaker notification for a form.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OwnerContact {
    pub email: String,
    pub form_name: String,
}
