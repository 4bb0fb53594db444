//! Destination capabilities for the generic delivery workflow.
//!
//! Each [`DestinationConfig`] variant decides whether credentials are needed,
//! how the submission is transformed, and which network call delivers it.

pub mod mail;
pub mod spreadsheet;
pub mod template;
pub mod webhook;
pub mod workspace_db;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::credentials::ResolvedCredentials;
use crate::error::DeliveryError;
use crate::models::{FormField, ProviderKind};
use crate::workflow::{KeyedRecord, WorkflowParams};

pub use mail::MailDelivery;
pub use spreadsheet::SheetsClient;
pub use webhook::WebhookClient;
pub use workspace_db::NotionClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "kebab-case")]
pub enum DestinationConfig {
    Spreadsheet(TableMeta),
    WorkspaceDatabase(TableMeta),
    Webhook(WebhookMeta),
    Mail(MailMeta),
}

/// Spreadsheet or workspace-database target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookMeta {
    pub url: String,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMeta {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub is_dynamic_body: bool,
}

impl DestinationConfig {
    /// Workflow bucket name; `mail-notify` integrations share the mail workflow.
    pub fn kind(&self) -> &'static str {
        match self {
            DestinationConfig::Spreadsheet(_) => "spreadsheet",
            DestinationConfig::WorkspaceDatabase(_) => "workspace-database",
            DestinationConfig::Webhook(_) => "webhook",
            DestinationConfig::Mail(_) => "mail",
        }
    }

    pub fn credential_provider(&self) -> Option<ProviderKind> {
        match self {
            DestinationConfig::Spreadsheet(_) => Some(ProviderKind::Google),
            DestinationConfig::WorkspaceDatabase(_) => Some(ProviderKind::Notion),
            DestinationConfig::Webhook(_) | DestinationConfig::Mail(_) => None,
        }
    }
}

/// Output of the transform step, checkpointed before delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Payload {
    Record { record: KeyedRecord },
    Mail { html: String },
}

/// Summary of a successful delivery, checkpointed as the final step output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub destination: String,
    pub reference: Option<String>,
    /// True when an earlier attempt had already delivered this submission.
    #[serde(default)]
    pub already_delivered: bool,
}

pub fn transform(params: &WorkflowParams, fields: &[FormField]) -> Result<Payload, DeliveryError> {
    match &params.destination {
        DestinationConfig::Spreadsheet(_)
        | DestinationConfig::WorkspaceDatabase(_)
        | DestinationConfig::Webhook(_) => Ok(Payload::Record {
            record: KeyedRecord::build(fields, &params.values),
        }),
        DestinationConfig::Mail(meta) if meta.is_dynamic_body => Ok(Payload::Mail {
            html: template::render_dynamic(&meta.body, &params.values),
        }),
        DestinationConfig::Mail(_) => Ok(Payload::Mail {
            html: template::render_listing(fields, &params.values)?,
        }),
    }
}

/// HTTP and mail clients for every destination type.
pub struct Destinations {
    pub sheets: SheetsClient,
    pub notion: NotionClient,
    pub webhook: WebhookClient,
    pub mail: MailDelivery,
}

impl Destinations {
    /// Perform exactly one destination-specific delivery attempt.
    pub async fn deliver(
        &self,
        params: &WorkflowParams,
        payload: &Payload,
        credentials: Option<&ResolvedCredentials>,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        match (&params.destination, payload) {
            (DestinationConfig::Spreadsheet(meta), Payload::Record { record }) => {
                let token = require_token(credentials)?;
                self.sheets.deliver(token, &meta.id, record).await
            }
            (DestinationConfig::WorkspaceDatabase(meta), Payload::Record { record }) => {
                let token = require_token(credentials)?;
                self.notion
                    .deliver(token, &meta.id, &params.respondent_id, record)
                    .await
            }
            (DestinationConfig::Webhook(meta), Payload::Record { record }) => {
                self.webhook.deliver(meta, record).await
            }
            (DestinationConfig::Mail(meta), Payload::Mail { html }) => {
                self.mail.deliver(meta, html).await
            }
            (destination, _) => Err(DeliveryError::Configuration(format!(
                "payload does not match {} destination",
                destination.kind()
            ))),
        }
    }
}

fn require_token(credentials: Option<&ResolvedCredentials>) -> Result<&str, DeliveryError> {
    credentials
        .map(|c| c.access_token.as_str())
        .ok_or_else(|| DeliveryError::Credential("no credentials resolved".to_string()))
}

/// Read a bounded amount of an error response body for logs and errors.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(1024)
        .collect()
}
