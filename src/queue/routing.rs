//! Validation and routing shared by the queue dispatcher and the fan-out manager.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::IntegrationMessage;
use crate::destinations::{DestinationConfig, MailMeta, TableMeta, WebhookMeta};
use crate::error::DeliveryError;
use crate::models::IntegrationType;
use crate::workflow::{instance_id, WorkflowParams, WorkflowSpec};

/// Validate a message's `metaData` and build its workflow creation call.
pub fn route(message: &IntegrationMessage) -> Result<WorkflowSpec, DeliveryError> {
    let destination = parse_destination(message.integration_type, message.meta_data.as_deref())?;

    Ok(WorkflowSpec {
        id: instance_id(
            &message.respondent_id,
            message.integration_type,
            &message.integration_id,
        ),
        params: WorkflowParams {
            form_id: message.form_id.clone(),
            integration_id: message.integration_id.clone(),
            user_id: message.user_id.clone(),
            respondent_id: message.respondent_id.clone(),
            values: message.values.clone(),
            destination,
        },
    })
}

pub fn parse_destination(
    integration_type: IntegrationType,
    meta_data: Option<&str>,
) -> Result<DestinationConfig, DeliveryError> {
    let raw = meta_data
        .ok_or_else(|| DeliveryError::Configuration("metaData is missing".to_string()))?;
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| DeliveryError::Configuration(format!("metaData is not valid JSON: {e}")))?;

    match integration_type {
        IntegrationType::Spreadsheet => table_meta(value).map(DestinationConfig::Spreadsheet),
        IntegrationType::WorkspaceDatabase => {
            table_meta(value).map(DestinationConfig::WorkspaceDatabase)
        }
        IntegrationType::Webhook => webhook_meta(value).map(DestinationConfig::Webhook),
        IntegrationType::Mail | IntegrationType::MailNotify => {
            mail_meta(value).map(DestinationConfig::Mail)
        }
    }
}

fn table_meta(value: Value) -> Result<TableMeta, DeliveryError> {
    let meta: TableMeta = decode(value, "destination")?;
    if meta.id.trim().is_empty() {
        return Err(DeliveryError::Configuration(
            "destination id is empty".to_string(),
        ));
    }
    Ok(meta)
}

fn webhook_meta(value: Value) -> Result<WebhookMeta, DeliveryError> {
    let meta: WebhookMeta = decode(value, "webhook")?;
    let url = url::Url::parse(&meta.url)
        .map_err(|e| DeliveryError::Configuration(format!("webhook url is invalid: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DeliveryError::Configuration(format!(
            "webhook url scheme '{}' is not supported",
            url.scheme()
        )));
    }
    Ok(meta)
}

fn mail_meta(value: Value) -> Result<MailMeta, DeliveryError> {
    let meta: MailMeta = decode(value, "mail")?;
    if meta.from.trim().is_empty() || meta.to.trim().is_empty() {
        return Err(DeliveryError::Configuration(
            "mail from and to are required".to_string(),
        ));
    }
    Ok(meta)
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, DeliveryError> {
    serde_json::from_value(value)
        .map_err(|e| DeliveryError::Configuration(format!("invalid {what} metaData: {e}")))
}
