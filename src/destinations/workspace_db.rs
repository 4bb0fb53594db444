use serde_json::{json, Map, Value};

use super::{error_body, DeliveryReceipt};
use crate::error::DeliveryError;
use crate::workflow::KeyedRecord;

/// Title property that always carries the respondent id.
pub const RESPONDENT_PROPERTY: &str = "respondent";

const RICH_TEXT_LIMIT: usize = 2000;

/// Notion pages API client.
pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl NotionClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
        }
    }

    /// Create one page for the respondent unless a previous attempt already did.
    pub async fn deliver(
        &self,
        access_token: &str,
        database_id: &str,
        respondent_id: &str,
        record: &KeyedRecord,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        if let Some(page_id) = self
            .find_page_for_respondent(access_token, database_id, respondent_id)
            .await?
        {
            tracing::info!(
                database_id,
                respondent_id,
                page_id = %page_id,
                "page for respondent already exists, skipping create"
            );
            return Ok(DeliveryReceipt {
                destination: "workspace-database".to_string(),
                reference: Some(page_id),
                already_delivered: true,
            });
        }

        let page_id = self
            .create_page(access_token, database_id, respondent_id, record)
            .await?;

        Ok(DeliveryReceipt {
            destination: "workspace-database".to_string(),
            reference: page_id,
            already_delivered: false,
        })
    }

    pub async fn find_page_for_respondent(
        &self,
        access_token: &str,
        database_id: &str,
        respondent_id: &str,
    ) -> Result<Option<String>, DeliveryError> {
        let url = format!("{}/v1/databases/{database_id}/query", self.base_url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header("Notion-Version", &self.api_version)
            .json(&json!({
                "filter": {
                    "property": RESPONDENT_PROPERTY,
                    "title": { "equals": respondent_id },
                },
                "page_size": 1,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(DeliveryError::from_status(status, error_body(resp).await));
        }

        let body: Value = resp.json().await?;
        Ok(body["results"]
            .as_array()
            .and_then(|results| results.first())
            .and_then(|page| page["id"].as_str())
            .map(|id| id.to_string()))
    }

    pub async fn create_page(
        &self,
        access_token: &str,
        database_id: &str,
        respondent_id: &str,
        record: &KeyedRecord,
    ) -> Result<Option<String>, DeliveryError> {
        let url = format!("{}/v1/pages", self.base_url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header("Notion-Version", &self.api_version)
            .json(&json!({
                "parent": { "database_id": database_id },
                "properties": page_properties(respondent_id, record),
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(DeliveryError::from_status(status, error_body(resp).await));
        }

        let body: Value = resp.json().await.unwrap_or_default();
        Ok(body["id"].as_str().map(|s| s.to_string()))
    }
}

pub fn page_properties(respondent_id: &str, record: &KeyedRecord) -> Value {
    let mut properties = Map::new();
    properties.insert(
        RESPONDENT_PROPERTY.to_string(),
        json!({ "title": [text(respondent_id)] }),
    );
    for entry in record.entries() {
        properties.insert(
            entry.key.clone(),
            json!({ "rich_text": [text(&entry.value)] }),
        );
    }
    Value::Object(properties)
}

fn text(content: &str) -> Value {
    let content: String = content.chars().take(RICH_TEXT_LIMIT).collect();
    json!({ "type": "text", "text": { "content": content } })
}
