use serde_json::json;

use super::{error_body, DeliveryReceipt};
use crate::error::DeliveryError;
use crate::workflow::KeyedRecord;

/// Google Sheets values API client.
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
}

impl SheetsClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Rewrite the header row with the current field keys, then append the record.
    pub async fn deliver(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        record: &KeyedRecord,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        self.set_header_row(access_token, spreadsheet_id, &record.keys())
            .await?;
        let updated_range = self
            .append_row(access_token, spreadsheet_id, &record.values())
            .await?;

        Ok(DeliveryReceipt {
            destination: "spreadsheet".to_string(),
            reference: updated_range,
            already_delivered: false,
        })
    }

    pub async fn set_header_row(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        keys: &[String],
    ) -> Result<(), DeliveryError> {
        let url = format!(
            "{}/v4/spreadsheets/{spreadsheet_id}/values/A1?valueInputOption=RAW",
            self.base_url
        );

        let resp = self
            .client
            .put(&url)
            .bearer_auth(access_token)
            .json(&json!({
                "range": "A1",
                "majorDimension": "ROWS",
                "values": [keys],
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(DeliveryError::from_status(status, error_body(resp).await));
        }
        Ok(())
    }

    /// Returns the updated range reported by the API, if any.
    pub async fn append_row(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        values: &[String],
    ) -> Result<Option<String>, DeliveryError> {
        let url = format!(
            "{}/v4/spreadsheets/{spreadsheet_id}/values/A1:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.base_url
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({
                "majorDimension": "ROWS",
                "values": [values],
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(DeliveryError::from_status(status, error_body(resp).await));
        }

        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        Ok(body["updates"]["updatedRange"]
            .as_str()
            .map(|s| s.to_string()))
    }
}
