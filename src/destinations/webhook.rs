use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use super::{error_body, DeliveryReceipt, WebhookMeta};
use crate::error::DeliveryError;
use crate::workflow::KeyedRecord;

pub struct WebhookClient {
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// One JSON `POST` of the keyed record, with the stored custom headers.
    pub async fn deliver(
        &self,
        meta: &WebhookMeta,
        record: &KeyedRecord,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let headers = build_headers(meta)?;

        let resp = self
            .client
            .post(&meta.url)
            .headers(headers)
            .json(&record.to_json())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DeliveryError::from_status(status, error_body(resp).await));
        }

        Ok(DeliveryReceipt {
            destination: "webhook".to_string(),
            reference: Some(status.as_u16().to_string()),
            already_delivered: false,
        })
    }
}

fn build_headers(meta: &WebhookMeta) -> Result<HeaderMap, DeliveryError> {
    let mut headers = HeaderMap::new();

    for (name, value) in meta.headers.iter().flatten() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DeliveryError::Configuration(format!("invalid header name '{name}': {e}")))?;
        // Content type is fixed.
        if name == CONTENT_TYPE {
            continue;
        }
        let value = HeaderValue::from_str(value).map_err(|e| {
            DeliveryError::Configuration(format!("invalid value for header '{name}': {e}"))
        })?;
        headers.insert(name, value);
    }

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}
