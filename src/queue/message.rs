use serde::{Deserialize, Serialize};

use crate::models::{Integration, IntegrationType, SubmissionValue};

/// One integration-delivery message, as enqueued by the submission path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationMessage {
    pub form_id: String,
    pub values: Vec<SubmissionValue>,
    pub user_id: String,
    pub respondent_id: String,
    pub integration_id: String,
    pub meta_data: Option<String>,
    #[serde(rename = "type")]
    pub integration_type: IntegrationType,
}

/// An accepted submission, the input of both entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEvent {
    pub form_id: String,
    pub respondent_id: String,
    /// Owner of the form; credentials are resolved for this user.
    pub user_id: String,
    pub values: Vec<SubmissionValue>,
}

impl IntegrationMessage {
    pub fn new(integration: &Integration, submission: &SubmissionEvent) -> Self {
        Self {
            form_id: submission.form_id.clone(),
            values: submission.values.clone(),
            user_id: submission.user_id.clone(),
            respondent_id: submission.respondent_id.clone(),
            integration_id: integration.id.clone(),
            meta_data: integration.meta_data.clone(),
            integration_type: integration.integration_type,
        }
    }
}
