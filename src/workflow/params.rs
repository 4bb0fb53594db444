use serde::{Deserialize, Serialize};

use crate::destinations::DestinationConfig;
use crate::models::{IntegrationType, SubmissionValue};

/// Deterministic instance id; creating an instance twice with it is a no-op.
pub fn instance_id(
    respondent_id: &str,
    integration_type: IntegrationType,
    integration_id: &str,
) -> String {
    format!("{respondent_id}-{integration_type}-{integration_id}")
}

/// A workflow creation call: `{id, params}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub id: String,
    pub params: WorkflowParams,
}

/// Everything one delivery workflow instance needs, persisted with the instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowParams {
    pub form_id: String,
    pub integration_id: String,
    pub user_id: String,
    pub respondent_id: String,
    pub values: Vec<SubmissionValue>,
    pub destination: DestinationConfig,
}
