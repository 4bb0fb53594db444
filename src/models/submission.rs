use serde::{Deserialize, Serialize};

/// One answered field of a submission. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionValue {
    pub form_field_id: String,
    pub value: String,
    pub respondent_id: String,
    pub form_id: String,
}
