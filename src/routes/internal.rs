use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::InternalCaller;
use crate::error::AppError;
use crate::models::SubmissionValue;
use crate::queue::{producer, SubmissionEvent};
use crate::state::SharedState;
use crate::workflow::FanOutReport;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub respondent_id: String,
    pub user_id: String,
    #[serde(default)]
    pub values: Vec<SubmissionValue>,
}

impl SubmissionRequest {
    fn into_event(self, form_id: String) -> Result<SubmissionEvent, AppError> {
        if self.respondent_id.trim().is_empty() {
            return Err(AppError::BadRequest("respondentId is required".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(AppError::BadRequest("userId is required".to_string()));
        }
        if let Some(stray) = self.values.iter().find(|v| v.form_id != form_id) {
            return Err(AppError::BadRequest(format!(
                "value for field {} belongs to form {}",
                stray.form_field_id, stray.form_id
            )));
        }

        Ok(SubmissionEvent {
            form_id,
            respondent_id: self.respondent_id,
            user_id: self.user_id,
            values: self.values,
        })
    }
}

/// Enqueue one delivery message per integration of the form.
pub async fn enqueue_submission(
    State(state): State<SharedState>,
    _caller: InternalCaller,
    Path(form_id): Path<String>,
    Json(req): Json<SubmissionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let event = req.into_event(form_id)?;
    let enqueued =
        producer::enqueue_for_submission(state.queue.as_ref(), state.integrations.as_ref(), &event).await?;

    tracing::info!(
        form_id = %event.form_id,
        respondent_id = %event.respondent_id,
        enqueued,
        "submission enqueued for delivery"
    );

    Ok((StatusCode::ACCEPTED, Json(json!({ "enqueued": enqueued }))))
}

/// Create workflow instances for every integration of the form directly.
pub async fn fan_out(
    State(state): State<SharedState>,
    _caller: InternalCaller,
    Path(form_id): Path<String>,
    Json(req): Json<SubmissionRequest>,
) -> Result<Json<FanOutReport>, AppError> {
    let event = req.into_event(form_id)?;
    let report = state.manager.fan_out(&event).await?;
    Ok(Json(report))
}
