use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{PersistenceError, ValidationError};
use crate::server::AppState;
use crate::server::store::SubmissionRecord;
use crate::server::validation::{Step1Submission, validate_step1};

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub id: Uuid,
    pub message: String,
}

/// Failures of a submission request.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Persistence(PersistenceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(failures) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Validation failed", "errors": failures.errors })),
            )
                .into_response(),
            ApiError::Persistence(e) => {
                error!("Failed to store submission: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// `GET /`
pub async fn liveness() -> Json<serde_json::Value> {
    Json(json!({ "message": "server is alive" }))
}

/// `POST /api/udyam/step1`
///
/// A body that is not JSON, or has no JSON content type, is validated as
/// if it were empty, so every bad request gets the per-field 400.
pub async fn submit_step1(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SavedResponse>, ApiError> {
    let body = match body {
        Ok(Json(value)) => Step1Submission::from_value(&value),
        Err(rejection) => {
            debug!("Unreadable submission body: {}", rejection);
            Step1Submission::default()
        }
    };

    let accepted = validate_step1(&body).map_err(ApiError::Validation)?;

    let store = state.store.clone();
    let record = SubmissionRecord::accepted(accepted);
    let saved = tokio::task::spawn_blocking(move || store.insert(record))
        .await
        .map_err(|e| ApiError::Persistence(PersistenceError::Unavailable(e.to_string())))?
        .map_err(ApiError::Persistence)?;

    info!("Saved submission {}", saved.id);

    Ok(Json(SavedResponse {
        id: saved.id,
        message: "Saved successfully".to_string(),
    }))
}
