use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::error::{ScoringError, ValidationError};
use crate::service::{HealthStatus, SignalService};
use crate::signals::{ScoreResult, SignalRequest};

pub type AppState = Arc<SignalService>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Internal(String),
}

impl From<ScoringError> for ApiError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::Validation(e) => ApiError::Validation(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": e.to_string(),
                    "field": e.field(),
                    "status": StatusCode::BAD_REQUEST.as_u16(),
                }),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": msg,
                    "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn health(State(service): State<AppState>) -> Json<HealthStatus> {
    Json(service.health())
}

async fn predict(
    State(service): State<AppState>,
    Json(request): Json<SignalRequest>,
) -> Result<Json<ScoreResult>, ApiError> {
    let result = service.predict(request)?;
    Ok(Json(result))
}
