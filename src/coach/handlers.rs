use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::Serialize;

use super::models::{CoachRequest, CoachResponse};
use super::service::CoachError;
use crate::extractors::ForwardedFor;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub paused: bool,
    pub daily_used: u32,
    pub daily_limit: u32,
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let usage = state.coach_service.usage();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        paused: state.coach_service.is_paused(),
        daily_used: usage.used_today,
        daily_limit: usage.daily_limit,
    })
}

/// Generate a study aid from notes
///
/// POST /api/coach {"prompt": "...", "mode": "quiz", "userId": "..."}
///
/// The body is decoded by hand so that an unreadable body is reported as
/// missing fields, and only after the kill switch has been checked.
pub async fn generate(
    State(state): State<AppState>,
    ForwardedFor(forwarded_for): ForwardedFor,
    body: Bytes,
) -> Result<Json<CoachResponse>, CoachError> {
    let request = serde_json::from_slice::<CoachRequest>(&body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Unreadable coach request body");
        CoachRequest::default()
    });

    let response = state
        .coach_service
        .generate(request, forwarded_for.as_deref())
        .await?;
    Ok(Json(response))
}

/// CORS preflight; headers are added by the CORS middleware
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Any method other than POST or OPTIONS on the coach endpoint
pub async fn method_not_allowed() -> CoachError {
    CoachError::MethodNotAllowed
}
