use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::models::{format_timestamp, LeadSubmission, LivenessResponse, SubmitResponse};
use crate::pipeline::LeadPipeline;

pub const SUBMIT_SUCCESS_MESSAGE: &str = "Thank you! We'll be in touch soon.";

/// Application state shared across all request handlers.
#[derive(Debug)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Contact form workflow against the CRM.
    pub pipeline: LeadPipeline,
}

/// Health check endpoint.
///
/// Returns the service status, version, and whether the CRM token is configured.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "crm_configured": state.pipeline.is_configured(),
        })),
    )
}

/// GET /api/contact
///
/// Static liveness payload for the contact endpoint.
pub async fn contact_liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        message: "Contact API is working".to_string(),
        timestamp: format_timestamp(Utc::now()),
    })
}

/// POST /api/contact
///
/// Runs the contact form submission against the CRM.
///
/// # Returns
///
/// * `200` - `{success: true, message, contactId}`.
/// * `400` - Malformed JSON or a validation failure, `{success: false, error}`.
/// * `413` - Body larger than the configured limit.
/// * `500` - Missing configuration or a CRM failure, `{success: false, error}` with a
///   generic message.
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let Json(submission) = payload
        .map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge(rejection.body_text())
            } else {
                tracing::info!("Unreadable contact form body: {}", rejection.body_text());
                AppError::BadRequest("Invalid request body".to_string())
            }
        })
        .context("reading contact form body")?;

    let receipt = state.pipeline.submit(submission).await?;

    Ok(Json(SubmitResponse {
        success: true,
        message: SUBMIT_SUCCESS_MESSAGE.to_string(),
        contact_id: receipt.contact_id,
    }))
}
