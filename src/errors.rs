use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Message returned to the caller for any upstream or internal failure.
pub const GENERIC_SUBMIT_FAILURE: &str = "Failed to submit form. Please try again.";

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Bad request error (invalid input). The message is shown to the caller verbatim.
    BadRequest(String),
    /// The server is missing configuration it needs to serve the request.
    Configuration(String),
    /// Request body exceeds the configured limit.
    PayloadTooLarge(String),
    /// Error interacting with the CRM.
    ExternalApiError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Configuration(_) | AppError::ExternalApiError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::WithContext { source, .. } => source.status_code(),
        }
    }

    /// The message that is safe to echo back to the caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::PayloadTooLarge(_) => "Request body is too large".to_string(),
            AppError::Configuration(_) => "Server configuration error".to_string(),
            AppError::ExternalApiError(_) => GENERIC_SUBMIT_FAILURE.to_string(),
            AppError::WithContext { source, .. } => source.public_message(),
        }
    }

    /// The innermost error, with every context layer removed.
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Client errors are echoed as-is. Server-side failures are logged in full and the
    /// caller only sees a generic message.
    fn into_response(self) -> Response {
        match &self {
            AppError::BadRequest(msg) => tracing::info!("Rejected submission: {}", msg),
            AppError::PayloadTooLarge(msg) => tracing::info!("Rejected submission: {}", msg),
            AppError::Configuration(msg) => tracing::error!("Configuration error: {}", msg),
            AppError::ExternalApiError(msg) => tracing::error!("External API error: {}", msg),
            // Log full context chain for debugging
            AppError::WithContext { .. } if self.status_code().is_client_error() => {
                tracing::info!("Rejected submission: {}", self)
            }
            AppError::WithContext { .. } => tracing::error!("Error with context: {}", self),
        }

        let body = Json(json!({
            "success": false,
            "error": self.public_message(),
        }));

        (self.status_code(), body).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_is_echoed() {
        let err = AppError::BadRequest("Please provide a valid email address".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Please provide a valid email address");
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::ExternalApiError("CRM returned 401: token revoked".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), GENERIC_SUBMIT_FAILURE);

        let err = AppError::Configuration("CRM_ACCESS_TOKEN is not set".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("CRM_ACCESS_TOKEN"));
    }

    #[test]
    fn test_context_keeps_source_mapping() {
        let result: Result<(), AppError> =
            Err(AppError::BadRequest("Missing required fields".to_string()));
        let err = result.context("validating submission").unwrap_err();

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Missing required fields");
        assert_eq!(
            err.to_string(),
            "validating submission: Bad request: Missing required fields"
        );
    }

    #[test]
    fn test_root_cause_unwraps_every_layer() {
        let result: Result<(), AppError> =
            Err(AppError::ExternalApiError("CRM returned 500".to_string()));
        let err = result
            .context("resolving CRM contact")
            .context("processing submission")
            .unwrap_err();

        assert!(matches!(err.root_cause(), AppError::ExternalApiError(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), GENERIC_SUBMIT_FAILURE);
    }

    #[test]
    fn test_payload_too_large_maps_to_413() {
        let err = AppError::PayloadTooLarge("length limit exceeded".to_string());
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.public_message(), "Request body is too large");
    }

    #[test]
    fn test_with_context_is_lazy_on_success() {
        let result: Result<u8, AppError> = Ok(7);
        let value = result
            .with_context(|| panic!("context must not be built on success"))
            .unwrap();
        assert_eq!(value, 7);
    }
}
