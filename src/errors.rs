use std::fmt;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    // Configuration errors
    ConfigurationError(String),
    ValidationError(String),

    // Session errors
    SessionNotFound(String),
    SessionExpired(String),
    SessionAlreadyRegistered(String),

    // Telemetry collaborator errors
    AuditDeliveryError(String),
    AccessLogError(String),
    DirectoryError(String),

    // Rate limiting
    RateLimited { retry_after_secs: u64 },

    // General errors
    InternalServerError(String),
    BadRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),

            AppError::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            AppError::SessionExpired(id) => write!(f, "Session expired: {}", id),
            AppError::SessionAlreadyRegistered(id) => write!(f, "Session already registered: {}", id),

            AppError::AuditDeliveryError(msg) => write!(f, "Audit delivery error: {}", msg),
            AppError::AccessLogError(msg) => write!(f, "Access log error: {}", msg),
            AppError::DirectoryError(msg) => write!(f, "Approval directory error: {}", msg),

            AppError::RateLimited { retry_after_secs } => {
                write!(f, "Rate limit exceeded, retry after {}s", retry_after_secs)
            }

            AppError::InternalServerError(msg) => write!(f, "Internal server error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Secure HTTP response implementation
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, user_message) = match &self {
            AppError::ConfigurationError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),

            AppError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "Session not found".to_string()),
            AppError::SessionExpired(_) => (StatusCode::UNAUTHORIZED, "Session expired".to_string()),
            AppError::SessionAlreadyRegistered(_) => {
                (StatusCode::CONFLICT, "Session already registered".to_string())
            }

            // Telemetry failures never reach the dashboard with details
            AppError::AuditDeliveryError(msg) => {
                tracing::warn!("Audit delivery error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::AccessLogError(msg) => {
                tracing::warn!("Access log error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::DirectoryError(msg) => {
                tracing::warn!("Approval directory error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests. Please try again later.".to_string(),
            ),

            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        tracing::warn!(
            status = %status,
            error = %self,
            "API error occurred"
        );

        let mut response = (
            status,
            Json(json!({
                "error": {
                    "message": user_message,
                    "code": status.as_u16()
                }
            })),
        )
            .into_response();

        if let AppError::RateLimited { retry_after_secs } = &self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

impl AppError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create an internal server error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalServerError(msg.into())
    }

    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

// Conversion from outbound HTTP client errors
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::InternalServerError(err.to_string())
    }
}
