use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::audit::{AuditEmitter, AuditEvent, AuditKind};
use crate::errors::AppError;
use crate::middleware::ActionRateLimiter;
use crate::models::{ActivityAction, ActivityEvent, SessionInfo};
use crate::monitor::UserActivityMonitor;

#[derive(Debug, Deserialize)]
pub struct PageAccessRequest {
    pub user_id: String,
    pub session_id: Option<String>,
    pub resource: String,
    #[serde(default)]
    pub session_info: SessionInfo,
}

#[derive(Debug, Deserialize)]
pub struct UserActionRequest {
    pub user_id: String,
    pub session_id: Option<String>,
    pub action: String,
    pub resource: String,
    /// Rows affected, for bulk and export operations
    pub record_count: Option<u64>,
    #[serde(default)]
    pub session_info: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct TelemetryResponse {
    /// False when the call was skipped (tracking disabled, or the caller is
    /// not an authenticated, approved user). Skips are not errors.
    pub recorded: bool,
}

pub fn create_routes() -> Router {
    Router::new()
        .route("/pages", post(log_page_access))
        .route("/actions", post(log_user_action))
}

async fn log_page_access(
    Extension(monitor): Extension<UserActivityMonitor>,
    Json(request): Json<PageAccessRequest>,
) -> Result<(StatusCode, Json<TelemetryResponse>), AppError> {
    let event = ActivityEvent::new(&request.resource, ActivityAction::PageView, request.session_info);
    let handles = monitor
        .log_page_access(&request.user_id, request.session_id.as_deref(), event)
        .await;

    Ok((StatusCode::ACCEPTED, Json(TelemetryResponse { recorded: handles.is_some() })))
}

async fn log_user_action(
    Extension(monitor): Extension<UserActivityMonitor>,
    Extension(emitter): Extension<AuditEmitter>,
    Extension(limiter): Extension<Arc<Mutex<ActionRateLimiter>>>,
    Json(request): Json<UserActionRequest>,
) -> Result<(StatusCode, Json<TelemetryResponse>), AppError> {
    let key = format!("{}:{}", request.user_id, request.action);
    let decision = {
        let mut limiter = limiter
            .lock()
            .map_err(|_| AppError::internal("rate limiter lock poisoned"))?;
        limiter.check(&key)
    };

    if !decision.allowed {
        let mut audit = AuditEvent::new(AuditKind::RateLimitExceeded {
            action: request.action.clone(),
            limit: decision.limit,
            window_secs: decision.window_secs,
        })
        .with_user(request.user_id.clone());
        if let Some(session_id) = &request.session_id {
            audit = audit.with_session(session_id.clone());
        }
        emitter.emit(audit);

        return Err(AppError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        });
    }
    debug!(key = %key, remaining = decision.remaining, "action admitted");

    let event = ActivityEvent::new(&request.resource, ActivityAction::UserAction, request.session_info);
    let handles = monitor
        .log_user_action(
            &request.user_id,
            request.session_id.as_deref(),
            &request.action,
            event,
            request.record_count,
        )
        .await;

    Ok((StatusCode::ACCEPTED, Json(TelemetryResponse { recorded: handles.is_some() })))
}
