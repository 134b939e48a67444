use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::errors::AppError;
use crate::models::{SessionState, SignalKind};
use crate::session::SessionRegistry;

#[derive(Debug, Deserialize)]
pub struct RegisterSessionRequest {
    pub user_id: String,
    /// Platform session id; generated when absent.
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub state: SessionState,
}

#[derive(Debug, Deserialize)]
pub struct ActivitySignalRequest {
    pub signal: SignalKind,
}

#[derive(Debug, Serialize)]
pub struct ActivitySignalResponse {
    /// Whether the signal reset the countdown (throttled signals do not)
    pub accepted: bool,
    pub state: SessionState,
}

pub fn create_routes() -> Router {
    Router::new()
        .route("/", post(register_session))
        .route("/{id}", get(get_session_state).delete(remove_session))
        .route("/{id}/activity", post(record_signal))
        .route("/{id}/extend", post(extend_session))
        .route("/{id}/rearm", post(rearm_session))
}

async fn register_session(
    Extension(registry): Extension<Arc<SessionRegistry>>,
    Json(request): Json<RegisterSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    if request.user_id.trim().is_empty() {
        return Err(AppError::validation("user_id must not be empty"));
    }

    let (session_id, state) = registry.register(&request.user_id, request.session_id).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse { session_id, state })))
}

async fn get_session_state(
    Extension(registry): Extension<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionState>, AppError> {
    let state = registry.state(&session_id).await?;
    Ok(Json(state))
}

async fn record_signal(
    Extension(registry): Extension<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
    Json(request): Json<ActivitySignalRequest>,
) -> Result<Json<ActivitySignalResponse>, AppError> {
    debug!(session_id = %session_id, signal = ?request.signal, "activity signal received");
    let (accepted, state) = registry.signal(&session_id).await?;
    Ok(Json(ActivitySignalResponse { accepted, state }))
}

async fn extend_session(
    Extension(registry): Extension<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionState>, AppError> {
    let state = registry.extend(&session_id).await?;
    Ok(Json(state))
}

async fn rearm_session(
    Extension(registry): Extension<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionState>, AppError> {
    let state = registry.rearm(&session_id).await?;
    Ok(Json(state))
}

async fn remove_session(
    Extension(registry): Extension<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    registry.remove(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
