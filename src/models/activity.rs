use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observable countdown state for one dashboard session.
///
/// Published once per tick and on every accepted activity signal. The
/// dashboard treats `active == false` as a forced re-authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Seconds left until the session times out
    pub remaining_seconds: u64,
    /// Whether the warning window is currently open
    pub warning_active: bool,
    /// Whether the session still accepts activity
    pub active: bool,
}

/// Qualifying input signal types forwarded by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Pointer,
    Key,
    Scroll,
    Touch,
}

/// Kind of monitored interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    PageView,
    UserAction,
}

/// Browser-side context attached to a monitored interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_agent: Option<String>,
    pub url: Option<String>,
    pub referrer: Option<String>,
}

/// One monitored interaction as reported by the dashboard. Immutable once
/// received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub resource: String,
    pub action: ActivityAction,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub session_info: SessionInfo,
}

impl ActivityEvent {
    pub fn new(resource: impl Into<String>, action: ActivityAction, session_info: SessionInfo) -> Self {
        Self {
            resource: resource.into(),
            action,
            timestamp: Utc::now(),
            session_info,
        }
    }
}

/// Row handed to the remote access-log collaborator. Persistence is
/// best-effort; idempotency is neither guaranteed nor required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub user_id: String,
    pub resource: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// Profile record returned by the approval directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub approved: bool,
}
