pub mod controller;
pub mod timer;

pub use controller::{SessionController, TimeoutHandler, WarningHandler};
pub use timer::{ActivityTimer, TimerEvent, TimerPhase};

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditEmitter, AuditEvent, AuditKind};
use crate::errors::AppError;
use crate::models::SessionState;
use crate::monitor::{InactivityWatch, UserActivityMonitor};

/// Countdown windows applied to every registered session.
#[derive(Debug, Clone)]
pub struct SessionWindows {
    pub timeout_secs: u64,
    pub warning_lead_secs: u64,
}

struct SessionHandle {
    user_id: String,
    controller: SessionController,
    watch: InactivityWatch,
}

/// Tracks one controller and one inactivity watch per registered dashboard
/// session. Removal tears both down so no timer or listener outlives the
/// session.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    windows: SessionWindows,
    emitter: AuditEmitter,
    monitor: UserActivityMonitor,
}

impl SessionRegistry {
    pub fn new(windows: SessionWindows, emitter: AuditEmitter, monitor: UserActivityMonitor) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            windows,
            emitter,
            monitor,
        }
    }

    /// Start tracking a session: a fresh countdown controller plus an
    /// inactivity watch. The warning and timeout boundaries emit audit
    /// events for the session.
    pub async fn register(
        &self,
        user_id: &str,
        session_id: Option<String>,
    ) -> Result<(String, SessionState), AppError> {
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session_id) {
            return Err(AppError::SessionAlreadyRegistered(session_id));
        }

        let on_warning: WarningHandler = {
            let emitter = self.emitter.clone();
            let user_id = user_id.to_string();
            let session_id = session_id.clone();
            Box::new(move |remaining_secs| {
                emitter.emit(
                    AuditEvent::new(AuditKind::SessionWarning { remaining_secs })
                        .with_user(user_id.clone())
                        .with_session(session_id.clone()),
                );
            })
        };

        let on_timeout: TimeoutHandler = {
            let emitter = self.emitter.clone();
            let user_id = user_id.to_string();
            let session_id = session_id.clone();
            let timeout_secs = self.windows.timeout_secs;
            Box::new(move || {
                emitter.emit(
                    AuditEvent::new(AuditKind::SessionTimeout { timeout_secs })
                        .with_user(user_id.clone())
                        .with_session(session_id.clone()),
                );
                Ok(())
            })
        };

        let controller = SessionController::new(
            self.windows.timeout_secs,
            self.windows.warning_lead_secs,
            Some(on_warning),
            on_timeout,
        );
        let watch = self.monitor.spawn_inactivity_watch(user_id, &session_id);
        let state = controller.state();

        sessions.insert(
            session_id.clone(),
            SessionHandle {
                user_id: user_id.to_string(),
                controller,
                watch,
            },
        );

        info!(user_id, session_id = %session_id, "session registered");
        Ok((session_id, state))
    }

    /// Feed one qualifying input signal. The countdown reset is throttled by
    /// the controller; the inactivity watch is re-armed on every signal.
    /// Returns whether the countdown was reset, plus the current state.
    pub async fn signal(&self, session_id: &str) -> Result<(bool, SessionState), AppError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(session_id)
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;

        let accepted = handle.controller.record_activity().await;
        handle.watch.touch();
        Ok((accepted, handle.controller.state()))
    }

    pub async fn state(&self, session_id: &str) -> Result<SessionState, AppError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(session_id)
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;
        Ok(handle.controller.state())
    }

    pub async fn extend(&self, session_id: &str) -> Result<SessionState, AppError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(session_id)
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;

        let state = handle.controller.extend_session().await?;
        handle.watch.touch();
        Ok(state)
    }

    /// Restart the countdown of a timed-out session after the user has
    /// re-authenticated.
    pub async fn rearm(&self, session_id: &str) -> Result<SessionState, AppError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(session_id)
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;

        let state = handle.controller.rearm().await?;
        handle.watch.touch();
        Ok(state)
    }

    /// Stop tracking a session, tearing down its timers and listeners.
    pub async fn remove(&self, session_id: &str) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        let handle = sessions
            .remove(session_id)
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;

        handle.controller.shutdown().await;
        handle.watch.shutdown();
        info!(user_id = %handle.user_id, session_id, "session removed");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::emitter::testing::RecordingSink;
    use crate::monitor::testing::{RecordingStore, StaticDirectory};
    use crate::monitor::MonitorConfig;
    use tokio::time::Duration;

    fn registry(timeout_secs: u64, warning_lead_secs: u64, sink: std::sync::Arc<RecordingSink>) -> SessionRegistry {
        let emitter = AuditEmitter::new(sink);
        let monitor = UserActivityMonitor::new(
            StaticDirectory::with_user("user-1", true),
            RecordingStore::new(),
            emitter.clone(),
            MonitorConfig {
                inactivity_timeout: Duration::from_secs(3600),
                track_page_views: true,
                track_user_actions: true,
            },
        );
        SessionRegistry::new(
            SessionWindows {
                timeout_secs,
                warning_lead_secs,
            },
            emitter,
            monitor,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_signal_extend_remove() {
        let sink = RecordingSink::new();
        let registry = registry(60, 10, sink);

        let (session_id, state) = registry.register("user-1", None).await.unwrap();
        assert!(state.active);
        assert_eq!(state.remaining_seconds, 60);
        assert_eq!(registry.len().await, 1);

        let (accepted, _) = registry.signal(&session_id).await.unwrap();
        assert!(accepted);

        let state = registry.extend(&session_id).await.unwrap();
        assert_eq!(state.remaining_seconds, 60);

        registry.remove(&session_id).await.unwrap();
        assert_eq!(registry.len().await, 0);
        assert!(registry.state(&session_id).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_registration_conflicts() {
        let sink = RecordingSink::new();
        let registry = registry(60, 10, sink);

        registry.register("user-1", Some("sess-1".to_string())).await.unwrap();
        let err = registry.register("user-1", Some("sess-1".to_string())).await;
        assert!(matches!(err, Err(AppError::SessionAlreadyRegistered(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_session_is_not_found() {
        let sink = RecordingSink::new();
        let registry = registry(60, 10, sink);

        assert!(matches!(registry.signal("ghost").await, Err(AppError::SessionNotFound(_))));
        assert!(matches!(registry.extend("ghost").await, Err(AppError::SessionNotFound(_))));
        assert!(matches!(registry.remove("ghost").await, Err(AppError::SessionNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_boundaries_emit_audit_events() {
        let sink = RecordingSink::new();
        let registry = registry(5, 2, sink.clone());

        let (session_id, _) = registry.register("user-1", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5_500)).await;

        let delivered = sink.delivered.lock().await;
        let kinds: Vec<_> = delivered.iter().map(|e| e.kind.clone()).collect();
        assert!(kinds.contains(&AuditKind::SessionWarning { remaining_secs: 2 }));
        assert!(kinds.contains(&AuditKind::SessionTimeout { timeout_secs: 5 }));
        drop(delivered);

        let state = registry.state(&session_id).await.unwrap();
        assert!(!state.active);
    }
}
