pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::audit::{AuditEmitter, AuditEvent, AuditKind};
use crate::errors::AppError;
use crate::models::{AccessLogEntry, ActivityEvent, SessionInfo, UserProfile};

pub use remote::{HttpAccessLogStore, HttpApprovalDirectory};

/// Per-call approval check against the platform's user directory. Results
/// are never cached; approval can be revoked between calls.
#[async_trait]
pub trait ApprovalDirectory: Send + Sync {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, AppError>;
}

/// Remote access-log collaborator.
#[async_trait]
pub trait AccessLogStore: Send + Sync {
    async fn record(&self, entry: &AccessLogEntry) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub inactivity_timeout: Duration,
    pub track_page_views: bool,
    pub track_user_actions: bool,
}

/// The two telemetry dispatches of one monitored interaction. They are not
/// transactional: either may fail while the other succeeds. Only tests
/// observe the handles.
pub struct TelemetryHandles {
    pub access_log: JoinHandle<()>,
    pub audit: JoinHandle<()>,
}

/// Records page accesses and user actions for authenticated, approved users
/// and watches for prolonged inactivity.
#[derive(Clone)]
pub struct UserActivityMonitor {
    directory: Arc<dyn ApprovalDirectory>,
    access_log: Arc<dyn AccessLogStore>,
    emitter: AuditEmitter,
    config: Arc<MonitorConfig>,
}

impl UserActivityMonitor {
    pub fn new(
        directory: Arc<dyn ApprovalDirectory>,
        access_log: Arc<dyn AccessLogStore>,
        emitter: AuditEmitter,
        config: MonitorConfig,
    ) -> Self {
        Self {
            directory,
            access_log,
            emitter,
            config: Arc::new(config),
        }
    }

    /// Record a page access. A no-op unless page tracking is enabled and the
    /// user is authenticated and approved (checked per call). Returns the
    /// dispatch handles, or `None` when the call was skipped.
    pub async fn log_page_access(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        event: ActivityEvent,
    ) -> Option<TelemetryHandles> {
        if !self.config.track_page_views {
            return None;
        }
        if !self.is_authorized(user_id).await {
            debug!(user_id, "page access not recorded for unauthorized caller");
            return None;
        }

        let audit = AuditEvent::new(AuditKind::PageAccess { resource: event.resource.clone() });
        Some(self.dispatch(user_id, session_id, "page_view", event, audit))
    }

    /// Record a user action. Gated like `log_page_access`; the action name
    /// and record count drive the audit risk classification.
    pub async fn log_user_action(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        action: &str,
        event: ActivityEvent,
        record_count: Option<u64>,
    ) -> Option<TelemetryHandles> {
        if !self.config.track_user_actions {
            return None;
        }
        if !self.is_authorized(user_id).await {
            debug!(user_id, action, "user action not recorded for unauthorized caller");
            return None;
        }

        let kind = classify_action(action, &event.resource, record_count);
        let audit = AuditEvent::new(kind);
        Some(self.dispatch(user_id, session_id, action, event, audit))
    }

    /// Start the recurring inactivity watch for one session. Every
    /// qualifying signal re-arms the window through `touch()`; a full quiet
    /// window emits one suspicious-activity event and re-arms again.
    pub fn spawn_inactivity_watch(&self, user_id: &str, session_id: &str) -> InactivityWatch {
        let notify = Arc::new(Notify::new());
        let window = self.config.inactivity_timeout;
        let emitter = self.emitter.clone();
        let user_id = user_id.to_string();
        let session_id = session_id.to_string();

        let waiter = notify.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(window) => {
                        warn!(user_id = %user_id, session_id = %session_id, "prolonged inactivity detected");
                        emitter.emit(
                            AuditEvent::new(AuditKind::SuspiciousActivity { idle_secs: window.as_secs() })
                                .with_user(user_id.clone())
                                .with_session(session_id.clone()),
                        );
                    }
                    _ = waiter.notified() => {}
                }
            }
        });

        InactivityWatch { notify, task }
    }

    async fn is_authorized(&self, user_id: &str) -> bool {
        if user_id.is_empty() {
            return false;
        }
        match self.directory.lookup(user_id).await {
            Ok(Some(profile)) => profile.approved,
            Ok(None) => false,
            Err(e) => {
                warn!(user_id, "approval lookup failed, skipping telemetry: {}", e);
                false
            }
        }
    }

    /// Spawn the access-log write and the audit emission independently.
    /// Each failure is logged without aborting the other.
    fn dispatch(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        action: &str,
        event: ActivityEvent,
        mut audit: AuditEvent,
    ) -> TelemetryHandles {
        let entry = AccessLogEntry {
            user_id: user_id.to_string(),
            resource: event.resource.clone(),
            action: action.to_string(),
            timestamp: event.timestamp,
        };

        audit = audit.with_user(user_id);
        if let Some(session_id) = session_id {
            audit = audit.with_session(session_id);
        }
        if event.session_info != SessionInfo::default() {
            audit = audit.with_context(event.session_info);
        }

        let store = self.access_log.clone();
        let access_log = tokio::spawn(async move {
            if let Err(e) = store.record(&entry).await {
                warn!(user_id = %entry.user_id, resource = %entry.resource, "access log write failed: {}", e);
            }
        });

        let audit = self.emitter.emit(audit);

        TelemetryHandles { access_log, audit }
    }
}

/// Map an action name and optional record count to its audit event kind.
fn classify_action(action: &str, resource: &str, record_count: Option<u64>) -> AuditKind {
    if action.to_ascii_lowercase().starts_with("export") {
        return AuditKind::DataExport {
            resource: resource.to_string(),
            record_count: record_count.unwrap_or(0),
        };
    }
    match record_count {
        Some(record_count) => AuditKind::BulkOperation {
            action: action.to_string(),
            resource: resource.to_string(),
            record_count,
        },
        None => AuditKind::UserAction {
            action: action.to_string(),
            resource: resource.to_string(),
        },
    }
}

/// Handle to one session's inactivity watch. Dropping it clears the timer.
pub struct InactivityWatch {
    notify: Arc<Notify>,
    task: JoinHandle<()>,
}

impl InactivityWatch {
    /// Re-arm the quiet window after a qualifying input signal.
    pub fn touch(&self) {
        self.notify.notify_one();
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for InactivityWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// Fixed-profile approval directory for tests.
    pub(crate) struct StaticDirectory {
        profiles: HashMap<String, UserProfile>,
        fail: bool,
    }

    impl StaticDirectory {
        pub(crate) fn with_user(user_id: &str, approved: bool) -> Arc<Self> {
            let mut profiles = HashMap::new();
            profiles.insert(
                user_id.to_string(),
                UserProfile { user_id: user_id.to_string(), approved },
            );
            Arc::new(Self { profiles, fail: false })
        }

        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self { profiles: HashMap::new(), fail: true })
        }
    }

    #[async_trait]
    impl ApprovalDirectory for StaticDirectory {
        async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
            if self.fail {
                return Err(AppError::DirectoryError("directory unreachable".to_string()));
            }
            Ok(self.profiles.get(user_id).cloned())
        }
    }

    /// In-memory access-log store for tests, optionally failing every write.
    pub(crate) struct RecordingStore {
        pub(crate) entries: Mutex<Vec<AccessLogEntry>>,
        fail: bool,
    }

    impl RecordingStore {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self { entries: Mutex::new(Vec::new()), fail: false })
        }

        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self { entries: Mutex::new(Vec::new()), fail: true })
        }
    }

    #[async_trait]
    impl AccessLogStore for RecordingStore {
        async fn record(&self, entry: &AccessLogEntry) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::AccessLogError("store unreachable".to_string()));
            }
            self.entries.lock().await.push(entry.clone());
            Ok(())
        }
    }
}
