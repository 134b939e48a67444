use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SessionInfo;

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Closed set of audit event variants, one per event type, each carrying its
/// own detail payload. Keeps the wire format self-describing and the
/// classification total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditKind {
    PageAccess {
        resource: String,
    },
    UserAction {
        action: String,
        resource: String,
    },
    BulkOperation {
        action: String,
        resource: String,
        record_count: u64,
    },
    DataExport {
        resource: String,
        record_count: u64,
    },
    SessionWarning {
        remaining_secs: u64,
    },
    SessionTimeout {
        timeout_secs: u64,
    },
    SuspiciousActivity {
        idle_secs: u64,
    },
    RateLimitExceeded {
        action: String,
        limit: u32,
        window_secs: u64,
    },
}

/// Record-count thresholds for escalating bulk operations and exports.
const BULK_HIGH_THRESHOLD: u64 = 100;
const EXPORT_CRITICAL_THRESHOLD: u64 = 1000;

impl AuditKind {
    /// Operation-to-risk table: reads are low, writes medium, deletes high.
    /// Large bulk operations escalate to high, very large exports to
    /// critical.
    pub fn classify(&self) -> EventSeverity {
        match self {
            AuditKind::PageAccess { .. } => EventSeverity::Low,
            AuditKind::UserAction { action, .. } => {
                if is_delete_action(action) {
                    EventSeverity::High
                } else {
                    EventSeverity::Medium
                }
            }
            AuditKind::BulkOperation { action, record_count, .. } => {
                if *record_count > BULK_HIGH_THRESHOLD || is_delete_action(action) {
                    EventSeverity::High
                } else {
                    EventSeverity::Medium
                }
            }
            AuditKind::DataExport { record_count, .. } => {
                if *record_count > EXPORT_CRITICAL_THRESHOLD {
                    EventSeverity::Critical
                } else if *record_count > BULK_HIGH_THRESHOLD {
                    EventSeverity::High
                } else {
                    EventSeverity::Medium
                }
            }
            AuditKind::SessionWarning { .. } => EventSeverity::Low,
            AuditKind::SessionTimeout { .. } => EventSeverity::Medium,
            AuditKind::SuspiciousActivity { .. } => EventSeverity::Medium,
            AuditKind::RateLimitExceeded { .. } => EventSeverity::Medium,
        }
    }
}

fn is_delete_action(action: &str) -> bool {
    let action = action.to_ascii_lowercase();
    action == "delete" || action.starts_with("delete_") || action.starts_with("bulk_delete")
}

/// Normalized audit record handed to the remote logging collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: Uuid,
    /// Timestamp when event occurred
    pub timestamp: DateTime<Utc>,
    /// User ID if applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Session ID if applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Browser context reported with the interaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_info: Option<SessionInfo>,
    /// Event severity
    pub severity: EventSeverity,
    /// Typed event payload
    #[serde(flatten)]
    pub kind: AuditKind,
}

impl AuditEvent {
    /// Create a new audit event. Severity starts at the classified risk
    /// level for the event kind.
    pub fn new(kind: AuditKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id: None,
            session_id: None,
            session_info: None,
            severity: kind.classify(),
            kind,
        }
    }

    /// Set user ID
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set session ID
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attach the browser context of the monitored interaction
    pub fn with_context(mut self, session_info: SessionInfo) -> Self {
        self.session_info = Some(session_info);
        self
    }

    /// Raise the severity. The classified risk level is a floor, so callers
    /// can escalate but never downgrade.
    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = self.severity.max(severity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_delete_risk_table() {
        assert_eq!(
            AuditKind::PageAccess { resource: "contacts".into() }.classify(),
            EventSeverity::Low
        );
        assert_eq!(
            AuditKind::UserAction { action: "update".into(), resource: "contacts".into() }.classify(),
            EventSeverity::Medium
        );
        assert_eq!(
            AuditKind::UserAction { action: "delete".into(), resource: "contacts".into() }.classify(),
            EventSeverity::High
        );
        assert_eq!(
            AuditKind::UserAction { action: "delete_campaign".into(), resource: "campaigns".into() }
                .classify(),
            EventSeverity::High
        );
    }

    #[test]
    fn test_bulk_operation_escalates_above_threshold() {
        let small = AuditKind::BulkOperation {
            action: "bulk_update".into(),
            resource: "contacts".into(),
            record_count: 100,
        };
        assert_eq!(small.classify(), EventSeverity::Medium);

        let large = AuditKind::BulkOperation {
            action: "bulk_update".into(),
            resource: "contacts".into(),
            record_count: 150,
        };
        assert_eq!(large.classify(), EventSeverity::High);
    }

    #[test]
    fn test_export_escalates_to_critical_above_threshold() {
        let medium = AuditKind::DataExport { resource: "contacts".into(), record_count: 50 };
        assert_eq!(medium.classify(), EventSeverity::Medium);

        let high = AuditKind::DataExport { resource: "contacts".into(), record_count: 500 };
        assert_eq!(high.classify(), EventSeverity::High);

        let critical = AuditKind::DataExport { resource: "contacts".into(), record_count: 1500 };
        assert_eq!(critical.classify(), EventSeverity::Critical);
    }

    #[test]
    fn test_session_event_severities() {
        assert_eq!(
            AuditKind::SessionWarning { remaining_secs: 300 }.classify(),
            EventSeverity::Low
        );
        assert_eq!(
            AuditKind::SessionTimeout { timeout_secs: 1800 }.classify(),
            EventSeverity::Medium
        );
        assert_eq!(
            AuditKind::SuspiciousActivity { idle_secs: 3600 }.classify(),
            EventSeverity::Medium
        );
    }

    #[test]
    fn test_severity_can_only_escalate() {
        let event = AuditEvent::new(AuditKind::UserAction {
            action: "delete".into(),
            resource: "contacts".into(),
        });
        assert_eq!(event.severity, EventSeverity::High);

        // Attempting to lower the severity keeps the classified floor
        let event = event.with_severity(EventSeverity::Low);
        assert_eq!(event.severity, EventSeverity::High);

        let event = event.with_severity(EventSeverity::Critical);
        assert_eq!(event.severity, EventSeverity::Critical);
    }

    #[test]
    fn test_event_type_tag_on_the_wire() {
        let event = AuditEvent::new(AuditKind::SuspiciousActivity { idle_secs: 3600 })
            .with_user("user-1")
            .with_session("sess-1");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_type"], "suspicious_activity");
        assert_eq!(json["idle_secs"], 3600);
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["user_id"], "user-1");
    }
}
