use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::errors::AppError;

use super::event::AuditEvent;

/// Remote logging collaborator. Accepts one normalized event record per
/// call; delivery is at-most-once and the emitter never retries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn deliver(&self, event: &AuditEvent) -> Result<(), AppError>;
}

/// Forwards audit events to an HTTP collector endpoint.
pub struct HttpAuditSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAuditSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AuditSink for HttpAuditSink {
    async fn deliver(&self, event: &AuditEvent) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::AuditDeliveryError(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| AppError::AuditDeliveryError(e.to_string()))?;

        Ok(())
    }
}

/// Classifies and dispatches audit events. Emission is fire-and-forget: the
/// caller's flow is never blocked on, or interrupted by, delivery. A lost
/// log entry is an accepted risk, not a fatal error.
#[derive(Clone)]
pub struct AuditEmitter {
    sink: Arc<dyn AuditSink>,
}

impl AuditEmitter {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Hand the event to the sink on a detached task. Failures are logged
    /// locally and never propagated. The returned handle is only observed
    /// by tests.
    pub fn emit(&self, event: AuditEvent) -> tokio::task::JoinHandle<()> {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.deliver(&event).await {
                warn!(event_id = %event.id, "audit delivery failed: {}", e);
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// In-memory sink for tests, optionally failing every delivery.
    pub struct RecordingSink {
        pub delivered: Mutex<Vec<AuditEvent>>,
        pub fail: bool,
    }

    impl RecordingSink {
        pub fn new() -> Arc<Self> {
            Arc::new(Self { delivered: Mutex::new(Vec::new()), fail: false })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self { delivered: Mutex::new(Vec::new()), fail: true })
        }
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        async fn deliver(&self, event: &AuditEvent) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::AuditDeliveryError("collector unreachable".to_string()));
            }
            self.delivered.lock().await.push(event.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use crate::audit::event::{AuditKind, EventSeverity};

    #[tokio::test]
    async fn test_emit_forwards_to_sink() {
        let sink = RecordingSink::new();
        let emitter = AuditEmitter::new(sink.clone());

        let handle = emitter.emit(
            AuditEvent::new(AuditKind::PageAccess { resource: "campaigns".into() }).with_user("user-1"),
        );
        handle.await.unwrap();

        let delivered = sink.delivered.lock().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].severity, EventSeverity::Low);
        assert_eq!(delivered[0].user_id.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_delivery_failure_never_propagates() {
        let sink = RecordingSink::failing();
        let emitter = AuditEmitter::new(sink.clone());

        // The spawned task swallows the failure; awaiting it must not panic.
        let handle = emitter.emit(AuditEvent::new(AuditKind::SessionTimeout { timeout_secs: 1800 }));
        handle.await.unwrap();

        assert!(sink.delivered.lock().await.is_empty());
    }
}
