pub mod emitter;
pub mod event;

pub use emitter::{AuditEmitter, AuditSink, HttpAuditSink};
pub use event::{AuditEvent, AuditKind, EventSeverity};
