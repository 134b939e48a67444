pub mod activity;

pub use activity::{
    AccessLogEntry, ActivityAction, ActivityEvent, SessionInfo, SessionState, SignalKind, UserProfile,
};
