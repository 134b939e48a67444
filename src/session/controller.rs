use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::models::SessionState;

use super::timer::{ActivityTimer, TimerEvent, TimerPhase};

/// Invoked exactly once when the countdown expires. A failing handler does
/// not roll the session back to active.
pub type TimeoutHandler = Box<dyn Fn() -> Result<(), AppError> + Send + Sync>;

/// Invoked once per cycle when the warning window opens, with the seconds
/// remaining.
pub type WarningHandler = Box<dyn Fn(u64) + Send + Sync>;

/// Input signals are collapsed to at most one timer reset per this interval.
const ACTIVITY_THROTTLE: Duration = Duration::from_secs(1);

struct ControllerShared {
    timer: Mutex<ActivityTimer>,
    active: AtomicBool,
    last_accepted: Mutex<Option<Instant>>,
    state_tx: watch::Sender<SessionState>,
    on_warning: Option<WarningHandler>,
    on_timeout: TimeoutHandler,
}

impl ControllerShared {
    fn snapshot(&self, timer: &ActivityTimer) -> SessionState {
        SessionState {
            remaining_seconds: timer.remaining_secs(),
            warning_active: timer.warning_active(),
            active: self.active.load(Ordering::SeqCst),
        }
    }

    fn publish(&self, state: SessionState) {
        let _ = self.state_tx.send(state);
    }
}

/// Binds an `ActivityTimer` to wall-clock seconds and to the activity signal
/// stream. Owns the 1 Hz driver task; `shutdown()` (or drop) aborts it so no
/// timer outlives the session.
pub struct SessionController {
    shared: Arc<ControllerShared>,
    state_rx: watch::Receiver<SessionState>,
    driver: JoinHandle<()>,
}

impl SessionController {
    pub fn new(
        timeout_secs: u64,
        warning_lead_secs: u64,
        on_warning: Option<WarningHandler>,
        on_timeout: TimeoutHandler,
    ) -> Self {
        let timer = ActivityTimer::new(timeout_secs, warning_lead_secs);
        let initial = SessionState {
            remaining_seconds: timer.remaining_secs(),
            warning_active: false,
            active: true,
        };
        let (state_tx, state_rx) = watch::channel(initial);

        let shared = Arc::new(ControllerShared {
            timer: Mutex::new(timer),
            active: AtomicBool::new(true),
            last_accepted: Mutex::new(None),
            state_tx,
            on_warning,
            on_timeout,
        });

        let driver = tokio::spawn(Self::drive(shared.clone()));

        Self {
            shared,
            state_rx,
            driver,
        }
    }

    async fn drive(shared: Arc<ControllerShared>) {
        let period = Duration::from_secs(1);
        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            ticker.tick().await;

            let mut timer = shared.timer.lock().await;
            if timer.phase() == TimerPhase::Stopped {
                break;
            }

            let event = timer.tick();
            match event {
                Some(TimerEvent::WarningStarted) => {
                    let remaining = timer.remaining_secs();
                    let state = shared.snapshot(&timer);
                    drop(timer);

                    info!(remaining_secs = remaining, "session warning window opened");
                    shared.publish(state);
                    if let Some(on_warning) = &shared.on_warning {
                        on_warning(remaining);
                    }
                }
                Some(TimerEvent::Expired) => {
                    // Deactivate before the callback runs so a failing
                    // handler cannot roll the transition back.
                    shared.active.store(false, Ordering::SeqCst);
                    let state = shared.snapshot(&timer);
                    drop(timer);

                    info!("session timed out");
                    shared.publish(state);
                    if let Err(e) = (shared.on_timeout)() {
                        error!("session timeout handler failed: {}", e);
                    }
                }
                None => {
                    let state = shared.snapshot(&timer);
                    drop(timer);
                    shared.publish(state);
                }
            }
        }
    }

    /// Feed one qualifying input signal. Signals on an inactive session are
    /// ignored; accepted signals restart the countdown. At most one signal
    /// per second is accepted, the rest are dropped to bound overhead under
    /// high-frequency input. Returns whether the signal reset the countdown.
    pub async fn record_activity(&self) -> bool {
        if !self.shared.active.load(Ordering::SeqCst) {
            return false;
        }

        let now = Instant::now();
        {
            let mut last = self.shared.last_accepted.lock().await;
            if let Some(prev) = *last {
                if now.duration_since(prev) < ACTIVITY_THROTTLE {
                    debug!("activity signal throttled");
                    return false;
                }
            }
            *last = Some(now);
        }

        let mut timer = self.shared.timer.lock().await;
        match timer.phase() {
            TimerPhase::Expired | TimerPhase::Stopped => false,
            TimerPhase::Running | TimerPhase::Warning => {
                timer.reset();
                let state = self.shared.snapshot(&timer);
                drop(timer);
                self.shared.publish(state);
                true
            }
        }
    }

    /// Explicit reset requested by the user (the "stay signed in" action).
    /// Bypasses the signal throttle and returns the refreshed state as the
    /// user-visible confirmation.
    pub async fn extend_session(&self) -> Result<SessionState, AppError> {
        let mut timer = self.shared.timer.lock().await;
        if !self.shared.active.load(Ordering::SeqCst) || timer.is_expired() {
            return Err(AppError::SessionExpired("cannot extend an expired session".to_string()));
        }

        timer.reset();
        let state = self.shared.snapshot(&timer);
        drop(timer);

        *self.shared.last_accepted.lock().await = Some(Instant::now());
        self.shared.publish(state.clone());
        info!("session extended");
        Ok(state)
    }

    /// Restart a timed-out session with a fresh countdown cycle. Activity is
    /// accepted again after this returns.
    pub async fn rearm(&self) -> Result<SessionState, AppError> {
        let mut timer = self.shared.timer.lock().await;
        if timer.phase() == TimerPhase::Stopped {
            return Err(AppError::bad_request("session controller is stopped"));
        }

        timer.reset();
        self.shared.active.store(true, Ordering::SeqCst);
        let state = self.shared.snapshot(&timer);
        drop(timer);

        self.shared.publish(state.clone());
        info!("session re-armed");
        Ok(state)
    }

    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Stop the countdown and abort the driver task.
    pub async fn shutdown(&self) {
        let mut timer = self.shared.timer.lock().await;
        timer.stop();
        self.shared.active.store(false, Ordering::SeqCst);
        let state = self.shared.snapshot(&timer);
        drop(timer);

        self.shared.publish(state);
        self.driver.abort();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
