/// Countdown phases. `Stopped` is terminal; every other phase can return to
/// `Running` through `reset()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Running,
    Warning,
    Expired,
    Stopped,
}

/// Boundary crossings reported by `tick()`, each at most once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    WarningStarted,
    Expired,
}

/// Pure inactivity countdown. Holds no clock and performs no I/O; the owner
/// calls `tick()` once per elapsed second, which keeps the machine fully
/// deterministic under test.
#[derive(Debug)]
pub struct ActivityTimer {
    timeout_secs: u64,
    warning_lead_secs: u64,
    remaining_secs: u64,
    phase: TimerPhase,
    warning_fired: bool,
}

impl ActivityTimer {
    /// Start a countdown of `timeout_secs` with a warning opening at
    /// `warning_lead_secs` remaining. A lead equal to or larger than the
    /// timeout disables the warning; `Config::validate` rejects such windows
    /// before a timer is ever built.
    pub fn new(timeout_secs: u64, warning_lead_secs: u64) -> Self {
        let warning_lead_secs = if warning_lead_secs >= timeout_secs {
            0
        } else {
            warning_lead_secs
        };

        Self {
            timeout_secs,
            warning_lead_secs,
            remaining_secs: timeout_secs,
            phase: TimerPhase::Running,
            warning_fired: false,
        }
    }

    /// Advance the countdown by one second. Returns the boundary crossed by
    /// this tick, if any. Ticking an expired or stopped timer does nothing.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        match self.phase {
            TimerPhase::Expired | TimerPhase::Stopped => return None,
            TimerPhase::Running | TimerPhase::Warning => {}
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);

        if self.remaining_secs == 0 {
            self.phase = TimerPhase::Expired;
            return Some(TimerEvent::Expired);
        }

        if !self.warning_fired
            && self.warning_lead_secs > 0
            && self.remaining_secs <= self.warning_lead_secs
        {
            self.phase = TimerPhase::Warning;
            self.warning_fired = true;
            return Some(TimerEvent::WarningStarted);
        }

        None
    }

    /// Restart the full countdown window. Any pending warning or expiry for
    /// the previous cycle can never fire after this returns.
    pub fn reset(&mut self) {
        if self.phase == TimerPhase::Stopped {
            return;
        }
        self.remaining_secs = self.timeout_secs;
        self.phase = TimerPhase::Running;
        self.warning_fired = false;
    }

    /// Halt and discard the countdown. Terminal.
    pub fn stop(&mut self) {
        self.phase = TimerPhase::Stopped;
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_expired(&self) -> bool {
        self.phase == TimerPhase::Expired
    }

    pub fn warning_active(&self) -> bool {
        self.phase == TimerPhase::Warning
    }
}
