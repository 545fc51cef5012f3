//! No-position watchdog
//!
//! Single-shot resettable timer expressed as a pure state machine driven
//! by caller-supplied timestamps, so the host's event loop owns the actual
//! sleeping and the logic stays testable with a simulated clock.

/// Watchdog states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// Not armed
    Idle,
    /// Counting down toward a deadline (epoch ms)
    Armed { deadline_ms: u64 },
    /// Deadline passed and was reported; will not fire again until re-armed
    Fired,
}

/// Single-shot resettable watchdog.
///
/// Fires exactly once per arming unless reset or stopped first. Because
/// all transitions happen through `&mut self`, cancellation is synchronous
/// with respect to the caller: after [`Watchdog::stop`] returns, no
/// subsequent [`Watchdog::poll`] reports a firing.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout_ms: u64,
    state: WatchdogState,
}

impl Watchdog {
    pub fn new(timeout_ms: u64) -> Self {
        Watchdog {
            timeout_ms,
            state: WatchdogState::Idle,
        }
    }

    /// Arm the watchdog. Any pending deadline is discarded first, so
    /// restarting is idempotent.
    pub fn start(&mut self, now_ms: u64) {
        self.state = WatchdogState::Armed {
            deadline_ms: now_ms + self.timeout_ms,
        };
    }

    /// Restart the countdown from `now_ms`. Equivalent to stop + start.
    pub fn reset(&mut self, now_ms: u64) {
        self.start(now_ms);
    }

    /// Cancel any pending deadline.
    pub fn stop(&mut self) {
        self.state = WatchdogState::Idle;
    }

    /// Report whether the deadline has passed. Returns `true` exactly once
    /// per arming.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.state {
            WatchdogState::Armed { deadline_ms } if now_ms >= deadline_ms => {
                self.state = WatchdogState::Fired;
                true
            }
            _ => false,
        }
    }

    /// The pending deadline, if armed. Lets the host sleep until exactly
    /// the right moment instead of polling.
    pub fn deadline_ms(&self) -> Option<u64> {
        match self.state {
            WatchdogState::Armed { deadline_ms } => Some(deadline_ms),
            _ => None,
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }
}
