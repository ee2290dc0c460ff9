//! Power Management
//!
//! Idle detection for the radios. After a long stretch without a run the
//! radios are powered down; the next accepted start powers them up again
//! before the first health check.
//!
//! ```text
//!            idle >= timeout, no run
//!   ACTIVE ───────────────────────────▶ SLEEPING
//!      ▲                                   │
//!      └──────── start accepted ───────────┘
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;

use crate::config::{IDLE_TIMEOUT_MS, POWER_POLL_MS};
use crate::hal::clock::Clock;
use crate::jammer::RunControl;

/// Radio power state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PowerState {
    /// Radios powered, ready to transmit
    #[default]
    Active,
    /// Radios in their low-power mode
    Sleeping,
}

#[cfg(feature = "embedded")]
impl defmt::Format for PowerState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Active => defmt::write!(f, "ACTIVE"),
            Self::Sleeping => defmt::write!(f, "SLEEP"),
        }
    }
}

/// Idle timeout state machine
///
/// Pure bookkeeping: it decides when to sleep and records wake-ups, the
/// radios themselves are switched by the runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerStateMachine {
    state: PowerState,
    idle_timeout_ms: u64,
}

impl PowerStateMachine {
    /// Start awake with the given idle timeout
    #[must_use]
    pub const fn new(idle_timeout_ms: u64) -> Self {
        Self {
            state: PowerState::Active,
            idle_timeout_ms,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> PowerState {
        self.state
    }

    /// Configured idle timeout
    #[must_use]
    pub const fn idle_timeout_ms(&self) -> u64 {
        self.idle_timeout_ms
    }

    /// Milliseconds of idleness left before sleeping, 0 if already due
    #[must_use]
    pub const fn remaining_ms(&self, now_ms: u64, last_activity_ms: u64) -> u64 {
        self.idle_timeout_ms
            .saturating_sub(now_ms.saturating_sub(last_activity_ms))
    }

    /// Check the idle timeout
    ///
    /// Returns `true` on the transition to [`PowerState::Sleeping`]. Never
    /// sleeps while `busy` (a run active or a start pending).
    pub fn poll(&mut self, now_ms: u64, last_activity_ms: u64, busy: bool) -> bool {
        if busy || self.state == PowerState::Sleeping {
            return false;
        }
        if now_ms.saturating_sub(last_activity_ms) < self.idle_timeout_ms {
            return false;
        }
        self.state = PowerState::Sleeping;
        true
    }

    /// Back to [`PowerState::Active`]; returns `true` if it was sleeping
    pub fn wake(&mut self) -> bool {
        let was_sleeping = self.state == PowerState::Sleeping;
        self.state = PowerState::Active;
        was_sleeping
    }

    /// Back to [`PowerState::Sleeping`] without waiting for the timeout
    ///
    /// For radios that failed to power up; the next wake retries them.
    pub fn force_sleep(&mut self) {
        self.state = PowerState::Sleeping;
    }
}

impl Default for PowerStateMachine {
    fn default() -> Self {
        Self::new(IDLE_TIMEOUT_MS)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PowerStateMachine {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} (timeout {}ms)", self.state, self.idle_timeout_ms);
    }
}

/// Periodic idle check, run as its own task
///
/// Only decides; the sleep itself is queued to the runner, which owns the
/// radios.
pub struct PowerMonitor<'a, M: RawMutex, C: Clock, D: DelayNs> {
    control: &'a RunControl<M>,
    clock: C,
    delay: D,
}

impl<'a, M: RawMutex, C: Clock, D: DelayNs> PowerMonitor<'a, M, C, D> {
    /// Create a monitor over the shared run control
    pub const fn new(control: &'a RunControl<M>, clock: C, delay: D) -> Self {
        Self {
            control,
            clock,
            delay,
        }
    }

    /// One idle check; returns `true` if a sleep was queued
    pub fn poll(&mut self) -> bool {
        self.control.poll_idle(self.clock.now_ms())
    }

    /// Check every [`POWER_POLL_MS`] forever
    pub async fn run(&mut self) -> ! {
        info!("power monitor started");
        loop {
            if self.poll() {
                info!("radios idle, going to sleep");
            }
            self.delay.delay_ms(POWER_POLL_MS).await;
        }
    }
}
