//! Run Control
//!
//! The state shared between the control surface, the runner and the power
//! monitor. Everything that answers "is a run active, and which one" sits
//! behind one blocking mutex that is only held for a check or a transition,
//! never across an await. The stop signal and the run state are atomics so
//! the hop loop can poll them without locking.
//!
//! ```text
//!   start()  ──▶ pending ──Command::Start──▶ runner: begin_run ──▶ active
//!   stop()   ──▶ stop flag (Release)          hop loop reads (Acquire)
//!   poll_idle() ──Command::Sleep──▶ runner: power down
//! ```

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embedded_hal_async::delay::DelayNs;

use crate::config::{COMMAND_QUEUE_DEPTH, IDLE_TIMEOUT_MS, PREEMPT_GRACE_MS, PREEMPT_POLL_MS};
use crate::power::{PowerState, PowerStateMachine};
use crate::settings::JamSettings;
use crate::types::{JamMode, JamParameters, JamTarget, ParamError, RadioId, RunState};

/// Why a start request was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartError {
    /// Another start is still waiting for the previous run to quiesce
    Busy,
    /// Parameters rejected; no radio was touched
    InvalidParameters(ParamError),
}

impl From<ParamError> for StartError {
    fn from(e: ParamError) -> Self {
        Self::InvalidParameters(e)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for StartError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Busy => defmt::write!(f, "busy"),
            Self::InvalidParameters(e) => defmt::write!(f, "invalid parameters: {}", e),
        }
    }
}

/// What a stop request did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// Stop signalled, the run is tearing down
    Stopping,
    /// A queued start was dropped before it ran
    CancelledPending,
    /// Nothing was running
    NothingRunning,
}

#[cfg(feature = "embedded")]
impl defmt::Format for StopOutcome {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Stopping => defmt::write!(f, "stopping"),
            Self::CancelledPending => defmt::write!(f, "cancelled pending"),
            Self::NothingRunning => defmt::write!(f, "nothing running"),
        }
    }
}

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEnd {
    /// Stop signal observed (explicit stop or preemption)
    Stopped,
    /// The plan had nothing to sweep
    Exhausted,
    /// A radio stopped answering its presence check
    RadioLost(RadioId),
    /// A radio operation returned an error
    RadioFault(RadioId),
}

#[cfg(feature = "embedded")]
impl defmt::Format for RunEnd {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Stopped => defmt::write!(f, "stopped"),
            Self::Exhausted => defmt::write!(f, "exhausted"),
            Self::RadioLost(radio) => defmt::write!(f, "{} lost", radio),
            Self::RadioFault(radio) => defmt::write!(f, "{} fault", radio),
        }
    }
}

/// Everything a run needs, moved into the runner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunRequest {
    /// Run identity
    pub id: u32,
    /// Validated mode and parameters
    pub target: JamTarget,
    /// Settings snapshot taken at start
    pub settings: JamSettings,
}

#[cfg(feature = "embedded")]
impl defmt::Format for RunRequest {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "run {}: {}", self.id, self.target);
    }
}

/// Runner commands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Begin a run
    Start(RunRequest),
    /// Power the radios down
    Sleep,
}

#[derive(Clone, Copy, Debug)]
struct ActiveRun {
    id: u32,
    mode: JamMode,
}

#[derive(Debug)]
struct Shared {
    active: Option<ActiveRun>,
    pending: Option<u32>,
    next_id: u32,
    settings: JamSettings,
    last_activity_ms: u64,
    power: PowerStateMachine,
    last_outcome: Option<RunEnd>,
    preemption_timeouts: u32,
}

/// Shared run state
///
/// Place it in a `static` (or any shared reference) and hand the same
/// reference to the control surface, the [`JammerRunner`] and the
/// [`PowerMonitor`].
///
/// [`JammerRunner`]: super::JammerRunner
/// [`PowerMonitor`]: crate::power::PowerMonitor
pub struct RunControl<M: RawMutex> {
    state: AtomicU8,
    stop: AtomicBool,
    shared: Mutex<M, RefCell<Shared>>,
    commands: Channel<M, Command, COMMAND_QUEUE_DEPTH>,
}

impl<M: RawMutex> RunControl<M> {
    /// Idle control with the default idle timeout
    #[must_use]
    pub const fn new(settings: JamSettings) -> Self {
        Self::with_idle_timeout(settings, IDLE_TIMEOUT_MS)
    }

    /// Idle control with a custom idle timeout
    #[must_use]
    pub const fn with_idle_timeout(settings: JamSettings, idle_timeout_ms: u64) -> Self {
        Self {
            state: AtomicU8::new(RunState::Idle.as_u8()),
            stop: AtomicBool::new(false),
            shared: Mutex::new(RefCell::new(Shared {
                active: None,
                pending: None,
                next_id: 1,
                settings,
                last_activity_ms: 0,
                power: PowerStateMachine::new(idle_timeout_ms),
                last_outcome: None,
                preemption_timeouts: 0,
            })),
            commands: Channel::new(),
        }
    }

    // ========================================================================
    // Control surface
    // ========================================================================

    /// Request a new run
    ///
    /// Parameters are validated before anything else happens. If a run is
    /// active it is asked to stop and given [`PREEMPT_GRACE_MS`] to reach
    /// idle; after that the new run is queued regardless, the runner starts
    /// it once the old one has finished tearing down.
    ///
    /// # Errors
    ///
    /// [`StartError::InvalidParameters`] for rejected parameters,
    /// [`StartError::Busy`] if another start is still waiting.
    pub async fn start<D: DelayNs>(
        &self,
        mode: JamMode,
        params: JamParameters,
        delay: &mut D,
    ) -> Result<(), StartError> {
        let target = JamTarget::new(mode, params).map_err(|e| {
            warn!("rejected {:?} parameters: {:?}", mode, e);
            StartError::InvalidParameters(e)
        })?;

        let (id, preempting) = self.lock(|s| {
            if s.pending.is_some() {
                return Err(StartError::Busy);
            }
            let id = s.next_id;
            s.next_id = s.next_id.wrapping_add(1).max(1);
            s.pending = Some(id);
            Ok((id, s.active.is_some()))
        })?;

        if preempting {
            info!("preempting active run for run {}", id);
            self.signal_stop();
            self.wait_idle(delay).await;
        }

        let request = self.lock(|s| {
            // a stop() during the grace wait cancels this start
            (s.pending == Some(id)).then_some(RunRequest {
                id,
                target,
                settings: s.settings,
            })
        });
        let Some(request) = request else {
            debug!("run {} cancelled before queueing", id);
            return Ok(());
        };

        if self.commands.try_send(Command::Start(request)).is_err() {
            self.lock(|s| {
                if s.pending == Some(id) {
                    s.pending = None;
                }
            });
            warn!("command queue full, run {} refused", id);
            return Err(StartError::Busy);
        }
        debug!("run {} queued", id);
        Ok(())
    }

    /// Ask the active run to stop, or drop a queued start
    ///
    /// Returns immediately; the teardown is observed through
    /// [`Self::run_state`].
    pub fn stop(&self) -> StopOutcome {
        let (active, pending) = self.lock(|s| (s.active.is_some(), s.pending.take()));
        if active {
            info!("stop requested");
            self.signal_stop();
            StopOutcome::Stopping
        } else if let Some(id) = pending {
            info!("queued run {} cancelled", id);
            StopOutcome::CancelledPending
        } else {
            StopOutcome::NothingRunning
        }
    }

    /// A run owns the radios
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock(|s| s.active.is_some())
    }

    /// Mode of the active run
    #[must_use]
    pub fn current_mode(&self) -> Option<JamMode> {
        self.lock(|s| s.active.map(|run| run.mode))
    }

    /// Lifecycle state of the run
    #[must_use]
    pub fn run_state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// How the most recent run ended
    #[must_use]
    pub fn last_outcome(&self) -> Option<RunEnd> {
        self.lock(|s| s.last_outcome)
    }

    /// Current settings
    #[must_use]
    pub fn settings(&self) -> JamSettings {
        self.lock(|s| s.settings)
    }

    /// Replace the settings; an active run keeps its snapshot
    pub fn update_settings(&self, settings: JamSettings) {
        self.lock(|s| s.settings = settings);
        debug!("settings updated: {:?}", settings);
    }

    /// Radio power state
    #[must_use]
    pub fn power_state(&self) -> PowerState {
        self.lock(|s| s.power.state())
    }

    /// Preemptions whose previous run missed the grace window
    #[must_use]
    pub fn preemption_timeouts(&self) -> u32 {
        self.lock(|s| s.preemption_timeouts)
    }

    /// Stop signal as seen by the hop loop
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    // ========================================================================
    // Power monitor
    // ========================================================================

    /// Idle check at `now_ms`; returns `true` if a sleep was queued
    pub fn poll_idle(&self, now_ms: u64) -> bool {
        let running = self.run_state() == RunState::Running;
        let sleep = self.lock(|s| {
            if running {
                s.last_activity_ms = now_ms;
            }
            let busy = s.active.is_some() || s.pending.is_some();
            s.power.poll(now_ms, s.last_activity_ms, busy)
        });
        if !sleep {
            return false;
        }
        if self.commands.try_send(Command::Sleep).is_err() {
            // retried on the next poll
            self.lock(|s| s.power.wake());
            return false;
        }
        true
    }

    // ========================================================================
    // Runner side
    // ========================================================================

    pub(crate) async fn next_command(&self) -> Command {
        self.commands.receive().await
    }

    /// Claim a queued request; `None` if it was cancelled meanwhile,
    /// otherwise whether the radios must be woken first
    pub(crate) fn begin_run(&self, request: &RunRequest, now_ms: u64) -> Option<bool> {
        let wake = self.lock(|s| {
            if s.pending != Some(request.id) {
                return None;
            }
            s.pending = None;
            s.active = Some(ActiveRun {
                id: request.id,
                mode: request.target.mode(),
            });
            s.last_activity_ms = now_ms;
            self.stop.store(false, Ordering::Release);
            self.state.store(RunState::Running.as_u8(), Ordering::Release);
            Some(s.power.wake())
        });
        if wake.is_none() {
            debug!("discarding cancelled run {}", request.id);
        }
        wake
    }

    /// Radios did not come back up; keep them marked asleep
    pub(crate) fn mark_sleeping(&self) {
        self.lock(|s| s.power.force_sleep());
    }

    /// Record hop progress; ignored unless running
    pub(crate) fn note_activity(&self, now_ms: u64) {
        if self.run_state() == RunState::Running {
            self.lock(|s| s.last_activity_ms = now_ms);
        }
    }

    /// Raise the stop flag and leave `Running`
    pub(crate) fn signal_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.lock(|_| {
            if self.run_state() == RunState::Running {
                self.state
                    .store(RunState::StopRequested.as_u8(), Ordering::Release);
            }
        });
    }

    /// Loop exited, radios being silenced
    pub(crate) fn mark_stopping(&self) {
        self.lock(|_| {
            self.state.store(RunState::Stopping.as_u8(), Ordering::Release);
        });
    }

    /// Teardown done: clear the run identity and go idle
    pub(crate) fn finish_run(&self, end: RunEnd) {
        self.lock(|s| {
            s.active = None;
            s.last_outcome = Some(end);
            self.state.store(RunState::Idle.as_u8(), Ordering::Release);
        });
    }

    /// Whether a queued sleep still applies
    pub(crate) fn sleep_confirmed(&self) -> bool {
        self.lock(|s| s.power.state() == PowerState::Sleeping && s.active.is_none())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lock<T>(&self, f: impl FnOnce(&mut Shared) -> T) -> T {
        self.shared.lock(|cell| f(&mut cell.borrow_mut()))
    }

    async fn wait_idle<D: DelayNs>(&self, delay: &mut D) {
        let mut waited = 0;
        while self.is_running() {
            if waited >= PREEMPT_GRACE_MS {
                let count = self.lock(|s| {
                    s.preemption_timeouts = s.preemption_timeouts.saturating_add(1);
                    s.preemption_timeouts
                });
                warn!("previous run missed the {}ms grace window ({})", PREEMPT_GRACE_MS, count);
                return;
            }
            delay.delay_ms(PREEMPT_POLL_MS).await;
            waited += PREEMPT_POLL_MS;
        }
    }
}

impl<M: RawMutex> Default for RunControl<M> {
    fn default() -> Self {
        Self::new(JamSettings::DEFAULT)
    }
}
