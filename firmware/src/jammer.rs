//! Jammer Core
//!
//! Exclusive-execution run manager, per-mode channel sequencing,
//! dual-radio driver and radio health fail-stop.
//!
//! [`RunControl`] is shared between the control surface, the power monitor
//! and the single [`JammerRunner`]. Only the runner owns the radios; every
//! other context talks to it through the command channel inside
//! [`RunControl`].

pub mod control;
pub mod driver;
pub mod health;
pub mod runner;
pub mod sequencer;

pub use control::{Command, RunControl, RunEnd, RunRequest, StartError, StopOutcome};
pub use driver::{DriverError, DualRadioDriver};
pub use health::HealthReport;
pub use runner::JammerRunner;
pub use sequencer::{HopPlan, Sequencer};

/// Run control shared through a critical section (usable from a `static`)
pub type SharedRunControl =
    RunControl<embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex>;
