//! Dual-Radio Jammer Firmware Library
//!
//! This library provides the core of a 2.4 GHz interference generator built
//! around two nRF24L01+ front-ends. It owns the jam-run lifecycle, the
//! per-mode channel hopping, the dual-radio mirroring, the radio health
//! fail-stop and the idle power state machine. HTTP, access point bring-up,
//! persistent storage and display rendering live outside this crate and talk
//! to it through the traits in [`hal`], [`settings`] and [`status`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 CONTROL SURFACE (external)                   │
//! │        start / stop / is_running / current_mode              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      JAMMER CORE                             │
//! │  RunControl ────Channel──▶ JammerRunner ──▶ DualRadioDriver │
//! │        ▲                     │  Sequencer   │  health probe  │
//! │        └──── PowerMonitor ───┘                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 HAL TRAITS (implemented outside)             │
//! │   Radio ×2  │  Clock  │  DelayNs  │  StatusSink  │  Store    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RTOS / SCHEDULER                          │
//! │           embassy-rs (async/await executor)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Single owner of the radios**: only the runner context touches them
//! - **Message passing**: a start request is moved into the runner by value
//! - **Cooperative cancellation**: every hop yields, then checks the stop flag
//! - **Fail-stop**: a missing radio ends the run, it is never retried
//! - **Functional core, imperative shell**: channel sequencing is pure

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(async_fn_in_trait)]

// Must come first so the logging macros are visible to every module below
#[macro_use]
mod fmt;

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware-facing traits
///
/// Radio, clock and delay abstractions implemented by the board layer.
pub mod hal;

/// Jammer Core
///
/// Run control, sequencing, dual-radio driver and health monitoring.
pub mod jammer;

/// Power Management
///
/// Idle detection and radio sleep/wake state machine.
pub mod power;

/// Persisted runtime settings
pub mod settings;

/// Status messages for the display collaborator
pub mod status;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    pub use crate::hal::clock::Clock;
    pub use crate::hal::radio::Radio;
    pub use crate::jammer::{
        DualRadioDriver, JammerRunner, RunControl, RunEnd, SharedRunControl, StartError,
        StopOutcome,
    };
    pub use crate::power::{PowerMonitor, PowerState};
    pub use crate::settings::JamSettings;
    pub use crate::status::{Status, StatusSink};

    // Async traits
    pub use embedded_hal_async::delay::DelayNs;

    // Error handling
    pub use core::result::Result;
}
