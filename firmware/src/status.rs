//! Operator Status
//!
//! Messages the jammer core hands to the display collaborator. Rendering,
//! fonts and hold times belong to the display; this module only decides
//! the header and footer text for each event.

use core::fmt::Write;

use heapless::String;

use crate::config::{CANCELLED_FOOTER_MSG, RADIO_LOST_FOOTER_MSG, SLEEP_DISPLAY_MSG};
use crate::types::{JamMode, RadioId, TxPower};

/// Longest header text
pub const HEADER_CAPACITY: usize = 24;

/// Event shown to the operator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Radios coming out of sleep
    Waking,
    /// A run started
    Jamming {
        /// Mode being run
        mode: JamMode,
        /// Transmit power
        power: TxPower,
    },
    /// Run ended by stop, preemption or exhaustion
    Cancelled,
    /// Run ended because a radio stopped answering
    RadioLost(RadioId),
    /// Run ended because a radio operation failed
    RadioFault(RadioId),
    /// Radios powered down after the idle timeout
    Sleeping,
}

impl Status {
    /// First display line
    #[must_use]
    pub fn header(&self) -> String<HEADER_CAPACITY> {
        let mut line = String::new();
        // every message fits HEADER_CAPACITY
        let _ = match self {
            Self::Waking => line.push_str("Initializing radios").map_err(|()| core::fmt::Error),
            Self::Jamming { mode, .. } => write!(line, "{} jamming", mode.label()),
            Self::Cancelled => line.push_str("Task cancelled").map_err(|()| core::fmt::Error),
            Self::RadioLost(radio) => write!(line, "Radio {} disconnected", radio.index()),
            Self::RadioFault(radio) => write!(line, "Radio {} fault", radio.index()),
            Self::Sleeping => line.push_str(SLEEP_DISPLAY_MSG).map_err(|()| core::fmt::Error),
        };
        line
    }

    /// Second display line, if any
    #[must_use]
    pub const fn footer(&self) -> Option<&'static str> {
        match self {
            Self::Jamming { power, .. } => Some(power.label()),
            Self::Cancelled => Some(CANCELLED_FOOTER_MSG),
            Self::RadioLost(_) | Self::RadioFault(_) => Some(RADIO_LOST_FOOTER_MSG),
            Self::Waking | Self::Sleeping => None,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Waking => defmt::write!(f, "Waking"),
            Self::Jamming { mode, power } => defmt::write!(f, "Jamming({}, {})", mode, power),
            Self::Cancelled => defmt::write!(f, "Cancelled"),
            Self::RadioLost(radio) => defmt::write!(f, "RadioLost({})", radio),
            Self::RadioFault(radio) => defmt::write!(f, "RadioFault({})", radio),
            Self::Sleeping => defmt::write!(f, "Sleeping"),
        }
    }
}

/// Receives status events, typically a display
pub trait StatusSink {
    /// Show an event; must not block the caller for long
    fn show(&mut self, status: Status);
}

impl<S: StatusSink + ?Sized> StatusSink for &mut S {
    fn show(&mut self, status: Status) {
        (**self).show(status);
    }
}

/// Sink for boards without a display
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDisplay;

impl StatusSink for NoDisplay {
    fn show(&mut self, _status: Status) {}
}
