//! Radio Health
//!
//! Presence check on both radios, run before every hop. A missing radio is
//! a fail-stop condition: recovering it needs the boot-time bring-up, so
//! the run ends and nothing here retries.

use super::driver::DualRadioDriver;
use crate::hal::radio::Radio;
use crate::types::RadioId;

/// Result of probing both radios
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthReport {
    /// Radio A answered
    pub radio_a: bool,
    /// Radio B answered
    pub radio_b: bool,
}

impl HealthReport {
    /// Both radios answered
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.radio_a && self.radio_b
    }

    /// First missing radio, radio A before radio B
    #[must_use]
    pub const fn first_absent(&self) -> Option<RadioId> {
        if !self.radio_a {
            Some(RadioId::A)
        } else if !self.radio_b {
            Some(RadioId::B)
        } else {
            None
        }
    }

    /// `Ok` when healthy, otherwise the first missing radio
    ///
    /// # Errors
    ///
    /// Returns the [`RadioId`] of the first radio that did not answer.
    pub const fn check(&self) -> Result<(), RadioId> {
        match self.first_absent() {
            Some(radio) => Err(radio),
            None => Ok(()),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for HealthReport {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Health(a={}, b={})", self.radio_a, self.radio_b);
    }
}

impl<R: Radio> DualRadioDriver<R> {
    /// Query both radios for presence
    pub async fn probe(&mut self) -> HealthReport {
        let radio_a = self.radio_mut(RadioId::A).is_present().await;
        let radio_b = self.radio_mut(RadioId::B).is_present().await;
        HealthReport { radio_a, radio_b }
    }

    /// Both radios present
    pub async fn is_healthy(&mut self) -> bool {
        self.probe().await.is_healthy()
    }
}
