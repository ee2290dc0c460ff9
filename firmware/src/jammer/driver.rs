//! Dual-Radio Driver
//!
//! Owns both radio handles for the process lifetime and applies channel
//! pairs to them. Carrier modes start the carrier once and only retune per
//! hop; payload modes retune and write the filler payload every hop.

use crate::config::CARRIER_START_CHANNEL;
use crate::hal::radio::Radio;
use crate::types::{Channel, ChannelPair, RadioId, TxPower};

/// A radio operation failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverError<E> {
    /// Radio that failed
    pub radio: RadioId,
    /// Hardware error
    pub error: E,
}

impl<E> DriverError<E> {
    fn on(radio: RadioId) -> impl FnOnce(E) -> Self {
        move |error| Self { radio, error }
    }
}

#[cfg(feature = "embedded")]
impl<E> defmt::Format for DriverError<E> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} I/O error", self.radio);
    }
}

/// Driver result
pub type DriverResult<T, E> = Result<T, DriverError<E>>;

/// Exclusive owner of radio A and radio B
pub struct DualRadioDriver<R> {
    a: R,
    b: R,
    carrier: bool,
}

impl<R: Radio> DualRadioDriver<R> {
    /// Take ownership of two configured radios
    #[must_use]
    pub const fn new(a: R, b: R) -> Self {
        Self {
            a,
            b,
            carrier: false,
        }
    }

    /// Borrow one radio
    #[must_use]
    pub const fn radio(&self, id: RadioId) -> &R {
        match id {
            RadioId::A => &self.a,
            RadioId::B => &self.b,
        }
    }

    /// Mutably borrow one radio
    pub fn radio_mut(&mut self, id: RadioId) -> &mut R {
        match id {
            RadioId::A => &mut self.a,
            RadioId::B => &mut self.b,
        }
    }

    /// Give the radios back
    pub fn into_inner(self) -> (R, R) {
        (self.a, self.b)
    }

    /// Whether a carrier was started and not yet ended
    #[must_use]
    pub const fn carrier_active(&self) -> bool {
        self.carrier
    }

    /// Retune both radios
    ///
    /// # Errors
    ///
    /// Stops at the first radio that fails.
    pub async fn apply_channel(&mut self, pair: ChannelPair) -> DriverResult<(), R::Error> {
        self.a
            .set_channel(pair.a)
            .await
            .map_err(DriverError::on(RadioId::A))?;
        self.b
            .set_channel(pair.b)
            .await
            .map_err(DriverError::on(RadioId::B))
    }

    /// Write one payload on both radios at their current channel
    ///
    /// # Errors
    ///
    /// Stops at the first radio that fails.
    pub async fn write_payload(&mut self, payload: &[u8]) -> DriverResult<(), R::Error> {
        self.a
            .write(payload)
            .await
            .map_err(DriverError::on(RadioId::A))?;
        self.b
            .write(payload)
            .await
            .map_err(DriverError::on(RadioId::B))
    }

    /// Start a continuous carrier on both radios
    ///
    /// # Errors
    ///
    /// Stops at the first radio that fails; the carrier counts as started
    /// so [`Self::silence_all`] still turns radio A off.
    pub async fn begin_carrier(&mut self, power: TxPower) -> DriverResult<(), R::Error> {
        let channel = Channel::saturating(i32::from(CARRIER_START_CHANNEL));
        self.carrier = true;
        self.a
            .start_carrier(power, channel)
            .await
            .map_err(DriverError::on(RadioId::A))?;
        self.b
            .start_carrier(power, channel)
            .await
            .map_err(DriverError::on(RadioId::B))
    }

    /// Stop the carrier on both radios
    ///
    /// # Errors
    ///
    /// Reports the first radio that failed; both are always attempted.
    pub async fn end_carrier(&mut self) -> DriverResult<(), R::Error> {
        self.carrier = false;
        let a = self.a.stop_carrier().await.map_err(DriverError::on(RadioId::A));
        let b = self.b.stop_carrier().await.map_err(DriverError::on(RadioId::B));
        a.and(b)
    }

    /// Silence both radios: carrier off, back to standby
    ///
    /// Best effort and infallible; every step is attempted on both radios
    /// even after a failure, and failures are only logged.
    pub async fn silence_all(&mut self) {
        if let Err(e) = self.end_carrier().await {
            warn!("failed to stop carrier on radio {}", e.radio.index());
        }
        if self.a.stop_listening().await.is_err() {
            warn!("failed to idle radio 0");
        }
        if self.b.stop_listening().await.is_err() {
            warn!("failed to idle radio 1");
        }
    }

    /// Put both radios into their low-power mode
    ///
    /// # Errors
    ///
    /// Reports the first radio that failed; both are always attempted.
    pub async fn power_down_all(&mut self) -> DriverResult<(), R::Error> {
        debug!("powering down radios");
        let a = self.a.power_down().await.map_err(DriverError::on(RadioId::A));
        let b = self.b.power_down().await.map_err(DriverError::on(RadioId::B));
        a.and(b)
    }

    /// Bring both radios out of their low-power mode
    ///
    /// The caller waits for the oscillators to settle.
    ///
    /// # Errors
    ///
    /// Stops at the first radio that fails.
    pub async fn power_up_all(&mut self) -> DriverResult<(), R::Error> {
        debug!("waking radios");
        self.a.power_up().await.map_err(DriverError::on(RadioId::A))?;
        self.b.power_up().await.map_err(DriverError::on(RadioId::B))
    }
}
