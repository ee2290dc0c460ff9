//! Radio front-end abstraction
//!
//! One implementation per physical nRF24L01+ handle. Handles are opened
//! and configured once at boot (no auto-ack, no retries, CRC off, 2 Mbps)
//! by the board layer; the jammer core only retunes, transmits, and moves
//! them between standby, carrier and power-down.

use crate::types::{Channel, TxPower};

/// Async access to one radio front-end
pub trait Radio {
    /// Bus or device error
    type Error: core::fmt::Debug;

    /// Hardware-presence check (the chip answers on its bus)
    async fn is_present(&mut self) -> bool;

    /// Retune to a channel
    ///
    /// # Errors
    ///
    /// Returns the bus error if the register write fails.
    async fn set_channel(&mut self, channel: Channel) -> Result<(), Self::Error>;

    /// Transmit a payload without waiting for an acknowledgement
    ///
    /// # Errors
    ///
    /// Returns the bus error if the payload cannot be queued.
    async fn write(&mut self, payload: &[u8]) -> Result<(), Self::Error>;

    /// Start a continuous carrier at `power` on `channel`
    ///
    /// # Errors
    ///
    /// Returns the bus error if the radio cannot be switched to carrier mode.
    async fn start_carrier(&mut self, power: TxPower, channel: Channel) -> Result<(), Self::Error>;

    /// Stop the continuous carrier
    ///
    /// # Errors
    ///
    /// Returns the bus error if the radio cannot be switched back.
    async fn stop_carrier(&mut self) -> Result<(), Self::Error>;

    /// Leave RX/TX and return to standby
    ///
    /// # Errors
    ///
    /// Returns the bus error if the mode change fails.
    async fn stop_listening(&mut self) -> Result<(), Self::Error>;

    /// Enter the low-power mode
    ///
    /// # Errors
    ///
    /// Returns the bus error if the mode change fails.
    async fn power_down(&mut self) -> Result<(), Self::Error>;

    /// Leave the low-power mode (caller waits for the oscillator to settle)
    ///
    /// # Errors
    ///
    /// Returns the bus error if the mode change fails.
    async fn power_up(&mut self) -> Result<(), Self::Error>;
}
