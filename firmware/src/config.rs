//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the dual nRF24L01+ jammer.
//! Channel limits, timing contracts, display strings and persisted-setting
//! keys are centralized here.

/// Highest channel the nRF24L01+ accepts (2.400 GHz + 125 MHz)
pub const MAX_CHANNEL: u8 = 125;

/// Channel both radios sit on when a carrier is started
pub const CARRIER_START_CHANNEL: u8 = 45;

/// Filler payload written on every hop by payload-write modes
pub const FILLER_PAYLOAD: [u8; 16] = *b"xxxxxxxxxxxxxxxx";

/// Yield after every channel application, in milliseconds
///
/// Bounds the duty cycle of the radios and is the latency within which a
/// stop request or a missing radio is observed.
pub const HOP_YIELD_MS: u32 = 1;

/// How long `start` waits for a preempted run to reach idle, in milliseconds
pub const PREEMPT_GRACE_MS: u32 = 100;

/// Polling step used while waiting out the preemption grace, in milliseconds
pub const PREEMPT_POLL_MS: u32 = 1;

/// Inactivity after which the radios are powered down, in milliseconds
pub const IDLE_TIMEOUT_MS: u64 = 600_000;

/// Period of the power monitor, in milliseconds
pub const POWER_POLL_MS: u32 = 10_000;

/// Settle time after powering a radio back up, in milliseconds
///
/// Twice the 5 ms crystal start-up the nRF24L01+ datasheet asks for.
pub const RADIO_SETTLE_MS: u32 = 10;

/// Depth of the runner command queue (one start plus one sleep)
pub const COMMAND_QUEUE_DEPTH: usize = 2;

/// Footer shown when a run ends without a fault
pub const CANCELLED_FOOTER_MSG: &str = "o_o";

/// Message shown while the radios are powered down
pub const SLEEP_DISPLAY_MSG: &str = "zzz...";

/// Footer shown when a radio drops out mid-run
pub const RADIO_LOST_FOOTER_MSG: &str = "Jammer stopped";

/// Keys under which [`crate::settings::JamSettings`] is persisted
pub mod keys {
    //! Preference-store keys (all values are stored as integers)

    /// Bluetooth sweep hop method
    pub const BLUETOOTH_METHOD: &str = "nvs_bluetooth_jam";

    /// BLE sweep hop method
    pub const BLE_METHOD: &str = "nvs_ble_jam";

    /// Drone sweep hop method
    pub const DRONE_METHOD: &str = "nvs_drone_jam";

    /// Misc range emission
    pub const MISC_EMISSION: &str = "nvs_misc_jam";

    /// Radio-B mirror policy
    pub const MIRROR_POLICY: &str = "nvs_nrf24_cfg";

    /// Transmit power level
    pub const TX_POWER: &str = "nvs_txpower";

    /// All keys, in load order
    pub const ALL: [&str; 6] = [
        BLUETOOTH_METHOD,
        BLE_METHOD,
        DRONE_METHOD,
        MISC_EMISSION,
        MIRROR_POLICY,
        TX_POWER,
    ];
}
