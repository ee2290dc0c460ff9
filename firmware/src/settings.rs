//! Persisted Runtime Settings
//!
//! Operator-selectable behaviour that survives reboots: hop method per
//! sweep mode, Misc emission, radio-B mirror policy and transmit power.
//! The storage back-end itself lives outside the crate behind
//! [`SettingsStore`]; values are kept as plain integers so existing
//! preference stores decode unchanged.

use crate::config::keys;
use crate::types::{Emission, HopMethod, MirrorPolicy, TxPower};

/// Integer key/value preference store
pub trait SettingsStore {
    /// Back-end error
    type Error;

    /// Read an integer, `None` if the key was never written
    ///
    /// # Errors
    ///
    /// Returns the back-end error if the store cannot be read.
    fn load(&mut self, key: &str) -> Result<Option<i32>, Self::Error>;

    /// Write an integer
    ///
    /// # Errors
    ///
    /// Returns the back-end error if the store cannot be written.
    fn store(&mut self, key: &str, value: i32) -> Result<(), Self::Error>;
}

/// Settings errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsError<E> {
    /// Selector value has no meaning for this key
    UnknownSelector {
        /// Setting key
        key: &'static str,
        /// Rejected value
        value: i32,
    },
    /// The drone sweep has no channel table to walk
    ChannelListUnsupported,
    /// Storage back-end failed
    Store(E),
}

#[cfg(feature = "embedded")]
impl<E> defmt::Format for SettingsError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::UnknownSelector { key, value } => {
                defmt::write!(f, "unknown selector {}={}", key, value);
            }
            Self::ChannelListUnsupported => defmt::write!(f, "channel list unsupported"),
            Self::Store(_) => defmt::write!(f, "store error"),
        }
    }
}

/// Runtime settings snapshot
///
/// Copied into every run at start, so a run never observes a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JamSettings {
    bluetooth: HopMethod,
    ble: HopMethod,
    drone: HopMethod,
    misc: Emission,
    mirror: MirrorPolicy,
    tx_power: TxPower,
    wifi_excluded: Option<u8>,
}

impl JamSettings {
    /// Factory defaults
    pub const DEFAULT: Self = Self {
        bluetooth: HopMethod::ChannelList,
        ble: HopMethod::ChannelList,
        drone: HopMethod::Random,
        misc: Emission::Carrier,
        mirror: MirrorPolicy::Reflected,
        tx_power: TxPower::Max,
        wifi_excluded: None,
    };

    /// Bluetooth sweep hop method
    #[must_use]
    pub const fn bluetooth_method(&self) -> HopMethod {
        self.bluetooth
    }

    /// BLE sweep hop method
    #[must_use]
    pub const fn ble_method(&self) -> HopMethod {
        self.ble
    }

    /// Drone sweep hop method (never [`HopMethod::ChannelList`])
    #[must_use]
    pub const fn drone_method(&self) -> HopMethod {
        self.drone
    }

    /// Misc range emission
    #[must_use]
    pub const fn misc_emission(&self) -> Emission {
        self.misc
    }

    /// Radio-B mirror policy
    #[must_use]
    pub const fn mirror(&self) -> MirrorPolicy {
        self.mirror
    }

    /// Transmit power level
    #[must_use]
    pub const fn tx_power(&self) -> TxPower {
        self.tx_power
    }

    /// Wi-Fi channel index the full sweep leaves out
    ///
    /// Not persisted: it follows the access point, which the application
    /// configures.
    #[must_use]
    pub const fn wifi_excluded_channel(&self) -> Option<u8> {
        self.wifi_excluded
    }

    /// Set the Bluetooth hop method (returns new settings)
    #[must_use]
    pub const fn with_bluetooth_method(self, method: HopMethod) -> Self {
        Self {
            bluetooth: method,
            ..self
        }
    }

    /// Set the BLE hop method (returns new settings)
    #[must_use]
    pub const fn with_ble_method(self, method: HopMethod) -> Self {
        Self { ble: method, ..self }
    }

    /// Set the drone hop method (returns new settings)
    ///
    /// # Errors
    ///
    /// The drone sweep has no channel table, so
    /// [`HopMethod::ChannelList`] is rejected.
    pub fn with_drone_method<E>(self, method: HopMethod) -> Result<Self, SettingsError<E>> {
        match method {
            HopMethod::ChannelList => Err(SettingsError::ChannelListUnsupported),
            _ => Ok(Self {
                drone: method,
                ..self
            }),
        }
    }

    /// Set the Misc emission (returns new settings)
    #[must_use]
    pub const fn with_misc_emission(self, emission: Emission) -> Self {
        Self {
            misc: emission,
            ..self
        }
    }

    /// Set the mirror policy (returns new settings)
    #[must_use]
    pub const fn with_mirror(self, mirror: MirrorPolicy) -> Self {
        Self { mirror, ..self }
    }

    /// Set the transmit power (returns new settings)
    #[must_use]
    pub const fn with_tx_power(self, tx_power: TxPower) -> Self {
        Self { tx_power, ..self }
    }

    /// Leave one Wi-Fi channel index (0-based, as for the single-channel
    /// mode) out of the full sweep; indexes past the last channel exclude
    /// nothing (returns new settings)
    #[must_use]
    pub const fn with_wifi_excluded_channel(self, channel: Option<u8>) -> Self {
        Self {
            wifi_excluded: channel,
            ..self
        }
    }

    /// Apply one stored selector (returns new settings)
    ///
    /// # Errors
    ///
    /// Rejects unknown keys and values that do not decode for the key.
    /// Transmit power accepts any value (unknown levels mean full power).
    pub fn with_selector<E>(self, key: &str, value: i32) -> Result<Self, SettingsError<E>> {
        let unknown = |key: &'static str| SettingsError::UnknownSelector { key, value };
        match key {
            keys::BLUETOOTH_METHOD => HopMethod::from_index(value)
                .map(|m| self.with_bluetooth_method(m))
                .ok_or(unknown(keys::BLUETOOTH_METHOD)),
            keys::BLE_METHOD => HopMethod::from_index(value)
                .map(|m| self.with_ble_method(m))
                .ok_or(unknown(keys::BLE_METHOD)),
            keys::DRONE_METHOD => {
                let method = HopMethod::from_index(value).ok_or(unknown(keys::DRONE_METHOD))?;
                self.with_drone_method(method)
            }
            keys::MISC_EMISSION => Emission::from_index(value)
                .map(|e| self.with_misc_emission(e))
                .ok_or(unknown(keys::MISC_EMISSION)),
            keys::MIRROR_POLICY => MirrorPolicy::from_index(value)
                .map(|m| self.with_mirror(m))
                .ok_or(unknown(keys::MIRROR_POLICY)),
            keys::TX_POWER => Ok(self.with_tx_power(TxPower::from_index(value))),
            _ => Err(SettingsError::UnknownSelector { key: "?", value }),
        }
    }

    /// Stored selector for a key, `None` for unknown keys
    #[must_use]
    pub fn selector(&self, key: &str) -> Option<i32> {
        match key {
            keys::BLUETOOTH_METHOD => Some(self.bluetooth.index()),
            keys::BLE_METHOD => Some(self.ble.index()),
            keys::DRONE_METHOD => Some(self.drone.index()),
            keys::MISC_EMISSION => Some(self.misc.index()),
            keys::MIRROR_POLICY => Some(self.mirror.index()),
            keys::TX_POWER => Some(self.tx_power.index()),
            _ => None,
        }
    }

    /// Load settings from a store
    ///
    /// Missing keys keep their default; stored values that do not decode
    /// are logged and also keep their default.
    ///
    /// # Errors
    ///
    /// Only a failing back-end is reported.
    pub fn load<S: SettingsStore>(store: &mut S) -> Result<Self, SettingsError<S::Error>> {
        let mut settings = Self::DEFAULT;
        for key in keys::ALL {
            let Some(value) = store.load(key).map_err(SettingsError::Store)? else {
                continue;
            };
            match settings.with_selector::<S::Error>(key, value) {
                Ok(updated) => settings = updated,
                Err(_) => warn!("ignoring stored selector {}={}", key, value),
            }
        }
        debug!("settings loaded: {:?}", settings);
        Ok(settings)
    }

    /// Write every selector to a store
    ///
    /// # Errors
    ///
    /// Stops at the first back-end failure.
    pub fn save<S: SettingsStore>(&self, store: &mut S) -> Result<(), SettingsError<S::Error>> {
        for key in keys::ALL {
            if let Some(value) = self.selector(key) {
                store.store(key, value).map_err(SettingsError::Store)?;
            }
        }
        Ok(())
    }
}

impl Default for JamSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for JamSettings {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Settings(bt={}, ble={}, drone={}, misc={}, mirror={}, tx={}, wifi_skip={})",
            self.bluetooth,
            self.ble,
            self.drone,
            self.misc,
            self.mirror,
            self.tx_power,
            self.wifi_excluded
        );
    }
}
