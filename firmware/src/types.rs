//! Shared types used across the jammer firmware
//!
//! This module defines domain-specific types that enforce invariants
//! at construction time and provide type safety throughout the codebase.

use core::fmt;

use crate::config::MAX_CHANNEL;

/// nRF24L01+ RF channel (2400 MHz + n MHz)
///
/// Always within `0..=125`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Lowest channel (2400 MHz)
    pub const MIN: Self = Self(0);

    /// Highest channel (2525 MHz)
    pub const MAX: Self = Self(MAX_CHANNEL);

    /// Create a channel, returns None if above the radio's ceiling
    #[must_use]
    pub const fn new(number: u8) -> Option<Self> {
        if number <= MAX_CHANNEL {
            Some(Self(number))
        } else {
            None
        }
    }

    /// Create a channel from any computed value, clamping into `0..=125`
    ///
    /// The radio clamps anything above 125 itself; negative values clamp to 0.
    #[must_use]
    pub const fn saturating(value: i32) -> Self {
        if value < 0 {
            Self(0)
        } else if value > MAX_CHANNEL as i32 {
            Self(MAX_CHANNEL)
        } else {
            Self(value as u8)
        }
    }

    /// Get the channel number
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Get the carrier frequency in MHz
    #[must_use]
    pub const fn frequency_mhz(self) -> u16 {
        2400 + self.0 as u16
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel({} / {} MHz)", self.0, self.frequency_mhz())
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Channel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ch{}", self.0);
    }
}

/// Channels applied to radio A and radio B in one hop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelPair {
    /// Radio A channel
    pub a: Channel,
    /// Radio B channel
    pub b: Channel,
}

impl ChannelPair {
    /// Create a pair
    #[must_use]
    pub const fn new(a: Channel, b: Channel) -> Self {
        Self { a, b }
    }

    /// Both radios on the same channel
    #[must_use]
    pub const fn same(channel: Channel) -> Self {
        Self {
            a: channel,
            b: channel,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ChannelPair {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "({}, {})", self.a, self.b);
    }
}

/// Which of the two front-ends
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioId {
    /// First radio (index 0)
    A,
    /// Second radio (index 1)
    B,
}

impl RadioId {
    /// Index shown to the operator
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for RadioId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "radio{}", self.index());
    }
}

/// Jamming mode selected by the operator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JamMode {
    /// Classic Bluetooth hop set
    BluetoothSweep,
    /// BLE advertising channels
    BleSweep,
    /// Whole 2.4 GHz band used by drone links
    DroneSweep,
    /// All thirteen Wi-Fi channels
    WifiSweep,
    /// One Wi-Fi channel
    WifiSingleChannel,
    /// IEEE 802.15.4 channels 11-26
    ZigbeeSweep,
    /// Operator-chosen channel range
    MiscRange,
}

impl JamMode {
    /// Every mode, in menu order
    pub const ALL: [Self; 7] = [
        Self::BluetoothSweep,
        Self::BleSweep,
        Self::DroneSweep,
        Self::WifiSweep,
        Self::WifiSingleChannel,
        Self::ZigbeeSweep,
        Self::MiscRange,
    ];

    /// Short name for status lines
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BluetoothSweep => "Bluetooth",
            Self::BleSweep => "BLE",
            Self::DroneSweep => "Drone",
            Self::WifiSweep | Self::WifiSingleChannel => "Wi-Fi",
            Self::ZigbeeSweep => "Zigbee",
            Self::MiscRange => "Misc",
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for JamMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::BluetoothSweep => defmt::write!(f, "BT"),
            Self::BleSweep => defmt::write!(f, "BLE"),
            Self::DroneSweep => defmt::write!(f, "DRONE"),
            Self::WifiSweep => defmt::write!(f, "WIFI"),
            Self::WifiSingleChannel => defmt::write!(f, "WIFI1"),
            Self::ZigbeeSweep => defmt::write!(f, "ZIGBEE"),
            Self::MiscRange => defmt::write!(f, "MISC"),
        }
    }
}

/// Raw mode parameters as received from the control surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JamParameters {
    /// Mode takes no parameters
    #[default]
    None,
    /// A single channel (Wi-Fi channel index)
    Channel(i32),
    /// An inclusive channel range (Misc)
    Range {
        /// First channel
        start: i32,
        /// Last channel
        end: i32,
    },
}

/// Why a parameter set was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamError {
    /// Mode needs parameters that were not supplied
    Missing,
    /// Parameters supplied that the mode does not take
    Unexpected,
    /// Value outside the accepted range
    OutOfRange {
        /// Offending value
        value: i32,
        /// Smallest accepted value
        min: i32,
        /// Largest accepted value
        max: i32,
    },
    /// Range end below its start
    Inverted {
        /// Range start
        start: i32,
        /// Range end
        end: i32,
    },
}

#[cfg(feature = "embedded")]
impl defmt::Format for ParamError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Missing => defmt::write!(f, "missing"),
            Self::Unexpected => defmt::write!(f, "unexpected"),
            Self::OutOfRange { value, min, max } => {
                defmt::write!(f, "{} not in {}..={}", value, min, max);
            }
            Self::Inverted { start, end } => defmt::write!(f, "{} > {}", start, end),
        }
    }
}

/// A mode together with its validated parameters
///
/// Constructing one is the only way to get a run started, so a run never
/// sees out-of-range or inverted parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JamTarget {
    /// Classic Bluetooth hop set
    BluetoothSweep,
    /// BLE advertising channels
    BleSweep,
    /// Whole band, drone links
    DroneSweep,
    /// All Wi-Fi channels
    WifiSweep,
    /// One Wi-Fi channel (0-based index, `0..=12`)
    WifiSingleChannel(u8),
    /// IEEE 802.15.4 channels
    ZigbeeSweep,
    /// Inclusive range, `first <= last`
    MiscRange {
        /// First channel
        first: Channel,
        /// Last channel
        last: Channel,
    },
}

impl JamTarget {
    /// Highest Wi-Fi channel index accepted by the single-channel mode
    pub const WIFI_CHANNEL_MAX: u8 = 12;

    /// Validate raw parameters for a mode
    ///
    /// # Errors
    ///
    /// Returns a [`ParamError`] if the parameters do not fit the mode.
    pub fn new(mode: JamMode, params: JamParameters) -> Result<Self, ParamError> {
        match (mode, params) {
            (JamMode::BluetoothSweep, JamParameters::None) => Ok(Self::BluetoothSweep),
            (JamMode::BleSweep, JamParameters::None) => Ok(Self::BleSweep),
            (JamMode::DroneSweep, JamParameters::None) => Ok(Self::DroneSweep),
            (JamMode::WifiSweep, JamParameters::None) => Ok(Self::WifiSweep),
            (JamMode::ZigbeeSweep, JamParameters::None) => Ok(Self::ZigbeeSweep),
            (JamMode::WifiSingleChannel, JamParameters::Channel(channel)) => {
                let index = in_range(channel, 0, i32::from(Self::WIFI_CHANNEL_MAX))?;
                Ok(Self::WifiSingleChannel(index))
            }
            (JamMode::MiscRange, JamParameters::Range { start, end }) => {
                let first = in_range(start, 0, i32::from(MAX_CHANNEL))?;
                let last = in_range(end, 0, i32::from(MAX_CHANNEL))?;
                if first > last {
                    return Err(ParamError::Inverted { start, end });
                }
                Ok(Self::MiscRange {
                    first: Channel(first),
                    last: Channel(last),
                })
            }
            (JamMode::WifiSingleChannel | JamMode::MiscRange, _) => Err(ParamError::Missing),
            (_, _) => Err(ParamError::Unexpected),
        }
    }

    /// The mode this target runs
    #[must_use]
    pub const fn mode(self) -> JamMode {
        match self {
            Self::BluetoothSweep => JamMode::BluetoothSweep,
            Self::BleSweep => JamMode::BleSweep,
            Self::DroneSweep => JamMode::DroneSweep,
            Self::WifiSweep => JamMode::WifiSweep,
            Self::WifiSingleChannel(_) => JamMode::WifiSingleChannel,
            Self::ZigbeeSweep => JamMode::ZigbeeSweep,
            Self::MiscRange { .. } => JamMode::MiscRange,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for JamTarget {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::WifiSingleChannel(index) => defmt::write!(f, "WIFI1({})", index),
            Self::MiscRange { first, last } => defmt::write!(f, "MISC({}..={})", first, last),
            other => defmt::write!(f, "{}", other.mode()),
        }
    }
}

fn in_range(value: i32, min: i32, max: i32) -> Result<u8, ParamError> {
    if (min..=max).contains(&value) {
        // max never exceeds MAX_CHANNEL, so this always fits
        u8::try_from(value).map_err(|_| ParamError::OutOfRange { value, min, max })
    } else {
        Err(ParamError::OutOfRange { value, min, max })
    }
}

/// Lifecycle of the single jam run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RunState {
    /// No run, radios silent
    #[default]
    Idle = 0,
    /// Sequencing loop active
    Running = 1,
    /// Stop signalled, loop not yet exited
    StopRequested = 2,
    /// Loop exited, radios being silenced
    Stopping = 3,
}

impl RunState {
    /// Decode from the atomic representation
    #[must_use]
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::StopRequested,
            3 => Self::Stopping,
            _ => Self::Idle,
        }
    }

    /// Encode for the atomic representation
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for RunState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "IDLE"),
            Self::Running => defmt::write!(f, "RUN"),
            Self::StopRequested => defmt::write!(f, "STOP_REQ"),
            Self::Stopping => defmt::write!(f, "STOPPING"),
        }
    }
}

/// nRF24L01+ power amplifier level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TxPower {
    /// -18 dBm
    Min,
    /// -12 dBm
    Low,
    /// -6 dBm
    High,
    /// 0 dBm
    #[default]
    Max,
}

impl TxPower {
    /// Decode a stored selector; anything unknown means full power
    #[must_use]
    pub const fn from_index(index: i32) -> Self {
        match index {
            0 => Self::Min,
            1 => Self::Low,
            2 => Self::High,
            _ => Self::Max,
        }
    }

    /// Stored selector value
    #[must_use]
    pub const fn index(self) -> i32 {
        match self {
            Self::Min => 0,
            Self::Low => 1,
            Self::High => 2,
            Self::Max => 3,
        }
    }

    /// Output power in dBm
    #[must_use]
    pub const fn dbm(self) -> i8 {
        match self {
            Self::Min => -18,
            Self::Low => -12,
            Self::High => -6,
            Self::Max => 0,
        }
    }

    /// Footer text shown while jamming
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Min => "Low TxP",
            Self::Low => "Medium TxP",
            Self::High => "High TxP",
            Self::Max => "Maximum TxP",
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxPower {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}dBm", self.dbm());
    }
}

/// How radio A walks its channel space
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HopMethod {
    /// Walk the mode's fixed channel table
    #[default]
    ChannelList,
    /// Uniform random draw per hop
    Random,
    /// Ascending walk over the raw range
    Sequential,
}

impl HopMethod {
    /// Decode a stored selector
    #[must_use]
    pub const fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::ChannelList),
            1 => Some(Self::Random),
            2 => Some(Self::Sequential),
            _ => None,
        }
    }

    /// Stored selector value
    #[must_use]
    pub const fn index(self) -> i32 {
        match self {
            Self::ChannelList => 0,
            Self::Random => 1,
            Self::Sequential => 2,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for HopMethod {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::ChannelList => defmt::write!(f, "list"),
            Self::Random => defmt::write!(f, "random"),
            Self::Sequential => defmt::write!(f, "sequential"),
        }
    }
}

/// How radio B's channel relates to radio A's
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MirrorPolicy {
    /// Radio B reflected/offset from radio A
    #[default]
    Reflected,
    /// Radio B on radio A's channel
    SameChannel,
}

impl MirrorPolicy {
    /// Decode a stored selector
    #[must_use]
    pub const fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Reflected),
            1 => Some(Self::SameChannel),
            _ => None,
        }
    }

    /// Stored selector value
    #[must_use]
    pub const fn index(self) -> i32 {
        match self {
            Self::Reflected => 0,
            Self::SameChannel => 1,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for MirrorPolicy {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Reflected => defmt::write!(f, "reflected"),
            Self::SameChannel => defmt::write!(f, "same"),
        }
    }
}

/// What the radios put on air at each hop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Emission {
    /// Continuous unmodulated carrier, retuned per hop
    #[default]
    Carrier,
    /// Filler payload written per hop
    Payload,
}

impl Emission {
    /// Decode a stored selector
    #[must_use]
    pub const fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Carrier),
            1 => Some(Self::Payload),
            _ => None,
        }
    }

    /// Stored selector value
    #[must_use]
    pub const fn index(self) -> i32 {
        match self {
            Self::Carrier => 0,
            Self::Payload => 1,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Emission {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Carrier => defmt::write!(f, "carrier"),
            Self::Payload => defmt::write!(f, "payload"),
        }
    }
}
