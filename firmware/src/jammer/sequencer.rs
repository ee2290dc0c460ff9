//! Channel Sequencing
//!
//! Pure computation of the channel pair to apply at each hop, one
//! algorithm per mode. Every mode scans radio A's channel space, and radio
//! B either copies radio A or sits on an arithmetic reflection of it so the
//! two radios stay symmetric around a band centre.
//!
//! A pass is the finite list of hops for one sweep; the [`Sequencer`]
//! repeats passes until the run is stopped. A plan whose pass is empty is
//! exhausted and ends the run.

use core::ops::Range;

use rand_core::RngCore;

use crate::settings::JamSettings;
use crate::types::{Channel, ChannelPair, Emission, HopMethod, JamTarget, MirrorPolicy};

/// Classic Bluetooth hop table, in sweep order
pub const BLUETOOTH_CHANNELS: [u8; 21] = [
    32, 34, 46, //
    48, 50, 52, //
    0, 1, 2, //
    4, 6, 8, //
    22, 24, 26, //
    28, 30, 74, //
    76, 78, 80,
];

/// BLE advertising channels (37, 38, 39)
pub const BLE_CHANNELS: [u8; 3] = [2, 26, 80];

/// Raw channel range swept for drone links
pub const DRONE_RANGE_END: u8 = 125;

/// Number of Wi-Fi channels swept
pub const WIFI_CHANNEL_COUNT: u8 = 13;

/// Width of the window swept per Wi-Fi channel
pub const WIFI_WINDOW: u8 = 22;

/// Radio-B reflection point for the full Wi-Fi sweep
pub const WIFI_REFLECT: i32 = 83;

/// First IEEE 802.15.4 channel
pub const ZIGBEE_FIRST: u8 = 11;

/// Last IEEE 802.15.4 channel
pub const ZIGBEE_LAST: u8 = 26;

/// Width of the window swept per Zigbee channel
pub const ZIGBEE_WINDOW: u8 = 6;

/// Radio-B reflection point for the Zigbee sweep
pub const ZIGBEE_REFLECT: i32 = 85;

/// Reflect `value` around `k`
///
/// Involutive: `reflect(k, reflect(k, v)) == v`.
#[must_use]
pub const fn reflect(k: i32, value: i32) -> i32 {
    k - value
}

/// Channel value as the radio's one-byte channel register receives it
///
/// Negative values wrap modulo 256; anything above
/// [`MAX_CHANNEL`](crate::config::MAX_CHANNEL) is then
/// clamped by the radio.
#[must_use]
pub const fn register_byte(value: i32) -> i32 {
    value.rem_euclid(256)
}

/// Radio-B channel for a fixed-table sweep
///
/// Looks up the reversed table at the index given by radio A's channel
/// *value*, not by the loop position. Values past the end of the table
/// wrap around it.
#[must_use]
pub fn list_mirror(list: &[u8], value: u8) -> u8 {
    let len = list.len();
    if len == 0 {
        return value;
    }
    let position = usize::from(value) % len;
    list[len - 1 - position]
}

/// Channels swept for Wi-Fi channel index `k` (`5k+1 .. 5k+23`)
#[must_use]
pub fn wifi_window(k: u8) -> Range<u8> {
    let start = k.saturating_mul(5).saturating_add(1);
    start..start.saturating_add(WIFI_WINDOW)
}

/// Radio-B channel for the single Wi-Fi channel `k`
///
/// Reflection of `i` inside the window's own endpoints.
#[must_use]
pub const fn wifi_channel_mirror(k: u8, i: i32) -> i32 {
    let base = 5 * k as i32;
    (base + 23) - (i - base)
}

/// Channels swept for Zigbee channel `c` (`11..=26`)
#[must_use]
pub fn zigbee_window(c: u8) -> Range<u8> {
    let start = c.saturating_sub(ZIGBEE_FIRST).saturating_mul(5).saturating_add(5);
    start..start.saturating_add(ZIGBEE_WINDOW)
}

/// What radio A walks for one run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HopPlan {
    /// Fixed channel table
    List(&'static [u8]),
    /// Uniform draw from `[start, end)` each hop
    Random {
        /// Inclusive start
        start: u8,
        /// Exclusive end
        end: u8,
    },
    /// Ascending walk over `[start, end)`
    Sequential {
        /// Inclusive start
        start: u8,
        /// Exclusive end
        end: u8,
    },
    /// All Wi-Fi channels, 22-channel window each
    WifiSweep {
        /// Channel index left out of the sweep
        skip: Option<u8>,
    },
    /// One Wi-Fi channel's window
    WifiChannel(u8),
    /// All Zigbee channels, 6-channel window each
    Zigbee,
    /// Inclusive linear walk `first..=last`
    Misc {
        /// First channel
        first: u8,
        /// Last channel
        last: u8,
    },
}

impl HopPlan {
    /// Build the plan for a target under the given settings
    #[must_use]
    pub fn for_target(target: JamTarget, settings: &JamSettings) -> Self {
        match target {
            JamTarget::BluetoothSweep => {
                Self::from_method(settings.bluetooth_method(), &BLUETOOTH_CHANNELS)
            }
            JamTarget::BleSweep => Self::from_method(settings.ble_method(), &BLE_CHANNELS),
            JamTarget::DroneSweep => match settings.drone_method() {
                HopMethod::Sequential => Self::Sequential {
                    start: 0,
                    end: DRONE_RANGE_END,
                },
                // no channel table for drones
                HopMethod::Random | HopMethod::ChannelList => Self::Random {
                    start: 0,
                    end: DRONE_RANGE_END,
                },
            },
            JamTarget::WifiSweep => Self::WifiSweep {
                skip: settings
                    .wifi_excluded_channel()
                    .filter(|&k| k < WIFI_CHANNEL_COUNT),
            },
            JamTarget::WifiSingleChannel(k) => Self::WifiChannel(k),
            JamTarget::ZigbeeSweep => Self::Zigbee,
            JamTarget::MiscRange { first, last } => Self::Misc {
                first: first.number(),
                last: last.number(),
            },
        }
    }

    /// Random and sequential methods cover the raw range `[0, table length)`
    fn from_method(method: HopMethod, list: &'static [u8]) -> Self {
        let end = u8::try_from(list.len()).unwrap_or(u8::MAX);
        match method {
            HopMethod::ChannelList => Self::List(list),
            HopMethod::Random => Self::Random { start: 0, end },
            HopMethod::Sequential => Self::Sequential { start: 0, end },
        }
    }

    /// Number of hops in one pass (0 = nothing to sweep)
    #[must_use]
    pub fn pass_len(&self) -> usize {
        match *self {
            Self::List(list) => list.len(),
            Self::Random { start, end } => usize::from(end > start),
            Self::Sequential { start, end } => usize::from(end.saturating_sub(start)),
            Self::WifiSweep { skip } => {
                usize::from(WIFI_CHANNEL_COUNT - u8::from(skip.is_some())) * usize::from(WIFI_WINDOW)
            }
            Self::WifiChannel(_) => usize::from(WIFI_WINDOW),
            Self::Zigbee => usize::from(ZIGBEE_LAST - ZIGBEE_FIRST + 1) * usize::from(ZIGBEE_WINDOW),
            Self::Misc { first, last } => {
                usize::from(last).checked_sub(usize::from(first)).map_or(0, |span| span + 1)
            }
        }
    }

    /// Channel pair for hop `step` of a pass (`step < pass_len()`)
    ///
    /// Only the random plan draws from `rng`.
    pub fn pair_at<R: RngCore>(&self, step: usize, mirror: MirrorPolicy, rng: &mut R) -> ChannelPair {
        let reflected = mirror == MirrorPolicy::Reflected;
        let (a, b) = match *self {
            Self::List(list) => {
                let value = list.get(step % list.len().max(1)).copied().unwrap_or(0);
                let b = if reflected { list_mirror(list, value) } else { value };
                (i32::from(value), i32::from(b))
            }
            Self::Random { start, end } => {
                let a = draw(rng, i32::from(start), i32::from(end));
                let b = if reflected {
                    draw(rng, i32::from(end), 2 * i32::from(end))
                } else {
                    a
                };
                (a, b)
            }
            Self::Sequential { start, end } => {
                let i = i32::from(start) + step_i32(step);
                // below the range end this wraps, so radio B parks on the ceiling
                let b = if reflected {
                    register_byte(i - i32::from(end))
                } else {
                    i
                };
                (i, b)
            }
            Self::WifiSweep { skip } => {
                let mut k = step_i32(step) / i32::from(WIFI_WINDOW);
                if skip.is_some_and(|skip| k >= i32::from(skip)) {
                    k += 1;
                }
                let i = 5 * k + 1 + step_i32(step) % i32::from(WIFI_WINDOW);
                (i, if reflected { reflect(WIFI_REFLECT, i) } else { i })
            }
            Self::WifiChannel(k) => {
                let i = 5 * i32::from(k) + 1 + step_i32(step);
                (i, if reflected { wifi_channel_mirror(k, i) } else { i })
            }
            Self::Zigbee => {
                let c = step_i32(step) / i32::from(ZIGBEE_WINDOW);
                let i = 5 + 5 * c + step_i32(step) % i32::from(ZIGBEE_WINDOW);
                (i, if reflected { reflect(ZIGBEE_REFLECT, i) } else { i })
            }
            Self::Misc { first, last } => {
                let offset = step_i32(step);
                let a = i32::from(first) + offset;
                (a, if reflected { i32::from(last) - offset } else { a })
            }
        };
        ChannelPair::new(Channel::saturating(a), Channel::saturating(b))
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for HopPlan {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::List(list) => defmt::write!(f, "list[{}]", list.len()),
            Self::Random { start, end } => defmt::write!(f, "random[{}..{})", start, end),
            Self::Sequential { start, end } => defmt::write!(f, "seq[{}..{})", start, end),
            Self::WifiSweep { skip: None } => defmt::write!(f, "wifi"),
            Self::WifiSweep { skip: Some(k) } => defmt::write!(f, "wifi[!{}]", k),
            Self::WifiChannel(k) => defmt::write!(f, "wifi[{}]", k),
            Self::Zigbee => defmt::write!(f, "zigbee"),
            Self::Misc { first, last } => defmt::write!(f, "misc[{}..={}]", first, last),
        }
    }
}

/// Carrier for the raw-energy sweeps, payload writes for packet modes
#[must_use]
pub const fn emission_for(target: JamTarget, settings: &JamSettings) -> Emission {
    match target {
        JamTarget::BluetoothSweep | JamTarget::DroneSweep => Emission::Carrier,
        JamTarget::MiscRange { .. } => settings.misc_emission(),
        JamTarget::BleSweep
        | JamTarget::WifiSweep
        | JamTarget::WifiSingleChannel(_)
        | JamTarget::ZigbeeSweep => Emission::Payload,
    }
}

fn draw<R: RngCore>(rng: &mut R, start: i32, end: i32) -> i32 {
    let span = end - start;
    if span <= 0 {
        return start;
    }
    // span is at most 250, the modulo bias is negligible
    start + (rng.next_u32() % span.unsigned_abs()) as i32
}

fn step_i32(step: usize) -> i32 {
    i32::try_from(step).unwrap_or(i32::MAX)
}

/// Cyclic cursor over a [`HopPlan`]
#[derive(Clone, Debug)]
pub struct Sequencer {
    plan: HopPlan,
    mirror: MirrorPolicy,
    step: usize,
    pass_len: usize,
    passes: u32,
}

impl Sequencer {
    /// Start at the first hop of the first pass
    #[must_use]
    pub fn new(plan: HopPlan, mirror: MirrorPolicy) -> Self {
        Self {
            plan,
            mirror,
            step: 0,
            pass_len: plan.pass_len(),
            passes: 0,
        }
    }

    /// Plan being walked
    #[must_use]
    pub const fn plan(&self) -> HopPlan {
        self.plan
    }

    /// Completed passes
    #[must_use]
    pub const fn passes(&self) -> u32 {
        self.passes
    }

    /// Next hop, wrapping to the next pass; `None` if the plan is empty
    pub fn next_pair<R: RngCore>(&mut self, rng: &mut R) -> Option<ChannelPair> {
        if self.pass_len == 0 {
            return None;
        }
        let pair = self.plan.pair_at(self.step, self.mirror, rng);
        self.step += 1;
        if self.step == self.pass_len {
            self.step = 0;
            self.passes = self.passes.wrapping_add(1);
        }
        Some(pair)
    }
}
