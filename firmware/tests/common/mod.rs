//! Shared test doubles: recording radios, simulated clock, yield-based
//! delays, status recorder and an in-memory settings store.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal_async::delay::DelayNs;
use jammer_firmware::hal::clock::Clock;
use jammer_firmware::hal::radio::Radio;
use jammer_firmware::jammer::{DualRadioDriver, JammerRunner, RunControl};
use jammer_firmware::settings::SettingsStore;
use jammer_firmware::status::{Status, StatusSink};
use jammer_firmware::types::{Channel, TxPower};
use rand::rngs::SmallRng;
use rand::SeedableRng;

pub type Control = RunControl<CriticalSectionRawMutex>;

pub type TestRunner<'a> =
    JammerRunner<'a, CriticalSectionRawMutex, MockRadio, SimDelay, SimClock, StatusLog, SmallRng>;

// =============================================================================
// Radio
// =============================================================================

/// Everything a mock radio was asked to do, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioOp {
    Probe,
    SetChannel(u8),
    Write(usize),
    StartCarrier(TxPower, u8),
    StopCarrier,
    StopListening,
    PowerDown,
    PowerUp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockError;

#[derive(Debug, Default)]
struct RadioState {
    ops: Vec<RadioOp>,
    absent: bool,
    /// Presence answers left before the radio disappears
    probes_left: Option<usize>,
    fail_set_channel: bool,
    fail_power_up: bool,
    stalled: bool,
}

/// Radio that records every call; clones share the same state
#[derive(Clone, Debug, Default)]
pub struct MockRadio {
    state: Rc<RefCell<RadioState>>,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<RadioOp> {
        self.state.borrow().ops.clone()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().ops.clear();
    }

    /// Channels set, in order
    pub fn channels(&self) -> Vec<u8> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                RadioOp::SetChannel(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: RadioOp) -> usize {
        self.ops().into_iter().filter(|op| *op == wanted).count()
    }

    pub fn writes(&self) -> usize {
        self.ops()
            .into_iter()
            .filter(|op| matches!(op, RadioOp::Write(_)))
            .count()
    }

    pub fn position(&self, wanted: RadioOp) -> Option<usize> {
        self.ops().into_iter().position(|op| op == wanted)
    }

    pub fn set_absent(&self, absent: bool) {
        self.state.borrow_mut().absent = absent;
    }

    /// Answer `n` more presence checks, then report absent
    pub fn disappear_after(&self, n: usize) {
        self.state.borrow_mut().probes_left = Some(n);
    }

    /// Plugged back in: present again, no pending disappearance
    pub fn reconnect(&self) {
        let mut state = self.state.borrow_mut();
        state.absent = false;
        state.probes_left = None;
    }

    pub fn fail_set_channel(&self, fail: bool) {
        self.state.borrow_mut().fail_set_channel = fail;
    }

    pub fn fail_power_up(&self, fail: bool) {
        self.state.borrow_mut().fail_power_up = fail;
    }

    /// Hold every retune until released
    pub fn stall(&self, stalled: bool) {
        self.state.borrow_mut().stalled = stalled;
    }

    /// Carrier off and back in standby, with nothing after
    pub fn is_silenced(&self) -> bool {
        let ops = self.ops();
        let n = ops.len();
        n >= 2 && ops[n - 2] == RadioOp::StopCarrier && ops[n - 1] == RadioOp::StopListening
    }

    fn record(&self, op: RadioOp) {
        self.state.borrow_mut().ops.push(op);
    }
}

impl Radio for MockRadio {
    type Error = MockError;

    async fn is_present(&mut self) -> bool {
        self.record(RadioOp::Probe);
        let mut state = self.state.borrow_mut();
        let probes_left = state.probes_left;
        match probes_left {
            Some(0) => state.absent = true,
            Some(left) => state.probes_left = Some(left - 1),
            None => {}
        }
        !state.absent
    }

    async fn set_channel(&mut self, channel: Channel) -> Result<(), Self::Error> {
        while self.state.borrow().stalled {
            yield_now().await;
        }
        self.record(RadioOp::SetChannel(channel.number()));
        if self.state.borrow().fail_set_channel {
            Err(MockError)
        } else {
            Ok(())
        }
    }

    async fn write(&mut self, payload: &[u8]) -> Result<(), Self::Error> {
        self.record(RadioOp::Write(payload.len()));
        Ok(())
    }

    async fn start_carrier(&mut self, power: TxPower, channel: Channel) -> Result<(), Self::Error> {
        self.record(RadioOp::StartCarrier(power, channel.number()));
        Ok(())
    }

    async fn stop_carrier(&mut self) -> Result<(), Self::Error> {
        self.record(RadioOp::StopCarrier);
        Ok(())
    }

    async fn stop_listening(&mut self) -> Result<(), Self::Error> {
        self.record(RadioOp::StopListening);
        Ok(())
    }

    async fn power_down(&mut self) -> Result<(), Self::Error> {
        self.record(RadioOp::PowerDown);
        Ok(())
    }

    async fn power_up(&mut self) -> Result<(), Self::Error> {
        self.record(RadioOp::PowerUp);
        if self.state.borrow().fail_power_up {
            return Err(MockError);
        }
        Ok(())
    }
}

// =============================================================================
// Time
// =============================================================================

/// Manually advanced millisecond clock
#[derive(Clone, Debug, Default)]
pub struct SimClock(Rc<Cell<u64>>);

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// Delay that advances the simulated clock and yields once
#[derive(Clone, Debug, Default)]
pub struct SimDelay {
    clock: SimClock,
}

impl SimDelay {
    pub fn new(clock: SimClock) -> Self {
        Self { clock }
    }
}

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(u64::from(ns) / 1_000_000);
        yield_now().await;
    }

    async fn delay_us(&mut self, us: u32) {
        self.clock.advance(u64::from(us) / 1_000);
        yield_now().await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.clock.advance(u64::from(ms));
        yield_now().await;
    }
}

/// Yield until `cond` holds, giving up after `max` yields
pub async fn wait_until(mut cond: impl FnMut() -> bool, max: usize) -> bool {
    for _ in 0..max {
        if cond() {
            return true;
        }
        yield_now().await;
    }
    cond()
}

/// Let the other futures run for `n` polls
pub async fn settle(n: usize) {
    for _ in 0..n {
        yield_now().await;
    }
}

// =============================================================================
// Status and storage
// =============================================================================

/// Records every status shown
#[derive(Clone, Debug, Default)]
pub struct StatusLog(Rc<RefCell<Vec<Status>>>);

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Status> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<Status> {
        self.0.borrow().last().copied()
    }
}

impl StatusSink for StatusLog {
    fn show(&mut self, status: Status) {
        self.0.borrow_mut().push(status);
    }
}

#[derive(Debug, Default)]
pub struct MemStore {
    pub values: HashMap<String, i32>,
    pub broken: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreError;

impl SettingsStore for MemStore {
    type Error = StoreError;

    fn load(&mut self, key: &str) -> Result<Option<i32>, Self::Error> {
        if self.broken {
            return Err(StoreError);
        }
        Ok(self.values.get(key).copied())
    }

    fn store(&mut self, key: &str, value: i32) -> Result<(), Self::Error> {
        if self.broken {
            return Err(StoreError);
        }
        self.values.insert(key.to_owned(), value);
        Ok(())
    }
}

// =============================================================================
// Rig
// =============================================================================

/// Two mock radios, a clock and a status recorder wired to one control
pub struct Rig {
    pub a: MockRadio,
    pub b: MockRadio,
    pub clock: SimClock,
    pub status: StatusLog,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            a: MockRadio::new(),
            b: MockRadio::new(),
            clock: SimClock::new(),
            status: StatusLog::new(),
        }
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay::new(self.clock.clone())
    }

    pub fn runner<'a>(&self, control: &'a Control) -> TestRunner<'a> {
        JammerRunner::new(
            control,
            DualRadioDriver::new(self.a.clone(), self.b.clone()),
            self.delay(),
            self.clock.clone(),
            self.status.clone(),
            SmallRng::seed_from_u64(0x5eed),
        )
    }
}
