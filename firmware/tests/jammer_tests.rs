//! Jammer Run Lifecycle Tests
//!
//! Start/stop, preemption, mutual exclusion and fail-stop scenarios driven
//! through the shared run control with the runner polled alongside.
//! Run with: cargo test --test jammer_tests

mod common;

use core::future::Future;

use common::{settle, wait_until, Control, RadioOp, Rig, TestRunner};
use embassy_futures::block_on;
use embassy_futures::join::join3;
use embassy_futures::select::{select, Either};
use jammer_firmware::config::FILLER_PAYLOAD;
use jammer_firmware::jammer::{RunEnd, StartError, StopOutcome};
use jammer_firmware::settings::JamSettings;
use jammer_firmware::status::Status;
use jammer_firmware::types::{JamMode, JamParameters, ParamError, RadioId, RunState, TxPower};

/// Drive the runner until `scenario` completes
fn run_with(runner: &mut TestRunner<'_>, scenario: impl Future<Output = ()>) {
    block_on(async {
        match select(runner.run(), scenario).await {
            Either::First(_) => unreachable!("runner never returns"),
            Either::Second(()) => {}
        }
    });
}

fn after_last_probe(ops: &[RadioOp]) -> Vec<RadioOp> {
    let last = ops.iter().rposition(|op| *op == RadioOp::Probe).unwrap();
    ops[last + 1..].to_vec()
}

// =============================================================================
// Start / Stop Tests
// =============================================================================

#[test]
fn start_then_stop_silences_both_radios() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();

    run_with(&mut runner, async {
        control
            .start(JamMode::BluetoothSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| control.run_state() == RunState::Running, 10).await);
        assert!(control.is_running());
        assert_eq!(control.current_mode(), Some(JamMode::BluetoothSweep));
        assert!(wait_until(|| rig.a.channels().len() >= 5, 50).await);

        assert_eq!(control.stop(), StopOutcome::Stopping);
        assert_eq!(control.run_state(), RunState::StopRequested);
        assert!(wait_until(|| control.run_state() == RunState::Idle, 5).await);
    });

    assert!(rig.a.is_silenced());
    assert!(rig.b.is_silenced());
    assert!(!control.is_running());
    assert_eq!(control.current_mode(), None);
    assert_eq!(control.last_outcome(), Some(RunEnd::Stopped));
    assert_eq!(
        rig.status.entries(),
        vec![
            Status::Jamming {
                mode: JamMode::BluetoothSweep,
                power: TxPower::Max
            },
            Status::Cancelled,
        ]
    );
}

#[test]
fn carrier_mode_starts_carrier_once() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();

    run_with(&mut runner, async {
        control
            .start(JamMode::DroneSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| rig.a.channels().len() >= 20, 50).await);
        control.stop();
        assert!(wait_until(|| !control.is_running(), 5).await);
    });

    assert_eq!(rig.a.count(RadioOp::StartCarrier(TxPower::Max, 45)), 1);
    assert_eq!(rig.b.count(RadioOp::StartCarrier(TxPower::Max, 45)), 1);
    assert_eq!(rig.a.writes(), 0);
}

#[test]
fn payload_mode_writes_every_hop() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();

    run_with(&mut runner, async {
        control
            .start(JamMode::WifiSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| rig.a.channels().len() >= 10, 50).await);
        control.stop();
        assert!(wait_until(|| !control.is_running(), 5).await);
    });

    let hops = rig.a.channels().len();
    assert_eq!(rig.a.writes(), hops);
    assert_eq!(rig.b.writes(), rig.b.channels().len());
    assert_eq!(rig.a.count(RadioOp::Write(FILLER_PAYLOAD.len())), hops);
    assert!(rig.a.position(RadioOp::StartCarrier(TxPower::Max, 45)).is_none());
    assert!(rig.a.is_silenced());
}

#[test]
fn misc_range_reflected_sequence() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();

    run_with(&mut runner, async {
        control
            .start(
                JamMode::MiscRange,
                JamParameters::Range { start: 10, end: 15 },
                &mut delay,
            )
            .await
            .unwrap();
        assert!(wait_until(|| rig.a.channels().len() >= 6, 20).await);
        control.stop();
        assert!(wait_until(|| !control.is_running(), 5).await);
    });

    assert_eq!(rig.a.channels()[..6], [10u8, 11, 12, 13, 14, 15]);
    assert_eq!(rig.b.channels()[..6], [15u8, 14, 13, 12, 11, 10]);
}

#[test]
fn stop_with_nothing_running() {
    let control = Control::default();
    assert_eq!(control.stop(), StopOutcome::NothingRunning);
    assert_eq!(control.run_state(), RunState::Idle);
    assert!(!control.stop_requested());
}

#[test]
fn stop_cancels_queued_start() {
    let rig = Rig::new();
    let control = Control::default();
    let mut delay = rig.delay();

    // runner not polled yet, so the start stays queued
    block_on(control.start(JamMode::BleSweep, JamParameters::None, &mut delay)).unwrap();
    assert!(!control.is_running());
    assert_eq!(control.stop(), StopOutcome::CancelledPending);

    let mut runner = rig.runner(&control);
    run_with(&mut runner, settle(20));

    assert!(rig.a.ops().is_empty());
    assert!(rig.b.ops().is_empty());
    assert!(!control.is_running());
    assert_eq!(control.last_outcome(), None);
    assert!(rig.status.entries().is_empty());
}

// =============================================================================
// Parameter Validation Tests
// =============================================================================

#[test]
fn invalid_parameters_touch_no_radio() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();

    run_with(&mut runner, async {
        let result = control
            .start(
                JamMode::WifiSingleChannel,
                JamParameters::Channel(13),
                &mut delay,
            )
            .await;
        assert_eq!(
            result,
            Err(StartError::InvalidParameters(ParamError::OutOfRange {
                value: 13,
                min: 0,
                max: 12
            }))
        );
        let result = control
            .start(
                JamMode::MiscRange,
                JamParameters::Range { start: 50, end: 20 },
                &mut delay,
            )
            .await;
        assert_eq!(
            result,
            Err(StartError::InvalidParameters(ParamError::Inverted {
                start: 50,
                end: 20
            }))
        );
        settle(20).await;
    });

    assert!(rig.a.ops().is_empty());
    assert!(rig.b.ops().is_empty());
    assert_eq!(control.run_state(), RunState::Idle);
}

#[test]
fn invalid_parameters_leave_active_run_alone() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();

    run_with(&mut runner, async {
        control
            .start(JamMode::ZigbeeSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| control.is_running(), 10).await);
        let result = control
            .start(JamMode::MiscRange, JamParameters::None, &mut delay)
            .await;
        assert_eq!(result, Err(StartError::InvalidParameters(ParamError::Missing)));
        settle(5).await;
        assert_eq!(control.current_mode(), Some(JamMode::ZigbeeSweep));
        assert!(!control.stop_requested());
        control.stop();
        assert!(wait_until(|| !control.is_running(), 5).await);
    });
}

// =============================================================================
// Preemption and Mutual Exclusion Tests
// =============================================================================

#[test]
fn start_preempts_active_run() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();

    run_with(&mut runner, async {
        control
            .start(JamMode::BluetoothSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| rig.a.channels().len() >= 3, 20).await);

        control
            .start(JamMode::WifiSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| control.current_mode() == Some(JamMode::WifiSweep), 10).await);
        assert_eq!(control.last_outcome(), Some(RunEnd::Stopped));
        assert_eq!(control.preemption_timeouts(), 0);
        control.stop();
        assert!(wait_until(|| !control.is_running(), 5).await);
    });

    // the first run was silenced before the second one wrote anything
    let silenced = rig.a.position(RadioOp::StopListening).unwrap();
    let first_write = rig.a.position(RadioOp::Write(FILLER_PAYLOAD.len())).unwrap();
    assert!(silenced < first_write);
    assert_eq!(
        rig.status.entries(),
        vec![
            Status::Jamming {
                mode: JamMode::BluetoothSweep,
                power: TxPower::Max
            },
            Status::Cancelled,
            Status::Jamming {
                mode: JamMode::WifiSweep,
                power: TxPower::Max
            },
            Status::Cancelled,
        ]
    );
}

#[test]
fn concurrent_starts_one_wins() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let (mut d1, mut d2, mut d3) = (rig.delay(), rig.delay(), rig.delay());

    run_with(&mut runner, async {
        control
            .start(JamMode::DroneSweep, JamParameters::None, &mut d1)
            .await
            .unwrap();
        assert!(wait_until(|| control.is_running(), 10).await);

        let (first, second, third) = join3(
            control.start(JamMode::WifiSweep, JamParameters::None, &mut d1),
            control.start(JamMode::ZigbeeSweep, JamParameters::None, &mut d2),
            control.start(JamMode::BleSweep, JamParameters::None, &mut d3),
        )
        .await;
        assert_eq!(first, Ok(()));
        assert_eq!(second, Err(StartError::Busy));
        assert_eq!(third, Err(StartError::Busy));

        assert!(wait_until(|| control.current_mode() == Some(JamMode::WifiSweep), 10).await);
        control.stop();
        assert!(wait_until(|| !control.is_running(), 5).await);
    });

    let jams = rig
        .status
        .entries()
        .into_iter()
        .filter(|s| matches!(s, Status::Jamming { .. }))
        .count();
    assert_eq!(jams, 2);
}

#[test]
fn runs_never_overlap() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();

    run_with(&mut runner, async {
        for mode in [
            JamMode::BluetoothSweep,
            JamMode::BleSweep,
            JamMode::WifiSweep,
            JamMode::ZigbeeSweep,
            JamMode::DroneSweep,
        ] {
            // Busy is allowed, a second loop is not
            let _ = control.start(mode, JamParameters::None, &mut delay).await;
            settle(2).await;
        }
        control.stop();
        assert!(wait_until(|| control.run_state() == RunState::Idle, 10).await);
    });

    // every Jamming is closed by exactly one teardown before the next one
    let mut open = false;
    for status in rig.status.entries() {
        match status {
            Status::Jamming { .. } => {
                assert!(!open, "two runs active at once");
                open = true;
            }
            Status::Cancelled => {
                assert!(open);
                open = false;
            }
            other => panic!("unexpected status {other:?}"),
        }
    }
    assert!(!open);
}

#[test]
fn preemption_timeout_counted_and_new_run_still_starts() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();

    run_with(&mut runner, async {
        control
            .start(JamMode::BluetoothSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| rig.a.channels().len() >= 2, 20).await);

        // a retune that never finishes keeps the old run from seeing the stop
        rig.a.stall(true);
        settle(2).await;
        control
            .start(JamMode::ZigbeeSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert_eq!(control.preemption_timeouts(), 1);
        assert_eq!(control.current_mode(), Some(JamMode::BluetoothSweep));
        assert_eq!(control.run_state(), RunState::StopRequested);

        rig.a.stall(false);
        assert!(wait_until(|| control.current_mode() == Some(JamMode::ZigbeeSweep), 10).await);
        control.stop();
        assert!(wait_until(|| !control.is_running(), 5).await);
    });

    assert_eq!(control.preemption_timeouts(), 1);
    assert!(rig.a.is_silenced());
}

// =============================================================================
// Fail-Stop Tests
// =============================================================================

#[test]
fn radio_b_lost_mid_run() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();
    rig.b.disappear_after(3);

    run_with(&mut runner, async {
        control
            .start(JamMode::BluetoothSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| control.last_outcome().is_some(), 20).await);
    });

    assert_eq!(control.last_outcome(), Some(RunEnd::RadioLost(RadioId::B)));
    assert_eq!(control.run_state(), RunState::Idle);
    assert!(!control.is_running());
    assert_eq!(rig.status.last(), Some(Status::RadioLost(RadioId::B)));

    assert_eq!(rig.a.channels().len(), 3);
    assert_eq!(rig.b.channels().len(), 3);
    // nothing but the teardown after the failed check
    let teardown = vec![RadioOp::StopCarrier, RadioOp::StopListening];
    assert_eq!(after_last_probe(&rig.a.ops()), teardown);
    assert_eq!(after_last_probe(&rig.b.ops()), teardown);
}

#[test]
fn radio_loss_does_not_stop_the_runner() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();
    rig.a.set_absent(true);

    run_with(&mut runner, async {
        control
            .start(JamMode::WifiSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| control.last_outcome().is_some(), 10).await);
        assert_eq!(control.last_outcome(), Some(RunEnd::RadioLost(RadioId::A)));
        assert!(rig.a.channels().is_empty());

        rig.a.reconnect();
        control
            .start(JamMode::WifiSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| rig.a.channels().len() >= 3, 20).await);
        control.stop();
        assert!(wait_until(|| !control.is_running(), 5).await);
    });

    assert_eq!(control.last_outcome(), Some(RunEnd::Stopped));
}

#[test]
fn radio_fault_ends_run() {
    let rig = Rig::new();
    let control = Control::default();
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();
    rig.b.fail_set_channel(true);

    run_with(&mut runner, async {
        control
            .start(JamMode::ZigbeeSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| control.last_outcome().is_some(), 10).await);
    });

    assert_eq!(control.last_outcome(), Some(RunEnd::RadioFault(RadioId::B)));
    assert_eq!(rig.status.last(), Some(Status::RadioFault(RadioId::B)));
    assert_eq!(rig.a.writes(), 0);
    assert!(rig.a.is_silenced());
    assert!(rig.b.is_silenced());
}

// =============================================================================
// Settings Tests
// =============================================================================

#[test]
fn run_uses_settings_snapshot() {
    let rig = Rig::new();
    let control = Control::new(JamSettings::DEFAULT.with_tx_power(TxPower::Low));
    let mut runner = rig.runner(&control);
    let mut delay = rig.delay();

    run_with(&mut runner, async {
        control
            .start(JamMode::BluetoothSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| control.is_running(), 10).await);

        control.update_settings(JamSettings::DEFAULT.with_tx_power(TxPower::High));
        settle(5).await;
        assert_eq!(rig.a.count(RadioOp::StartCarrier(TxPower::High, 45)), 0);

        control
            .start(JamMode::BluetoothSweep, JamParameters::None, &mut delay)
            .await
            .unwrap();
        assert!(wait_until(|| rig.a.count(RadioOp::StartCarrier(TxPower::High, 45)) == 1, 10).await);
        control.stop();
        assert!(wait_until(|| !control.is_running(), 5).await);
    });

    assert_eq!(rig.a.count(RadioOp::StartCarrier(TxPower::Low, 45)), 1);
    assert_eq!(control.settings().tx_power(), TxPower::High);
}
