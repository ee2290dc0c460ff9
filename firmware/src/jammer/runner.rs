//! Jammer Runner
//!
//! The single execution context that owns both radios. It waits for
//! commands from [`RunControl`], runs one jam at a time to completion and
//! always silences the radios before going idle again.
//!
//! One hop:
//!
//! ```text
//!   stop flag? ──yes──▶ teardown
//!       │ no
//!   probe radios ──absent──▶ teardown (radio lost)
//!       │
//!   next pair ──none──▶ teardown (exhausted)
//!       │
//!   retune A/B, write payload (packet modes)
//!       │
//!   yield HOP_YIELD_MS
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use rand_core::RngCore;

use super::control::{Command, RunControl, RunEnd, RunRequest};
use super::driver::DualRadioDriver;
use super::sequencer::{emission_for, HopPlan, Sequencer};
use crate::config::{FILLER_PAYLOAD, HOP_YIELD_MS, RADIO_SETTLE_MS};
use crate::hal::clock::Clock;
use crate::hal::radio::Radio;
use crate::status::{Status, StatusSink};
use crate::types::Emission;

/// Owner of the radios and executor of jam runs
pub struct JammerRunner<'a, M, R, D, C, S, G>
where
    M: RawMutex,
{
    control: &'a RunControl<M>,
    driver: DualRadioDriver<R>,
    delay: D,
    clock: C,
    status: S,
    rng: G,
}

impl<'a, M, R, D, C, S, G> JammerRunner<'a, M, R, D, C, S, G>
where
    M: RawMutex,
    R: Radio,
    D: DelayNs,
    C: Clock,
    S: StatusSink,
    G: RngCore,
{
    /// Create the runner; radios must already be configured
    pub const fn new(
        control: &'a RunControl<M>,
        driver: DualRadioDriver<R>,
        delay: D,
        clock: C,
        status: S,
        rng: G,
    ) -> Self {
        Self {
            control,
            driver,
            delay,
            clock,
            status,
            rng,
        }
    }

    /// The radios
    pub const fn driver(&self) -> &DualRadioDriver<R> {
        &self.driver
    }

    /// Process commands forever
    pub async fn run(&mut self) -> ! {
        info!("jammer runner started");
        loop {
            let command = self.control.next_command().await;
            self.handle(command).await;
        }
    }

    /// Process one command to completion
    pub async fn handle(&mut self, command: Command) {
        match command {
            Command::Start(request) => self.execute(request).await,
            Command::Sleep => self.sleep().await,
        }
    }

    async fn execute(&mut self, request: RunRequest) {
        let Some(wake) = self.control.begin_run(&request, self.clock.now_ms()) else {
            return;
        };
        info!("run {} started: {:?}", request.id, request.target);

        let end = self.jam(&request, wake).await;

        // teardown runs for every exit path
        self.control.signal_stop();
        self.control.mark_stopping();
        self.driver.silence_all().await;
        self.status.show(match end {
            RunEnd::Stopped | RunEnd::Exhausted => Status::Cancelled,
            RunEnd::RadioLost(radio) => Status::RadioLost(radio),
            RunEnd::RadioFault(radio) => Status::RadioFault(radio),
        });
        self.control.finish_run(end);
        info!("run {} ended: {:?}", request.id, end);
    }

    async fn jam(&mut self, request: &RunRequest, wake: bool) -> RunEnd {
        if wake {
            self.status.show(Status::Waking);
            if let Err(e) = self.driver.power_up_all().await {
                error!("radio {} failed to wake", e.radio.index());
                self.control.mark_sleeping();
                return RunEnd::RadioFault(e.radio);
            }
            self.delay.delay_ms(RADIO_SETTLE_MS).await;
        }

        let settings = request.settings;
        let plan = HopPlan::for_target(request.target, &settings);
        let emission = emission_for(request.target, &settings);
        let power = settings.tx_power();
        let mut sequencer = Sequencer::new(plan, settings.mirror());
        debug!(
            "plan {:?}, emission {:?}, mirror {:?}",
            plan,
            emission,
            settings.mirror()
        );

        self.status.show(Status::Jamming {
            mode: request.target.mode(),
            power,
        });

        if emission == Emission::Carrier {
            if let Err(e) = self.driver.begin_carrier(power).await {
                error!("radio {} refused carrier", e.radio.index());
                return RunEnd::RadioFault(e.radio);
            }
        }

        while !self.control.stop_requested() {
            if let Err(radio) = self.driver.probe().await.check() {
                error!("radio {} disconnected, stopping run", radio.index());
                return RunEnd::RadioLost(radio);
            }
            let Some(pair) = sequencer.next_pair(&mut self.rng) else {
                warn!("plan {:?} has nothing to sweep", plan);
                return RunEnd::Exhausted;
            };
            trace!("hop {:?}", pair);
            if let Err(e) = self.driver.apply_channel(pair).await {
                error!("radio {} failed to retune", e.radio.index());
                return RunEnd::RadioFault(e.radio);
            }
            if emission == Emission::Payload {
                if let Err(e) = self.driver.write_payload(&FILLER_PAYLOAD).await {
                    error!("radio {} failed to transmit", e.radio.index());
                    return RunEnd::RadioFault(e.radio);
                }
            }
            self.control.note_activity(self.clock.now_ms());
            self.delay.delay_ms(HOP_YIELD_MS).await;
        }
        RunEnd::Stopped
    }

    async fn sleep(&mut self) {
        if !self.control.sleep_confirmed() {
            debug!("sleep superseded by a new run");
            return;
        }
        if let Err(e) = self.driver.power_down_all().await {
            warn!("radio {} failed to power down", e.radio.index());
        }
        self.status.show(Status::Sleeping);
        info!("radios sleeping");
    }
}
