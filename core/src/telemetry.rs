//! Telemetry loop
//!
//! Startup brings up the sensor, network and cloud session once; after that
//! every reporting cycle is sleep, read, publish, reset, pulse. Only startup
//! failures are fatal. A failed read or publish is logged and the next
//! cycle starts on schedule with a fresh min/max window.

use alloc::vec::Vec;

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use embedded_io_async::Write;
use hal_abstractions::{HttpClient, NetworkLink, WallClock};

use crate::cloud::{CloudSession, Credential, PublishOutcome};
use crate::config::Config;
use crate::connectivity::{ConnectionState, ConnectivityManager, NetworkCredentials};
use crate::error::{PublishError, StartupError};
use crate::event_log::EventLog;
use crate::heartbeat::{Heartbeat, CYCLE_PULSE_MS, STARTUP_PULSE_MS};
use crate::reading::Reading;
use crate::sensor::SensorDevice;

/// Board resources handed to the telemetry loop
///
/// Built once by the board; the loop owns everything in it.
pub struct Peripherals<I, L, H, W, C, P, D> {
    /// I2C controller the sound level sensor is attached to
    pub i2c: I,
    pub link: L,
    pub http: H,
    /// Append-mode handle of the event log file
    pub log_sink: W,
    pub clock: C,
    /// Liveness LED
    pub led: P,
    pub delay: D,
}

/// What happened in one reporting cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// `None` if the sensor could not be read
    pub reading: Option<Reading>,
    /// `None` if nothing was published
    pub outcome: Option<PublishOutcome>,
    pub reset_ok: bool,
}

pub struct TelemetryLoop<I, L, H, W, C, P, D> {
    config: Config,
    sensor: SensorDevice<I>,
    network: ConnectivityManager<L>,
    cloud: CloudSession<H>,
    log: EventLog<W, C>,
    heartbeat: Heartbeat<P>,
    delay: D,
    credential: Credential,
}

impl<I, L, H, W, C, P, D> TelemetryLoop<I, L, H, W, C, P, D>
where
    I: I2c,
    L: NetworkLink,
    H: HttpClient,
    W: Write,
    C: WallClock,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(config: Config, peripherals: Peripherals<I, L, H, W, C, P, D>) -> Self {
        let cloud = CloudSession::new(peripherals.http, &config);
        let log = EventLog::open(peripherals.log_sink, peripherals.clock, config.utc_offset_secs);
        Self {
            sensor: SensorDevice::new(peripherals.i2c),
            network: ConnectivityManager::new(peripherals.link),
            cloud,
            log,
            heartbeat: Heartbeat::new(peripherals.led),
            delay: peripherals.delay,
            credential: Credential::default(),
            config,
        }
    }

    /// Startup sequence
    ///
    /// Sensor problems are logged and tolerated. Invalid configuration, a
    /// network that never comes up, or a failed token request end startup
    /// with an error; the board is expected to halt on it.
    pub async fn start(&mut self) -> Result<(), StartupError> {
        if let Err(e) = self.config.validate() {
            self.log
                .record(format_args!("invalid configuration: {}", e))
                .await;
            return Err(e.into());
        }

        self.check_sensor().await;

        self.log.record(format_args!("STARTUP")).await;

        let credentials = NetworkCredentials {
            network_name: &self.config.network_name,
            passphrase: &self.config.network_passphrase,
        };
        if let Err(e) = self
            .network
            .connect(
                credentials,
                self.config.max_connect_attempts,
                self.config.connect_poll_interval_ms,
                &mut self.delay,
            )
            .await
        {
            self.log
                .record(format_args!("could not connect to network: {}", e))
                .await;
            return Err(e.into());
        }
        info!("connected");

        self.heartbeat.pulse(&mut self.delay, STARTUP_PULSE_MS).await;

        let auth = match self.cloud.authenticate(&self.config.api_key).await {
            Ok(auth) => auth,
            Err(e) => {
                self.log
                    .record(format_args!("authentication failed: {}", e))
                    .await;
                return Err(e.into());
            }
        };

        self.log
            .record(format_args!("auth response: {}", auth.raw_text))
            .await;
        if auth.credential.is_empty() {
            // Publishing continues; every request will be rejected until reboot
            warn!("Telemetry token is empty");
            self.log.record(format_args!("TOKEN IS EMPTY")).await;
        } else {
            self.log.record(format_args!("token acquired")).await;
        }
        self.credential = auth.credential;

        Ok(())
    }

    /// Identity, averaging window and initial min/max reset
    async fn check_sensor(&mut self) {
        match self.sensor.identity().await {
            Ok(identity) => {
                self.log
                    .record(format_args!("dbMeter VERSION = 0x{:02x}", identity.version))
                    .await;
                self.log
                    .record(format_args!("Unique ID: 0x{:08x}", identity.unique_id))
                    .await;
            }
            Err(e) => {
                self.log
                    .record(format_args!("sensor identity read failed: {}", e))
                    .await
            }
        }

        match self.sensor.control().await {
            Ok(control) => {
                self.log
                    .record(format_args!("Control = 0b{:08b}", control))
                    .await
            }
            Err(e) => {
                self.log
                    .record(format_args!("control register read failed: {}", e))
                    .await
            }
        }

        let expected = self.config.expected_averaging_window_ms;
        match self.sensor.averaging_window_millis().await {
            Ok(window) if window == expected => {
                self.log.record(format_args!("T avg = {}ms", window)).await;
            }
            Ok(window) => {
                let [high, low] = window.to_be_bytes();
                warn!("Averaging window is {} ms, expected {} ms", window, expected);
                self.log
                    .record(format_args!("Tavg high = 0x{:02x}", high))
                    .await;
                self.log.record(format_args!("Tavg low = 0x{:02x}", low)).await;
                if self.config.enforce_averaging_window {
                    match self.sensor.set_averaging_window_millis(expected).await {
                        Ok(()) => {
                            self.log
                                .record(format_args!("T avg set to {}ms", expected))
                                .await
                        }
                        Err(e) => {
                            self.log
                                .record(format_args!("T avg write failed: {}", e))
                                .await
                        }
                    }
                }
            }
            Err(e) => {
                self.log
                    .record(format_args!("averaging window read failed: {}", e))
                    .await
            }
        }

        if let Err(e) = self.sensor.reset_min_max().await {
            self.log
                .record(format_args!("min/max reset failed: {}", e))
                .await;
        }
    }

    /// One reporting cycle: sleep, read, publish, reset, pulse
    ///
    /// Never fails. The min/max reset runs whatever happened to the read or
    /// publish, so a lost interval is not folded into the next one.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.delay
            .delay_ms(self.config.reporting_interval_ms())
            .await;

        let reading = match self.sensor.current_reading().await {
            Ok(reading) => {
                info!("{}", reading);
                Some(reading)
            }
            Err(e) => {
                self.log
                    .record(format_args!("sensor read failed: {}", e))
                    .await;
                None
            }
        };

        let outcome = match reading {
            Some(ref reading) => {
                let outcome = self.cloud.publish(&self.credential, reading).await;
                log_outcome(&mut self.log, &outcome).await;
                Some(outcome)
            }
            None => None,
        };

        let reset_ok = match self.sensor.reset_min_max().await {
            Ok(()) => true,
            Err(e) => {
                self.log
                    .record(format_args!("min/max reset failed: {}", e))
                    .await;
                false
            }
        };

        self.heartbeat.pulse(&mut self.delay, CYCLE_PULSE_MS).await;

        CycleReport {
            reading,
            outcome,
            reset_ok,
        }
    }

    /// Run a fixed number of cycles
    pub async fn run_cycles(&mut self, cycles: usize) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(cycles);
        for _ in 0..cycles {
            reports.push(self.run_cycle().await);
        }
        reports
    }

    /// Run reporting cycles forever
    pub async fn run(&mut self) -> ! {
        loop {
            self.run_cycle().await;
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.network.state()
    }

    /// True while the network link established at startup is still up
    pub fn is_online(&mut self) -> bool {
        self.network.is_ready()
    }

    /// Heartbeat pulses emitted since construction
    pub fn pulses(&self) -> u32 {
        self.heartbeat.pulses()
    }
}

async fn log_outcome<W: Write, C: WallClock>(log: &mut EventLog<W, C>, outcome: &PublishOutcome) {
    if let Some(PublishError::Degraded { reason, body }) = &outcome.error {
        log.record(format_args!("non-fatal request error: {} / {}", reason, body))
            .await;
    }

    let context = outcome.context();
    log.record(format_args!("publish response: {}", context))
        .await;

    if !outcome.success {
        if context.is_empty() {
            log.record(format_args!("unexpected status (no other info)"))
                .await;
        } else {
            log.record(format_args!("unexpected status: {}", context))
                .await;
        }
    }
}
