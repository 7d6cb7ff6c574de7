//! Simulated collaborators for unit tests

use std::collections::VecDeque;
use std::convert::Infallible;
use std::string::String as StdString;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use hal_abstractions::{
    Header, HttpClient, HttpError, HttpResponse, LinkStatus, NetworkLink, WallClock,
};

use crate::sensor::{registers, DEVICE_ADDRESS, RESET_MIN_MAX};

pub(crate) const SENSOR_ADDRESS: u8 = DEVICE_ADDRESS;

/// Register file behaving like the decibel meter
///
/// Writing the reset pattern collapses min/max onto the current level.
pub(crate) struct SimSensor {
    regs: [u8; 256],
    pointer: u8,
    /// Levels the device reaches by the end of the interval after the next reset
    next_interval: Option<(u8, u8, u8)>,
    pub(crate) nack: bool,
    pub(crate) resets: usize,
}

impl SimSensor {
    pub(crate) fn new() -> Self {
        Self {
            regs: [0; 256],
            pointer: 0,
            next_interval: None,
            nack: false,
            resets: 0,
        }
    }

    pub(crate) fn with_identity(mut self, version: u8, unique_id: u32) -> Self {
        self.regs[registers::VERSION as usize] = version;
        let id = unique_id.to_be_bytes();
        self.regs[registers::ID3 as usize..=registers::ID0 as usize].copy_from_slice(&id);
        self
    }

    pub(crate) fn with_window(mut self, high: u8, low: u8) -> Self {
        self.regs[registers::TAVG_HIGH as usize] = high;
        self.regs[registers::TAVG_LOW as usize] = low;
        self
    }

    pub(crate) fn with_levels(mut self, current: u8, min: u8, max: u8) -> Self {
        self.set_levels(current, min, max);
        self
    }

    pub(crate) fn set_levels(&mut self, current: u8, min: u8, max: u8) {
        self.regs[registers::DECIBEL as usize] = current;
        self.regs[registers::MIN as usize] = min;
        self.regs[registers::MAX as usize] = max;
    }

    /// Once the next reset has happened, report these levels
    pub(crate) fn queue_interval(&mut self, current: u8, min: u8, max: u8) {
        self.next_interval = Some((current, min, max));
    }

    pub(crate) fn register(&self, register: u8) -> u8 {
        self.regs[register as usize]
    }

    pub(crate) fn set_register(&mut self, register: u8, value: u8) {
        self.regs[register as usize] = value;
    }

    fn store(&mut self, register: u8, value: u8) {
        self.regs[register as usize] = value;
        if register == registers::RESET && value & RESET_MIN_MAX != 0 {
            let current = self.regs[registers::DECIBEL as usize];
            self.regs[registers::MIN as usize] = current;
            self.regs[registers::MAX as usize] = current;
            self.resets += 1;
            if let Some((current, min, max)) = self.next_interval.take() {
                self.set_levels(current, min, max);
            }
        }
    }
}

impl ErrorType for SimSensor {
    type Error = ErrorKind;
}

impl I2c for SimSensor {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.nack || address != SENSOR_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if let Some((register, values)) = bytes.split_first() {
                        self.pointer = *register;
                        for value in values {
                            self.store(self.pointer, *value);
                            self.pointer = self.pointer.wrapping_add(1);
                        }
                    }
                }
                Operation::Read(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = self.regs[self.pointer as usize];
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Link whose status follows a script; the last entry repeats
pub(crate) struct ScriptedLink {
    script: Vec<LinkStatus>,
    pub(crate) polls: usize,
    pub(crate) refuse_join: bool,
    pub(crate) joined: Option<(StdString, StdString)>,
}

impl ScriptedLink {
    pub(crate) fn new(script: &[LinkStatus]) -> Self {
        Self {
            script: script.to_vec(),
            polls: 0,
            refuse_join: false,
            joined: None,
        }
    }

    pub(crate) fn up() -> Self {
        Self::new(&[LinkStatus::Joining, LinkStatus::NoIp, LinkStatus::Up])
    }
}

impl NetworkLink for ScriptedLink {
    type Error = ();

    async fn join(&mut self, network_name: &str, passphrase: &str) -> Result<(), ()> {
        if self.refuse_join {
            return Err(());
        }
        self.joined = Some((network_name.into(), passphrase.into()));
        Ok(())
    }

    fn status(&mut self) -> LinkStatus {
        let index = self.polls.min(self.script.len().saturating_sub(1));
        self.polls += 1;
        self.script.get(index).copied().unwrap_or(LinkStatus::Idle)
    }
}

/// A request seen by [`ScriptedHttp`]
#[derive(Debug, Clone)]
pub(crate) struct SentRequest {
    pub(crate) url: StdString,
    pub(crate) headers: Vec<(StdString, StdString)>,
    pub(crate) body: StdString,
}

impl SentRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP client replaying queued results; answers `NoResponse` once drained
pub(crate) struct ScriptedHttp {
    replies: VecDeque<Result<HttpResponse, HttpError>>,
    pub(crate) requests: Vec<SentRequest>,
}

impl ScriptedHttp {
    pub(crate) fn new() -> Self {
        Self {
            replies: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    pub(crate) fn reply(mut self, status: u16, body: &str) -> Self {
        self.replies.push_back(Ok(response(status, body)));
        self
    }

    pub(crate) fn fail(mut self, err: HttpError) -> Self {
        self.replies.push_back(Err(err));
        self
    }
}

impl HttpClient for ScriptedHttp {
    async fn post(
        &mut self,
        url: &str,
        headers: &[Header<'_>],
        body: &[u8],
    ) -> Result<HttpResponse, HttpError> {
        self.requests.push(SentRequest {
            url: url.into(),
            headers: headers
                .iter()
                .map(|h| (h.name.into(), h.value.into()))
                .collect(),
            body: StdString::from_utf8_lossy(body).into_owned(),
        });
        self.replies.pop_front().unwrap_or(Err(HttpError::NoResponse))
    }
}

pub(crate) fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        body: heapless::String::try_from(body).unwrap(),
    }
}

pub(crate) fn partial(reason: &str, body: &str) -> HttpError {
    HttpError::Partial {
        reason: heapless::String::try_from(reason).unwrap(),
        body: heapless::String::try_from(body).unwrap(),
    }
}

/// Clock stuck at a fixed instant
pub(crate) struct FixedClock(pub(crate) u64);

impl WallClock for FixedClock {
    fn unix_secs(&mut self) -> u64 {
        self.0
    }
}

/// Output pin counting rising edges
#[derive(Default)]
pub(crate) struct RecordingPin {
    pub(crate) high: bool,
    pub(crate) pulses: usize,
}

impl PinErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.high {
            self.pulses += 1;
        }
        self.high = true;
        Ok(())
    }
}

/// Delay that returns immediately and records what was asked for
#[derive(Default)]
pub(crate) struct RecordingDelay {
    pub(crate) total_ns: u64,
    pub(crate) millis: Vec<u32>,
}

impl RecordingDelay {
    pub(crate) fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }

    async fn delay_us(&mut self, us: u32) {
        self.total_ns += u64::from(us) * 1_000;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
        self.millis.push(ms);
    }
}

/// In-memory log sink that tracks flushes
#[derive(Default)]
pub(crate) struct MemorySink {
    pub(crate) data: Vec<u8>,
    pub(crate) flushes: usize,
    /// Bytes written since the last flush
    pub(crate) pending: usize,
    pub(crate) broken: bool,
}

impl MemorySink {
    pub(crate) fn text(&self) -> StdString {
        StdString::from_utf8(self.data.clone()).unwrap()
    }

    pub(crate) fn lines(&self) -> Vec<StdString> {
        self.text().lines().map(StdString::from).collect()
    }

    /// Message part of each line, timestamp stripped
    pub(crate) fn messages(&self) -> Vec<StdString> {
        self.lines()
            .iter()
            .map(|line| line.get(20..).unwrap_or("").into())
            .collect()
    }

    pub(crate) fn contains(&self, message: &str) -> bool {
        self.messages().iter().any(|m| m == message)
    }
}

impl embedded_io_async::ErrorType for MemorySink {
    type Error = embedded_io_async::ErrorKind;
}

impl embedded_io_async::Write for MemorySink {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.broken {
            return Err(embedded_io_async::ErrorKind::Other);
        }
        self.data.extend_from_slice(buf);
        self.pending += buf.len();
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        if self.broken {
            return Err(embedded_io_async::ErrorKind::Other);
        }
        self.flushes += 1;
        self.pending = 0;
        Ok(())
    }
}
