//! Liveness indicator
//!
//! A short LED pulse per loop iteration, independent of whether data got
//! through. Delivery success is only visible in the event log.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

/// Pulse after the network comes up at startup
pub const STARTUP_PULSE_MS: u32 = 100;

/// Pulse at the end of every reporting cycle
pub const CYCLE_PULSE_MS: u32 = 1000;

pub struct Heartbeat<P> {
    pin: P,
    pulses: u32,
}

impl<P: OutputPin> Heartbeat<P> {
    /// Take the pin and drive it low
    pub fn new(mut pin: P) -> Self {
        if pin.set_low().is_err() {
            warn!("Liveness indicator unavailable");
        }
        Self { pin, pulses: 0 }
    }

    /// Drive the indicator high for `duration_ms`
    pub async fn pulse<D: DelayNs>(&mut self, delay: &mut D, duration_ms: u32) {
        if self.pin.set_high().is_err() {
            warn!("Liveness indicator unavailable");
        }
        delay.delay_ms(duration_ms).await;
        if self.pin.set_low().is_err() {
            warn!("Liveness indicator unavailable");
        }
        self.pulses = self.pulses.wrapping_add(1);
    }

    /// Pulses emitted so far
    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    pub fn release(self) -> P {
        self.pin
    }
}
