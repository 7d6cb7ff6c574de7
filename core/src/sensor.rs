//! Sound level sensor on the register bus
//!
//! PCB Artists I2C decibel meter: fixed 7-bit address, one byte per register.
//! The device keeps a running min/max since the last reset, which the
//! telemetry loop clears once per reporting interval.

use embedded_hal_async::i2c::I2c;

use crate::bus::RegisterBus;
use crate::error::BusError;
use crate::reading::Reading;

/// Fixed 7-bit bus address of the sensor
pub const DEVICE_ADDRESS: u8 = 0x48;

/// Register map
pub mod registers {
    pub const VERSION: u8 = 0x00;
    /// First of four unique ID bytes, most significant first
    pub const ID3: u8 = 0x01;
    pub const ID2: u8 = 0x02;
    pub const ID1: u8 = 0x03;
    pub const ID0: u8 = 0x04;
    pub const SCRATCH: u8 = 0x05;
    pub const CONTROL: u8 = 0x06;
    /// Averaging window in milliseconds, high byte
    pub const TAVG_HIGH: u8 = 0x07;
    pub const TAVG_LOW: u8 = 0x08;
    pub const RESET: u8 = 0x09;
    pub const DECIBEL: u8 = 0x0A;
    pub const MIN: u8 = 0x0B;
    pub const MAX: u8 = 0x0C;
    pub const THR_MIN: u8 = 0x0D;
    pub const THR_MAX: u8 = 0x0E;
    /// Oldest..newest history samples, 100 registers
    pub const HISTORY_0: u8 = 0x14;
    pub const HISTORY_99: u8 = 0x77;
}

/// Value written to [`registers::RESET`] to clear min/max
pub const RESET_MIN_MAX: u8 = 0b0000_0010;

/// Firmware version and factory unique ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identity {
    pub version: u8,
    pub unique_id: u32,
}

/// Sound level sensor
pub struct SensorDevice<I> {
    bus: RegisterBus<I>,
    address: u8,
}

impl<I: I2c> SensorDevice<I> {
    /// Sensor at the default address
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, DEVICE_ADDRESS)
    }

    pub fn with_address(i2c: I, address: u8) -> Self {
        Self {
            bus: RegisterBus::new(i2c),
            address,
        }
    }

    /// Read version and unique ID (startup diagnostics)
    pub async fn identity(&mut self) -> Result<Identity, BusError> {
        let version = self.bus.read_u8(self.address, registers::VERSION).await?;
        let id = self.bus.read(self.address, registers::ID3, 4).await?;
        let unique_id = id.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
        Ok(Identity { version, unique_id })
    }

    /// Control register, for diagnostics
    pub async fn control(&mut self) -> Result<u8, BusError> {
        self.bus.read_u8(self.address, registers::CONTROL).await
    }

    /// Averaging window in milliseconds
    ///
    /// High and low bytes are separate single-register reads.
    pub async fn averaging_window_millis(&mut self) -> Result<u16, BusError> {
        let high = self.bus.read_u8(self.address, registers::TAVG_HIGH).await?;
        let low = self.bus.read_u8(self.address, registers::TAVG_LOW).await?;
        Ok(u16::from_be_bytes([high, low]))
    }

    /// Program the averaging window, high byte first
    pub async fn set_averaging_window_millis(&mut self, millis: u16) -> Result<(), BusError> {
        let [high, low] = millis.to_be_bytes();
        self.bus.write(self.address, registers::TAVG_HIGH, high).await?;
        self.bus.write(self.address, registers::TAVG_LOW, low).await
    }

    /// Current, minimum and maximum level since the last reset
    pub async fn current_reading(&mut self) -> Result<Reading, BusError> {
        let current = self.bus.read_u8(self.address, registers::DECIBEL).await?;
        let min = self.bus.read_u8(self.address, registers::MIN).await?;
        let max = self.bus.read_u8(self.address, registers::MAX).await?;
        Ok(Reading::new(current, min, max))
    }

    /// Clear the device's min/max tracking
    pub async fn reset_min_max(&mut self) -> Result<(), BusError> {
        self.bus
            .write(self.address, registers::RESET, RESET_MIN_MAX)
            .await
    }

    /// Release the underlying I2C controller
    pub fn release(self) -> I {
        self.bus.release()
    }
}
