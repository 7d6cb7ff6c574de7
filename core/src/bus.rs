//! Register-addressed bus access
//!
//! Thin typed layer over an async I2C controller for devices that expose a
//! flat map of 8-bit registers. Multi-byte reads auto-increment the register
//! pointer on the device, so `count` bytes come back in register order
//! (big-endian for multi-byte values). No retries happen here.

use embedded_hal_async::i2c::I2c;
use heapless::Vec;

use crate::error::BusError;

/// Largest single read, in bytes
///
/// Covers the 100-byte history block of the sound level sensor.
pub const MAX_TRANSFER: usize = 128;

/// Bytes returned by [`RegisterBus::read`]
pub type RegisterBytes = Vec<u8, MAX_TRANSFER>;

/// Register bus over an I2C controller
pub struct RegisterBus<I> {
    i2c: I,
}

impl<I: I2c> RegisterBus<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Write one byte to one register
    pub async fn write(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .write(address, &[register, value])
            .await
            .map_err(BusError::transport)
    }

    /// Read `count` bytes starting at `register`
    ///
    /// A zero count returns an empty result without touching the bus.
    pub async fn read(
        &mut self,
        address: u8,
        register: u8,
        count: usize,
    ) -> Result<RegisterBytes, BusError> {
        let mut data = RegisterBytes::new();
        if count < 1 {
            return Ok(data);
        }
        data.resize_default(count)
            .map_err(|_| BusError::Oversized { requested: count })?;

        self.i2c
            .write_read(address, &[register], &mut data)
            .await
            .map_err(BusError::transport)?;

        Ok(data)
    }

    /// Read a single register
    pub async fn read_u8(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(address, &[register], &mut value)
            .await
            .map_err(BusError::transport)?;
        Ok(value[0])
    }

    /// Release the underlying I2C controller
    pub fn release(self) -> I {
        self.i2c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SimSensor, SENSOR_ADDRESS};
    use embassy_futures::block_on;
    use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

    #[test]
    fn test_write_then_read_back() {
        let mut sim = SimSensor::new();
        let mut bus = RegisterBus::new(&mut sim);

        block_on(async {
            // Scratch register and the start of the history block are plain storage
            for (register, count) in [(0x05u8, 1usize), (0x14, 4), (0x20, 16), (0x14, 100)] {
                for offset in 0..count {
                    let value = (offset as u8).wrapping_mul(7).wrapping_add(register);
                    bus.write(SENSOR_ADDRESS, register + offset as u8, value)
                        .await
                        .unwrap();
                }
                let data = bus.read(SENSOR_ADDRESS, register, count).await.unwrap();
                assert_eq!(data.len(), count);
                for (offset, byte) in data.iter().enumerate() {
                    assert_eq!(*byte, (offset as u8).wrapping_mul(7).wrapping_add(register));
                }
            }
        });
    }

    #[test]
    fn test_multi_byte_read_is_big_endian() {
        let mut sim = SimSensor::new().with_identity(0x01, 0xAABB_CCDD);
        let mut bus = RegisterBus::new(&mut sim);

        let data = block_on(bus.read(SENSOR_ADDRESS, 0x01, 4)).unwrap();
        assert_eq!(u32::from_be_bytes([data[0], data[1], data[2], data[3]]), 0xAABB_CCDD);
    }

    #[test]
    fn test_zero_count_returns_empty() {
        let mut sim = SimSensor::new();
        sim.nack = true;
        let mut bus = RegisterBus::new(&mut sim);

        // No bus transaction happens, so even a dead device does not error
        let data = block_on(bus.read(SENSOR_ADDRESS, 0x00, 0)).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_oversized_read() {
        let mut sim = SimSensor::new();
        let mut bus = RegisterBus::new(&mut sim);

        let result = block_on(bus.read(SENSOR_ADDRESS, 0x00, MAX_TRANSFER + 1));
        assert_eq!(result, Err(BusError::Oversized { requested: MAX_TRANSFER + 1 }));
    }

    #[test]
    fn test_missing_device_is_transport_error() {
        let mut sim = SimSensor::new();
        let mut bus = RegisterBus::new(&mut sim);

        let result = block_on(bus.read_u8(0x49, 0x00));
        assert_eq!(
            result,
            Err(BusError::Transport(ErrorKind::NoAcknowledge(
                NoAcknowledgeSource::Address
            )))
        );
        let result = block_on(bus.write(0x49, 0x05, 0xFF));
        assert!(matches!(result, Err(BusError::Transport(_))));
    }
}
