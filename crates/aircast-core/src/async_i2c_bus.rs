//! Async I2C bus sharing
//!
//! Several drivers can sit on one I2C peripheral. Each gets its own
//! [`AsyncI2cDevice`] handle; a transfer holds an embassy async mutex on the
//! bus for its whole duration, so transfers from different drivers never
//! interleave and waiting drivers yield to the executor instead of spinning.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

/// Handle to a bus shared through an embassy [`Mutex`].
///
/// ```rust,ignore
/// static I2C_BUS: StaticCell<Mutex<CriticalSectionRawMutex, I2c<'static, Async>>> = StaticCell::new();
/// let bus = I2C_BUS.init(Mutex::new(i2c));
///
/// let sensor = Scd30::new(AsyncI2cDevice::new(bus), embassy_time::Delay);
/// ```
pub struct AsyncI2cDevice<'a, M: RawMutex, T> {
    bus: &'a Mutex<M, T>,
}

impl<'a, M: RawMutex, T> AsyncI2cDevice<'a, M, T> {
    #[inline]
    pub const fn new(bus: &'a Mutex<M, T>) -> Self {
        Self { bus }
    }
}

impl<M: RawMutex, T: ErrorType> ErrorType for AsyncI2cDevice<'_, M, T> {
    type Error = T::Error;
}

impl<M: RawMutex, T: I2c> I2c for AsyncI2cDevice<'_, M, T> {
    #[inline]
    async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.lock().await.read(address, read).await
    }

    #[inline]
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.bus.lock().await.write(address, write).await
    }

    #[inline]
    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.write_read(address, write, read).await
    }

    /// The bus stays locked for the whole transaction.
    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.transaction(address, operations).await
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_hal_async::i2c::ErrorKind;

    /// Bus that logs `(address, bytes)` for every write and echoes the
    /// address into reads.
    #[derive(Default)]
    struct LoggingBus {
        log: Vec<(u8, Vec<u8>)>,
    }

    impl ErrorType for LoggingBus {
        type Error = ErrorKind;
    }

    impl I2c for LoggingBus {
        async fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), ErrorKind> {
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.log.push((address, bytes.to_vec())),
                    Operation::Read(buf) => buf.fill(address),
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_devices_share_one_bus() {
        let bus = Mutex::<NoopRawMutex, _>::new(LoggingBus::default());
        let mut sensor = AsyncI2cDevice::new(&bus);
        let mut expander = AsyncI2cDevice::new(&bus);

        block_on(async {
            sensor.write(0x61, &[0x02, 0x02]).await.unwrap();
            expander.write(0x58, &[0x01]).await.unwrap();

            let mut buf = [0u8; 3];
            sensor.write_read(0x61, &[0x03, 0x00], &mut buf).await.unwrap();
            assert_eq!(buf, [0x61; 3]);
        });

        let bus = bus.try_lock().unwrap();
        assert_eq!(
            bus.log.as_slice(),
            [
                (0x61, std::vec![0x02, 0x02]),
                (0x58, std::vec![0x01]),
                (0x61, std::vec![0x03, 0x00]),
            ]
        );
    }
}
