use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

/// All commands need to have this trait which gives the register address of the command.
///
/// The address is the first byte of every packet sent over the command channel.
pub(crate) trait Command: Copy {
    fn address(self) -> u8;
}

/// The command channel between host and panel controller
///
/// Writes may be buffered by the implementation but must keep issue order up to
/// the next [flush](CommandTransport::flush). Every packet starts with the register
/// address followed by its parameters.
pub trait CommandTransport {
    /// Error type of the underlying bus
    type Error: Debug;

    /// Queue one packet (address + parameters)
    fn write(&mut self, packet: &[u8]) -> Result<(), Self::Error>;

    /// Push everything queued so far out to the panel
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Queue one packet and flush right away
    fn write_and_flush(&mut self, packet: &[u8]) -> Result<(), Self::Error> {
        self.write(packet)?;
        self.flush()
    }

    /// Read `buf.len()` bytes from `register`
    ///
    /// Returns the number of bytes actually read. Anything short of `buf.len()`
    /// is a short read and must be treated as a failure by the caller.
    fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Hardware reset of the panel
    ///
    /// Transports without a reset line can keep the default, which does nothing.
    fn reset<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: CommandTransport> CommandTransport for &mut T {
    type Error = T::Error;

    fn write(&mut self, packet: &[u8]) -> Result<(), Self::Error> {
        T::write(self, packet)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        T::flush(self)
    }

    fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        T::read(self, register, buf)
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        T::reset(self, delay)
    }
}

/// Vertical blank / tearing effect signal of the display pipeline
pub trait VblankSource {
    /// Error type, returned when no vblank signal is available right now
    type Error: Debug;

    /// Block until the next vertical blank
    ///
    /// Implementations must time out on their own, this is never expected to hang.
    fn wait_for_next_vblank(&mut self) -> Result<(), Self::Error>;

    /// Monotonic timestamp in microseconds
    fn now_us(&mut self) -> u64;
}

/// Ambient temperature next to the panel
pub trait TemperatureSensor {
    /// Error type of a failed read
    type Error: Debug;

    /// Temperature in millidegrees Celsius
    fn read_millidegrees(&mut self) -> Result<i32, Self::Error>;
}

/// Stand-in for panels without a temperature sensor
///
/// Every read fails, so thermal compensation never writes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemperatureSensor;

impl TemperatureSensor for NoTemperatureSensor {
    type Error = ();

    fn read_millidegrees(&mut self) -> Result<i32, Self::Error> {
        Err(())
    }
}
