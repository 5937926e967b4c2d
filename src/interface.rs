use crate::traits::CommandTransport;
use core::fmt::{Debug, Display, Formatter};
use embedded_hal::{
    delay::DelayNs,
    digital::OutputPin,
    spi::{Operation, SpiDevice},
};

/// Error of the [SpiInterface], one variant per line
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum InterfaceError<SPI, DC, RST> {
    /// Error on the SPI bus
    SpiError(SPI),
    /// Error driving the data/command pin
    DcError(DC),
    /// Error driving the reset pin
    RstError(RST),
}

impl<SPI: Debug, DC: Debug, RST: Debug> Debug for InterfaceError<SPI, DC, RST> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SpiError(e) => f.debug_tuple("SpiError").field(e).finish(),
            Self::DcError(e) => f.debug_tuple("DcError").field(e).finish(),
            Self::RstError(e) => f.debug_tuple("RstError").field(e).finish(),
        }
    }
}

impl<SPI: Debug, DC: Debug, RST: Debug> Display for InterfaceError<SPI, DC, RST> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SpiError(e) => write!(f, "SPI error: {e:?}"),
            Self::DcError(e) => write!(f, "DC pin error: {e:?}"),
            Self::RstError(e) => write!(f, "RST pin error: {e:?}"),
        }
    }
}

impl<SPI: Debug, DC: Debug, RST: Debug> core::error::Error for InterfaceError<SPI, DC, RST> {}

type SpiResult<SPI, DC, RST> = Result<
    (),
    InterfaceError<
        <SPI as embedded_hal::spi::ErrorType>::Error,
        <DC as embedded_hal::digital::ErrorType>::Error,
        <RST as embedded_hal::digital::ErrorType>::Error,
    >,
>;

/// Command channel over a 4-wire SPI link
///
/// The register address goes out with DC low, its parameters with DC high.
/// Every write goes straight to the bus, so [flush](CommandTransport::flush)
/// has nothing left to do.
pub struct SpiInterface<SPI, DC, RST> {
    spi: SPI,
    /// Data/Command Control Pin (High for data, Low for command)
    dc: DC,
    /// Pin for Resetting
    rst: RST,
}

impl<SPI, DC, RST> SpiInterface<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    /// Creates a new `SpiInterface`
    pub fn new(spi: SPI, dc: DC, rst: RST) -> Self {
        SpiInterface { spi, dc, rst }
    }

    /// Gives the bus and pins back
    pub fn release(self) -> (SPI, DC, RST) {
        (self.spi, self.dc, self.rst)
    }

    fn command(&mut self, address: u8) -> SpiResult<SPI, DC, RST> {
        // low for commands
        self.dc.set_low().map_err(InterfaceError::DcError)?;
        self.spi_write(&[address])
    }

    fn data(&mut self, data: &[u8]) -> SpiResult<SPI, DC, RST> {
        // high for data
        self.dc.set_high().map_err(InterfaceError::DcError)?;
        self.spi_write(data)
    }

    // spi write helper/abstraction function
    fn spi_write(&mut self, data: &[u8]) -> SpiResult<SPI, DC, RST> {
        // Linux has a default limit of 4096 bytes per spi transfer
        if cfg!(target_os = "linux") {
            for data_chunk in data.chunks(4096) {
                self.spi.write(data_chunk).map_err(InterfaceError::SpiError)?;
            }
            Ok(())
        } else {
            self.spi.write(data).map_err(InterfaceError::SpiError)
        }
    }
}

impl<SPI, DC, RST> CommandTransport for SpiInterface<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    type Error = InterfaceError<SPI::Error, DC::Error, RST::Error>;

    fn write(&mut self, packet: &[u8]) -> Result<(), Self::Error> {
        let Some((&address, params)) = packet.split_first() else {
            return Ok(());
        };
        self.command(address)?;
        if !params.is_empty() {
            self.data(params)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.command(register)?;
        self.dc.set_high().map_err(InterfaceError::DcError)?;
        let len = buf.len();
        self.spi
            .transaction(&mut [Operation::Read(buf)])
            .map_err(InterfaceError::SpiError)?;
        Ok(len)
    }

    /// Pulses the reset line: high 1ms, low 1ms, high and 5ms to settle
    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        self.rst.set_high().map_err(InterfaceError::RstError)?;
        delay.delay_ms(1);
        self.rst.set_low().map_err(InterfaceError::RstError)?;
        delay.delay_ms(1);
        self.rst.set_high().map_err(InterfaceError::RstError)?;
        delay.delay_ms(5);
        Ok(())
    }
}
