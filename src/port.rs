//! serialport-backed transport for the MK3-USB adapter.
//!
//! [`open`] applies the fixed Winmon line settings and returns a wrapper that
//! satisfies the [`embedded_io`] bounds of [`Multi`](crate::multi::Multi).

use std::io;
use std::time::Duration;

use serialport::SerialPort;

/// The MK3-USB talks Winmon at a fixed 2400 baud, 8N1.
pub const BAUD_RATE: u32 = 2400;

/// Read timeout. The device answers well within this at 2400 baud; hitting
/// it means nothing (more) is coming for the current request.
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// A serial port opened for Winmon traffic.
pub struct Mk3Port(Box<dyn SerialPort>);

/// Open the MK3-USB adapter at `path` with the fixed Winmon line settings.
pub fn open(path: &str) -> serialport::Result<Mk3Port> {
    let port = serialport::new(path, BAUD_RATE)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .timeout(READ_TIMEOUT)
        .open()?;
    Ok(Mk3Port(port))
}

/// Wrapper giving `std::io::Error` an [`embedded_io::Error`] impl.
#[derive(Debug)]
pub struct IoError(io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            io::ErrorKind::ConnectionRefused => embedded_io::ErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset => embedded_io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted => embedded_io::ErrorKind::ConnectionAborted,
            io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
            io::ErrorKind::AddrInUse => embedded_io::ErrorKind::AddrInUse,
            io::ErrorKind::AddrNotAvailable => embedded_io::ErrorKind::AddrNotAvailable,
            io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            io::ErrorKind::AlreadyExists => embedded_io::ErrorKind::AlreadyExists,
            io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for Mk3Port {
    type Error = IoError;
}

impl embedded_io::Read for Mk3Port {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for Mk3Port {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        io::Write::flush(&mut self.0).map_err(IoError)
    }
}
