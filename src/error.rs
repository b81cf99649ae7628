//! Our error types for Winmon communication.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for Multi/Quattro Winmon communications.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("serial communication error")]
    SerialError(I),
    /// Covers both a silent device and buffers that never contained a
    /// well-formed frame; the two are not distinguished on this link.
    #[error("no matching response after retries")]
    NoResponse,
    #[error("receive buffer overflow")]
    BufferError,
    #[error("value out of range")]
    InvalidRange,
}

impl<I: embedded_io::Error> From<core::num::TryFromIntError> for Error<I> {
    fn from(_: core::num::TryFromIntError) -> Self {
        Error::InvalidRange
    }
}
