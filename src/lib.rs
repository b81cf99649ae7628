//! This crate provides an interface for communicating with Victron Multi and
//! Quattro inverter/chargers over the MK3-USB adapter, using the proprietary
//! "Winmon" serial sub-protocol.
//!
//! It supports reading live RAM variables (voltage, current, state), reading
//! and writing persisted settings by numeric ID, fetching raw setting
//! metadata, and sweeping the whole 0-255 ID space to discover which IDs a
//! given device implements.
//!
//! Device models this is known to work with:
//! * MultiPlus 48/3000
//! * MultiPlus Compact
//!
//! Device models it should work with:
//! * Other VE.Bus Multis
//! * Quattro
//!
//! The serial port used for Winmon comms should be configured like so:
//! * Baud rate: 2400
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//! * Read timeout: 500 ms
//!
//! [`port::open`] applies these settings for you. The protocol layer itself
//! only needs something that implements [`embedded_io::Read`] and
//! [`embedded_io::Write`], so other transports (or mocks) plug in as well.

pub mod command;
pub mod error;
pub mod frame;
pub mod interpret;
pub mod multi;
pub mod port;
pub mod registers;
pub mod sweep;

#[cfg(test)]
mod mock_serial;
