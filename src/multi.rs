//! High-level client for a Multi/Quattro reached through an MK3-USB adapter.

use std::thread;
use std::time::Duration;

use embedded_io::Error;
use log::debug;

use crate::command::{Command, SET_ADDRESS_FRAME, WriteTarget};
use crate::error::Result;
use crate::frame;
use crate::registers::Setting;

/// Timing and strictness knobs for the command executor.
///
/// These are threaded explicitly into [`Multi`] instead of living in any
/// process-wide state, so two sessions (or a test) can disagree about them.
#[derive(Debug, Clone)]
pub struct MultiConfig {
    /// Write attempts per command before giving up.
    pub attempts: u8,
    /// Pause after each write, giving the device time to push its reply.
    pub settle: Duration,
    /// Pause between failed attempts.
    pub retry_backoff: Duration,
    /// Log every TX/RX buffer as hex at debug level.
    pub trace_io: bool,
    /// Discard response frames whose byte sum is non-zero.
    ///
    /// Off by default: the Multis this was tested against occasionally send
    /// frames that fail the sum check yet carry usable data, and VEConfigure
    /// appears to tolerate them too.
    pub verify_checksums: bool,
}

impl Default for MultiConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            settle: Duration::from_millis(100),
            retry_backoff: Duration::from_millis(50),
            trace_io: false,
            verify_checksums: false,
        }
    }
}

/// You can create a Multi using any interface which implements
/// [`embedded_io::Read`] & [`embedded_io::Write`].
///
/// For its methods we use the nomenclature that "get"/"set" move persisted
/// settings and "read" fetches a live measured value.
///
/// The link is half-duplex and the device answers one request at a time, so a
/// `Multi` issues commands strictly sequentially; there is never more than
/// one in flight.
pub struct Multi<S: embedded_io::Read + embedded_io::Write, const L: usize = 64> {
    interface: S,
    /// Routing byte for this device class. Fixed for the session.
    slot: u8,
    config: MultiConfig,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Multi<S, L> {
    /// Create a new Multi instance over the given interface with default
    /// timing.
    pub fn new(interface: S) -> Self {
        Self::with_config(interface, MultiConfig::default())
    }

    /// Create a new Multi instance with explicit executor configuration.
    pub fn with_config(interface: S, config: MultiConfig) -> Self {
        Self {
            interface,
            slot: frame::WINMON_SLOT,
            config,
        }
    }

    /// Borrow the underlying transport.
    pub fn interface(&self) -> &S {
        &self.interface
    }

    /// Consume the client and hand the transport back.
    pub fn into_inner(self) -> S {
        self.interface
    }

    /// Send the once-per-session addressing frame.
    ///
    /// The device acknowledges with a frame we have no use for; it is drained
    /// and discarded so it cannot be mistaken for a later reply.
    pub fn set_address(&mut self) -> Result<(), S::Error> {
        self.transact(&SET_ADDRESS_FRAME).map(|_| ())
    }

    /// Read a single RAM variable (live telemetry value).
    pub fn read_ram_var(&mut self, var_id: u8) -> Result<u16, S::Error> {
        self.execute(&Command::ReadRamVar { var_id })
    }

    /// Read a single persisted setting.
    pub fn read_setting(&mut self, setting_id: impl Into<u8>) -> Result<u16, S::Error> {
        self.execute(&Command::ReadSetting {
            setting_id: setting_id.into(),
        })
    }

    /// Fetch the raw metadata reply for a setting.
    ///
    /// Returns the bytes following the reply subcmd, trailing checksum
    /// included. The layout is unresolved upstream (flag/min/default/max
    /// fields have been guessed at but never confirmed), so nothing here
    /// attempts to decode it.
    pub fn setting_info(&mut self, setting_id: impl Into<u8>) -> Result<Vec<u8>, S::Error> {
        let cmd = Command::GetSettingInfo {
            setting_id: setting_id.into(),
        };
        let reply = self.exchange(&cmd.request(self.slot), cmd.reply_subcmd(), 4)?;
        Ok(reply.get(4..).map(<[u8]>::to_vec).unwrap_or_default())
    }

    /// Write a setting by ID.
    ///
    /// Success means the device produced *some* framed reply within the retry
    /// budget; the written value is not read back or otherwise verified here.
    /// Callers that care should follow up with [`Self::read_setting`].
    pub fn write_setting(
        &mut self,
        setting_id: impl Into<u8>,
        target: WriteTarget,
        value: u16,
    ) -> Result<(), S::Error> {
        self.execute_write(&Command::WriteSetting {
            setting_id: setting_id.into(),
            target,
            value,
        })
    }

    /// Get the absorption voltage setpoint. Value returned in millivolts.
    pub fn get_absorption_voltage_mv(&mut self) -> Result<u32, S::Error> {
        let centivolts = self.read_setting(Setting::UBatAbsorption)?;
        Ok(centivolts as u32 * 10)
    }

    /// Set the absorption voltage setpoint. Value supplied in millivolts;
    /// persists across power cycles.
    pub fn set_absorption_voltage_mv(&mut self, voltage_mv: u32) -> Result<(), S::Error> {
        let centivolts = u16::try_from(voltage_mv / 10)?;
        self.write_setting(
            Setting::UBatAbsorption,
            WriteTarget::new().with_persist(true),
            centivolts,
        )
    }

    /// Get the float voltage setpoint. Value returned in millivolts.
    pub fn get_float_voltage_mv(&mut self) -> Result<u32, S::Error> {
        let centivolts = self.read_setting(Setting::UBatFloat)?;
        Ok(centivolts as u32 * 10)
    }

    /// Set the float voltage setpoint. Value supplied in millivolts; persists
    /// across power cycles.
    pub fn set_float_voltage_mv(&mut self, voltage_mv: u32) -> Result<(), S::Error> {
        let centivolts = u16::try_from(voltage_mv / 10)?;
        self.write_setting(
            Setting::UBatFloat,
            WriteTarget::new().with_persist(true),
            centivolts,
        )
    }

    /// Issue a read-style command ([`Command::ReadRamVar`] or
    /// [`Command::ReadSetting`]) and return the 16-bit value from its reply.
    ///
    /// A reply of `0xFFFF` is returned like any other value: it is the
    /// device's "ID not implemented" sentinel, and interpreting it is the
    /// sweep layer's job, not the executor's.
    pub fn execute(&mut self, command: &Command) -> Result<u16, S::Error> {
        let reply = self.exchange(&command.request(self.slot), command.reply_subcmd(), 6)?;
        Ok(u16::from_le_bytes([reply[4], reply[5]]))
    }

    /// Issue a write-style command, accepting any framed reply as the ack.
    pub fn execute_write(&mut self, command: &Command) -> Result<(), S::Error> {
        self.exchange(&command.request(self.slot), command.reply_subcmd(), 0)
            .map(|_| ())
    }

    /// Send `request` until a reply frame of at least `min_len` bytes with
    /// the wanted subcmd turns up, or the attempt budget runs out.
    fn exchange(
        &mut self,
        request: &[u8],
        reply_subcmd: Option<u8>,
        min_len: usize,
    ) -> Result<Vec<u8>, S::Error> {
        for attempt in 0..self.config.attempts {
            if attempt > 0 {
                thread::sleep(self.config.retry_backoff);
            }
            let rx = self.transact(request)?;
            let found = match reply_subcmd {
                Some(subcmd) => frame::scan_for_response(&rx, subcmd),
                None => frame::scan_for_any_response(&rx),
            };
            if let Some(reply) = found {
                if self.config.verify_checksums && !frame::has_valid_checksum(reply) {
                    debug!("discarding frame with bad checksum: {}", hex::encode(reply));
                    continue;
                }
                if reply.len() >= min_len {
                    return Ok(reply.to_vec());
                }
            }
        }
        Err(crate::error::Error::NoResponse)
    }

    /// Write one frame, wait out the settle interval, then drain whatever the
    /// device sent back.
    fn transact(&mut self, request: &[u8]) -> Result<heapless::Vec<u8, L>, S::Error> {
        if self.config.trace_io {
            debug!("TX: {}", hex::encode(request));
        }
        self.interface
            .write_all(request)
            .map_err(crate::error::Error::SerialError)?;

        thread::sleep(self.config.settle);

        let mut rx: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut temp_buf = [0u8; 8];
        loop {
            match self.interface.read(&mut temp_buf) {
                Ok(0) => break,
                Ok(bytes_read) => {
                    if rx.extend_from_slice(&temp_buf[0..bytes_read]).is_err() {
                        return Err(crate::error::Error::BufferError);
                    }
                }
                Err(e) => {
                    // The port signals "nothing more buffered" as a timeout;
                    // anything else is a real transport fault.
                    if matches!(
                        e.kind(),
                        embedded_io::ErrorKind::Other | embedded_io::ErrorKind::TimedOut
                    ) {
                        break;
                    }
                    return Err(crate::error::Error::SerialError(e));
                }
            }
        }

        if self.config.trace_io && !rx.is_empty() {
            debug!("RX: {}", hex::encode(&rx[..]));
        }
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::checksum;
    use crate::mock_serial::MockSerial;

    /// Executor config with the sleeps zeroed out so tests run instantly.
    fn instant() -> MultiConfig {
        MultiConfig {
            settle: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            ..MultiConfig::default()
        }
    }

    fn reply(subcmd: u8, value: u16) -> Vec<u8> {
        let [lo, hi] = value.to_le_bytes();
        let mut frame = vec![0x05, 0xFF, 0x58, subcmd, lo, hi];
        frame.push(checksum(&frame));
        frame
    }

    #[test]
    fn read_ram_var_extracts_le_value() {
        let mut mock = MockSerial::new();
        let request = Command::ReadRamVar { var_id: 2 }.request(0x58);
        mock.stub(&request, &reply(0x85, 0x1770));

        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        assert_eq!(multi.read_ram_var(2).unwrap(), 0x1770);
        assert_eq!(multi.interface().write_count(), 1);
    }

    #[test]
    fn sentinel_value_is_passed_through() {
        let mut mock = MockSerial::new();
        let request = Command::ReadRamVar { var_id: 7 }.request(0x58);
        mock.stub(&request, &reply(0x85, 0xFFFF));

        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        assert_eq!(multi.read_ram_var(7).unwrap(), 0xFFFF);
    }

    #[test]
    fn silent_device_exhausts_exactly_three_attempts() {
        let mock = MockSerial::new();
        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());

        let result = multi.read_ram_var(0);
        assert!(matches!(result, Err(crate::error::Error::NoResponse)));
        assert_eq!(multi.interface().write_count(), 3);
    }

    #[test]
    fn reply_with_garbage_prefix_is_found() {
        let mut mock = MockSerial::new();
        let request = Command::ReadSetting { setting_id: 3 }.request(0x58);
        let mut noisy = vec![0x00, 0x12, 0xFF];
        noisy.extend_from_slice(&reply(0x86, 0x1518));
        mock.stub(&request, &noisy);

        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        assert_eq!(multi.read_setting(3u8).unwrap(), 0x1518);
    }

    #[test]
    fn wrong_reply_subcmd_counts_as_no_response() {
        let mut mock = MockSerial::new();
        let request = Command::ReadRamVar { var_id: 1 }.request(0x58);
        // A setting reply where a RAM var reply was expected.
        mock.stub(&request, &reply(0x86, 0x1234));

        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        assert!(matches!(
            multi.read_ram_var(1),
            Err(crate::error::Error::NoResponse)
        ));
        assert_eq!(multi.interface().write_count(), 3);
    }

    #[test]
    fn write_accepts_any_framed_reply() {
        let mut mock = MockSerial::new();
        let request = Command::WriteSetting {
            setting_id: 2,
            target: WriteTarget::new().with_persist(true),
            value: 0x15E0,
        }
        .request(0x58);
        // Undocumented ack subcmd; only the framing matters.
        let mut ack = vec![0x04, 0xFF, 0x58, 0x99, 0x00];
        ack.push(checksum(&ack));
        mock.stub(&request, &ack);

        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        multi
            .write_setting(2u8, WriteTarget::new().with_persist(true), 0x15E0)
            .unwrap();
        assert_eq!(multi.interface().write_count(), 1);
    }

    #[test]
    fn unanswered_write_is_no_response() {
        let mock = MockSerial::new();
        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        let result = multi.write_setting(2u8, WriteTarget::new(), 0x1518);
        assert!(matches!(result, Err(crate::error::Error::NoResponse)));
        assert_eq!(multi.interface().write_count(), 3);
    }

    #[test]
    fn strict_mode_rejects_bad_checksum() {
        let request = Command::ReadRamVar { var_id: 4 }.request(0x58);
        let mut corrupted = reply(0x85, 0x0102);
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;

        // Default config tolerates the bad sum.
        let mut mock = MockSerial::new();
        mock.stub(&request, &corrupted);
        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        assert_eq!(multi.read_ram_var(4).unwrap(), 0x0102);

        // Strict config treats it like no frame at all.
        let mut mock = MockSerial::new();
        mock.stub(&request, &corrupted);
        let config = MultiConfig {
            verify_checksums: true,
            ..instant()
        };
        let mut multi: Multi<MockSerial> = Multi::with_config(mock, config);
        assert!(matches!(
            multi.read_ram_var(4),
            Err(crate::error::Error::NoResponse)
        ));
    }

    #[test]
    fn transport_write_failure_is_fatal() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        assert!(matches!(
            multi.read_ram_var(0),
            Err(crate::error::Error::SerialError(_))
        ));
    }

    #[test]
    fn set_address_sends_the_fixed_frame() {
        let mock = MockSerial::new();
        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        multi.set_address().unwrap();
        assert_eq!(multi.interface().writes()[0], SET_ADDRESS_FRAME);
    }

    #[test]
    fn setting_info_returns_opaque_payload() {
        let mut mock = MockSerial::new();
        let request = Command::GetSettingInfo { setting_id: 0 }.request(0x58);
        // Captured shape: 0E FF 58 89 <11 payload bytes> <checksum>.
        let mut info = vec![
            0x0E, 0xFF, 0x58, 0x89, 0x01, 0x00, 0x00, 0x00, 0xB4, 0x89, 0x00, 0x00, 0xFC, 0x6F,
            0x00,
        ];
        info.push(checksum(&info));
        mock.stub(&request, &info);

        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        let payload = multi.setting_info(0u8).unwrap();
        assert_eq!(payload, &info[4..]);
    }

    #[test]
    fn scaled_voltage_setters_use_centivolt_raw() {
        let mut mock = MockSerial::new();
        let request = Command::WriteSetting {
            setting_id: 2,
            target: WriteTarget::new().with_persist(true),
            value: 5600,
        }
        .request(0x58);
        let mut ack = vec![0x04, 0xFF, 0x58, 0x99, 0x00];
        ack.push(checksum(&ack));
        mock.stub(&request, &ack);

        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        multi.set_absorption_voltage_mv(56_000).unwrap();
        assert_eq!(
            multi.interface().writes()[0],
            [0x07, 0xFF, 0x58, 0x37, 0x01, 0x02, 0xE0, 0x15, 0x73]
        );
    }

    #[test]
    fn oversized_voltage_is_invalid_range() {
        let mock = MockSerial::new();
        let mut multi: Multi<MockSerial> = Multi::with_config(mock, instant());
        let result = multi.set_absorption_voltage_mv(700_000);
        assert!(matches!(result, Err(crate::error::Error::InvalidRange)));
        assert_eq!(multi.interface().write_count(), 0);
    }
}
