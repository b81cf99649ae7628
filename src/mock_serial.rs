//! We use this mocking module in unit tests to emulate the half-duplex MK3
//! link: writes are recorded, and each recognised request frame queues its
//! canned reply for the next reads.

use std::collections::{HashMap, VecDeque};

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    /// Every write call's bytes, in order.
    writes: Vec<Vec<u8>>,
    /// Canned replies keyed by the exact request frame. A stubbed request is
    /// answered every time it is written, an unstubbed one never is.
    replies: HashMap<Vec<u8>, Vec<u8>>,
    /// Bytes currently waiting to be read.
    pending: VecDeque<u8>,
    /// Flag to simulate write errors.
    should_error_on_write: bool,
    /// Flag to simulate read errors.
    should_error_on_read: bool,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// No data available, like a serial read timing out.
    WouldBlock,
    /// Generic simulated error for testing.
    SimulatedError,
}

impl std::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockSerialError::WouldBlock => write!(f, "would block"),
            MockSerialError::SimulatedError => write!(f, "simulated error"),
        }
    }
}

impl std::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::WouldBlock => embedded_io::ErrorKind::TimedOut,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::BrokenPipe,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }

        self.writes.push(buf.to_vec());
        if let Some(reply) = self.replies.get(buf) {
            self.pending.extend(reply);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }

        if self.pending.is_empty() {
            return Err(MockSerialError::WouldBlock);
        }

        let mut count = 0;
        while count < buf.len() {
            match self.pending.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl MockSerial {
    /// Create a new MockSerial with nothing stubbed.
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            replies: HashMap::new(),
            pending: VecDeque::new(),
            should_error_on_write: false,
            should_error_on_read: false,
        }
    }

    /// Queue `response` to be readable after every write of `request`.
    pub fn stub(&mut self, request: &[u8], response: &[u8]) {
        self.replies.insert(request.to_vec(), response.to_vec());
    }

    /// All write calls so far, one entry per call.
    pub fn writes(&self) -> &Vec<Vec<u8>> {
        &self.writes
    }

    /// Number of write calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Configure whether write operations should fail with an error.
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error.
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Write};

    #[test]
    fn unstubbed_write_leaves_nothing_to_read() {
        let mut mock = MockSerial::new();
        mock.write(&[0x01, 0x02]).unwrap();

        let mut buf = [0u8; 8];
        assert!(matches!(
            mock.read(&mut buf),
            Err(MockSerialError::WouldBlock)
        ));
        assert_eq!(mock.write_count(), 1);
        assert_eq!(mock.writes()[0], [0x01, 0x02]);
    }

    #[test]
    fn stubbed_request_is_answered_every_time() {
        let mut mock = MockSerial::new();
        mock.stub(&[0xAA], &[0x10, 0x20, 0x30]);

        for _ in 0..2 {
            mock.write(&[0xAA]).unwrap();
            let mut buf = [0u8; 8];
            let n = mock.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], [0x10, 0x20, 0x30]);
        }
    }

    #[test]
    fn reads_drain_in_chunks() {
        let mut mock = MockSerial::new();
        mock.stub(&[0xAA], &[1, 2, 3, 4, 5]);
        mock.write(&[0xAA]).unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(mock.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(mock.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [3, 4]);
        assert_eq!(mock.read(&mut buf).unwrap(), 1);
        assert!(matches!(
            mock.read(&mut buf),
            Err(MockSerialError::WouldBlock)
        ));
    }

    #[test]
    fn simulated_errors_toggle() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(mock.write(&[0x00]).is_err());
        assert!(mock.flush().is_err());
        mock.set_write_error(false);
        assert!(mock.write(&[0x00]).is_ok());

        mock.stub(&[0x01], &[0xFF]);
        mock.write(&[0x01]).unwrap();
        mock.set_read_error(true);
        let mut buf = [0u8; 1];
        assert!(mock.read(&mut buf).is_err());
        mock.set_read_error(false);
        assert!(mock.read(&mut buf).is_ok());
    }
}
