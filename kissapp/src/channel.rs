use std::io::{ErrorKind, Read, Write};

use kisscore::kiss::KissFrame;

use crate::error::KissTestError;

/// A byte stream connected to a TNC, such as a serial port.
///
/// Reads must come back within a bounded time even when nothing arrives, either with
/// `Ok(0)` or a `TimedOut`/`WouldBlock` error. The loopback harness relies on this to
/// keep its transmit deadlines.
pub trait Channel: Read + Write + Send + 'static {
    /// Name used when logging, e.g. the device path.
    fn name(&self) -> &str;

    /// Shut down I/O - it is assumed we cannot restart.
    fn close(&mut self) -> Result<(), KissTestError>;
}

fn is_no_data(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}

fn classify<C: Channel>(channel: &C, e: std::io::Error) -> KissTestError {
    if e.kind() == ErrorKind::NotConnected {
        KissTestError::ChannelClosed(channel.name().to_owned())
    } else {
        e.into()
    }
}

/// Read at most one byte. A read timeout is reported as `None`.
pub fn read_byte<C: Channel>(channel: &mut C) -> Result<Option<u8>, KissTestError> {
    let mut buf = [0u8; 1];
    match channel.read(&mut buf) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(buf[0])),
        Err(e) if is_no_data(e.kind()) => Ok(None),
        Err(e) => Err(classify(channel, e)),
    }
}

/// Read whatever is available into `buf`. A read timeout is reported as 0 bytes.
pub fn read_available<C: Channel>(channel: &mut C, buf: &mut [u8]) -> Result<usize, KissTestError> {
    match channel.read(buf) {
        Ok(n) => Ok(n),
        Err(e) if is_no_data(e.kind()) => Ok(0),
        Err(e) => Err(classify(channel, e)),
    }
}

/// Write a whole KISS frame and wait for it to leave.
pub fn write_frame<C: Channel>(channel: &mut C, frame: &KissFrame) -> Result<(), KissTestError> {
    write_bytes(channel, frame.as_bytes())
}

/// Write raw bytes without any framing.
pub fn write_bytes<C: Channel>(channel: &mut C, bytes: &[u8]) -> Result<(), KissTestError> {
    let result = channel.write_all(bytes).and_then(|_| channel.flush());
    result.map_err(|e| classify(channel, e))
}
