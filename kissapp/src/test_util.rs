use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};

use crate::channel::Channel;
use crate::error::KissTestError;

/// How the simulated TNC treats what the harness transmits.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum EchoMode {
    /// Every byte written to the transmit end comes back on the receive end.
    Exact,
    /// Like `Exact` but one callsign byte of each write is altered.
    CorruptOneByte,
    /// Nothing ever comes back.
    Silent,
}

struct LinkState {
    mode: EchoMode,
    returning: VecDeque<u8>,
    written: Vec<u8>,
    rx_written: Vec<u8>,
    fail_reads: bool,
    tx_closed: bool,
    rx_closed: bool,
}

/// Inspect or inject traffic on an in-memory link from test code.
#[derive(Clone)]
pub(crate) struct LinkTap(Arc<Mutex<LinkState>>);

impl LinkTap {
    pub(crate) fn written(&self) -> Vec<u8> {
        self.0.lock().unwrap().written.clone()
    }

    /// Bytes written to the receive end, which a real TNC would treat as a command.
    pub(crate) fn rx_written(&self) -> Vec<u8> {
        self.0.lock().unwrap().rx_written.clone()
    }

    pub(crate) fn inject(&self, bytes: &[u8]) {
        self.0.lock().unwrap().returning.extend(bytes);
    }

    /// Make every later read on the receive end fail as if the device went away.
    pub(crate) fn fail_reads(&self) {
        self.0.lock().unwrap().fail_reads = true;
    }

    pub(crate) fn tx_closed(&self) -> bool {
        self.0.lock().unwrap().tx_closed
    }

    pub(crate) fn rx_closed(&self) -> bool {
        self.0.lock().unwrap().rx_closed
    }
}

pub(crate) struct TxEnd(Arc<Mutex<LinkState>>);
pub(crate) struct RxEnd(Arc<Mutex<LinkState>>);

/// Create the transmit and receive ends of a simulated TNC loopback.
///
/// Reads on the receive end never block: an empty link reads as 0 bytes.
pub(crate) fn link(mode: EchoMode) -> (TxEnd, RxEnd, LinkTap) {
    let state = Arc::new(Mutex::new(LinkState {
        mode,
        returning: VecDeque::new(),
        written: vec![],
        rx_written: vec![],
        fail_reads: false,
        tx_closed: false,
        rx_closed: false,
    }));
    (
        TxEnd(state.clone()),
        RxEnd(state.clone()),
        LinkTap(state),
    )
}

impl Write for TxEnd {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut state = self.0.lock().unwrap();
        state.written.extend_from_slice(buf);
        match state.mode {
            EchoMode::Exact => state.returning.extend(buf),
            EchoMode::CorruptOneByte => {
                let mut echo = buf.to_vec();
                // byte 2 is the first destination callsign character, which stays clear of FEND/FESC
                if let Some(b) = echo.get_mut(2) {
                    *b ^= 0x02;
                }
                state.returning.extend(echo);
            }
            EchoMode::Silent => (),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Read for TxEnd {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(0)
    }
}

impl Channel for TxEnd {
    fn name(&self) -> &str {
        "memory-tx"
    }

    fn close(&mut self) -> Result<(), KissTestError> {
        self.0.lock().unwrap().tx_closed = true;
        Ok(())
    }
}

impl Write for RxEnd {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().rx_written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Read for RxEnd {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut state = self.0.lock().unwrap();
        if state.fail_reads {
            return Err(std::io::Error::new(ErrorKind::BrokenPipe, "link failed"));
        }
        let mut n = 0;
        while n < buf.len() {
            let Some(b) = state.returning.pop_front() else {
                break;
            };
            buf[n] = b;
            n += 1;
        }
        Ok(n)
    }
}

impl Channel for RxEnd {
    fn name(&self) -> &str {
        "memory-rx"
    }

    fn close(&mut self) -> Result<(), KissTestError> {
        self.0.lock().unwrap().rx_closed = true;
        Ok(())
    }
}
