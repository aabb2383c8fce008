use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use kisscore::ax25::{Ax25Header, decode_header};
use kisscore::crc::ax25_fcs;
use kisscore::kiss::{KissCommand, KissDecoder, split_type_byte};
use log::{debug, info, warn};

use crate::channel::{Channel, read_available};
use crate::error::KissTestError;

/// A frame seen on a monitored port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredFrame {
    /// Counts up from 1 for each frame received.
    pub number: u64,
    raw: Vec<u8>,
    pub port: u8,
    /// `None` if the type byte names a command we don't know.
    pub command: Option<KissCommand>,
    /// Present for data frames only.
    pub header: Option<Ax25Header>,
    /// FCS computed over the body. Nothing on the wire is checked against it.
    pub fcs: u16,
}

impl MonitoredFrame {
    /// Unescaped frame, starting with its KISS type byte.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn type_byte(&self) -> Option<u8> {
        self.raw.first().copied()
    }

    /// Frame contents after the type byte.
    pub fn body(&self) -> &[u8] {
        self.raw.get(1..).unwrap_or(&[])
    }

    /// Information field of a data frame.
    pub fn info(&self) -> Option<&[u8]> {
        let header = self.header.as_ref()?;
        self.body().get(header.payload_offset..)
    }
}

/// Decodes everything arriving on a channel into frames.
pub struct Monitor<C: Channel> {
    channel: C,
    decoder: KissDecoder,
    ready: VecDeque<Vec<u8>>,
    received: u64,
}

impl<C: Channel> Monitor<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            decoder: KissDecoder::new(),
            ready: VecDeque::new(),
            received: 0,
        }
    }

    /// Return the next complete frame, reading from the channel if none is queued.
    ///
    /// Blocks for no longer than the channel's read timeout.
    pub fn poll(&mut self) -> Result<Option<MonitoredFrame>, KissTestError> {
        if self.ready.is_empty() {
            let mut buf = [0u8; 256];
            let n = read_available(&mut self.channel, &mut buf)?;
            if n > 0 {
                debug!("read {n} bytes from {}", self.channel.name());
                self.ready.extend(self.decoder.feed(&buf[..n]));
            }
        }
        Ok(self.ready.pop_front().and_then(|raw| self.describe(raw)))
    }

    /// Hand every frame to `handler` until `stop` is set, then close the channel.
    ///
    /// Returns the number of frames received.
    pub fn run<F>(mut self, stop: &AtomicBool, mut handler: F) -> Result<u64, KissTestError>
    where
        F: FnMut(&MonitoredFrame),
    {
        let mut result = Ok(());
        while !stop.load(Ordering::SeqCst) {
            match self.poll() {
                Ok(Some(frame)) => handler(&frame),
                Ok(None) => (),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        let closed = self.channel.close();
        if let Err(e) = &closed {
            warn!("error closing {}: {e}", self.channel.name());
        }
        result?;
        closed?;
        info!("received {} frames from {}", self.received, self.channel.name());
        Ok(self.received)
    }

    pub fn framing_errors(&self) -> u64 {
        self.decoder.framing_errors()
    }

    fn describe(&mut self, raw: Vec<u8>) -> Option<MonitoredFrame> {
        let (type_byte, body) = split_type_byte(&raw)?;
        self.received += 1;
        let command = KissCommand::from_type_byte(type_byte).ok();
        if command.is_none() {
            warn!("unsupported KISS command in type byte {type_byte:#04x}");
        }
        let header = (command == Some(KissCommand::DataFrame)).then(|| decode_header(body));
        let fcs = ax25_fcs(body);
        Some(MonitoredFrame {
            number: self.received,
            port: type_byte >> 4,
            command,
            header,
            fcs,
            raw,
        })
    }
}
