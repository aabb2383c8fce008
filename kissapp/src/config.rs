//! Argument parsing shared by the tools.
//!
//! Every parser reports its own error variant so a bad value can be traced to the
//! field it was given for, before any port is opened.

use std::time::Duration;

use kisscore::address::Address;

use crate::error::KissTestError;

/// Pacing and shape of a loopback run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Number of frames to send, at least 1.
    pub frame_count: u32,
    /// Length of the info field of every test frame.
    pub payload_len: usize,
    /// Time between the start of one transmission and the next.
    pub interval: Duration,
}

impl HarnessConfig {
    pub fn new(
        frame_count: u32,
        payload_len: usize,
        interval: Duration,
    ) -> Result<Self, KissTestError> {
        if frame_count == 0 {
            return Err(KissTestError::InvalidFrameCount(frame_count.to_string()));
        }
        Ok(Self {
            frame_count,
            payload_len,
            interval,
        })
    }
}

pub fn parse_baud_rate(s: &str) -> Result<u32, KissTestError> {
    match s.trim().parse::<u32>() {
        Ok(b) if b > 0 => Ok(b),
        _ => Err(KissTestError::InvalidBaudRate(s.to_owned())),
    }
}

pub fn parse_frame_count(s: &str) -> Result<u32, KissTestError> {
    match s.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(KissTestError::InvalidFrameCount(s.to_owned())),
    }
}

pub fn parse_payload_length(s: &str) -> Result<usize, KissTestError> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| KissTestError::InvalidPayloadLength(s.to_owned()))
}

pub fn parse_interval(s: &str) -> Result<Duration, KissTestError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| KissTestError::InvalidInterval(s.to_owned()))
}

pub fn parse_byte_value(s: &str) -> Result<u8, KissTestError> {
    s.trim()
        .parse::<u8>()
        .map_err(|_| KissTestError::InvalidParameter(s.to_owned()))
}

pub fn parse_callsign(s: &str) -> Result<Address, KissTestError> {
    Address::from_callsign(s).map_err(|reason| KissTestError::InvalidCallsignFormat {
        callsign: s.to_owned(),
        reason,
    })
}
