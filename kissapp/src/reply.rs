//! Commands that the TNC answers with a single KISS frame, such as a version query.

use std::time::{Duration, Instant};

use kisscore::kiss::{KissDecoder, KissFrame, split_type_byte};
use log::{debug, warn};

use crate::channel::{Channel, read_byte, write_frame};
use crate::error::KissTestError;

/// How long to wait for the TNC to answer a query.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Read until one complete frame arrives and return it without its type byte.
///
/// Fails with `ReplyTimeout` once `timeout` has passed, which may overrun by up to the
/// channel's read timeout. Anything after the first frame is left unread.
pub fn await_reply<C: Channel>(
    channel: &mut C,
    timeout: Duration,
) -> Result<Vec<u8>, KissTestError> {
    let start = Instant::now();
    let mut decoder = KissDecoder::new();
    while start.elapsed() < timeout {
        let Some(byte) = read_byte(channel)? else {
            continue;
        };
        if let Some(frame) = decoder.push(byte) {
            if let Some((type_byte, body)) = split_type_byte(&frame) {
                debug!("reply type {type_byte:#04x} {body:02x?}");
                return Ok(body.to_vec());
            }
        }
    }
    warn!("no reply on {} after {:?}", channel.name(), timeout);
    Err(KissTestError::ReplyTimeout(timeout))
}

/// Send `frame` and wait for the TNC's answer.
pub fn query<C: Channel>(
    channel: &mut C,
    frame: &KissFrame,
    timeout: Duration,
) -> Result<Vec<u8>, KissTestError> {
    write_frame(channel, frame)?;
    await_reply(channel, timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{EchoMode, link};
    use kisscore::kiss::{FEND, encode};

    const SHORT: Duration = Duration::from_millis(20);

    #[test]
    fn reply_body_is_returned() {
        let (_tx, mut rx, tap) = link(EchoMode::Silent);
        tap.inject(&encode(0x08, b"N9600A v3.21"));
        let frame = KissFrame::new(0x08, &[0x00]);
        let reply = query(&mut rx, &frame, REPLY_TIMEOUT).unwrap();
        assert_eq!(reply, b"N9600A v3.21");
        assert_eq!(tap.rx_written(), frame.as_bytes());
    }

    #[test]
    fn first_frame_is_the_reply() {
        let (_tx, mut rx, tap) = link(EchoMode::Silent);
        let mut wire = vec![FEND, FEND];
        wire.extend(encode(0x0E, &[0xC0, b'7']));
        wire.extend(encode(0x0E, b"second"));
        tap.inject(&wire);
        assert_eq!(await_reply(&mut rx, REPLY_TIMEOUT).unwrap(), &[0xC0, b'7']);
    }

    #[test]
    fn silent_tnc_times_out() {
        let (_tx, mut rx, tap) = link(EchoMode::Silent);
        let start = Instant::now();
        let result = query(&mut rx, &KissFrame::new(0x0B, &[0x00]), SHORT);
        assert!(matches!(result, Err(KissTestError::ReplyTimeout(t)) if t == SHORT));
        assert!(start.elapsed() >= SHORT);
        assert!(!tap.rx_written().is_empty());
    }

    #[test]
    fn incomplete_reply_times_out() {
        let (_tx, mut rx, tap) = link(EchoMode::Silent);
        tap.inject(&[0xC0, 0x08, b'v', b'3']);
        assert!(matches!(
            await_reply(&mut rx, SHORT),
            Err(KissTestError::ReplyTimeout(_))
        ));
    }

    #[test]
    fn read_failure_is_not_a_timeout() {
        let (_tx, mut rx, tap) = link(EchoMode::Silent);
        tap.fail_reads();
        assert!(matches!(
            await_reply(&mut rx, REPLY_TIMEOUT),
            Err(KissTestError::Io(_))
        ));
    }
}
