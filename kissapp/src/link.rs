//! Transparent byte bridge between two channels.
//!
//! Whatever arrives on one side is written unchanged to the other. No KISS decoding takes
//! place, so two TNCs can be put back to back for testing.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::channel::{Channel, read_available, write_bytes};
use crate::error::KissTestError;

/// Bytes forwarded in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Traffic {
    pub a_to_b: u64,
    pub b_to_a: u64,
}

pub struct Bridge<A: Channel, B: Channel> {
    a: A,
    b: B,
    traffic: Traffic,
}

impl<A: Channel, B: Channel> Bridge<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self {
            a,
            b,
            traffic: Traffic::default(),
        }
    }

    pub fn traffic(&self) -> Traffic {
        self.traffic
    }

    /// Forward whatever is waiting on each side once, A to B first.
    ///
    /// Returns the number of bytes moved. Blocks for up to the read timeout of each channel.
    pub fn poll(&mut self) -> Result<usize, KissTestError> {
        let mut buf = [0u8; 1024];
        let ab = forward(&mut self.a, &mut self.b, &mut buf)?;
        self.traffic.a_to_b += ab as u64;
        let ba = forward(&mut self.b, &mut self.a, &mut buf)?;
        self.traffic.b_to_a += ba as u64;
        Ok(ab + ba)
    }

    /// Forward traffic until `stop` is set.
    ///
    /// Both channels are closed before returning, whatever the outcome.
    pub fn run(mut self, stop: &AtomicBool) -> Result<Traffic, KissTestError> {
        let mut result = Ok(());
        while !stop.load(Ordering::SeqCst) {
            if let Err(e) = self.poll() {
                result = Err(e);
                break;
            }
        }
        let closed = self.close();
        result?;
        closed?;
        info!(
            "forwarded {} bytes {} to {} and {} bytes back",
            self.traffic.a_to_b,
            self.a.name(),
            self.b.name(),
            self.traffic.b_to_a
        );
        Ok(self.traffic)
    }

    fn close(&mut self) -> Result<(), KissTestError> {
        let a = self.a.close();
        if let Err(e) = &a {
            warn!("error closing {}: {e}", self.a.name());
        }
        let b = self.b.close();
        if let Err(e) = &b {
            warn!("error closing {}: {e}", self.b.name());
        }
        a.and(b)
    }
}

fn forward<F: Channel, T: Channel>(
    from: &mut F,
    to: &mut T,
    buf: &mut [u8],
) -> Result<usize, KissTestError> {
    let n = read_available(from, buf)?;
    if n > 0 {
        debug!("{} -> {}: {} bytes", from.name(), to.name(), n);
        write_bytes(to, &buf[..n])?;
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{EchoMode, link};

    #[test]
    fn bytes_cross_in_both_directions() {
        let (_tx1, rx1, side_a) = link(EchoMode::Silent);
        let (_tx2, rx2, side_b) = link(EchoMode::Silent);
        let mut bridge = Bridge::new(rx1, rx2);

        side_a.inject(&[0xC0, 0x00, 0xDB, 0xDC, 0xC0]);
        side_b.inject(b"reply");
        assert_eq!(bridge.poll().unwrap(), 10);
        assert_eq!(side_b.rx_written(), &[0xC0, 0x00, 0xDB, 0xDC, 0xC0]);
        assert_eq!(side_a.rx_written(), b"reply");
        assert_eq!(
            bridge.traffic(),
            Traffic {
                a_to_b: 5,
                b_to_a: 5
            }
        );

        assert_eq!(bridge.poll().unwrap(), 0);
    }

    #[test]
    fn stop_flag_closes_both_channels() {
        let (_tx1, rx1, side_a) = link(EchoMode::Silent);
        let (_tx2, rx2, side_b) = link(EchoMode::Silent);
        side_a.inject(b"never sent");
        let traffic = Bridge::new(rx1, rx2).run(&AtomicBool::new(true)).unwrap();
        assert_eq!(traffic, Traffic::default());
        assert!(side_a.rx_closed());
        assert!(side_b.rx_closed());
        assert!(side_b.rx_written().is_empty());
    }

    #[test]
    fn io_error_still_closes_both_channels() {
        let (_tx1, rx1, side_a) = link(EchoMode::Silent);
        let (_tx2, rx2, side_b) = link(EchoMode::Silent);
        side_a.inject(b"abc");
        side_b.fail_reads();
        let result = Bridge::new(rx1, rx2).run(&AtomicBool::new(false));
        assert!(matches!(result, Err(KissTestError::Io(_))));
        assert!(side_a.rx_closed());
        assert!(side_b.rx_closed());
        // the A side was forwarded before B failed
        assert_eq!(side_b.rx_written(), b"abc");
    }
}
