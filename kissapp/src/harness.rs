//! Timed loopback test of a TNC.
//!
//! Test frames go out on one channel at a fixed interval while the other channel is read
//! continuously. Each returned frame is compared with the one most recently sent. At most
//! one frame is ever in flight: if nothing comes back before the next transmission is due,
//! the outstanding frame is written off as a miss.

use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use kisscore::ax25::Ax25Frame;
use kisscore::crc::ax25_fcs;
use kisscore::kiss::{DATA_FRAME_PORT0, KissDecoder, KissFrame, split_type_byte};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::channel::{Channel, read_byte, write_frame};
use crate::config::{HarnessConfig, parse_callsign};
use crate::error::KissTestError;
use crate::util::payload::{pad_printable, random_callsign};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    Pending,
    Done,
}

/// Where the most recent transmission stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    WaitingToSend,
    Sent,
    Matched,
    Mismatched,
    Missed,
}

/// Everything that changes over the course of a run.
#[derive(Debug)]
pub struct HarnessState {
    last_transmit: Option<Instant>,
    frames_sent: u32,
    in_flight: bool,
    /// AX.25 bytes of the last frame sent, without KISS framing.
    pending: Vec<u8>,
    decoder: KissDecoder,
    cycle: Cycle,
    matches: u32,
    mismatches: u32,
    misses: u32,
    unsolicited: u32,
    latencies: Vec<Duration>,
}

impl HarnessState {
    fn new() -> Self {
        Self {
            last_transmit: None,
            frames_sent: 0,
            in_flight: false,
            pending: vec![],
            decoder: KissDecoder::new(),
            cycle: Cycle::WaitingToSend,
            matches: 0,
            mismatches: 0,
            misses: 0,
            unsolicited: 0,
            latencies: vec![],
        }
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn matches(&self) -> u32 {
        self.matches
    }

    pub fn mismatches(&self) -> u32 {
        self.mismatches
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    /// Frames that arrived while nothing was in flight.
    pub fn unsolicited(&self) -> u32 {
        self.unsolicited
    }

    /// Round trip time of each matched frame, in order.
    pub fn latencies(&self) -> &[Duration] {
        &self.latencies
    }

    pub fn framing_errors(&self) -> u64 {
        self.decoder.framing_errors()
    }

    /// Number of frames whose outcome is decided.
    fn resolved(&self) -> u32 {
        self.matches + self.mismatches + self.misses
    }
}

/// Final tallies of a loopback run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub frames_sent: u32,
    pub matches: u32,
    pub mismatches: u32,
    pub misses: u32,
    pub unsolicited: u32,
    pub framing_errors: u64,
    pub latencies: Vec<Duration>,
}

impl Report {
    pub fn mean_latency(&self) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let total: Duration = self.latencies.iter().sum();
        Some(total / self.latencies.len() as u32)
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Frames sent:    {}", self.frames_sent)?;
        writeln!(f, "Matches:        {}", self.matches)?;
        writeln!(f, "Mismatches:     {}", self.mismatches)?;
        writeln!(f, "Misses:         {}", self.misses)?;
        if self.unsolicited > 0 {
            writeln!(f, "Unsolicited:    {}", self.unsolicited)?;
        }
        if self.framing_errors > 0 {
            writeln!(f, "Framing errors: {}", self.framing_errors)?;
        }
        match self.mean_latency() {
            Some(mean) => write!(f, "Mean latency:   {:.3} s", mean.as_secs_f64()),
            None => write!(f, "Mean latency:   n/a"),
        }
    }
}

pub struct Harness<T: Channel, R: Channel, G: Rng = StdRng> {
    tx: T,
    rx: R,
    config: HarnessConfig,
    rng: G,
    state: HarnessState,
}

impl<T: Channel, R: Channel> Harness<T, R> {
    pub fn new(tx: T, rx: R, config: HarnessConfig) -> Self {
        Self::with_rng(tx, rx, config, StdRng::from_entropy())
    }
}

impl<T: Channel, R: Channel, G: Rng> Harness<T, R, G> {
    /// Use a specific random source for addresses and padding.
    pub fn with_rng(tx: T, rx: R, config: HarnessConfig, rng: G) -> Self {
        Self {
            tx,
            rx,
            config,
            rng,
            state: HarnessState::new(),
        }
    }

    pub fn state(&self) -> &HarnessState {
        &self.state
    }

    /// Perform one step of the test at time `now`.
    ///
    /// Starts a transmission if one is due, then reads at most one byte.
    pub fn poll(&mut self, now: Instant) -> Result<Poll, KissTestError> {
        let due = self
            .state
            .last_transmit
            .is_none_or(|last| now.saturating_duration_since(last) >= self.config.interval);
        if due {
            if self.state.in_flight {
                self.state.in_flight = false;
                self.state.misses += 1;
                self.state.cycle = Cycle::Missed;
                info!("frame {} missed", self.state.frames_sent);
            }
            if self.state.frames_sent < self.config.frame_count {
                self.transmit(now)?;
            }
        }

        if let Some(byte) = read_byte(&mut self.rx)? {
            if let Some(frame) = self.state.decoder.push(byte) {
                self.receive(&frame, now);
            }
        }

        debug_assert!(self.state.resolved() <= self.state.frames_sent);
        if self.state.frames_sent == self.config.frame_count && !self.state.in_flight {
            Ok(Poll::Done)
        } else {
            Ok(Poll::Pending)
        }
    }

    /// Poll against the real clock until every frame is resolved or `stop` is set.
    ///
    /// Both channels are closed before returning, whatever the outcome.
    pub fn run(mut self, stop: &AtomicBool) -> Result<Report, KissTestError> {
        let result = self.drive(stop);
        let closed = self.close();
        result?;
        closed?;
        Ok(self.report())
    }

    pub fn report(&self) -> Report {
        Report {
            frames_sent: self.state.frames_sent,
            matches: self.state.matches,
            mismatches: self.state.mismatches,
            misses: self.state.misses,
            unsolicited: self.state.unsolicited,
            framing_errors: self.state.decoder.framing_errors(),
            latencies: self.state.latencies.clone(),
        }
    }

    fn drive(&mut self, stop: &AtomicBool) -> Result<(), KissTestError> {
        while !stop.load(Ordering::SeqCst) {
            if self.poll(Instant::now())? == Poll::Done {
                return Ok(());
            }
        }
        info!(
            "stopped after {} of {} frames",
            self.state.frames_sent, self.config.frame_count
        );
        Ok(())
    }

    fn close(&mut self) -> Result<(), KissTestError> {
        let tx = self.tx.close();
        if let Err(e) = &tx {
            warn!("error closing {}: {e}", self.tx.name());
        }
        let rx = self.rx.close();
        if let Err(e) = &rx {
            warn!("error closing {}: {e}", self.rx.name());
        }
        tx.and(rx)
    }

    fn transmit(&mut self, now: Instant) -> Result<(), KissTestError> {
        let number = self.state.frames_sent + 1;
        let destination = parse_callsign(&random_callsign(&mut self.rng))?;
        let source = parse_callsign(&random_callsign(&mut self.rng))?;

        // fields of one byte carry no frame number
        let mut info = if self.config.payload_len > 1 {
            format!("{number} ").into_bytes()
        } else {
            vec![]
        };
        info.truncate(self.config.payload_len);
        pad_printable(&mut info, self.config.payload_len, &mut self.rng);

        let route = format!("to {destination} from {source}");
        let ax25 = Ax25Frame::new_test(destination, source, &info).to_bytes();
        let frame = KissFrame::new(DATA_FRAME_PORT0, &ax25);
        write_frame(&mut self.tx, &frame)?;

        info!("sent frame {number} {route}, fcs {:#06x}", ax25_fcs(&ax25));
        debug!("tx {:02x?}", frame.as_bytes());

        self.state.pending = ax25;
        self.state.in_flight = true;
        self.state.last_transmit = Some(now);
        self.state.frames_sent = number;
        self.state.cycle = Cycle::Sent;
        Ok(())
    }

    fn receive(&mut self, frame: &[u8], now: Instant) {
        let Some((type_byte, body)) = split_type_byte(frame) else {
            return;
        };
        debug!("rx type {type_byte:#04x} {body:02x?}");

        if !self.state.in_flight {
            self.state.unsolicited += 1;
            warn!(
                "received {} byte frame with nothing outstanding",
                body.len()
            );
            return;
        }
        self.state.in_flight = false;

        let number = self.state.frames_sent;
        if body == self.state.pending.as_slice() {
            let latency = self
                .state
                .last_transmit
                .map_or(Duration::ZERO, |sent| now.saturating_duration_since(sent));
            self.state.matches += 1;
            self.state.latencies.push(latency);
            self.state.cycle = Cycle::Matched;
            info!("frame {number} matched after {:.3} s", latency.as_secs_f64());
        } else {
            self.state.mismatches += 1;
            self.state.cycle = Cycle::Mismatched;
            warn!("frame {number} came back different");
            debug!("expected {:02x?}", self.state.pending);
            debug!("received {body:02x?}");
        }
    }
}
