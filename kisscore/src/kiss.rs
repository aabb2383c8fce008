use alloc::vec::Vec;
use log::warn;

// The type byte is escaped like the payload. Otherwise a data frame on port 12 (0xC0) would
// read as an empty frame followed by a frame that has lost its type byte.

pub const FEND: u8 = 0xC0;
pub const FESC: u8 = 0xDB;
pub const TFEND: u8 = 0xDC;
pub const TFESC: u8 = 0xDD;

/// KISS type byte of a data frame on port 0.
pub const DATA_FRAME_PORT0: u8 = 0x00;

/// Longest decoded frame the decoder will accumulate, type byte included.
pub const MAX_FRAME_LEN: usize = 2048;

/// Type byte of the Return command, which carries no port number.
const RETURN_TYPE_BYTE: u8 = 0xFF;

/// Holder for one KISS frame in wire form, delimiters included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KissFrame {
    data: Vec<u8>,
}

impl KissFrame {
    /// Frame an arbitrary payload behind the given type byte.
    pub fn new(type_byte: u8, payload: &[u8]) -> Self {
        Self {
            data: encode(type_byte, payload),
        }
    }

    /// Request to transmit a data frame (normally AX.25) on the given port.
    pub fn new_data_frame(port: u8, payload: &[u8]) -> Self {
        Self::new(
            kiss_header(port, KissCommand::DataFrame.proto_value()),
            payload,
        )
    }

    /// Request to set the TxDelay, in units of 10 ms
    pub fn new_set_tx_delay(port: u8, units: u8) -> Self {
        Self::new(kiss_header(port, KissCommand::TxDelay.proto_value()), &[units])
    }

    /// Persistence P, where the TNC keys up with probability (P+1)/256
    pub fn new_set_p(port: u8, value: u8) -> Self {
        Self::new(kiss_header(port, KissCommand::P.proto_value()), &[value])
    }

    /// Request to set the slot interval, in units of 10 ms
    pub fn new_set_slot_time(port: u8, units: u8) -> Self {
        Self::new(kiss_header(port, KissCommand::SlotTime.proto_value()), &[units])
    }

    /// Request to set the TxTail, in units of 10 ms
    pub fn new_set_tx_tail(port: u8, units: u8) -> Self {
        Self::new(kiss_header(port, KissCommand::TxTail.proto_value()), &[units])
    }

    /// Full duplex TNCs transmit without waiting for a clear channel
    pub fn new_set_full_duplex(port: u8, full_duplex: bool) -> Self {
        Self::new(
            kiss_header(port, KissCommand::FullDuplex.proto_value()),
            &[u8::from(full_duplex)],
        )
    }

    /// Vendor-specific hardware configuration. The meaning of `value` is up to the TNC.
    pub fn new_set_hardware(port: u8, value: &[u8]) -> Self {
        Self::new(
            kiss_header(port, KissCommand::SetHardware.proto_value()),
            value,
        )
    }

    /// Ask the TNC to leave KISS mode.
    pub fn new_return() -> Self {
        Self::new(RETURN_TYPE_BYTE, &[])
    }

    /// Command named by the low nibble of the type byte.
    pub fn command(&self) -> Result<KissCommand, KissError> {
        KissCommand::from_type_byte(self.type_byte()?)
    }

    /// KISS port from the high nibble of the type byte.
    pub fn port(&self) -> Result<u8, KissError> {
        Ok(self.type_byte()? >> 4)
    }

    /// Unescaped bytes following the type byte.
    pub fn decode_payload(&self) -> Result<Vec<u8>, KissError> {
        let mut frame = self.decoded()?;
        frame.remove(0);
        Ok(frame)
    }

    /// Wire form, ready to write to a port
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn type_byte(&self) -> Result<u8, KissError> {
        self.decoded()?
            .first()
            .copied()
            .ok_or(KissError::MalformedKissFrame)
    }

    /// The first complete frame in `data`, type byte included. Never empty.
    fn decoded(&self) -> Result<Vec<u8>, KissError> {
        KissDecoder::new()
            .feed(&self.data)
            .into_iter()
            .next()
            .ok_or(KissError::MalformedKissFrame)
    }
}

pub fn kiss_header(port: u8, command: u8) -> u8 {
    ((port & 0x0f) << 4) | (command & 0x0f)
}

/// Split a decoded frame into its KISS type byte and the remaining body.
pub fn split_type_byte(frame: &[u8]) -> Option<(u8, &[u8])> {
    frame.split_first().map(|(t, body)| (*t, body))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KissCommand {
    DataFrame,
    TxDelay,
    P,
    SlotTime,
    TxTail,
    FullDuplex,
    SetHardware,
    Return,
}

impl KissCommand {
    pub fn from_type_byte(type_byte: u8) -> Result<Self, KissError> {
        if type_byte == RETURN_TYPE_BYTE {
            return Ok(KissCommand::Return);
        }
        Ok(match type_byte & 0x0f {
            0 => KissCommand::DataFrame,
            1 => KissCommand::TxDelay,
            2 => KissCommand::P,
            3 => KissCommand::SlotTime,
            4 => KissCommand::TxTail,
            5 => KissCommand::FullDuplex,
            6 => KissCommand::SetHardware,
            _ => return Err(KissError::UnsupportedKissCommand),
        })
    }

    pub fn proto_value(&self) -> u8 {
        match self {
            KissCommand::DataFrame => 0,
            KissCommand::TxDelay => 1,
            KissCommand::P => 2,
            KissCommand::SlotTime => 3,
            KissCommand::TxTail => 4,
            KissCommand::FullDuplex => 5,
            KissCommand::SetHardware => 6,
            KissCommand::Return => RETURN_TYPE_BYTE,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum KissError {
    MalformedKissFrame,
    UnsupportedKissCommand,
}

/// Produce the wire form `FEND, type_byte, <escaped payload>, FEND`.
pub fn encode(type_byte: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.push(FEND);
    escape(&[type_byte], &mut out);
    escape(payload, &mut out);
    out.push(FEND);
    out
}

fn escape(src: &[u8], dst: &mut Vec<u8>) {
    for b in src {
        match *b {
            FEND => dst.extend_from_slice(&[FESC, TFEND]),
            FESC => dst.extend_from_slice(&[FESC, TFESC]),
            b => dst.push(b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Idle,
    Escaped,
    /// Skipping the rest of an oversized frame until the next FEND.
    Discarding,
}

/// Incremental KISS decoder for bytes arriving one at a time from a stream.
///
/// Completed frames still begin with their KISS type byte.
#[derive(Debug)]
pub struct KissDecoder {
    buffer: Vec<u8>,
    state: DecoderState,
    framing_errors: u64,
    oversized_frames: u64,
}

impl Default for KissDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KissDecoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: DecoderState::Idle,
            framing_errors: 0,
            oversized_frames: 0,
        }
    }

    /// Decode one byte, returning the frame it completes, if any.
    ///
    /// A FEND with nothing accumulated is only a boundary and never yields an empty frame.
    /// A frame growing past `MAX_FRAME_LEN` is dropped along with the rest of its bytes.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        match (self.state, byte) {
            (DecoderState::Idle, FESC) => self.state = DecoderState::Escaped,
            (DecoderState::Idle, FEND) => {
                if !self.buffer.is_empty() {
                    return Some(core::mem::take(&mut self.buffer));
                }
            }
            (DecoderState::Idle, b) => self.append(b),
            (DecoderState::Escaped, TFESC) => {
                self.state = DecoderState::Idle;
                self.append(FESC);
            }
            (DecoderState::Escaped, TFEND) => {
                self.state = DecoderState::Idle;
                self.append(FEND);
            }
            (DecoderState::Escaped, b) => {
                warn!("dropping invalid byte {b:#04x} after FESC");
                self.framing_errors += 1;
                self.state = DecoderState::Idle;
            }
            (DecoderState::Discarding, FEND) => self.state = DecoderState::Idle,
            (DecoderState::Discarding, _) => (),
        }
        None
    }

    fn append(&mut self, byte: u8) {
        if self.buffer.len() < MAX_FRAME_LEN {
            self.buffer.push(byte);
            return;
        }
        warn!("dropping frame longer than {MAX_FRAME_LEN} bytes");
        self.oversized_frames += 1;
        self.buffer.clear();
        self.state = DecoderState::Discarding;
    }

    /// Decode a run of bytes, returning every frame completed along the way.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        bytes.iter().filter_map(|b| self.push(*b)).collect()
    }

    /// Number of bytes accumulated towards the next frame.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Count of escape sequences that were dropped as protocol violations.
    pub fn framing_errors(&self) -> u64 {
        self.framing_errors
    }

    /// Count of frames dropped for exceeding `MAX_FRAME_LEN`.
    pub fn oversized_frames(&self) -> u64 {
        self.oversized_frames
    }

    /// Discard any partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn escaped(src: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        escape(src, &mut buf);
        buf
    }

    fn unescape(src: &[u8]) -> Vec<u8> {
        let mut decoder = KissDecoder::new();
        for b in src {
            decoder.push(*b);
        }
        decoder.buffer
    }

    #[test]
    fn escaping() {
        assert_eq!(escaped(&[0x10, 0x20, 0x30]), [0x10, 0x20, 0x30]);
        assert_eq!(escaped(&[TFEND, TFESC, 0x7e]), [TFEND, TFESC, 0x7e]);
        assert_eq!(escaped(&[0x41, FEND, 0x42]), [0x41, FESC, TFEND, 0x42]);
        assert_eq!(escaped(&[0x41, 0x42, FESC]), [0x41, 0x42, FESC, TFESC]);
    }

    #[test]
    fn unescaping() {
        assert_eq!(unescape(&[0x10, 0x20, 0x30]), [0x10, 0x20, 0x30]);
        assert_eq!(unescape(&[TFEND, TFESC, 0x7e]), [TFEND, TFESC, 0x7e]);
        assert_eq!(unescape(&[0x41, FESC, TFEND, 0x42]), [0x41, FEND, 0x42]);
        assert_eq!(unescape(&[0x41, 0x42, FESC, TFESC]), [0x41, 0x42, FESC]);
    }

    #[test]
    fn data_frame_roundtrip() {
        let f = KissFrame::new_data_frame(2, &[0x41, FEND, 0x42]);
        assert_eq!(f.as_bytes(), &[FEND, 0x20, 0x41, FESC, TFEND, 0x42, FEND]);
        assert_eq!(f.decode_payload().unwrap(), &[0x41, FEND, 0x42]);
        assert_eq!(f.command(), Ok(KissCommand::DataFrame));
        assert_eq!(f.port(), Ok(2));
    }

    #[test]
    fn command_frames() {
        assert_eq!(
            KissFrame::new_set_tx_delay(0, 50).as_bytes(),
            &[FEND, 0x01, 50, FEND]
        );
        assert_eq!(
            KissFrame::new_set_p(1, 63).as_bytes(),
            &[FEND, 0x12, 63, FEND]
        );
        assert_eq!(
            KissFrame::new_set_slot_time(0, 10).as_bytes(),
            &[FEND, 0x03, 10, FEND]
        );
        assert_eq!(
            KissFrame::new_set_tx_tail(0, 2).as_bytes(),
            &[FEND, 0x04, 2, FEND]
        );
        assert_eq!(
            KissFrame::new_set_full_duplex(0, true).as_bytes(),
            &[FEND, 0x05, 1, FEND]
        );
        assert_eq!(
            KissFrame::new_set_hardware(0, &[0xF0, 0x00]).as_bytes(),
            &[FEND, 0x06, 0xF0, 0x00, FEND]
        );
        let ret = KissFrame::new_return();
        assert_eq!(ret.as_bytes(), &[FEND, 0xFF, FEND]);
        assert_eq!(ret.command(), Ok(KissCommand::Return));
        assert_eq!(
            KissFrame::new(0x07, &[]).command(),
            Err(KissError::UnsupportedKissCommand)
        );
    }

    #[test]
    fn decode_inverts_encode() {
        let all_bytes: Vec<u8> = (0x00..=0xFF).collect();
        let payloads: [&[u8]; 6] = [
            &[],
            &[FEND],
            &[FESC],
            &[FESC, FEND, FESC, FEND],
            &[TFEND, FESC, TFESC, FEND, 0x00, FESC, FESC],
            &all_bytes,
        ];
        for payload in payloads {
            let mut decoder = KissDecoder::new();
            let frames = decoder.feed(&encode(0x00, payload));
            assert_eq!(frames.len(), 1);
            let (type_byte, body) = split_type_byte(&frames[0]).unwrap();
            assert_eq!(type_byte, 0x00);
            assert_eq!(body, payload);
        }
    }

    #[test]
    fn escape_adds_one_byte_per_special() {
        let payload = [0x41, FEND, 0x42, FESC, FESC, 0x00, TFEND, TFESC, FEND];
        let specials = payload.iter().filter(|b| **b == FEND || **b == FESC).count();
        assert_eq!(specials, 4);
        assert_eq!(encode(0x00, &payload).len(), payload.len() + 3 + specials);

        let plain = [0x41, 0x42, TFEND, TFESC];
        assert_eq!(encode(0x00, &plain).len(), plain.len() + 3);
    }

    #[test]
    fn empty_frames_are_not_emitted() {
        let mut decoder = KissDecoder::new();
        assert!(decoder.feed(&[FEND, FEND, FEND]).is_empty());
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn back_to_back_frames() {
        let mut decoder = KissDecoder::new();
        let frames = decoder.feed(&[FEND, 0x00, 0x41, FEND, 0x00, 0x42, FEND]);
        assert_eq!(frames, vec![vec![0x00, 0x41], vec![0x00, 0x42]]);
    }

    #[test]
    fn frame_split_across_pushes() {
        let wire = encode(0x00, &[0x10, FEND, 0x20]);
        let mut decoder = KissDecoder::new();
        let (first, second) = wire.split_at(4);
        assert!(decoder.feed(first).is_empty());
        assert!(decoder.pending_len() > 0);
        assert_eq!(decoder.feed(second), vec![vec![0x00, 0x10, FEND, 0x20]]);
    }

    #[test]
    fn invalid_escape_is_dropped() {
        let mut decoder = KissDecoder::new();
        let frames = decoder.feed(&[FEND, 0x00, 0x41, FESC, 0x42, 0x43, FEND]);
        assert_eq!(frames, vec![vec![0x00, 0x41, 0x43]]);
        assert_eq!(decoder.framing_errors(), 1);
    }

    #[test]
    fn random_payloads_survive_encoding() {
        let mut rng = StdRng::seed_from_u64(0x4b495353);
        let alphabet = [FEND, FESC, TFEND, TFESC, 0x00, 0x41, 0xFF];
        for _ in 0..2000 {
            let len = rng.gen_range(0..300);
            let payload: Vec<u8> = (0..len)
                .map(|_| {
                    if rng.gen_bool(0.5) {
                        alphabet[rng.gen_range(0..alphabet.len())]
                    } else {
                        rng.r#gen()
                    }
                })
                .collect();
            let type_byte = rng.r#gen();
            let wire = encode(type_byte, &payload);

            let specials = payload.iter().filter(|b| **b == FEND || **b == FESC).count();
            let type_extra = usize::from(type_byte == FEND || type_byte == FESC);
            assert_eq!(wire.len(), payload.len() + 3 + specials + type_extra);

            let mut decoder = KissDecoder::new();
            let frames = decoder.feed(&wire);
            assert_eq!(frames.len(), 1);
            assert_eq!(split_type_byte(&frames[0]), Some((type_byte, payload.as_slice())));
        }
    }

    #[test]
    fn ports_colliding_with_delimiters() {
        let on_port_12 = KissFrame::new_data_frame(12, &[0x82, 0x84]);
        assert_eq!(on_port_12.as_bytes(), &[FEND, FESC, TFEND, 0x82, 0x84, FEND]);
        assert_eq!(on_port_12.port(), Ok(12));
        assert_eq!(on_port_12.command(), Ok(KissCommand::DataFrame));
        assert_eq!(on_port_12.decode_payload().unwrap(), &[0x82, 0x84]);

        let mut decoder = KissDecoder::new();
        assert_eq!(decoder.feed(on_port_12.as_bytes()), vec![vec![FEND, 0x82, 0x84]]);

        // port 13 with the (unassigned) command 0x0B is FESC
        let on_port_13 = KissFrame::new(kiss_header(13, 0x0B), &[0x01]);
        assert_eq!(on_port_13.as_bytes(), &[FEND, FESC, TFESC, 0x01, FEND]);
        assert_eq!(on_port_13.port(), Ok(13));
        assert_eq!(kiss_header(0x1C, 0x00), 0xC0);
    }

    #[test]
    fn oversized_frame_is_dropped() {
        let mut decoder = KissDecoder::new();
        let mut wire = vec![FEND];
        wire.extend(core::iter::repeat_n(0x41, MAX_FRAME_LEN + 500));
        wire.extend([FEND, 0x00, 0x42, FEND]);
        let frames = decoder.feed(&wire);
        assert_eq!(frames, vec![vec![0x00, 0x42]]);
        assert_eq!(decoder.oversized_frames(), 1);
        assert_eq!(decoder.pending_len(), 0);

        for _ in 0..2_000_000 {
            decoder.push(0x41);
        }
        assert!(decoder.pending_len() <= MAX_FRAME_LEN);
        assert_eq!(decoder.oversized_frames(), 2);
    }

    #[test]
    fn frame_of_exactly_max_len_is_kept() {
        let mut decoder = KissDecoder::new();
        let payload = vec![0x41; MAX_FRAME_LEN - 1];
        let frames = decoder.feed(&encode(0x00, &payload));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), MAX_FRAME_LEN);
        assert_eq!(decoder.oversized_frames(), 0);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut decoder = KissDecoder::new();
        decoder.feed(&[FEND, 0x00, 0x41, FESC]);
        decoder.reset();
        assert_eq!(decoder.feed(&[TFEND, FEND]), vec![vec![TFEND]]);
    }
}
