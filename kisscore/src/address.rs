use core::fmt::{self, Display};

/// Size of one address field in an AX.25 header.
pub const ADDRESS_LEN: usize = 7;

/// Callsigns are space-padded to exactly this many characters.
pub const CALLSIGN_LEN: usize = 6;

/// Largest SSID accepted from text. Only the low 4 bits reach the wire.
pub const SSID_MAX: u8 = 16;

/// Bits 5 and 6 of the SSID byte are reserved and transmitted as ones.
pub const RESERVED_BITS: u8 = 0b11;

/// Characters that may appear in a callsign created from text.
pub static ALPHABET: [u8; 36] = [
    b'A', b'B', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'J', b'K', b'L', b'M', b'N', b'O', b'P',
    b'Q', b'R', b'S', b'T', b'U', b'V', b'W', b'X', b'Y', b'Z', b'0', b'1', b'2', b'3', b'4', b'5',
    b'6', b'7', b'8', b'9',
];

/// ASCII representation of a callsign, padded with spaces to 6 characters.
///
/// Callsigns decoded off the air are not validated against `ALPHABET` so they may
/// contain anything a sender chose to put there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callsign(pub [u8; CALLSIGN_LEN]);

impl Callsign {
    /// Characters of the callsign without trailing padding.
    pub fn trimmed(&self) -> &[u8] {
        let end = self
            .0
            .iter()
            .rposition(|c| *c != b' ' && *c != 0)
            .map_or(0, |p| p + 1);
        &self.0[..end]
    }
}

impl Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.trimmed() {
            write!(f, "{}", *c as char)?;
        }
        Ok(())
    }
}

/// One 7-byte address field of an AX.25 header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub callsign: Callsign,
    pub ssid: u8,
    /// Command/response bit on the destination and source, has-been-repeated bit on a repeater.
    pub ch: bool,
    /// Reserved bits 5 and 6 of the SSID byte.
    pub reserved: u8,
    /// Extension bit: set only on the final address of a header.
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    EmptyCallsign,
    CallsignTooLong,
    InvalidCharacter(char),
    RepeatedHyphen,
    InvalidSsid,
}

impl Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::EmptyCallsign => write!(f, "callsign is empty"),
            AddressError::CallsignTooLong => write!(f, "callsign is longer than 6 characters"),
            AddressError::InvalidCharacter(c) => {
                write!(f, "character '{c}' is not allowed in a callsign")
            }
            AddressError::RepeatedHyphen => write!(f, "more than one hyphen"),
            AddressError::InvalidSsid => write!(f, "SSID must be one or two digits"),
        }
    }
}

impl Address {
    pub fn new(callsign: Callsign, ssid: u8) -> Self {
        Self {
            callsign,
            ssid: ssid.min(SSID_MAX),
            ch: false,
            reserved: RESERVED_BITS,
            last: false,
        }
    }

    /// Parse `CALL` or `CALL-SSID`. A missing SSID is 0.
    pub fn from_callsign(text: &str) -> Result<Self, AddressError> {
        Self::parse(text, 0)
    }

    /// Parse `CALL` or `CALL-SSID`, using `default_ssid` when no SSID digits are given.
    ///
    /// Input is uppercased. SSIDs are clamped to `SSID_MAX`.
    pub fn parse(text: &str, default_ssid: u8) -> Result<Self, AddressError> {
        let mut callsign = [b' '; CALLSIGN_LEN];
        let mut len = 0;
        let mut digits = [0u8; 2];
        let mut digit_count = 0;
        let mut reading_ssid = false;

        for c in text.chars().map(|c| c.to_ascii_uppercase()) {
            if !reading_ssid {
                if c == '-' {
                    reading_ssid = true;
                } else if len == CALLSIGN_LEN {
                    return Err(AddressError::CallsignTooLong);
                } else if c.is_ascii() && ALPHABET.contains(&(c as u8)) {
                    callsign[len] = c as u8;
                    len += 1;
                } else {
                    return Err(AddressError::InvalidCharacter(c));
                }
                continue;
            }
            if c == '-' {
                return Err(AddressError::RepeatedHyphen);
            }
            let Some(d) = c.to_digit(10) else {
                return Err(AddressError::InvalidSsid);
            };
            if digit_count == digits.len() {
                return Err(AddressError::InvalidSsid);
            }
            digits[digit_count] = d as u8;
            digit_count += 1;
        }

        if len == 0 {
            return Err(AddressError::EmptyCallsign);
        }
        let ssid = match digit_count {
            0 => default_ssid,
            1 => digits[0],
            _ => digits[0] * 10 + digits[1],
        };
        Ok(Self::new(Callsign(callsign), ssid))
    }

    pub fn to_bytes(&self) -> [u8; ADDRESS_LEN] {
        let mut out = [0u8; ADDRESS_LEN];
        for (o, c) in out.iter_mut().zip(self.callsign.0.iter()) {
            *o = c << 1;
        }
        out[6] = (u8::from(self.ch) << 7)
            | ((self.reserved & 0b11) << 5)
            | ((self.ssid & 0x0f) << 1)
            | u8::from(self.last);
        out
    }

    pub fn from_bytes(encoded: &[u8; ADDRESS_LEN]) -> Self {
        let mut callsign = [b' '; CALLSIGN_LEN];
        for (c, e) in callsign.iter_mut().zip(encoded.iter()) {
            *c = e >> 1;
        }
        let ssid_byte = encoded[6];
        Self {
            callsign: Callsign(callsign),
            ssid: (ssid_byte >> 1) & 0x0f,
            ch: ssid_byte & 0x80 != 0,
            reserved: (ssid_byte >> 5) & 0b11,
            last: ssid_byte & 0x01 != 0,
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.callsign, self.ssid)
    }
}
