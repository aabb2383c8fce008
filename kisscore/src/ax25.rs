//! Just enough AX.25 to build test frames and describe received ones.
//!
//! Header decoding is best-effort. It is used for display only, so malformed input yields
//! missing fields rather than an error.

use alloc::vec::Vec;
use core::fmt::{self, Display};
use log::debug;

use crate::address::{ADDRESS_LEN, Address};

pub const CONTROL_UI: u8 = 0x03;
pub const CONTROL_TEST: u8 = 0xE3;
pub const PID_NO_LAYER3: u8 = 0xF0;

const POLL_FINAL: u8 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisoryKind {
    ReceiveReady,
    ReceiveNotReady,
    Reject,
    SelectiveReject,
}

impl SupervisoryKind {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            SupervisoryKind::ReceiveReady => "RR",
            SupervisoryKind::ReceiveNotReady => "RNR",
            SupervisoryKind::Reject => "REJ",
            SupervisoryKind::SelectiveReject => "SREJ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnnumberedKind {
    Sabme,
    Sabm,
    Disc,
    Dm,
    Ua,
    Frmr,
    Ui,
    Xid,
    Test,
    Unknown(u8),
}

impl UnnumberedKind {
    /// Classify an unnumbered control byte, ignoring the poll/final bit.
    pub fn from_control(control: u8) -> Self {
        match control & !POLL_FINAL {
            0x6F => UnnumberedKind::Sabme,
            0x2F => UnnumberedKind::Sabm,
            0x43 => UnnumberedKind::Disc,
            0x0F => UnnumberedKind::Dm,
            0x63 => UnnumberedKind::Ua,
            0x87 => UnnumberedKind::Frmr,
            0x03 => UnnumberedKind::Ui,
            0xAF => UnnumberedKind::Xid,
            0xE3 => UnnumberedKind::Test,
            c => UnnumberedKind::Unknown(c),
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            UnnumberedKind::Sabme => "SABME",
            UnnumberedKind::Sabm => "SABM",
            UnnumberedKind::Disc => "DISC",
            UnnumberedKind::Dm => "DM",
            UnnumberedKind::Ua => "UA",
            UnnumberedKind::Frmr => "FRMR",
            UnnumberedKind::Ui => "UI",
            UnnumberedKind::Xid => "XID",
            UnnumberedKind::Test => "TEST",
            UnnumberedKind::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Information { ns: u8, nr: u8, poll: bool },
    Supervisory { kind: SupervisoryKind, nr: u8, poll: bool },
    Unnumbered { kind: UnnumberedKind, poll: bool },
}

impl Control {
    pub fn from_byte(control: u8) -> Self {
        let poll = control & POLL_FINAL != 0;
        let nr = (control >> 5) & 0x07;
        if control & 0x01 == 0 {
            return Control::Information {
                ns: (control >> 1) & 0x07,
                nr,
                poll,
            };
        }
        if control & 0x03 == 0x01 {
            let kind = match (control >> 2) & 0x03 {
                0 => SupervisoryKind::ReceiveReady,
                1 => SupervisoryKind::ReceiveNotReady,
                2 => SupervisoryKind::Reject,
                _ => SupervisoryKind::SelectiveReject,
            };
            return Control::Supervisory { kind, nr, poll };
        }
        Control::Unnumbered {
            kind: UnnumberedKind::from_control(control),
            poll,
        }
    }

    /// Information and UI frames carry a PID byte after the control field.
    pub fn has_pid(&self) -> bool {
        matches!(
            self,
            Control::Information { .. }
                | Control::Unnumbered {
                    kind: UnnumberedKind::Ui,
                    ..
                }
        )
    }
}

impl Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Information { ns, nr, .. } => write!(f, "I ns={ns} nr={nr}"),
            Control::Supervisory { kind, nr, .. } => write!(f, "{} nr={nr}", kind.mnemonic()),
            Control::Unnumbered { kind, .. } => write!(f, "{}", kind.mnemonic()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pid {
    Iso8208,
    CompressedTcpIp,
    UncompressedTcpIp,
    SegmentationFragment,
    Texnet,
    LinkQuality,
    AppleTalk,
    AppleTalkArp,
    ArpaIp,
    ArpaArp,
    NetRom,
    NoLayer3,
    Escape,
    Unknown(u8),
}

impl From<u8> for Pid {
    fn from(byte: u8) -> Self {
        match byte {
            0x01 => Pid::Iso8208,
            0x06 => Pid::CompressedTcpIp,
            0x07 => Pid::UncompressedTcpIp,
            0x08 => Pid::SegmentationFragment,
            0xC3 => Pid::Texnet,
            0xC4 => Pid::LinkQuality,
            0xCA => Pid::AppleTalk,
            0xCB => Pid::AppleTalkArp,
            0xCC => Pid::ArpaIp,
            0xCD => Pid::ArpaArp,
            0xCF => Pid::NetRom,
            0xF0 => Pid::NoLayer3,
            0xFF => Pid::Escape,
            other => Pid::Unknown(other),
        }
    }
}

impl Pid {
    pub fn name(&self) -> &'static str {
        match self {
            Pid::Iso8208 => "ISO 8208",
            Pid::CompressedTcpIp => "Compressed TCP/IP",
            Pid::UncompressedTcpIp => "Uncompressed TCP/IP",
            Pid::SegmentationFragment => "Segmentation Fragment",
            Pid::Texnet => "TEXNET",
            Pid::LinkQuality => "Link Quality Protocol",
            Pid::AppleTalk => "AppleTalk",
            Pid::AppleTalkArp => "AppleTalk ARP",
            Pid::ArpaIp => "ARPA Internet Protocol",
            Pid::ArpaArp => "ARPA Address Resolution",
            Pid::NetRom => "NET/ROM",
            Pid::NoLayer3 => "No Layer 3",
            Pid::Escape => "Escape",
            Pid::Unknown(_) => "unknown protocol",
        }
    }
}

/// Role of a frame according to the C bits of its destination and source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResponse {
    Command,
    Response,
    /// Both bits equal, as sent by AX.25 1.x stations.
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Header {
    /// Destination, source, then any repeaters in order.
    pub addresses: Vec<Address>,
    pub control_byte: Option<u8>,
    pub control: Option<Control>,
    pub pid_byte: Option<u8>,
    pub pid: Option<Pid>,
    /// Index of the first byte after the header.
    pub payload_offset: usize,
}

impl Ax25Header {
    pub fn destination(&self) -> Option<&Address> {
        self.addresses.first()
    }

    pub fn source(&self) -> Option<&Address> {
        self.addresses.get(1)
    }

    pub fn via(&self) -> &[Address] {
        self.addresses.get(2..).unwrap_or(&[])
    }

    pub fn command_response(&self) -> Option<CommandResponse> {
        let (dst, src) = (self.destination()?, self.source()?);
        Some(match (dst.ch, src.ch) {
            (true, false) => CommandResponse::Command,
            (false, true) => CommandResponse::Response,
            _ => CommandResponse::Legacy,
        })
    }
}

impl Display for Ax25Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, address) in self.addresses.iter().enumerate() {
            match i {
                0 => write!(f, "To:{address}")?,
                1 => write!(f, ", From:{address}")?,
                _ => {
                    write!(f, ", Via:{address}")?;
                    if address.ch {
                        write!(f, "*")?;
                    }
                }
            }
        }
        if let (Some(byte), Some(control)) = (self.control_byte, self.control) {
            write!(f, ", Control: {byte:#04x} {control}")?;
        }
        if let (Some(byte), Some(pid)) = (self.pid_byte, self.pid) {
            write!(f, ", PID: {byte:#04x} {}", pid.name())?;
        }
        Ok(())
    }
}

/// Walk the address, control and PID fields of an AX.25 frame with its KISS type byte removed.
pub fn decode_header(frame: &[u8]) -> Ax25Header {
    let mut header = Ax25Header {
        addresses: Vec::new(),
        control_byte: None,
        control: None,
        pid_byte: None,
        pid: None,
        payload_offset: frame.len(),
    };

    let mut offset = 0;
    let mut complete = false;
    while let Some(field) = frame[offset..].first_chunk::<ADDRESS_LEN>() {
        let address = Address::from_bytes(field);
        offset += ADDRESS_LEN;
        complete = address.last;
        header.addresses.push(address);
        if complete {
            break;
        }
    }
    if !complete {
        debug!(
            "address field truncated after {} addresses",
            header.addresses.len()
        );
        return header;
    }

    let Some(&control_byte) = frame.get(offset) else {
        return header;
    };
    offset += 1;
    let control = Control::from_byte(control_byte);
    header.control_byte = Some(control_byte);
    header.control = Some(control);

    if control.has_pid() {
        let Some(&pid_byte) = frame.get(offset) else {
            return header;
        };
        offset += 1;
        header.pid_byte = Some(pid_byte);
        header.pid = Some(Pid::from(pid_byte));
    }

    header.payload_offset = offset;
    header
}

/// An AX.25 command frame ready to be serialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Frame {
    pub destination: Address,
    pub source: Address,
    pub via: Vec<Address>,
    pub control: u8,
    pub pid: Option<u8>,
    pub info: Vec<u8>,
}

impl Ax25Frame {
    /// TEST frame in the form the loopback harness sends, with a No Layer 3 PID byte.
    pub fn new_test(destination: Address, source: Address, info: &[u8]) -> Self {
        Self {
            destination,
            source,
            via: Vec::new(),
            control: CONTROL_TEST,
            pid: Some(PID_NO_LAYER3),
            info: info.to_vec(),
        }
    }

    pub fn new_ui(destination: Address, source: Address, info: &[u8]) -> Self {
        Self {
            destination,
            source,
            via: Vec::new(),
            control: CONTROL_UI,
            pid: Some(PID_NO_LAYER3),
            info: info.to_vec(),
        }
    }

    /// Serialise as a command frame: C bit set on the destination, clear on the source,
    /// extension bit on whichever address comes last.
    pub fn to_bytes(&self) -> Vec<u8> {
        let address_count = 2 + self.via.len();
        let mut out = Vec::with_capacity(address_count * ADDRESS_LEN + 2 + self.info.len());

        let mut destination = self.destination.clone();
        destination.ch = true;
        destination.last = false;
        out.extend_from_slice(&destination.to_bytes());

        let mut source = self.source.clone();
        source.ch = false;
        source.last = self.via.is_empty();
        out.extend_from_slice(&source.to_bytes());

        for (i, repeater) in self.via.iter().enumerate() {
            let mut repeater = repeater.clone();
            repeater.last = i == self.via.len() - 1;
            out.extend_from_slice(&repeater.to_bytes());
        }

        out.push(self.control);
        if let Some(pid) = self.pid {
            out.push(pid);
        }
        out.extend_from_slice(&self.info);
        out
    }
}
