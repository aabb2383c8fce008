use std::time::Duration;

use kisscore::address::AddressError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KissTestError {
    #[error("baud rate '{0}' is not a positive integer")]
    InvalidBaudRate(String),

    #[error("frame count '{0}' is not a positive integer")]
    InvalidFrameCount(String),

    #[error("payload length '{0}' is not a non-negative integer")]
    InvalidPayloadLength(String),

    #[error("frame interval '{0}' is not a non-negative number of seconds")]
    InvalidInterval(String),

    #[error("parameter value '{0}' is not an integer from 0 to 255")]
    InvalidParameter(String),

    #[error("serial number '{0}' is not 8 ASCII characters")]
    InvalidSerialNumber(String),

    #[error("command '{0}' requires a value")]
    MissingParameter(String),

    #[error("unable to open serial port '{port}': {source}")]
    PortOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("callsign '{callsign}' is invalid: {reason}")]
    InvalidCallsignFormat {
        callsign: String,
        reason: AddressError,
    },

    #[error("no reply from the TNC within {0:?}")]
    ReplyTimeout(Duration),

    #[error("channel '{0}' has been closed")]
    ChannelClosed(String),

    #[error("I/O error on channel: {0}")]
    Io(#[from] std::io::Error),
}
