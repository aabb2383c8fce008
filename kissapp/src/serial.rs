use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use log::{info, warn};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::channel::Channel;
use crate::error::KissTestError;

/// Read timeout on the receive side of the loopback harness and for monitoring.
pub const RX_TIMEOUT: Duration = Duration::from_millis(100);

/// Read timeout on paths that expect a synchronous reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// A serial port configured 8N1 without flow control.
pub struct SerialChannel {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialChannel {
    pub fn available_ports() -> impl Iterator<Item = String> {
        serialport::available_ports()
            .unwrap_or_else(|_| vec![])
            .into_iter()
            .map(|i| i.port_name)
    }

    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, KissTestError> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|source| KissTestError::PortOpen {
                port: port_name.to_owned(),
                source,
            })?;
        info!("opened port {port_name} at {baud_rate} baud");
        Ok(Self {
            name: port_name.to_owned(),
            port: Some(port),
        })
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::NotConnected, "serial port is closed"))
    }
}

/// Open the transmit and receive ports of a loopback test.
///
/// The transmit port is closed again if the receive port cannot be opened.
pub fn open_pair(
    tx_name: &str,
    tx_baud: u32,
    rx_name: &str,
    rx_baud: u32,
) -> Result<(SerialChannel, SerialChannel), KissTestError> {
    let mut tx = SerialChannel::open(tx_name, tx_baud, DEFAULT_TIMEOUT)?;
    match SerialChannel::open(rx_name, rx_baud, RX_TIMEOUT) {
        Ok(rx) => Ok((tx, rx)),
        Err(e) => {
            if let Err(close_err) = tx.close() {
                warn!("error closing {tx_name}: {close_err}");
            }
            Err(e)
        }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port()?.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port()?.flush()
    }
}

impl Channel for SerialChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) -> Result<(), KissTestError> {
        // dropping the handle releases the device
        if let Some(mut port) = self.port.take() {
            port.flush()?;
            info!("closed port {}", self.name);
        }
        Ok(())
    }
}
