use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use kissapp::channel::{Channel, write_frame};
use kissapp::config::{parse_baud_rate, parse_byte_value};
use kissapp::error::KissTestError;
use kissapp::serial::{DEFAULT_TIMEOUT, SerialChannel};
use kissapp::util::hexdump::hexdump;
use kisscore::kiss::KissFrame;
use log::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Command {
    /// Keyup delay in units of 10 ms
    Txdelay,
    /// Persistence, 0 to 255
    P,
    /// Slot interval in units of 10 ms
    Slottime,
    /// Time to hold transmit after the frame, in units of 10 ms
    Txtail,
    /// 0 for half duplex, anything else for full duplex
    Fullduplex,
    /// Vendor-specific configuration bytes
    Sethardware,
    /// Leave KISS mode
    Return,
}

#[derive(Parser)]
#[command(about = "Send a KISS parameter command to a TNC")]
struct Args {
    #[arg(help = "Serial device connected to the TNC")]
    device: String,
    #[arg(value_parser = parse_baud_rate, help = "Baud rate")]
    baud: u32,
    #[arg(value_enum, help = "Parameter to set")]
    command: Command,
    #[arg(value_parser = parse_byte_value, help = "Value from 0 to 255, several for sethardware")]
    values: Vec<u8>,
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..16), help = "KISS port")]
    port: u8,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), KissTestError> {
    let frame = build_frame(args.command, args.port, &args.values)?;
    let mut channel = SerialChannel::open(&args.device, args.baud, DEFAULT_TIMEOUT)?;
    let result = write_frame(&mut channel, &frame);
    channel.close()?;
    result?;
    info!("sent {:?} to {}", args.command, args.device);
    print!("{}", hexdump(frame.as_bytes()));
    Ok(())
}

fn build_frame(command: Command, port: u8, values: &[u8]) -> Result<KissFrame, KissTestError> {
    Ok(match command {
        Command::Txdelay => KissFrame::new_set_tx_delay(port, required(command, values)?),
        Command::P => KissFrame::new_set_p(port, required(command, values)?),
        Command::Slottime => KissFrame::new_set_slot_time(port, required(command, values)?),
        Command::Txtail => KissFrame::new_set_tx_tail(port, required(command, values)?),
        Command::Fullduplex => KissFrame::new_set_full_duplex(port, required(command, values)? != 0),
        Command::Sethardware => KissFrame::new_set_hardware(port, values),
        Command::Return => KissFrame::new_return(),
    })
}

fn required(command: Command, values: &[u8]) -> Result<u8, KissTestError> {
    values.first().copied().ok_or_else(|| {
        let name = command
            .to_possible_value()
            .map(|v| v.get_name().to_owned())
            .unwrap_or_default();
        KissTestError::MissingParameter(name)
    })
}
