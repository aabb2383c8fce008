use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use kissapp::channel::{Channel, write_frame};
use kissapp::config::{parse_baud_rate, parse_byte_value};
use kissapp::error::KissTestError;
use kissapp::reply::{REPLY_TIMEOUT, query};
use kissapp::serial::{DEFAULT_TIMEOUT, SerialChannel};
use kisscore::kiss::KissFrame;
use log::info;

/// The N9600A configuration port runs at a fixed rate.
const N9600A_BAUD: u32 = 57600;

const SERIAL_NUMBER_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Command {
    /// Print the firmware version
    Getver,
    /// Print the serial number
    Getserno,
    /// Print every setting
    Getall,
    /// Set the 8 character serial number
    Setserno,
    /// Erase the serial number
    Clrserno,
    /// Stop any transmission in progress
    Stoptx,
    /// Beacon interval, 0 to 255
    Setbcnint,
    /// Persistence, 0 to 255
    Setpersist,
    /// Slot time, 0 to 255
    Setslot,
}

impl Command {
    /// Whether the TNC answers with a frame of its own.
    fn expects_reply(self) -> bool {
        matches!(self, Command::Getver | Command::Getserno | Command::Getall)
    }

    fn name(self) -> String {
        self.to_possible_value()
            .map(|v| v.get_name().to_owned())
            .unwrap_or_default()
    }
}

#[derive(Parser)]
#[command(about = "Send a configuration command to an N9600A TNC")]
struct Args {
    #[arg(help = "Serial device connected to the TNC")]
    device: String,
    #[arg(value_enum, help = "Command to send")]
    command: Command,
    #[arg(help = "Value for set commands")]
    value: Option<String>,
    #[arg(long, default_value_t = N9600A_BAUD, value_parser = parse_baud_rate, help = "Baud rate")]
    baud: u32,
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
    let frame = build_frame(args.command, args.value.as_deref())?;
    let mut channel = SerialChannel::open(&args.device, args.baud, DEFAULT_TIMEOUT)?;
    let result = if args.command.expects_reply() {
        query(&mut channel, &frame, REPLY_TIMEOUT).map(Some)
    } else {
        write_frame(&mut channel, &frame).map(|_| None)
    };
    channel.close()?;
    match result? {
        Some(reply) => println!("{}", String::from_utf8_lossy(&reply)),
        None => info!("sent {:?} to {}", args.command, args.device),
    }
    Ok(())
}

fn build_frame(command: Command, value: Option<&str>) -> Result<KissFrame, KissTestError> {
    Ok(match command {
        Command::Getver => KissFrame::new(0x08, &[0x00]),
        Command::Getserno => KissFrame::new(0x0E, &[0x00]),
        Command::Getall => KissFrame::new(0x0B, &[0x00]),
        Command::Setserno => KissFrame::new(0x0A, &serial_number(required(command, value)?)?),
        Command::Clrserno => KissFrame::new(0x0A, &[0; SERIAL_NUMBER_LEN]),
        Command::Stoptx => KissFrame::new(0x09, &[0x00]),
        Command::Setbcnint => {
            KissFrame::new(0x09, &[0xF0, parse_byte_value(required(command, value)?)?])
        }
        Command::Setpersist => KissFrame::new(0x02, &[parse_byte_value(required(command, value)?)?]),
        Command::Setslot => KissFrame::new(0x03, &[parse_byte_value(required(command, value)?)?]),
    })
}

fn required(command: Command, value: Option<&str>) -> Result<&str, KissTestError> {
    value.ok_or_else(|| KissTestError::MissingParameter(command.name()))
}

fn serial_number(s: &str) -> Result<[u8; SERIAL_NUMBER_LEN], KissTestError> {
    if !s.is_ascii() {
        return Err(KissTestError::InvalidSerialNumber(s.to_owned()));
    }
    s.as_bytes()
        .try_into()
        .map_err(|_| KissTestError::InvalidSerialNumber(s.to_owned()))
}
