use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use kissapp::channel::{Channel, write_frame};
use kissapp::config::{
    parse_baud_rate, parse_callsign, parse_frame_count, parse_interval, parse_payload_length,
};
use kissapp::error::KissTestError;
use kissapp::serial::{DEFAULT_TIMEOUT, SerialChannel};
use kissapp::util::hexdump::hexdump;
use kissapp::util::payload::pad_printable;
use kisscore::address::Address;
use kisscore::ax25::Ax25Frame;
use kisscore::kiss::{DATA_FRAME_PORT0, KissFrame};
use log::{info, warn};

#[derive(Parser)]
#[command(about = "Transmit a timed, numbered batch of AX.25 UI frames")]
struct Args {
    #[arg(help = "Serial device connected to the TNC")]
    device: String,
    #[arg(value_parser = parse_baud_rate, help = "Baud rate")]
    baud: u32,
    #[arg(value_parser = parse_callsign, help = "Source callsign, e.g. VK7XT-1")]
    source: Address,
    #[arg(value_parser = parse_callsign, help = "Destination callsign")]
    destination: Address,
    #[arg(value_parser = parse_frame_count, help = "Number of frames to send")]
    count: u32,
    #[arg(help = "Text at the start of every info field")]
    text: String,
    #[arg(
        value_parser = parse_payload_length,
        help = "Pad info fields with random printable characters up to this length"
    )]
    length: usize,
    #[arg(value_parser = parse_interval, help = "Seconds between frames")]
    interval: Duration,
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
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst)) {
        warn!("unable to install Ctrl-C handler: {e}");
    }

    let mut channel = SerialChannel::open(&args.device, args.baud, DEFAULT_TIMEOUT)?;
    let result = send_batch(&mut channel, args, &stop);
    channel.close()?;
    let sent = result?;
    println!("\nSent {sent} of {} frames", args.count);
    Ok(())
}

fn send_batch(
    channel: &mut SerialChannel,
    args: &Args,
    stop: &AtomicBool,
) -> Result<u32, KissTestError> {
    let mut rng = rand::thread_rng();
    for number in 1..=args.count {
        if stop.load(Ordering::SeqCst) {
            return Ok(number - 1);
        }
        let mut info = format!("{}{number} ", args.text).into_bytes();
        pad_printable(&mut info, args.length, &mut rng);
        let ax25 = Ax25Frame::new_ui(args.destination.clone(), args.source.clone(), &info);
        let ax25 = ax25.to_bytes();

        println!("\nFrame {number} content bytes:");
        print!("{}", hexdump(&ax25));
        write_frame(channel, &KissFrame::new(DATA_FRAME_PORT0, &ax25))?;
        info!("sent frame {number} of {}", args.count);

        if number < args.count {
            std::thread::sleep(args.interval);
        }
    }
    Ok(args.count)
}
