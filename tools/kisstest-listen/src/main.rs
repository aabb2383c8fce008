use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use kissapp::config::parse_baud_rate;
use kissapp::error::KissTestError;
use kissapp::monitor::{Monitor, MonitoredFrame};
use kissapp::serial::{RX_TIMEOUT, SerialChannel};
use kissapp::util::hexdump::hexdump;
use log::warn;

#[derive(Parser)]
#[command(about = "Print every KISS frame received from a TNC")]
struct Args {
    #[arg(help = "Serial device connected to the TNC")]
    device: String,
    #[arg(value_parser = parse_baud_rate, help = "Baud rate")]
    baud: u32,
    #[arg(long, help = "Show raw frames only, without decoding AX.25 headers")]
    no_decode: bool,
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

    let channel = SerialChannel::open(&args.device, args.baud, RX_TIMEOUT)
        .inspect_err(|_| list_ports())?;
    println!("Listening on {}, Ctrl-C to stop", args.device);
    let total = Monitor::new(channel).run(&stop, |frame| print_frame(frame, !args.no_decode))?;
    println!("\n{total} frames received");
    Ok(())
}

fn print_frame(frame: &MonitoredFrame, decode: bool) {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let kind = match frame.command {
        Some(command) => format!("{command:?}"),
        None => format!("unknown {:#04x}", frame.type_byte().unwrap_or_default()),
    };
    println!(
        "\n{now} {:>8}  port {} {kind}, {} bytes",
        frame.number,
        frame.port,
        frame.raw().len()
    );
    print!("{}", hexdump(frame.raw()));
    if !decode {
        return;
    }
    if let Some(header) = &frame.header {
        println!("{header}");
        println!("FCS: {:#06x}", frame.fcs);
    }
    if let Some(info) = frame.info() {
        println!("Payload: {}", String::from_utf8_lossy(info));
    }
}

fn list_ports() {
    let ports: Vec<String> = SerialChannel::available_ports().collect();
    if !ports.is_empty() {
        eprintln!("Available ports: {}", ports.join(", "));
    }
}
