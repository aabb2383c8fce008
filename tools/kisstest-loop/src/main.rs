use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use kissapp::config::{
    HarnessConfig, parse_baud_rate, parse_frame_count, parse_interval, parse_payload_length,
};
use kissapp::error::KissTestError;
use kissapp::harness::Harness;
use kissapp::serial::{SerialChannel, open_pair};
use log::warn;

#[derive(Parser)]
#[command(about = "Send TEST frames through a TNC and check they come back")]
struct Args {
    #[arg(help = "Serial device that transmits test frames")]
    tx_device: String,
    #[arg(value_parser = parse_baud_rate, help = "Baud rate of the transmit device")]
    tx_baud: u32,
    #[arg(help = "Serial device that receives them again")]
    rx_device: String,
    #[arg(value_parser = parse_baud_rate, help = "Baud rate of the receive device")]
    rx_baud: u32,
    #[arg(value_parser = parse_frame_count, help = "Number of frames to send")]
    frame_count: u32,
    #[arg(value_parser = parse_payload_length, help = "Length of each info field in bytes")]
    payload_length: usize,
    #[arg(value_parser = parse_interval, help = "Seconds between transmissions")]
    interval: Duration,
    #[arg(long, help = "Print the round trip time of every matched frame")]
    latency: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
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
    let config = HarnessConfig::new(args.frame_count, args.payload_length, args.interval)?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst)) {
        warn!("unable to install Ctrl-C handler: {e}");
    }

    let (tx, rx) = open_pair(&args.tx_device, args.tx_baud, &args.rx_device, args.rx_baud)
        .inspect_err(|_| list_ports())?;
    let report = Harness::new(tx, rx, config).run(&stop)?;

    println!("{report}");
    if args.latency {
        for (i, latency) in report.latencies.iter().enumerate() {
            println!("  match {:>4}: {:.3} s", i + 1, latency.as_secs_f64());
        }
    }
    Ok(())
}

fn list_ports() {
    let ports: Vec<String> = SerialChannel::available_ports().collect();
    if !ports.is_empty() {
        eprintln!("Available ports: {}", ports.join(", "));
    }
}
