use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use kissapp::channel::Channel;
use kissapp::config::parse_baud_rate;
use kissapp::error::KissTestError;
use kissapp::link::Bridge;
use kissapp::serial::{RX_TIMEOUT, SerialChannel};
use log::warn;

#[derive(Parser)]
#[command(about = "Join two serial ports, copying bytes in both directions")]
struct Args {
    #[arg(help = "First serial device")]
    device_a: String,
    #[arg(value_parser = parse_baud_rate, help = "Baud rate of the first device")]
    baud_a: u32,
    #[arg(help = "Second serial device")]
    device_b: String,
    #[arg(value_parser = parse_baud_rate, help = "Baud rate of the second device")]
    baud_b: u32,
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
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst)) {
        warn!("unable to install Ctrl-C handler: {e}");
    }

    let mut a = SerialChannel::open(&args.device_a, args.baud_a, RX_TIMEOUT)
        .inspect_err(|_| list_ports())?;
    println!("Opened {}", args.device_a);
    let b = match SerialChannel::open(&args.device_b, args.baud_b, RX_TIMEOUT) {
        Ok(b) => b,
        Err(e) => {
            if let Err(close_err) = a.close() {
                warn!("error closing {}: {close_err}", args.device_a);
            }
            list_ports();
            return Err(e);
        }
    };
    println!("Opened {}, Ctrl-C to stop", args.device_b);

    let traffic = Bridge::new(a, b).run(&stop)?;
    println!(
        "{} bytes {} -> {}, {} bytes {} -> {}",
        traffic.a_to_b, args.device_a, args.device_b, traffic.b_to_a, args.device_b, args.device_a
    );
    Ok(())
}

fn list_ports() {
    let ports: Vec<String> = SerialChannel::available_ports().collect();
    if !ports.is_empty() {
        eprintln!("Available ports: {}", ports.join(", "));
    }
}
