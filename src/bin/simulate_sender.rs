//! Writes simulated load readings to a serial port once per second, for
//! exercising the harness against a virtual port pair.

use std::{io::Write, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use rand::{rngs::StdRng, SeedableRng};

use loadcell_harness::{
    init_logging,
    models::DEFAULT_BAUD_RATE,
    serial::{simulator, system::available_ports},
};

#[derive(Parser, Debug)]
#[command(name = "simulate_sender")]
#[command(about = "Send random load readings to a serial port", long_about = None)]
struct Cli {
    /// Serial port to write to
    #[arg(default_value = "COM6")]
    port: String,

    /// Baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// List available serial ports and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        error!("Serial error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.list {
        for name in available_ports()? {
            println!("{name}");
        }
        return Ok(());
    }

    let Cli { port, baud, .. } = cli;
    let mut serial = serialport::new(&port, baud)
        .timeout(Duration::from_secs(1))
        .open()
        .with_context(|| format!("Failed to open serial port '{port}'"))?;
    info!("Sending simulated data to {port} at {baud} baud...");

    let mut rng = StdRng::from_entropy();
    loop {
        let line = simulator::random_reading(&mut rng);
        serial
            .write_all(line.as_bytes())
            .with_context(|| format!("Failed to write to '{port}'"))?;
        info!("Sent: {}", line.trim_end());
        thread::sleep(simulator::DEFAULT_EMIT_INTERVAL);
    }
}
