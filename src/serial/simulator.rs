//! Stand-in instrument that emits a random load every interval.

use std::{
    io,
    time::{Duration, Instant},
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{PortOpener, SerialDevice};

pub const SIMULATED_MAX_LOAD: f64 = 100.0;
pub const DEFAULT_EMIT_INTERVAL: Duration = Duration::from_secs(1);

/// One simulated reading in `[0, 100)` with two decimals, newline-terminated.
pub fn random_reading<R: Rng + ?Sized>(rng: &mut R) -> String {
    let value: f64 = rng.gen_range(0.0..SIMULATED_MAX_LOAD);
    format!("{value:.2}\n")
}

/// Opener that accepts any port name and returns a simulated instrument.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedPortOpener {
    interval: Duration,
}

impl SimulatedPortOpener {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for SimulatedPortOpener {
    fn default() -> Self {
        Self::new(DEFAULT_EMIT_INTERVAL)
    }
}

impl PortOpener for SimulatedPortOpener {
    fn open(
        &self,
        _port: &str,
        _baud: u32,
        read_timeout: Duration,
    ) -> anyhow::Result<Box<dyn SerialDevice>> {
        Ok(Box::new(SimulatedDevice {
            rng: StdRng::from_entropy(),
            interval: self.interval,
            read_timeout,
            last_emit: Instant::now(),
        }))
    }
}

struct SimulatedDevice {
    rng: StdRng,
    interval: Duration,
    read_timeout: Duration,
    last_emit: Instant,
}

impl SerialDevice for SimulatedDevice {
    fn has_data(&mut self) -> io::Result<bool> {
        Ok(self.last_emit.elapsed() >= self.interval)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let remaining = self.interval.saturating_sub(self.last_emit.elapsed());
        if remaining > self.read_timeout {
            std::thread::sleep(self.read_timeout);
            return Ok(Vec::new());
        }

        std::thread::sleep(remaining);
        self.last_emit = Instant::now();
        Ok(random_reading(&mut self.rng).into_bytes())
    }
}
