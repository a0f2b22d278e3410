use std::{
    io::{self, BufRead, BufReader},
    time::Duration,
};

use anyhow::{Context, Result};
use serialport::SerialPort;

use super::{PortOpener, SerialDevice};

/// Opens OS serial ports through the `serialport` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open(&self, port: &str, baud: u32, read_timeout: Duration) -> Result<Box<dyn SerialDevice>> {
        let serial = serialport::new(port, baud)
            .timeout(read_timeout)
            .open()
            .with_context(|| format!("Failed to open serial port '{port}'"))?;

        Ok(Box::new(SystemDevice {
            reader: BufReader::new(serial),
            partial: Vec::new(),
        }))
    }
}

/// Port names the OS currently reports, for populating a port picker.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    Ok(ports.into_iter().map(|info| info.port_name).collect())
}

struct SystemDevice {
    reader: BufReader<Box<dyn SerialPort>>,
    /// Bytes of a frame whose terminator has not arrived yet.
    partial: Vec<u8>,
}

impl SerialDevice for SystemDevice {
    fn has_data(&mut self) -> io::Result<bool> {
        if !self.reader.buffer().is_empty() {
            return Ok(true);
        }
        let waiting = self.reader.get_ref().bytes_to_read().map_err(io::Error::from)?;
        Ok(waiting > 0)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        match self.reader.read_until(b'\n', &mut self.partial) {
            Ok(_) if self.partial.ends_with(b"\n") => Ok(std::mem::take(&mut self.partial)),
            Ok(_) => Ok(Vec::new()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}
