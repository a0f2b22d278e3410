use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, info};

use crate::error::{HarnessError, HarnessResult};

use super::{PortOpener, SerialDevice};

/// Hands out at most one live [`SerialHandle`] at a time.
#[derive(Clone)]
pub struct SerialLink {
    opener: Arc<dyn PortOpener>,
    read_timeout: Duration,
    live_port: Arc<Mutex<Option<String>>>,
}

impl SerialLink {
    pub fn new(opener: Arc<dyn PortOpener>, read_timeout: Duration) -> Self {
        Self {
            opener,
            read_timeout,
            live_port: Arc::new(Mutex::new(None)),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Name of the port currently held open, if any.
    pub fn live_port(&self) -> Option<String> {
        lock(&self.live_port).clone()
    }

    pub fn open(&self, port: &str, baud: u32) -> HarnessResult<SerialHandle> {
        let mut live = lock(&self.live_port);
        if let Some(open_port) = live.as_ref() {
            return Err(HarnessError::AlreadyOpen(open_port.clone()));
        }

        if port.trim().is_empty() {
            return Err(connection_error(port, baud, "no port name given"));
        }
        if baud == 0 {
            return Err(connection_error(port, baud, "baud rate must be positive"));
        }

        let device = self
            .opener
            .open(port, baud, self.read_timeout)
            .map_err(|err| connection_error(port, baud, format!("{err:#}")))?;

        *live = Some(port.to_string());
        info!("Opened serial port {port} at {baud} baud");

        Ok(SerialHandle {
            port: port.to_string(),
            device: Some(device),
            live_port: self.live_port.clone(),
        })
    }
}

/// Exclusive ownership of one open port. Dropping the handle closes it.
pub struct SerialHandle {
    port: String,
    device: Option<Box<dyn SerialDevice>>,
    live_port: Arc<Mutex<Option<String>>>,
}

impl SerialHandle {
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn has_data(&mut self) -> io::Result<bool> {
        self.device_mut()?.has_data()
    }

    pub fn read_line(&mut self) -> io::Result<Vec<u8>> {
        self.device_mut()?.read_line()
    }

    /// Releases the port. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.device.take().is_none() {
            return;
        }

        let mut live = lock(&self.live_port);
        if live.as_deref() == Some(self.port.as_str()) {
            *live = None;
        }
        debug!("Closed serial port {}", self.port);
    }

    fn device_mut(&mut self) -> io::Result<&mut Box<dyn SerialDevice>> {
        self.device.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                format!("serial port {} is closed", self.port),
            )
        })
    }
}

impl Drop for SerialHandle {
    fn drop(&mut self) {
        self.close();
    }
}

fn connection_error(port: &str, baud: u32, reason: impl Into<String>) -> HarnessError {
    HarnessError::Connection {
        port: port.to_string(),
        baud,
        reason: reason.into(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::MockPortOpener;

    fn link_with(mock: &MockPortOpener) -> SerialLink {
        SerialLink::new(Arc::new(mock.clone()), Duration::from_millis(20))
    }

    #[test]
    fn unknown_port_is_a_connection_error() {
        let mock = MockPortOpener::new();
        let err = link_with(&mock).open("COM9", 9600).err().unwrap();
        assert!(matches!(err, HarnessError::Connection { port, .. } if port == "COM9"));
    }

    #[test]
    fn zero_baud_is_rejected_before_opening() {
        let mock = MockPortOpener::with_ports(["COM6"]);
        let err = link_with(&mock).open("COM6", 0).err().unwrap();
        assert!(matches!(err, HarnessError::Connection { baud: 0, .. }));
        assert_eq!(mock.open_count("COM6"), 0);
    }

    #[test]
    fn second_open_fails_until_first_is_closed() {
        let mock = MockPortOpener::with_ports(["COM6", "COM7"]);
        let link = link_with(&mock);

        let mut first = link.open("COM6", 9600).unwrap();
        let err = link.open("COM7", 9600).err().unwrap();
        assert!(matches!(err, HarnessError::AlreadyOpen(port) if port == "COM6"));

        first.close();
        first.close();
        assert!(!first.is_open());
        assert!(link.open("COM7", 9600).is_ok());
    }

    #[test]
    fn dropping_the_handle_releases_the_port() {
        let mock = MockPortOpener::with_ports(["COM6"]);
        let link = link_with(&mock);

        drop(link.open("COM6", 9600).unwrap());
        assert_eq!(link.live_port(), None);
        assert!(!mock.is_open("COM6"));
        assert!(link.open("COM6", 9600).is_ok());
    }

    #[test]
    fn closed_handle_reports_not_connected() {
        let mock = MockPortOpener::with_ports(["COM6"]);
        let mut handle = link_with(&mock).open("COM6", 9600).unwrap();
        handle.close();

        let err = handle.read_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn reads_scripted_lines_in_order() {
        let mock = MockPortOpener::with_ports(["COM6"]);
        mock.push_line("COM6", "12.5");
        mock.push_line("COM6", "13.0");
        let mut handle = link_with(&mock).open("COM6", 9600).unwrap();

        assert!(handle.has_data().unwrap());
        assert_eq!(handle.read_line().unwrap(), b"12.5\n");
        assert_eq!(handle.read_line().unwrap(), b"13.0\n");
        assert!(!handle.has_data().unwrap());
        assert!(handle.read_line().unwrap().is_empty());
    }
}
