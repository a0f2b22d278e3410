//! Scriptable in-memory ports for exercising the link and acquisition loop
//! without hardware.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    io,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::bail;

use super::{PortOpener, SerialDevice};

#[derive(Debug, Clone)]
enum MockFrame {
    Bytes(Vec<u8>),
    Fail(io::ErrorKind),
}

#[derive(Default)]
struct MockState {
    ports: HashSet<String>,
    queues: HashMap<String, VecDeque<MockFrame>>,
    open: HashSet<String>,
    open_counts: HashMap<String, usize>,
}

/// Opener over a fixed set of port names whose incoming traffic is queued
/// by the test.
#[derive(Clone, Default)]
pub struct MockPortOpener {
    state: Arc<Mutex<MockState>>,
}

impl MockPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ports<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        mock.lock().ports = ports.into_iter().map(Into::into).collect();
        mock
    }

    /// Queues one newline-terminated line.
    pub fn push_line(&self, port: &str, line: &str) {
        self.push_bytes(port, format!("{line}\n").into_bytes());
    }

    pub fn push_bytes(&self, port: &str, bytes: Vec<u8>) {
        self.queue(port, MockFrame::Bytes(bytes));
    }

    /// Queues a read failure; the read that reaches it returns `kind`.
    pub fn push_failure(&self, port: &str, kind: io::ErrorKind) {
        self.queue(port, MockFrame::Fail(kind));
    }

    pub fn is_open(&self, port: &str) -> bool {
        self.lock().open.contains(port)
    }

    /// Frames queued on `port` that no read has consumed yet.
    pub fn pending(&self, port: &str) -> usize {
        self.lock().queues.get(port).map_or(0, VecDeque::len)
    }

    pub fn open_count(&self, port: &str) -> usize {
        self.lock().open_counts.get(port).copied().unwrap_or(0)
    }

    fn queue(&self, port: &str, frame: MockFrame) {
        self.lock()
            .queues
            .entry(port.to_string())
            .or_default()
            .push_back(frame);
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PortOpener for MockPortOpener {
    fn open(
        &self,
        port: &str,
        _baud: u32,
        read_timeout: Duration,
    ) -> anyhow::Result<Box<dyn SerialDevice>> {
        let mut state = self.lock();
        if !state.ports.contains(port) {
            bail!("no such device: {port}");
        }
        if !state.open.insert(port.to_string()) {
            bail!("{port} is claimed by another handle");
        }
        *state.open_counts.entry(port.to_string()).or_default() += 1;

        Ok(Box::new(MockDevice {
            port: port.to_string(),
            state: self.state.clone(),
            read_timeout,
        }))
    }
}

struct MockDevice {
    port: String,
    state: Arc<Mutex<MockState>>,
    read_timeout: Duration,
}

impl MockDevice {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SerialDevice for MockDevice {
    fn has_data(&mut self) -> io::Result<bool> {
        Ok(self
            .lock()
            .queues
            .get(&self.port)
            .is_some_and(|queue| !queue.is_empty()))
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let next = self
            .lock()
            .queues
            .get_mut(&self.port)
            .and_then(VecDeque::pop_front);

        match next {
            Some(MockFrame::Bytes(bytes)) => Ok(bytes),
            Some(MockFrame::Fail(kind)) => Err(io::Error::new(kind, "mock read failure")),
            None => {
                std::thread::sleep(self.read_timeout);
                Ok(Vec::new())
            }
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        let port = self.port.clone();
        self.lock().open.remove(&port);
    }
}
