//! Serial transport.
//!
//! The acquisition loop only sees [`SerialHandle`]; the device behind it is
//! supplied by a [`PortOpener`], so real ports, the simulator and test mocks
//! are interchangeable.

pub mod link;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod simulator;
pub mod system;

use std::{io, time::Duration};

pub use link::{SerialHandle, SerialLink};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockPortOpener;
pub use simulator::SimulatedPortOpener;
pub use system::SystemPortOpener;

/// An open, exclusively owned serial connection.
pub trait SerialDevice: Send {
    /// Non-blocking check for unread bytes.
    fn has_data(&mut self) -> io::Result<bool>;

    /// Next newline-terminated frame including the terminator.
    ///
    /// Blocks for at most the read timeout the device was opened with and
    /// returns an empty frame when nothing complete arrived in time.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;
}

pub trait PortOpener: Send + Sync {
    fn open(
        &self,
        port: &str,
        baud: u32,
        read_timeout: Duration,
    ) -> anyhow::Result<Box<dyn SerialDevice>>;
}
