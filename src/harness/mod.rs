pub mod controller;
pub mod events;
pub mod state;

pub use controller::{HarnessController, SessionSnapshot};
pub use events::{EventSink, HarnessEvent, LogSink};
pub use state::{AcquisitionStatus, SessionState};
