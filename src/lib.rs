//! Load-cell capacity test harness.
//!
//! Reads newline-delimited loads from a weighing instrument on a serial port,
//! classifies each against the configured capacity and writes signed test
//! reports. [`HarnessController`] is the surface a front end drives.

pub mod acquisition;
pub mod error;
pub mod evaluation;
pub mod harness;
pub mod models;
pub mod report;
pub mod serial;
pub mod settings;
pub mod utils;

pub use error::{HarnessError, HarnessResult};
pub use evaluation::{evaluate, EvaluationResult, Verdict};
pub use harness::{EventSink, HarnessController, HarnessEvent, LogSink, SessionSnapshot};
pub use models::{Config, FieldKey, Reading};
pub use settings::{ConfigStore, HarnessOptions};
pub use utils::init_logging;
