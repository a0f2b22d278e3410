pub mod controller;
pub mod loop_worker;

use crate::models::Reading;

pub use controller::AcquisitionController;
pub use loop_worker::{acquisition_loop, LoopExit, LoopSettings};

/// What the background task hands to the controlling thread.
#[derive(Debug, Clone)]
pub enum AcquisitionMessage {
    Reading(Reading),
    /// Terminal: the loop has closed the port and exited.
    Failed { port: String, message: String },
}
