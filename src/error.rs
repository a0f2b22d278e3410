//! Error taxonomy for the harness.
//!
//! - **`Connection`**: the port could not be opened (missing, claimed, bad baud).
//!   Surfaced synchronously; acquisition does not start.
//! - **`AlreadyOpen`** / **`AcquisitionActive`**: a second handle or a second
//!   acquisition task was requested while one is live.
//! - **`IoFailure`**: a read failed mid-stream. Reported once, the loop halts.
//! - **`Parse`**: a typed field could not be parsed. Readings never produce this;
//!   they downgrade to `InvalidValue` instead.
//! - **`Persistence`**: config or report could not be written or read back.

use std::path::PathBuf;

use thiserror::Error;

pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("could not open serial port '{port}' at {baud} baud: {reason}")]
    Connection {
        port: String,
        baud: u32,
        reason: String,
    },

    #[error("serial port '{0}' is already open; close it before opening another")]
    AlreadyOpen(String),

    #[error("acquisition already active")]
    AcquisitionActive,

    #[error("serial read failed: {0}")]
    IoFailure(String),

    #[error("acquisition task failed: {0}")]
    TaskFailed(String),

    #[error("invalid value '{value}' for {field}")]
    Parse { field: String, value: String },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {} is malformed: {source}", path.display())]
    MalformedConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl HarnessError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Persistence {
            path: path.into(),
            source,
        }
    }
}
