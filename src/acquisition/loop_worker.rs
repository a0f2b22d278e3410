use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::models::Reading;
use crate::serial::SerialHandle;

use super::AcquisitionMessage;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Cancelled,
    Failed,
    /// The consumer dropped its receiver.
    Disconnected,
}

pub struct LoopSettings {
    pub idle_poll_interval: Duration,
    pub trace_frames: bool,
}

/// Polls the port until cancelled or a read fails, forwarding every line.
///
/// Runs on a blocking thread. The only blocking call is the bounded read, so
/// a cancel is observed within one read timeout. The handle is closed before
/// this returns on every path; a failure is reported only after the close so
/// a restart can reopen the port straight away.
pub fn acquisition_loop(
    mut handle: SerialHandle,
    tx: UnboundedSender<AcquisitionMessage>,
    cancel_token: CancellationToken,
    settings: LoopSettings,
) -> LoopExit {
    let port = handle.port().to_string();
    log_info!("acquisition loop started on {}", port);

    let exit = loop {
        if cancel_token.is_cancelled() {
            break LoopExit::Cancelled;
        }

        match poll_once(&mut handle, &settings) {
            Ok(Some(line)) => {
                if settings.trace_frames {
                    log_debug!("frame from {}: {:?}", port, line);
                }
                if tx.send(AcquisitionMessage::Reading(Reading::new(line))).is_err() {
                    break LoopExit::Disconnected;
                }
            }
            Ok(None) => {}
            Err(err) => {
                log_error!("serial read on {} failed: {}", port, err);
                handle.close();
                let _ = tx.send(AcquisitionMessage::Failed {
                    port: port.clone(),
                    message: err.to_string(),
                });
                break LoopExit::Failed;
            }
        }
    };

    handle.close();
    log_info!("acquisition loop on {} exited: {:?}", port, exit);
    exit
}

fn poll_once(
    handle: &mut SerialHandle,
    settings: &LoopSettings,
) -> std::io::Result<Option<String>> {
    if !handle.has_data()? {
        std::thread::sleep(settings.idle_poll_interval);
        return Ok(None);
    }

    let frame = handle.read_line()?;
    if frame.is_empty() {
        return Ok(None);
    }

    Ok(Some(decode_frame(&frame)))
}

/// Decodes a frame as text and strips the line terminator and trailing
/// whitespace. Invalid UTF-8 is replaced rather than rejected.
pub fn decode_frame(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).trim_end().to_string()
}
