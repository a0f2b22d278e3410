use log::info;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{HarnessError, HarnessResult};
use crate::serial::SerialLink;

use super::loop_worker::{acquisition_loop, LoopExit, LoopSettings};
use super::AcquisitionMessage;

/// Owns the single background acquisition task and the receiving end of its
/// queue.
pub struct AcquisitionController {
    handle: Option<JoinHandle<LoopExit>>,
    cancel_token: Option<CancellationToken>,
    rx: Option<UnboundedReceiver<AcquisitionMessage>>,
    /// Set once the loop has reported failure or hung up its sender; it will
    /// not touch the port again even if the task is still unwinding.
    terminated: bool,
}

impl Default for AcquisitionController {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            rx: None,
            terminated: false,
        }
    }

    /// True while the background task has not exited.
    pub fn is_running(&self) -> bool {
        !self.terminated
            && self
                .handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Opens the port and spawns the polling task. Returns once the task is
    /// spawned; connection errors surface here and nothing is started.
    ///
    /// A previous task may have exited before its queue was drained. Those
    /// messages are handed back, in order, so the caller can still apply them.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &mut self,
        link: &SerialLink,
        port: &str,
        baud: u32,
        settings: LoopSettings,
    ) -> HarnessResult<Vec<AcquisitionMessage>> {
        if self.is_running() {
            return Err(HarnessError::AcquisitionActive);
        }
        // A task that already exited on its own left nothing to clean up.
        self.handle = None;
        self.cancel_token = None;

        let serial = link.open(port, baud)?;
        let leftover = self.drain_previous();

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::task::spawn_blocking(move || {
            acquisition_loop(serial, tx, token_clone, settings)
        });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.rx = Some(rx);
        self.terminated = false;
        Ok(leftover)
    }

    /// Cancels the task and waits for it to close the port.
    ///
    /// Messages already queued stay available through [`Self::try_recv`].
    pub async fn stop(&mut self) -> HarnessResult<Option<LoopExit>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };

        let exit = handle
            .await
            .map_err(|err| HarnessError::TaskFailed(format!("failed to join: {err}")))?;
        info!("Acquisition stopped ({exit:?})");
        Ok(Some(exit))
    }

    /// Next queued message without waiting.
    pub fn try_recv(&mut self) -> Option<AcquisitionMessage> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(message) => Some(self.observe(message)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.rx = None;
                self.terminated = true;
                None
            }
        }
    }

    /// Waits for the next message. `None` once the task has exited and the
    /// queue is drained, or when nothing was ever started.
    pub async fn recv(&mut self) -> Option<AcquisitionMessage> {
        let rx = self.rx.as_mut()?;
        match rx.recv().await {
            Some(message) => Some(self.observe(message)),
            None => {
                self.rx = None;
                self.terminated = true;
                None
            }
        }
    }

    fn drain_previous(&mut self) -> Vec<AcquisitionMessage> {
        let mut leftover = Vec::new();
        if let Some(mut rx) = self.rx.take() {
            while let Ok(message) = rx.try_recv() {
                leftover.push(message);
            }
        }
        leftover
    }

    fn observe(&mut self, message: AcquisitionMessage) -> AcquisitionMessage {
        if matches!(message, AcquisitionMessage::Failed { .. }) {
            self.terminated = true;
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::serial::MockPortOpener;

    fn settings() -> LoopSettings {
        LoopSettings {
            idle_poll_interval: Duration::from_millis(1),
            trace_frames: false,
        }
    }

    fn link(mock: &MockPortOpener) -> SerialLink {
        SerialLink::new(Arc::new(mock.clone()), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn delivers_lines_in_device_order() {
        let mock = MockPortOpener::with_ports(["COM6"]);
        for line in ["1", "2", "3", "4"] {
            mock.push_line("COM6", line);
        }
        let link = link(&mock);
        let mut controller = AcquisitionController::new();
        controller.start(&link, "COM6", 9600, settings()).unwrap();

        let mut received = Vec::new();
        while received.len() < 4 {
            match tokio::time::timeout(Duration::from_secs(2), controller.recv()).await {
                Ok(Some(AcquisitionMessage::Reading(reading))) => received.push(reading.raw),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(received, ["1", "2", "3", "4"]);

        assert_eq!(controller.stop().await.unwrap(), Some(LoopExit::Cancelled));
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_running() {
        let mock = MockPortOpener::with_ports(["COM6", "COM7"]);
        let link = link(&mock);
        let mut controller = AcquisitionController::new();
        controller.start(&link, "COM6", 9600, settings()).unwrap();

        let err = controller.start(&link, "COM7", 9600, settings()).unwrap_err();
        assert!(matches!(err, HarnessError::AcquisitionActive));
        assert_eq!(mock.open_count("COM7"), 0);

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_closes_port_so_it_reopens_immediately() {
        let mock = MockPortOpener::with_ports(["COM6"]);
        let link = link(&mock);
        let mut controller = AcquisitionController::new();
        controller.start(&link, "COM6", 9600, settings()).unwrap();
        assert!(mock.is_open("COM6"));

        controller.stop().await.unwrap();
        assert!(!controller.is_running());
        assert!(!mock.is_open("COM6"));

        let reopened = link.open("COM6", 9600);
        assert!(reopened.is_ok());
    }

    #[tokio::test]
    async fn failed_open_starts_nothing() {
        let mock = MockPortOpener::new();
        let mut controller = AcquisitionController::new();

        let err = controller
            .start(&link(&mock), "COM1", 9600, settings())
            .unwrap_err();
        assert!(matches!(err, HarnessError::Connection { .. }));
        assert!(!controller.is_running());
        assert_eq!(controller.stop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn restart_hands_back_what_the_failed_run_left_queued() {
        let mock = MockPortOpener::with_ports(["COM6"]);
        mock.push_line("COM6", "12");
        mock.push_failure("COM6", std::io::ErrorKind::BrokenPipe);
        let link = link(&mock);
        let mut controller = AcquisitionController::new();
        assert!(controller.start(&link, "COM6", 9600, settings()).unwrap().is_empty());

        for _ in 0..400 {
            if !controller.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!controller.is_running());

        let leftover = controller.start(&link, "COM6", 9600, settings()).unwrap();
        assert_eq!(leftover.len(), 2);
        assert!(matches!(&leftover[0], AcquisitionMessage::Reading(r) if r.raw == "12"));
        assert!(matches!(&leftover[1], AcquisitionMessage::Failed { port, .. } if port == "COM6"));
        assert!(controller.is_running());

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_returns_within_a_few_read_timeouts() {
        let mock = MockPortOpener::with_ports(["COM6"]);
        let link = link(&mock);
        let mut controller = AcquisitionController::new();
        controller.start(&link, "COM6", 9600, settings()).unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;

        let exit = tokio::time::timeout(Duration::from_millis(100), controller.stop())
            .await
            .expect("stop blocked past the read timeout bound");
        assert_eq!(exit.unwrap(), Some(LoopExit::Cancelled));
        assert!(!mock.is_open("COM6"));
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let mut controller = AcquisitionController::new();
        assert_eq!(controller.stop().await.unwrap(), None);
        assert!(controller.try_recv().is_none());
        assert!(controller.recv().await.is_none());
    }
}
