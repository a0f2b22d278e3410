use std::{path::PathBuf, sync::Arc, time::Instant};

use chrono::Local;
use serde::Serialize;

use crate::{
    acquisition::{AcquisitionController, AcquisitionMessage, LoopSettings},
    error::HarnessResult,
    evaluation::evaluate,
    models::{Config, FieldKey},
    report::{ReportGenerator, ReportSnapshot},
    serial::{PortOpener, SerialLink, SystemPortOpener},
    settings::{ConfigStore, HarnessOptions},
};

use super::{AcquisitionStatus, EventSink, HarnessEvent, LogSink, SessionState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub banner: String,
    pub elapsed: String,
}

/// The control surface handed to the presentation layer.
///
/// Owns the config and all evaluation state. Lives on the controlling
/// thread; the acquisition task only ever talks to it through the message
/// queue drained by [`Self::process_pending`] / [`Self::process_next`].
pub struct HarnessController {
    options: HarnessOptions,
    store: ConfigStore,
    config: Config,
    link: SerialLink,
    acquisition: AcquisitionController,
    state: SessionState,
    reports: ReportGenerator,
    sink: Box<dyn EventSink>,
}

impl HarnessController {
    /// Loads the config and prepares the link; nothing is opened yet.
    pub fn new(
        options: HarnessOptions,
        opener: Arc<dyn PortOpener>,
        sink: Box<dyn EventSink>,
    ) -> HarnessResult<Self> {
        let store = ConfigStore::new(options.config_path.clone());
        let config = store.load()?;
        log_info!("Loaded config from {}", store.path().display());

        Ok(Self {
            link: SerialLink::new(opener, options.read_timeout),
            reports: ReportGenerator::new(options.report_dir.clone()),
            acquisition: AcquisitionController::new(),
            state: SessionState::new(),
            store,
            config,
            options,
            sink,
        })
    }

    /// Controller over the machine's real serial ports, logging its events.
    pub fn with_system_ports(options: HarnessOptions) -> HarnessResult<Self> {
        Self::new(options, Arc::new(SystemPortOpener), Box::new(LogSink))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            banner: self.state.banner(),
            elapsed: self.state.elapsed_display(),
        }
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquisition.is_running()
    }

    /// Opens `port` and starts the background poller, returning at once.
    ///
    /// Rejected while an acquisition is already running. The port and baud
    /// become the current config values (persisted on the next save).
    /// Anything the previous run queued but was never processed is applied
    /// first.
    pub fn start_acquisition(&mut self, port: &str, baud: u32) -> HarnessResult<()> {
        let settings = LoopSettings {
            idle_poll_interval: self.options.idle_poll_interval,
            trace_frames: self.options.debug,
        };
        let leftover = self.acquisition.start(&self.link, port, baud, settings)?;
        for message in leftover {
            self.apply(message);
        }

        self.config.com_port = port.to_string();
        self.config.baud_rate = baud;
        self.state.begin_acquisition(port, baud, Instant::now());
        log_info!("Acquisition started on {} at {} baud", port, baud);

        self.emit(HarnessEvent::AcquisitionStarted {
            port: port.to_string(),
            baud,
        });
        Ok(())
    }

    /// Cancels the poller, waits for it to release the port and applies any
    /// readings it had already queued. A no-op when nothing is running.
    pub async fn stop_acquisition(&mut self) -> HarnessResult<()> {
        let exit = self.acquisition.stop().await?;
        self.process_pending();

        if exit.is_none() {
            return Ok(());
        }

        let port = match &self.state.acquisition {
            AcquisitionStatus::Running { port, .. } => Some(port.clone()),
            _ => None,
        };
        self.state.end_acquisition();

        if let Some(port) = port {
            log_info!("Acquisition on {} stopped", port);
            self.emit(HarnessEvent::AcquisitionStopped { port });
        }
        Ok(())
    }

    /// Applies every message queued so far without waiting. Returns how many
    /// were applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(message) = self.acquisition.try_recv() {
            self.apply(message);
            applied += 1;
        }
        applied
    }

    /// Waits for the next message and applies it. Returns `false` once the
    /// acquisition has ended and its queue is empty.
    pub async fn process_next(&mut self) -> bool {
        match self.acquisition.recv().await {
            Some(message) => {
                self.apply(message);
                true
            }
            None => false,
        }
    }

    /// Routes one edit to the config or to the session readouts.
    pub fn update_field(&mut self, key: &str, value: &str) -> HarnessResult<()> {
        let key: FieldKey = key.parse()?;

        if key.is_persisted() {
            self.config.apply(key, value)?;
        } else {
            self.state.set_field(key, value);
        }

        self.emit(HarnessEvent::FieldUpdated {
            key,
            value: value.to_string(),
        });
        Ok(())
    }

    /// Stamps today's date into the config and returns it.
    pub fn set_date_today(&mut self) -> String {
        let today = self.config.set_date_today();
        self.emit(HarnessEvent::FieldUpdated {
            key: FieldKey::Date,
            value: today.clone(),
        });
        today
    }

    pub fn save_config(&self) -> HarnessResult<PathBuf> {
        if self.config.capacity().is_none() {
            log_warn!(
                "Saving config with non-numeric capacity {:?}",
                self.config.capacity_t.to_string()
            );
        }

        self.store.save(&self.config)?;
        let path = self.store.path().to_path_buf();
        log_info!("Config saved to {}", path.display());
        self.emit(HarnessEvent::ConfigSaved { path: path.clone() });
        Ok(path)
    }

    pub fn generate_report(&self) -> HarnessResult<PathBuf> {
        let snapshot = ReportSnapshot {
            config: self.config.clone(),
            result: self.state.result.clone(),
            test_load: self.state.test_load.clone(),
            load_cell_value: self.state.load_cell_value.clone(),
            duration: self.state.duration.clone(),
            generated_at: Local::now(),
        };

        let path = self.reports.generate(&snapshot)?;
        self.emit(HarnessEvent::ReportGenerated { path: path.clone() });
        Ok(path)
    }

    fn apply(&mut self, message: AcquisitionMessage) {
        match message {
            AcquisitionMessage::Reading(reading) => {
                let result = evaluate(&reading.raw, self.config.capacity());
                self.state.record(reading.clone(), result.clone());
                self.emit(HarnessEvent::ReadingEvaluated { reading, result });
            }
            AcquisitionMessage::Failed { port, message } => {
                log_warn!("Acquisition on {} failed: {}", port, message);
                self.state.fail_acquisition(&port, &message);
                self.emit(HarnessEvent::AcquisitionFailed { port, message });
            }
        }
    }

    fn emit(&self, event: HarnessEvent) {
        self.sink.emit(&event);
    }
}
