use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::evaluation::EvaluationResult;
use crate::models::{FieldKey, Reading};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum AcquisitionStatus {
    #[default]
    Idle,
    Running {
        port: String,
        baud: u32,
    },
    Failed {
        port: String,
        message: String,
    },
}

/// Display and evaluation state for the current run. Owned by the
/// controlling thread only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub acquisition: AcquisitionStatus,
    pub result: EvaluationResult,
    pub last_reading: Option<Reading>,
    pub test_load: String,
    pub load_cell_value: String,
    pub duration: String,
    pub started_at: Option<DateTime<Utc>>,
    /// Elapsed time of the acquisition as of the last stop or failure.
    pub elapsed_ms: u64,
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_acquisition(&mut self, port: &str, baud: u32, now: Instant) {
        self.acquisition = AcquisitionStatus::Running {
            port: port.to_string(),
            baud,
        };
        self.started_at = Some(Utc::now());
        self.elapsed_ms = 0;
        self.running_anchor = Some(now);
    }

    pub fn end_acquisition(&mut self) {
        self.freeze_elapsed();
        if matches!(self.acquisition, AcquisitionStatus::Running { .. }) {
            self.acquisition = AcquisitionStatus::Idle;
        }
    }

    pub fn fail_acquisition(&mut self, port: &str, message: &str) {
        self.freeze_elapsed();
        self.acquisition = AcquisitionStatus::Failed {
            port: port.to_string(),
            message: message.to_string(),
        };
    }

    /// Replaces the single reading slot and the result; both readouts take
    /// the raw line.
    pub fn record(&mut self, reading: Reading, result: EvaluationResult) {
        self.test_load = reading.raw.clone();
        self.load_cell_value = reading.raw.clone();
        self.last_reading = Some(reading);
        self.result = result;
    }

    pub fn set_field(&mut self, key: FieldKey, value: &str) -> bool {
        let slot = match key {
            FieldKey::TestLoad => &mut self.test_load,
            FieldKey::LoadCellValue => &mut self.load_cell_value,
            FieldKey::Duration => &mut self.duration,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }

    pub fn current_elapsed_ms(&self) -> u64 {
        match (&self.acquisition, self.running_anchor) {
            (AcquisitionStatus::Running { .. }, Some(anchor)) => {
                anchor.elapsed().as_millis() as u64
            }
            _ => self.elapsed_ms,
        }
    }

    /// `mm:ss` since acquisition started.
    pub fn elapsed_display(&self) -> String {
        let secs = self.current_elapsed_ms() / 1000;
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    /// Text for the result banner; a failed acquisition overrides the verdict.
    pub fn banner(&self) -> String {
        match &self.acquisition {
            AcquisitionStatus::Failed { message, .. } => format!("Error: {message}"),
            _ => self.result.label().to_string(),
        }
    }

    fn freeze_elapsed(&mut self) {
        self.elapsed_ms = self.current_elapsed_ms();
        self.running_anchor = None;
    }
}
