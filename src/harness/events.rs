use std::path::PathBuf;

use log::info;
use serde::Serialize;

use crate::evaluation::EvaluationResult;
use crate::models::{FieldKey, Reading};

/// One-way notifications to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HarnessEvent {
    ReadingEvaluated {
        reading: Reading,
        result: EvaluationResult,
    },
    AcquisitionStarted {
        port: String,
        baud: u32,
    },
    AcquisitionStopped {
        port: String,
    },
    AcquisitionFailed {
        port: String,
        message: String,
    },
    FieldUpdated {
        key: FieldKey,
        value: String,
    },
    ConfigSaved {
        path: PathBuf,
    },
    ReportGenerated {
        path: PathBuf,
    },
}

impl HarnessEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HarnessEvent::ReadingEvaluated { .. } => "reading-evaluated",
            HarnessEvent::AcquisitionStarted { .. } => "acquisition-started",
            HarnessEvent::AcquisitionStopped { .. } => "acquisition-stopped",
            HarnessEvent::AcquisitionFailed { .. } => "acquisition-failed",
            HarnessEvent::FieldUpdated { .. } => "field-updated",
            HarnessEvent::ConfigSaved { .. } => "config-saved",
            HarnessEvent::ReportGenerated { .. } => "report-generated",
        }
    }
}

/// Receiver of [`HarnessEvent`]s. Always called on the controlling thread.
pub trait EventSink: Send {
    fn emit(&self, event: &HarnessEvent);
}

impl<F> EventSink for F
where
    F: Fn(&HarnessEvent) + Send,
{
    fn emit(&self, event: &HarnessEvent) {
        self(event)
    }
}

/// Sink that writes every event to the log as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &HarnessEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => info!("{}: {payload}", event.name()),
            Err(_) => info!("{}: {event:?}", event.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_tag_matches_event_name() {
        let events = [
            HarnessEvent::AcquisitionStarted {
                port: "COM6".into(),
                baud: 9600,
            },
            HarnessEvent::FieldUpdated {
                key: FieldKey::CapacityT,
                value: "50".into(),
            },
            HarnessEvent::ReportGenerated {
                path: PathBuf::from("report_20240301_140509.txt"),
            },
        ];

        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.name());
        }
    }
}
