use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluation::parse_load;

/// One decoded line from the instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub raw: String,
    pub value: Option<f64>,
    pub received_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(raw: impl Into<String>) -> Self {
        Self::at(raw, Utc::now())
    }

    pub fn at(raw: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        let raw = raw.into();
        Self {
            value: parse_load(&raw),
            raw,
            received_at,
        }
    }
}
