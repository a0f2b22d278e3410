use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    #[default]
    Pending,
    Success,
    Fail,
    InvalidValue,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pending => "Pending",
            Verdict::Success => "Success",
            Verdict::Fail => "Fail",
            Verdict::InvalidValue => "InvalidValue",
        }
    }
}

/// Classification of the most recent reading, with the text that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub verdict: Verdict,
    pub raw: String,
}

impl EvaluationResult {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn new(verdict: Verdict, raw: impl Into<String>) -> Self {
        Self {
            verdict,
            raw: raw.into(),
        }
    }

    /// Operator-facing label, as shown on the result banner and in reports.
    pub fn label(&self) -> &'static str {
        match self.verdict {
            Verdict::Pending => "Pending",
            Verdict::Success => "RESULT: SUCCESS",
            Verdict::Fail => "RESULT: FAIL",
            Verdict::InvalidValue => "RESULT: Invalid Load Value",
        }
    }
}
