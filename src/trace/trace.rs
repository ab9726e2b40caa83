use serde::Serialize;

use crate::autofill::run_summary::{FieldDecision, FieldOutcome};
use crate::profile::profile_model::now_ms;

/// One JSONL audit record per processed field.
///
/// Applied values are recorded only as a SHA-1 fingerprint so the trace
/// never holds profile data.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    pub field: String,
    pub decision: String,

    pub confidence: f64,
    pub attempts: u32,

    pub value_fingerprint: Option<String>,
    pub error: Option<String>,
}

impl TraceEvent {
    pub fn now(step: u64, field: &str) -> Self {
        Self {
            timestamp_ms: now_ms(),
            step,
            field: field.to_string(),
            decision: String::new(),
            confidence: 0.0,
            attempts: 0,
            value_fingerprint: None,
            error: None,
        }
    }

    pub fn from_outcome(outcome: &FieldOutcome, applied_value: Option<&str>) -> Self {
        let mut event = Self::now(outcome.index as u64, &outcome.field)
            .with_decision(&outcome.decision)
            .with_confidence(outcome.confidence)
            .with_attempts(outcome.attempts);
        if let Some(value) = applied_value {
            event = event.with_value(value);
        }
        event
    }

    pub fn with_decision(mut self, decision: &FieldDecision) -> Self {
        self.decision = decision.label().to_string();
        if let FieldDecision::Errored(message) = decision {
            self.error = Some(message.clone());
        }
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value_fingerprint = Some(value_fingerprint(value));
        self
    }
}

pub fn value_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
