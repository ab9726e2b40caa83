use std::fmt;

use serde::Serialize;

/// Counts for one autofill pass. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub considered: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub errored: usize,
    /// The caller stopped the run between fields.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn record(&mut self, decision: &FieldDecision) {
        self.considered += 1;
        match decision {
            FieldDecision::Accepted => self.accepted += 1,
            FieldDecision::Skipped(_) => self.skipped += 1,
            FieldDecision::Errored(_) => self.errored += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fields considered: {} filled, {} skipped, {} failed",
            self.considered, self.accepted, self.skipped, self.errored
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoMatch,
    BelowThreshold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "detail")]
pub enum FieldDecision {
    Accepted,
    Skipped(SkipReason),
    Errored(String),
}

impl FieldDecision {
    pub fn label(&self) -> &'static str {
        match self {
            FieldDecision::Accepted => "accepted",
            FieldDecision::Skipped(SkipReason::NoMatch) => "skipped_no_match",
            FieldDecision::Skipped(SkipReason::BelowThreshold) => "skipped_below_threshold",
            FieldDecision::Errored(_) => "errored",
        }
    }
}

/// What happened to one field, reported as soon as the field is done.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutcome {
    pub index: usize,
    pub field: String,
    pub decision: FieldDecision,
    pub confidence: f64,
    pub attempts: u32,
}
