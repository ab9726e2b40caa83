use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::autofill::run_summary::{FieldDecision, FieldOutcome, RunSummary, SkipReason};
use crate::error::AutofillError;
use crate::field::field_model::FormField;
use crate::matching::engine::FieldMatcher;
use crate::page::{FormPage, PageWriter};
use crate::profile::profile_model::{Credential, Profile};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Shared flag a caller sets to stop a run between fields.
///
/// The field in flight finishes; no further field is started.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives one autofill pass: match each field in detection order, commit
/// values whose confidence exceeds the threshold, count the rest.
pub struct Autofill {
    threshold: f64,
    tracer: TraceLogger,
    cancel: CancelFlag,
}

impl Default for Autofill {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl Autofill {
    /// `threshold` is clamped to `[0, 1]`; a non-finite threshold falls back
    /// to `DEFAULT_THRESHOLD`. A value is applied only when its confidence is
    /// strictly greater than the threshold.
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 1.0)
        } else {
            warn!(threshold, fallback = DEFAULT_THRESHOLD, "non-finite threshold, using default");
            DEFAULT_THRESHOLD
        };
        Self {
            threshold,
            tracer: TraceLogger::disabled(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn run_autofill<W: PageWriter + ?Sized>(
        &self,
        fields: &[FormField],
        profile: Option<&Profile>,
        credential: Option<&Credential>,
        matcher: &dyn FieldMatcher,
        writer: &mut W,
    ) -> Result<RunSummary, AutofillError> {
        self.run_autofill_observed(fields, profile, credential, matcher, writer, &mut |_| {})
    }

    /// Like `run_autofill`, reporting each field's outcome as soon as it is known.
    pub fn run_autofill_observed<W: PageWriter + ?Sized>(
        &self,
        fields: &[FormField],
        profile: Option<&Profile>,
        credential: Option<&Credential>,
        matcher: &dyn FieldMatcher,
        writer: &mut W,
        on_field: &mut dyn FnMut(&FieldOutcome),
    ) -> Result<RunSummary, AutofillError> {
        let profile = check_preconditions(profile, credential)?;

        info!(fields = fields.len(), threshold = self.threshold, "starting autofill run");
        let mut summary = RunSummary::default();

        for (index, field) in fields.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(processed = index, remaining = fields.len() - index, "autofill run cancelled");
                summary.cancelled = true;
                break;
            }

            let (outcome, applied) = self.process_field(index, field, profile, matcher, &mut *writer);
            summary.record(&outcome.decision);
            self.tracer.log(&TraceEvent::from_outcome(&outcome, applied.as_deref()));
            on_field(&outcome);
        }

        info!(
            considered = summary.considered,
            accepted = summary.accepted,
            skipped = summary.skipped,
            errored = summary.errored,
            "autofill run finished"
        );
        Ok(summary)
    }

    /// Scan the page, then run over whatever it reports.
    ///
    /// Preconditions are checked before the page is touched.
    pub fn run_on_page<P: FormPage + ?Sized>(
        &self,
        page: &mut P,
        profile: Option<&Profile>,
        credential: Option<&Credential>,
        matcher: &dyn FieldMatcher,
    ) -> Result<RunSummary, AutofillError> {
        check_preconditions(profile, credential)?;
        let fields = page.scan_fields()?;
        if fields.is_empty() {
            info!("no fillable fields found on page");
        }
        self.run_autofill(&fields, profile, credential, matcher, page)
    }

    fn process_field<W: PageWriter + ?Sized>(
        &self,
        index: usize,
        field: &FormField,
        profile: &Profile,
        matcher: &dyn FieldMatcher,
        writer: &mut W,
    ) -> (FieldOutcome, Option<String>) {
        let result = matcher.match_field(field, profile);

        let (decision, applied) = match result.value.as_deref() {
            None => (FieldDecision::Skipped(SkipReason::NoMatch), None),
            Some(value) if result.confidence > self.threshold => match writer.write_value(field, value) {
                Ok(()) => {
                    info!(field = %field.name, confidence = result.confidence, "field filled");
                    (FieldDecision::Accepted, Some(value.to_string()))
                }
                Err(e) => {
                    warn!(field = %field.name, error = %e, "could not write field value");
                    (FieldDecision::Errored(e.to_string()), None)
                }
            },
            // Also reached when the confidence is NaN
            Some(_) => {
                debug!(
                    field = %field.name,
                    confidence = result.confidence,
                    threshold = self.threshold,
                    "confidence too low, skipping"
                );
                (FieldDecision::Skipped(SkipReason::BelowThreshold), None)
            }
        };

        let outcome = FieldOutcome {
            index,
            field: field.name.clone(),
            decision,
            confidence: result.confidence,
            attempts: result.attempts,
        };
        (outcome, applied)
    }
}

fn check_preconditions<'a>(
    profile: Option<&'a Profile>,
    credential: Option<&Credential>,
) -> Result<&'a Profile, AutofillError> {
    if !credential.is_some_and(Credential::is_usable) {
        warn!("autofill aborted: no API key configured");
        return Err(AutofillError::MissingCredential);
    }
    profile.ok_or_else(|| {
        warn!("autofill aborted: no profile configured");
        AutofillError::MissingProfile
    })
}
