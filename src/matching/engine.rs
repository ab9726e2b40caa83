use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::field::field_model::FormField;
use crate::matching::prompt::build_match_prompt;
use crate::matching::response::parse_match_response;
use crate::profile::profile_model::Profile;
use crate::provider::{CompletionOptions, CompletionProvider};

pub const MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

// ============================================================================
// MatchResult
// ============================================================================

/// Outcome of matching one field. `value == None` implies `confidence == 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub field: FormField,
    pub value: Option<String>,
    pub confidence: f64,
    /// Provider calls made for this field (0 when short-circuited).
    pub attempts: u32,
}

impl MatchResult {
    pub fn no_match(field: &FormField, attempts: u32) -> Self {
        Self {
            field: field.clone(),
            value: None,
            confidence: 0.0,
            attempts,
        }
    }
}

/// Anything that can resolve a field against a profile.
///
/// Implementations are total: every failure resolves to a zero-confidence
/// `MatchResult` rather than an error.
pub trait FieldMatcher {
    fn match_field(&self, field: &FormField, profile: &Profile) -> MatchResult;
}

// ============================================================================
// RetryPolicy
// ============================================================================

/// Bounded retry with linear backoff: the wait after attempt `n` is `base * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to `1..=MAX_ATTEMPTS`.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
            base_delay,
        }
    }

    /// Default attempt budget without waiting between attempts.
    pub fn immediate() -> Self {
        Self::new(MAX_ATTEMPTS, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

// ============================================================================
// MatchingEngine
// ============================================================================

/// Resolves fields against a profile through a completion provider.
///
/// Holds no per-call state; each call builds its own prompt and retry loop.
pub struct MatchingEngine {
    provider: Box<dyn CompletionProvider>,
    options: CompletionOptions,
    retry: RetryPolicy,
}

impl MatchingEngine {
    pub fn new(provider: Box<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            options: CompletionOptions::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Match one field. Never fails: transport failures are retried up to
    /// the policy's attempt budget, and unusable completions resolve to a
    /// no-match immediately.
    pub fn match_field_with_profile(&self, field: &FormField, profile: &Profile) -> MatchResult {
        if field.name.trim().is_empty() {
            warn!("field without a name reached the matcher; skipping");
            return MatchResult::no_match(field, 0);
        }
        if profile.is_empty() {
            debug!(field = %field.name, "empty profile, nothing to match");
            return MatchResult::no_match(field, 0);
        }

        let prompt = build_match_prompt(field, profile);
        let max_attempts = self.retry.max_attempts();

        for attempt in 1..=max_attempts {
            match self.provider.complete(&prompt, &self.options) {
                Ok(text) => {
                    return match parse_match_response(&text) {
                        Ok(answer) => {
                            debug!(
                                field = %field.name,
                                attempt,
                                confidence = answer.confidence,
                                matched = answer.value.is_some(),
                                "provider answered"
                            );
                            MatchResult {
                                field: field.clone(),
                                value: answer.value,
                                confidence: answer.confidence,
                                attempts: attempt,
                            }
                        }
                        Err(reason) => {
                            debug!(field = %field.name, attempt, %reason, "unusable completion");
                            MatchResult::no_match(field, attempt)
                        }
                    };
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        field = %field.name,
                        provider = self.provider.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "completion failed, retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => {
                    error!(
                        field = %field.name,
                        provider = self.provider.name(),
                        attempts = max_attempts,
                        error = %e,
                        "completion failed, giving up"
                    );
                }
            }
        }

        MatchResult::no_match(field, max_attempts)
    }
}

impl FieldMatcher for MatchingEngine {
    fn match_field(&self, field: &FormField, profile: &Profile) -> MatchResult {
        self.match_field_with_profile(field, profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_linearly() {
        let policy = RetryPolicy::new(3, Duration::from_millis(200));
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
    }

    #[test]
    fn attempts_are_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
        assert_eq!(RetryPolicy::new(10, Duration::ZERO).max_attempts(), 3);
    }
}
