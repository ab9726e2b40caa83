use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Value, json};

use crate::error::ProviderError;
use crate::provider::{CompletionOptions, CompletionPrompt, CompletionProvider};

// ============================================================================
// ScriptedProvider: replays queued replies (for testing without a network)
// ============================================================================

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<String, ProviderError>>,
    prompts: Vec<CompletionPrompt>,
}

/// Provider that answers from a queue of canned replies and failures.
///
/// Clones share the same queue and call log, so a test can keep one handle
/// while the engine owns another. An exhausted queue answers with a network
/// error.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.lock().replies.push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, error: ProviderError) -> Self {
        self.lock().replies.push_back(Err(error));
        self
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.lock().prompts.len()
    }

    pub fn prompts(&self) -> Vec<CompletionPrompt> {
        self.lock().prompts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(
        &self,
        prompt: &CompletionPrompt,
        _options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let mut script = self.lock();
        script.prompts.push(prompt.clone());
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Network("scripted replies exhausted".into())))
    }
}

// ============================================================================
// HeuristicProvider: offline, rule-based stand-in for a language model
// ============================================================================

/// Terms that name the same profile concept.
const SYNONYM_GROUPS: &[&[&str]] = &[
    &["email", "mail", "メール", "メールアドレス"],
    &["phone", "tel", "telephone", "mobile", "電話", "電話番号", "携帯"],
    &["name", "fullname", "氏名", "名前", "お名前"],
    &["address", "street", "住所"],
    &["zip", "postal", "postcode", "郵便番号"],
    &["company", "organization", "organisation", "会社", "会社名"],
    &["birthday", "birthdate", "dob", "生年月日"],
];

/// Deterministic provider that reads the match prompt's JSON document and
/// scores profile keys against the field's attributes by string rules.
///
/// Answers in the same `{value, confidence}` shape a model would.
pub struct HeuristicProvider;

impl CompletionProvider for HeuristicProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete(
        &self,
        prompt: &CompletionPrompt,
        _options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let doc: Value = serde_json::from_str(&prompt.user)
            .map_err(|e| ProviderError::Decode(format!("prompt is not JSON: {}", e)))?;

        let field_terms: Vec<String> = doc["field"]
            .as_object()
            .map(|attrs| {
                attrs
                    .iter()
                    .filter(|(k, _)| k.as_str() != "type")
                    .filter_map(|(_, v)| v.as_str())
                    .map(normalize_term)
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let best = doc["profile"]
            .as_object()
            .into_iter()
            .flatten()
            .filter_map(|(key, value)| {
                let score = score_key(&normalize_term(key), &field_terms);
                (score > 0.0).then(|| (score, value.as_str().unwrap_or_default()))
            })
            .fold(None::<(f64, &str)>, |best, candidate| match best {
                Some(b) if b.0 >= candidate.0 => Some(b),
                _ => Some(candidate),
            });

        let answer = match best {
            Some((confidence, value)) => json!({ "value": value, "confidence": confidence }),
            None => json!({ "value": null, "confidence": 0.0 }),
        };
        Ok(answer.to_string())
    }
}

/// Lowercase and drop separators so "Full Name", "full_name" and "fullName" agree.
fn normalize_term(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.' | ':' | '*'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn score_key(key: &str, field_terms: &[String]) -> f64 {
    if key.is_empty() {
        return 0.0;
    }
    if field_terms.iter().any(|t| t == key) {
        return 1.0;
    }
    if field_terms
        .iter()
        .any(|t| t.chars().count() >= 2 && (t.contains(key) || key.contains(t.as_str())))
    {
        return 0.8;
    }
    let shares_group = SYNONYM_GROUPS.iter().any(|group| {
        let key_in = group.iter().any(|s| key.contains(s));
        let field_in = field_terms
            .iter()
            .any(|t| group.iter().any(|s| t.contains(s)));
        key_in && field_in
    });
    if shares_group { 0.6 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(field: Value, profile: Value) -> CompletionPrompt {
        CompletionPrompt {
            system: String::new(),
            user: json!({ "field": field, "profile": profile }).to_string(),
        }
    }

    fn answer(p: &CompletionPrompt) -> Value {
        let text = HeuristicProvider.complete(p, &CompletionOptions::default()).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn exact_key_match_scores_one() {
        let p = prompt(json!({"name": "email", "type": "email"}), json!({"email": "a@b.test"}));
        let v = answer(&p);
        assert_eq!(v["value"], "a@b.test");
        assert_eq!(v["confidence"], 1.0);
    }

    #[test]
    fn synonym_match_scores_partial() {
        let p = prompt(
            json!({"name": "contact", "type": "text", "label": "メールアドレス"}),
            json!({"email": "a@b.test", "氏名": "山田太郎"}),
        );
        let v = answer(&p);
        assert_eq!(v["value"], "a@b.test");
        assert_eq!(v["confidence"], 0.6);
    }

    #[test]
    fn no_match_returns_null() {
        let p = prompt(json!({"name": "coupon", "type": "text"}), json!({"email": "a@b.test"}));
        let v = answer(&p);
        assert!(v["value"].is_null());
        assert_eq!(v["confidence"], 0.0);
    }

    #[test]
    fn scripted_provider_counts_calls_across_clones() {
        let scripted = ScriptedProvider::new().reply("{}");
        let handle = scripted.clone();
        let p = prompt(json!({}), json!({}));
        assert!(scripted.complete(&p, &CompletionOptions::default()).is_ok());
        assert!(scripted.complete(&p, &CompletionOptions::default()).is_err());
        assert_eq!(handle.calls(), 2);
    }
}
