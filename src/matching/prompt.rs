use serde_json::{Map, Value, json};

use crate::field::field_model::FormField;
use crate::profile::profile_model::Profile;
use crate::provider::CompletionPrompt;

pub const SYSTEM_INSTRUCTION: &str = "You assist with filling in web forms automatically. \
Given one form field and a user profile, choose the profile value that belongs in the field. \
Respond with a single JSON object and nothing else.";

const TASK_INSTRUCTION: &str = "Analyze the form field and the profile. Return the best \
profile value for this field and your confidence as JSON: \
{\"value\": string | null, \"confidence\": number}. Use null with confidence 0 when no \
profile value fits. Copy the value exactly as it appears in the profile.";

/// Build the matching prompt for one field.
///
/// The user message is a JSON document: the field's present attributes, the
/// whole profile, the task, the confidence rubric, and the response shape.
pub fn build_match_prompt(field: &FormField, profile: &Profile) -> CompletionPrompt {
    let attributes: Map<String, Value> = field
        .attributes()
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();

    let profile_doc: Map<String, Value> = profile
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();

    let document = json!({
        "field": attributes,
        "profile": profile_doc,
        "instruction": TASK_INSTRUCTION,
        "confidence_rubric": {
            "exact_label_match": 1.0,
            "partial_or_synonym_match": "0.5 - 0.9",
            "speculative_match": "0.3 - 0.5",
            "no_match": 0.0
        },
        "response_format": {
            "value": "string | null",
            "confidence": "number between 0 and 1"
        }
    });

    CompletionPrompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user: serde_json::to_string_pretty(&document).unwrap_or_else(|_| document.to_string()),
    }
}
