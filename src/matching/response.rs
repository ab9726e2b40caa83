use serde_json::Value;
use thiserror::Error;

/// A validated `{value, confidence}` answer.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchAnswer {
    pub value: Option<String>,
    pub confidence: f64,
}

/// Why a completion was not accepted as a match answer.
#[derive(Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("empty completion")]
    Empty,
    #[error("completion is not JSON")]
    NotJson,
    #[error("completion is not a JSON object")]
    NotObject,
    #[error("'value' missing or not a string or null")]
    InvalidValue,
    #[error("'confidence' missing, not a number, or outside [0, 1]")]
    InvalidConfidence,
}

/// Parse and validate completion text against the two-field schema.
///
/// Tolerates surrounding prose and markdown code fences around the object.
/// A blank string value is treated as null, and a null value always carries
/// confidence 0.
pub fn parse_match_response(text: &str) -> Result<MatchAnswer, Rejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Empty);
    }

    let doc = extract_json(trimmed).ok_or(Rejection::NotJson)?;
    let obj = doc.as_object().ok_or(Rejection::NotObject)?;

    let value = match obj.get("value") {
        Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        _ => return Err(Rejection::InvalidValue),
    };

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite() && (0.0..=1.0).contains(c))
        .ok_or(Rejection::InvalidConfidence)?;

    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => Ok(MatchAnswer {
            value: Some(v),
            confidence,
        }),
        None => Ok(MatchAnswer {
            value: None,
            confidence: 0.0,
        }),
    }
}

fn extract_json(text: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str(text) {
        return Some(v);
    }
    let unfenced = strip_code_fence(text);
    if let Ok(v) = serde_json::from_str(unfenced) {
        return Some(v);
    }
    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&unfenced[start..=end]).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
