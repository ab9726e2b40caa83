use serde::Deserialize;

use crate::field::field_model::{FormField, InputKind};

/// One input element as reported by the page scanner, before normalization.
///
/// Label candidates are captured separately so that the priority between
/// them is decided here rather than in the scanner script.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInput {
    pub tag: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub input_type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    /// Text of a `<label for=...>` pointing at this input.
    #[serde(default)]
    pub label_for: Option<String>,
    /// Text of an enclosing `<label>` wrapper.
    #[serde(default)]
    pub wrapper_label: Option<String>,
    /// Text of the nearest preceding sibling.
    #[serde(default)]
    pub preceding_text: Option<String>,
}

/// Normalize a scanner snapshot into the fields the engine will see.
///
/// Order is preserved. Non-text kinds and inputs with neither a `name` nor
/// an `id` are dropped.
pub fn detect_fields(raw: &[RawInput]) -> Vec<FormField> {
    raw.iter().filter_map(to_field).collect()
}

/// Fillable kind of a raw element, or `None` for elements never written to.
pub fn fillable_kind(raw: &RawInput) -> Option<InputKind> {
    match raw.tag.to_ascii_lowercase().as_str() {
        "textarea" => Some(InputKind::Textarea),
        "input" => InputKind::from_type_attr(raw.input_type.as_deref().unwrap_or("")),
        _ => None,
    }
}

fn to_field(raw: &RawInput) -> Option<FormField> {
    let kind = fillable_kind(raw)?;

    let id = non_empty(raw.id.as_deref());
    let name = non_empty(raw.name.as_deref()).or_else(|| id.clone())?;

    Some(FormField {
        name,
        input_type: kind.as_str().to_string(),
        label: resolve_label(raw),
        placeholder: non_empty(raw.placeholder.as_deref()),
        id,
        class_name: non_empty(raw.class_name.as_deref()),
        aria_label: non_empty(raw.aria_label.as_deref()),
    })
}

/// Label priority: explicit `for`, enclosing wrapper, preceding sibling, aria-label.
pub fn resolve_label(raw: &RawInput) -> Option<String> {
    [
        raw.label_for.as_deref(),
        raw.wrapper_label.as_deref(),
        raw.preceding_text.as_deref(),
        raw.aria_label.as_deref(),
    ]
    .into_iter()
    .find_map(clean_label)
}

fn clean_label(raw: Option<&str>) -> Option<String> {
    let collapsed = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
