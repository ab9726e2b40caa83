use serde::{Deserialize, Serialize};

/// Text-like input kinds the autofill pass is willing to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Email,
    Tel,
    Password,
    Url,
    Search,
    Number,
    Date,
    Textarea,
}

impl InputKind {
    /// Parse an HTML `type` attribute. Returns `None` for kinds that are
    /// never filled (buttons, hidden inputs, toggles, pickers).
    pub fn from_type_attr(raw: &str) -> Option<InputKind> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Some(InputKind::Text),
            "email" => Some(InputKind::Email),
            "tel" => Some(InputKind::Tel),
            "password" => Some(InputKind::Password),
            "url" => Some(InputKind::Url),
            "search" => Some(InputKind::Search),
            "number" => Some(InputKind::Number),
            "date" => Some(InputKind::Date),
            "textarea" => Some(InputKind::Textarea),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Text => "text",
            InputKind::Email => "email",
            InputKind::Tel => "tel",
            InputKind::Password => "password",
            InputKind::Url => "url",
            InputKind::Search => "search",
            InputKind::Number => "number",
            InputKind::Date => "date",
            InputKind::Textarea => "textarea",
        }
    }
}

/// One detected, fillable form field.
///
/// `name` is the identity key used to find the element again when writing
/// the value back. It falls back to the element id when the `name`
/// attribute is absent. All other attributes are descriptive only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
}

impl FormField {
    pub fn new(name: &str, kind: InputKind) -> Self {
        Self {
            name: name.to_string(),
            input_type: kind.as_str().to_string(),
            label: None,
            placeholder: None,
            id: None,
            class_name: None,
            aria_label: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class_name(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self
    }

    pub fn with_aria_label(mut self, aria_label: &str) -> Self {
        self.aria_label = Some(aria_label.to_string());
        self
    }

    pub fn kind(&self) -> Option<InputKind> {
        InputKind::from_type_attr(&self.input_type)
    }

    /// Descriptive attributes that are present, in prompt order.
    pub fn attributes(&self) -> Vec<(&'static str, &str)> {
        let mut attrs = vec![("name", self.name.as_str()), ("type", self.input_type.as_str())];
        let optional = [
            ("label", &self.label),
            ("placeholder", &self.placeholder),
            ("id", &self.id),
            ("class", &self.class_name),
            ("aria-label", &self.aria_label),
        ];
        for (key, value) in optional {
            if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                attrs.push((key, v));
            }
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excluded_kinds_do_not_parse() {
        for raw in ["submit", "button", "hidden", "checkbox", "radio", "file"] {
            assert_eq!(InputKind::from_type_attr(raw), None, "{raw}");
        }
    }

    #[test]
    fn missing_type_is_text() {
        assert_eq!(InputKind::from_type_attr(""), Some(InputKind::Text));
        assert_eq!(InputKind::from_type_attr("EMAIL"), Some(InputKind::Email));
    }

    #[test]
    fn attributes_skip_blank_values() {
        let field = FormField::new("email", InputKind::Email)
            .with_label("Email")
            .with_placeholder("  ");
        let keys: Vec<_> = field.attributes().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["name", "type", "label"]);
    }

    #[test]
    fn serializes_type_and_camel_case() {
        let field = FormField::new("fullName", InputKind::Text).with_class_name("input-lg");
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["className"], "input-lg");
        assert!(json.get("label").is_none());
    }
}
