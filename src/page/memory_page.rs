use crate::error::PageError;
use crate::field::detector::{RawInput, detect_fields, fillable_kind};
use crate::field::field_model::FormField;
use crate::page::{FormPage, PageWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Input,
    Change,
}

/// A synthetic event dispatched on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub target: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
struct Element {
    raw: RawInput,
    value: String,
}

/// In-memory page: a list of inputs with values and an event log.
///
/// Used for dry runs against a scanned snapshot and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    elements: Vec<Element>,
    events: Vec<DispatchedEvent>,
}

impl MemoryPage {
    pub fn from_raw(inputs: Vec<RawInput>) -> Self {
        Self {
            elements: inputs
                .into_iter()
                .map(|raw| Element { raw, value: String::new() })
                .collect(),
            events: Vec::new(),
        }
    }

    /// Build a page holding one `<input>` per field.
    pub fn from_fields(fields: &[FormField]) -> Self {
        let inputs = fields
            .iter()
            .map(|f| RawInput {
                tag: "input".into(),
                name: Some(f.name.clone()),
                input_type: Some(f.input_type.clone()),
                id: f.id.clone(),
                class_name: f.class_name.clone(),
                placeholder: f.placeholder.clone(),
                aria_label: f.aria_label.clone(),
                label_for: f.label.clone(),
                ..RawInput::default()
            })
            .collect();
        Self::from_raw(inputs)
    }

    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.find(name).map(|i| self.elements[i].value.as_str())
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    /// Drop an element, as a page script might between scan and write.
    pub fn remove_element(&mut self, name: &str) {
        if let Some(i) = self.find(name) {
            self.elements.remove(i);
        }
    }

    /// Fillable element lookup by `name`, or by `id` for inputs without a name.
    fn find(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| {
            if fillable_kind(&e.raw).is_none() {
                return false;
            }
            match e.raw.name.as_deref().filter(|n| !n.trim().is_empty()) {
                Some(n) => n == name,
                None => e.raw.id.as_deref() == Some(name),
            }
        })
    }
}

impl PageWriter for MemoryPage {
    fn write_value(&mut self, field: &FormField, value: &str) -> Result<(), PageError> {
        let index = self
            .find(&field.name)
            .ok_or_else(|| PageError::ElementNotFound(field.name.clone()))?;
        self.elements[index].value = value.to_string();
        for kind in [EventKind::Input, EventKind::Change] {
            self.events.push(DispatchedEvent {
                target: field.name.clone(),
                kind,
            });
        }
        Ok(())
    }
}

impl FormPage for MemoryPage {
    fn scan_fields(&mut self) -> Result<Vec<FormField>, PageError> {
        let raw: Vec<RawInput> = self.elements.iter().map(|e| e.raw.clone()).collect();
        Ok(detect_fields(&raw))
    }
}
