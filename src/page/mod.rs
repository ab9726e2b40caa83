use crate::error::PageError;
use crate::field::field_model::FormField;

pub mod memory_page;

/// Write-back side of a page.
pub trait PageWriter {
    /// Set the input's value and dispatch `input` then `change` so that
    /// framework-driven pages observe the edit.
    fn write_value(&mut self, field: &FormField, value: &str) -> Result<(), PageError>;
}

/// A page that can be scanned for fields and written back to.
///
/// `scan_fields` reflects the page's current state on every call and keeps
/// document order.
pub trait FormPage: PageWriter {
    fn scan_fields(&mut self) -> Result<Vec<FormField>, PageError>;
}
