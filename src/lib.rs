//! Profile-driven web form autofill.
//!
//! Fields detected on a page are matched one at a time against a stored
//! profile by a language-model completion provider. Values whose confidence
//! exceeds a configurable threshold are written back into the page.

pub mod autofill;
pub mod browser;
pub mod cli;
pub mod error;
pub mod field;
pub mod matching;
pub mod page;
pub mod profile;
pub mod provider;
pub mod trace;

pub use autofill::orchestrator::{Autofill, CancelFlag};
pub use autofill::run_summary::RunSummary;
pub use error::AutofillError;
pub use field::field_model::FormField;
pub use matching::engine::{FieldMatcher, MatchResult, MatchingEngine};
pub use profile::profile_model::Profile;
