//! Forms
//!
//! Validation-driven form state built on signals and effects. Field values
//! are `serde_json::Value`s so one form can mix text, numbers, booleans and
//! lists; rules decide what each field accepts.
//!
//! Validation failures are data, not errors: they live in
//! [`Form::errors`] and drive [`Form::is_valid`].

mod config;
mod engine;
mod field;
mod rule;
pub mod rules;

pub use config::{Errors, FormConfig, Values};
pub use engine::{create_form, Form, SubmitOutcome};
pub use field::{FieldOption, FieldType, FormField};
pub use rule::{CustomCheck, ValidationRule};
