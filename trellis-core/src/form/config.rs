//! Form configuration.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;

use super::field::{FieldType, FormField};
use super::rule::ValidationRule;
use crate::error::SubmitError;

/// Field values by name, in declaration order.
pub type Values = IndexMap<String, Value>;

/// Error messages by field name.
pub type Errors = IndexMap<String, String>;

pub(crate) type SubmitHandler =
    Arc<dyn Fn(Values) -> BoxFuture<'static, Result<(), SubmitError>> + Send + Sync>;

pub(crate) type FormValidator = Arc<dyn Fn(&Values) -> Errors + Send + Sync>;

/// Everything a form is created from.
///
/// ```rust
/// use trellis_core::form::{rules, FormConfig};
///
/// let config = FormConfig::new()
///     .initial_value("email", "")
///     .rule("email", rules::email())
///     .on_submit(|values| async move {
///         println!("submitting {values:?}");
///         Ok::<_, std::io::Error>(())
///     });
/// # let _ = config;
/// ```
#[derive(Clone, Default)]
pub struct FormConfig {
    initial_values: Values,
    fields: IndexMap<String, FormField>,
    rules: IndexMap<String, ValidationRule>,
    pub(crate) on_submit: Option<SubmitHandler>,
    pub(crate) on_validate: Option<FormValidator>,
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a plain text field with a starting value.
    pub fn initial_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initial_values.insert(name.into(), value.into());
        self
    }

    /// Declare a field with metadata. An `initial_value` under the same
    /// name overrides its value.
    pub fn field(mut self, field: FormField) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Attach a rule to a declared field, replacing the field's own rule.
    pub fn rule(mut self, name: impl Into<String>, rule: ValidationRule) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }

    /// Async handler run by [`Form::submit`](super::Form::submit) with the
    /// current values.
    pub fn on_submit<F, Fut, E>(mut self, handler: F) -> Self
    where
        F: Fn(Values) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<SubmitError>,
    {
        self.on_submit = Some(Arc::new(move |values| {
            let fut = handler(values);
            async move { fut.await.map_err(Into::into) }.boxed()
        }));
        self
    }

    /// Whole-form check run after the per-field rules. Its messages
    /// overwrite field errors under the same name.
    pub fn on_validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Values) -> Errors + Send + Sync + 'static,
    {
        self.on_validate = Some(Arc::new(validator));
        self
    }

    /// Fields in their initial state.
    pub fn build_fields(&self) -> IndexMap<String, FormField> {
        let mut fields = self.fields.clone();

        for (name, value) in &self.initial_values {
            fields
                .entry(name.clone())
                .or_insert_with(|| FormField::new(name.clone(), FieldType::Text))
                .value = value.clone();
        }

        for (name, rule) in &self.rules {
            if let Some(field) = fields.get_mut(name) {
                field.rule = Some(rule.clone());
            }
        }

        for field in fields.values_mut() {
            field.error = None;
            field.touched = false;
        }
        fields
    }
}

impl fmt::Debug for FormConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormConfig")
            .field("initial_values", &self.initial_values)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("rules", &self.rules)
            .field("on_submit", &self.on_submit.is_some())
            .field("on_validate", &self.on_validate.is_some())
            .finish()
    }
}
