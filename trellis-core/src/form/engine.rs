//! Form Engine
//!
//! A form keeps its fields in one signal and derives `errors` and
//! `is_valid` from them. An internal effect re-validates the whole form
//! whenever the field map changes; `set_field_value` additionally validates
//! the edited field right away, inside the same batch.
//!
//! # State
//!
//! - `fields`: name to [`FormField`]. Replaced as a whole on every edit.
//! - `errors`: name to message. `is_valid` is `errors.is_empty()` after
//!   every mutation.
//! - `is_dirty`: set by the first edit that moves a value away from its
//!   initial value, cleared only by [`Form::reset`].
//! - `is_submitting`: true while the submit handler is in flight.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::config::{Errors, FormConfig, Values};
use super::field::FormField;
use crate::reactive::{batch, untracked, Effect, Signal};

type FieldMap = IndexMap<String, FormField>;

/// How a call to [`Form::submit`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; the handler was not called.
    Invalid,
    /// The form is valid but has no submit handler.
    NoHandler,
    /// The handler completed successfully.
    Submitted,
    /// The handler returned an error or panicked. The failure was logged.
    Failed,
}

struct FormState {
    config: FormConfig,
    /// Field values right after initialization, for dirty tracking.
    initial: Values,
    fields: Signal<FieldMap>,
    errors: Signal<Errors>,
    is_valid: Signal<bool>,
    is_dirty: Signal<bool>,
    is_submitting: Signal<bool>,
}

impl FormState {
    fn has_field(&self, name: &str) -> bool {
        self.fields.with_untracked(|fields| fields.contains_key(name))
    }

    fn values_untracked(&self) -> Values {
        self.fields.with_untracked(collect_values)
    }

    fn validate(&self) -> Errors {
        let (mut errors, values) = self.fields.with_untracked(|fields| {
            let errors: Errors = fields
                .iter()
                .filter_map(|(name, field)| field.validate().map(|msg| (name.clone(), msg)))
                .collect();
            (errors, collect_values(fields))
        });

        if let Some(on_validate) = &self.config.on_validate {
            let extra = untracked(|| on_validate(&values));
            errors.extend(extra.into_iter().filter(|(_, msg)| !msg.is_empty()));
        }

        batch(|| {
            self.is_valid.set(errors.is_empty());
            self.errors.set(errors.clone());
        });
        errors
    }
}

fn collect_values(fields: &FieldMap) -> Values {
    fields
        .iter()
        .map(|(name, field)| (name.clone(), field.value.clone()))
        .collect()
}

struct FormInner {
    state: Arc<FormState>,
    auto_validate: Effect,
}

impl Drop for FormInner {
    fn drop(&mut self) {
        self.auto_validate.dispose();
    }
}

/// Resets `is_submitting` when a submission ends, however it ends.
struct SubmittingGuard<'a>(&'a Signal<bool>);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle to a form. Clones share the same form.
///
/// All reads are tracked, so effects re-run when the part of the form
/// they read changes.
///
/// ```rust
/// use trellis_core::form::{rules, Form, FormConfig};
///
/// let form = Form::new(
///     FormConfig::new()
///         .initial_value("email", "")
///         .rule("email", rules::email()),
/// );
///
/// form.set_field_value("email", "a@b.com");
/// assert!(form.is_valid());
/// assert!(form.is_dirty());
/// ```
#[derive(Clone)]
pub struct Form {
    inner: Arc<FormInner>,
}

impl Form {
    /// Build the fields and start auto-validation.
    pub fn new(config: FormConfig) -> Self {
        let fields = config.build_fields();
        let initial = collect_values(&fields);

        let state = Arc::new(FormState {
            config,
            initial,
            fields: Signal::with_equality(fields, |_, _| false),
            errors: Signal::new(Errors::new()),
            is_valid: Signal::new(true),
            is_dirty: Signal::new(false),
            is_submitting: Signal::new(false),
        });

        let watched = Arc::clone(&state);
        let auto_validate = Effect::new(move || {
            if watched.fields.with(|fields| !fields.is_empty()) {
                untracked(|| watched.validate());
            }
        });

        Self {
            inner: Arc::new(FormInner {
                state,
                auto_validate,
            }),
        }
    }

    fn state(&self) -> &FormState {
        &self.inner.state
    }

    /// Change a field's value, mark it touched and re-validate it.
    ///
    /// Unknown names are logged and ignored.
    pub fn set_field_value(&self, name: &str, value: impl Into<Value>) {
        let state = self.state();
        if !state.has_field(name) {
            warn!(field = name, "set_field_value on unknown field");
            return;
        }
        let value = value.into();

        batch(|| {
            let mut field_error = None;
            state.fields.update(|fields| {
                let mut next = fields.clone();
                if let Some(field) = next.get_mut(name) {
                    field.value = value.clone();
                    field.touched = true;
                    field_error = field.validate();
                }
                next
            });

            if state.initial.get(name) != Some(&value) {
                state.is_dirty.set(true);
            }

            state.errors.update(|errors| {
                let mut next = errors.clone();
                match field_error {
                    Some(message) => {
                        next.insert(name.to_string(), message);
                    }
                    None => {
                        next.shift_remove(name);
                    }
                }
                next
            });
            state
                .is_valid
                .set(state.errors.with_untracked(IndexMap::is_empty));
        });
    }

    /// Mark a field touched or untouched without changing its value.
    pub fn set_field_touched(&self, name: &str, touched: bool) {
        let state = self.state();
        if !state.has_field(name) {
            warn!(field = name, "set_field_touched on unknown field");
            return;
        }
        state.fields.update(|fields| {
            let mut next = fields.clone();
            if let Some(field) = next.get_mut(name) {
                field.touched = touched;
            }
            next
        });
    }

    /// Re-run every rule and the whole-form validator.
    pub fn validate(&self) -> Errors {
        self.state().validate()
    }

    /// Return to the initial fields with no errors.
    pub fn reset(&self) {
        let state = self.state();
        state.fields.set(state.config.build_fields());
        batch(|| {
            state.is_dirty.set(false);
            state.is_submitting.set(false);
            state.errors.set(Errors::new());
            state.is_valid.set(true);
        });
        debug!("form reset");
    }

    /// Validate, then hand the values to the submit handler.
    ///
    /// Handler errors and panics are logged, never propagated, and
    /// `is_submitting` is false again once this returns. Callers must not
    /// start a second submission while one is in flight.
    pub async fn submit(&self) -> SubmitOutcome {
        let state = self.state();
        if !state.validate().is_empty() {
            return SubmitOutcome::Invalid;
        }
        let Some(handler) = state.config.on_submit.clone() else {
            return SubmitOutcome::NoHandler;
        };

        state.is_submitting.set(true);
        let _submitting = SubmittingGuard(&state.is_submitting);

        let values = state.values_untracked();
        let result = AssertUnwindSafe(async move { handler(values).await })
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => SubmitOutcome::Submitted,
            Ok(Err(err)) => {
                error!(error = %err, "form submission failed");
                SubmitOutcome::Failed
            }
            Err(_) => {
                error!("form submit handler panicked");
                SubmitOutcome::Failed
            }
        }
    }

    /// Current values by field name.
    pub fn values(&self) -> Values {
        self.state().fields.with(collect_values)
    }

    /// All fields, each with its current error filled in.
    pub fn fields(&self) -> FieldMap {
        let errors = self.errors();
        self.state().fields.with(|fields| {
            fields
                .iter()
                .map(|(name, field)| {
                    let mut field = field.clone();
                    field.error = errors.get(name).cloned();
                    (name.clone(), field)
                })
                .collect()
        })
    }

    /// One field with its current error filled in.
    pub fn field(&self, name: &str) -> Option<FormField> {
        let error = self.error(name);
        self.state().fields.with(|fields| {
            fields.get(name).cloned().map(|mut field| {
                field.error = error;
                field
            })
        })
    }

    pub fn errors(&self) -> Errors {
        self.state().errors.get()
    }

    pub fn error(&self, name: &str) -> Option<String> {
        self.state().errors.with(|errors| errors.get(name).cloned())
    }

    pub fn is_valid(&self) -> bool {
        self.state().is_valid.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.state().is_dirty.get()
    }

    pub fn is_submitting(&self) -> bool {
        self.state().is_submitting.get()
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Form")
            .field("values", &state.values_untracked())
            .field("errors", &state.errors.get_untracked())
            .field("is_valid", &state.is_valid.get_untracked())
            .field("is_dirty", &state.is_dirty.get_untracked())
            .field("is_submitting", &state.is_submitting.get_untracked())
            .finish()
    }
}

/// Create a form from `config`.
pub fn create_form(config: FormConfig) -> Form {
    Form::new(config)
}
