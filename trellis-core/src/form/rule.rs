//! Per-field validation rules.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

/// Caller-supplied check. Returns an error message, or `None` when valid.
pub type CustomCheck = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// An ordered set of checks applied to one field value.
///
/// Checks run in a fixed order and the first failure wins:
/// `required`, length, `pattern`, numeric range, `custom`.
///
/// ```rust
/// use serde_json::json;
/// use trellis_core::form::ValidationRule;
///
/// let rule = ValidationRule::new().required().min_length(3);
/// assert_eq!(rule.validate(&json!("")).as_deref(), Some("This field is required"));
/// assert_eq!(rule.validate(&json!("ab")).as_deref(), Some("Minimum length is 3 characters"));
/// assert_eq!(rule.validate(&json!("abc")), None);
/// ```
#[derive(Clone, Default)]
pub struct ValidationRule {
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    min: Option<f64>,
    max: Option<f64>,
    custom: Option<CustomCheck>,
}

impl ValidationRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn pattern(mut self, regex: Regex) -> Self {
        self.pattern = Some(regex);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn custom<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(check));
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Check `value`, returning the first failing message.
    pub fn validate(&self, value: &Value) -> Option<String> {
        if self.required && is_missing(value) {
            return Some("This field is required".to_string());
        }

        if is_blank(value) {
            return None;
        }

        let text = as_text(value);
        let length = text.chars().count();

        if let Some(min) = self.min_length {
            if length < min {
                return Some(format!("Minimum length is {min} characters"));
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                return Some(format!("Maximum length is {max} characters"));
            }
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&text) {
                return Some("Invalid format".to_string());
            }
        }

        if let Some(number) = value.as_f64() {
            if let Some(min) = self.min {
                if number < min {
                    return Some(format!("Minimum value is {min}"));
                }
            }
            if let Some(max) = self.max {
                if number > max {
                    return Some(format!("Maximum value is {max}"));
                }
            }
        }

        self.custom
            .as_ref()
            .and_then(|check| check(value))
            .filter(|message| !message.is_empty())
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .field("min", &self.min)
            .field("max", &self.max)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Values that fail `required`.
fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Values that skip every check after `required`.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Textual form used by length and pattern checks.
pub(crate) fn as_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_rule_accepts_anything() {
        let rule = ValidationRule::new();
        assert_eq!(rule.validate(&json!(null)), None);
        assert_eq!(rule.validate(&json!("")), None);
        assert_eq!(rule.validate(&json!(42)), None);
    }

    #[test]
    fn required_rejects_missing_values() {
        let rule = ValidationRule::new().required();
        for missing in [json!(null), json!(""), json!(false), json!([])] {
            assert_eq!(
                rule.validate(&missing).as_deref(),
                Some("This field is required"),
                "{missing}"
            );
        }
        assert_eq!(rule.validate(&json!(0)), None);
        assert_eq!(rule.validate(&json!(true)), None);
    }

    #[test]
    fn blank_optional_value_skips_other_checks() {
        let rule = ValidationRule::new()
            .min_length(3)
            .custom(|_| Some("always".to_string()));
        assert_eq!(rule.validate(&json!("")), None);
        assert_eq!(rule.validate(&json!(null)), None);
    }

    #[test]
    fn length_counts_characters() {
        let rule = ValidationRule::new().min_length(2).max_length(4);
        assert_eq!(
            rule.validate(&json!("a")).as_deref(),
            Some("Minimum length is 2 characters")
        );
        assert_eq!(rule.validate(&json!("äöü")), None);
        assert_eq!(
            rule.validate(&json!("abcde")).as_deref(),
            Some("Maximum length is 4 characters")
        );
    }

    #[test]
    fn required_accepts_zero_and_rejects_empty_list() {
        let rule = ValidationRule::new().required();
        assert_eq!(rule.validate(&json!(0)), None);
        assert_eq!(rule.validate(&json!(true)), None);
        assert_eq!(
            rule.validate(&json!([])).as_deref(),
            Some("This field is required")
        );
        assert_eq!(
            rule.validate(&json!(false)).as_deref(),
            Some("This field is required")
        );
    }

    #[test]
    fn pattern_checks_textual_form() {
        let rule = ValidationRule::new().pattern(Regex::new(r"^\d+$").unwrap());
        assert_eq!(rule.validate(&json!("123")), None);
        assert_eq!(rule.validate(&json!(123)), None);
        assert_eq!(rule.validate(&json!("12a")).as_deref(), Some("Invalid format"));
    }

    #[test]
    fn numeric_range_applies_to_numbers_only() {
        let rule = ValidationRule::new().min(1.0).max(10.0);
        assert_eq!(rule.validate(&json!(0)).as_deref(), Some("Minimum value is 1"));
        assert_eq!(rule.validate(&json!(11)).as_deref(), Some("Maximum value is 10"));
        assert_eq!(rule.validate(&json!(2.5)), None);
        assert_eq!(rule.validate(&json!("0")), None);
    }

    #[test]
    fn first_failure_wins() {
        let rule = ValidationRule::new()
            .min_length(5)
            .pattern(Regex::new("^x").unwrap())
            .custom(|_| Some("custom".to_string()));
        assert_eq!(
            rule.validate(&json!("abc")).as_deref(),
            Some("Minimum length is 5 characters")
        );
        assert_eq!(rule.validate(&json!("abcdef")).as_deref(), Some("Invalid format"));
        assert_eq!(rule.validate(&json!("xbcdef")).as_deref(), Some("custom"));
    }

    #[test]
    fn empty_custom_message_is_not_an_error() {
        let rule = ValidationRule::new().custom(|_| Some(String::new()));
        assert_eq!(rule.validate(&json!("value")), None);
    }
}
