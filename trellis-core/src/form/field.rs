//! Form field state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rule::ValidationRule;

/// Input kind of a field. Decides the default value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Password,
    Number,
    Textarea,
    Select,
    Checkbox,
    Radio,
}

impl FieldType {
    /// Value of a field that has not been given one.
    pub fn default_value(self) -> Value {
        match self {
            FieldType::Checkbox => Value::Bool(false),
            FieldType::Number => Value::from(0),
            _ => Value::String(String::new()),
        }
    }
}

/// One choice of a select or radio field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: Value,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// A field: its value, presentation metadata and validation state.
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub field_type: FieldType,
    pub value: Value,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub options: Vec<FieldOption>,
    pub rule: Option<ValidationRule>,
    /// Current error. Filled in by [`Form::fields`](super::Form::fields).
    pub error: Option<String>,
    pub touched: bool,
}

impl FormField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            value: field_type.default_value(),
            label: None,
            placeholder: None,
            options: Vec::new(),
            rule: None,
            error: None,
            touched: false,
        }
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn option(mut self, option: FieldOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Run the field's rule against its current value.
    pub fn validate(&self) -> Option<String> {
        self.rule.as_ref().and_then(|rule| rule.validate(&self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_values_follow_type() {
        assert_eq!(FormField::new("a", FieldType::Checkbox).value, json!(false));
        assert_eq!(FormField::new("b", FieldType::Number).value, json!(0));
        assert_eq!(FormField::new("c", FieldType::Email).value, json!(""));
    }

    #[test]
    fn field_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&FieldType::Textarea).unwrap(), "\"textarea\"");
        let parsed: FieldType = serde_json::from_str("\"radio\"").unwrap();
        assert_eq!(parsed, FieldType::Radio);
    }

    #[test]
    fn builder_sets_metadata() {
        let field = FormField::new("size", FieldType::Select)
            .label("Size")
            .placeholder("Pick one")
            .option(FieldOption::new("s", "Small"))
            .option(FieldOption::new("l", "Large"))
            .value("s");

        assert_eq!(field.label.as_deref(), Some("Size"));
        assert_eq!(field.options.len(), 2);
        assert_eq!(field.value, json!("s"));
        assert!(!field.touched);
    }

    #[test]
    fn validate_without_rule_passes() {
        assert_eq!(FormField::new("x", FieldType::Text).validate(), None);
        let field = FormField::new("x", FieldType::Text).rule(ValidationRule::new().required());
        assert_eq!(field.validate().as_deref(), Some("This field is required"));
    }
}
