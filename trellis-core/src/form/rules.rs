//! Ready-made validation rules for common field kinds.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::error;
use url::Url;

use super::rule::{as_text, ValidationRule};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const PHONE_PATTERN: &str = r"^\+?[1-9]\d{0,15}$";
const URL_PATTERN: &str = r"^https?://.+";

/// Compile a preset pattern once. A pattern that fails to compile is logged
/// and the preset falls back to its other checks.
fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<Regex> {
    cell.get_or_init(|| {
        Regex::new(pattern)
            .map_err(|err| error!(pattern, %err, "invalid preset pattern"))
            .ok()
    })
    .clone()
}

fn email_regex() -> Option<Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, EMAIL_PATTERN)
}

fn phone_regex() -> Option<Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, PHONE_PATTERN)
}

fn url_regex() -> Option<Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, URL_PATTERN)
}

fn with_pattern(rule: ValidationRule, regex: Option<Regex>) -> ValidationRule {
    match regex {
        Some(regex) => rule.pattern(regex),
        None => rule,
    }
}

fn mismatches(regex: Option<Regex>, value: &Value) -> bool {
    regex.is_some_and(|regex| !regex.is_match(&as_text(value)))
}

/// Non-empty value.
pub fn required() -> ValidationRule {
    ValidationRule::new().required()
}

/// Required address of the form `local@domain.tld`.
pub fn email() -> ValidationRule {
    with_pattern(ValidationRule::new().required(), email_regex()).custom(|value| {
        mismatches(email_regex(), value).then(|| "Invalid email format".to_string())
    })
}

/// Required password: at least 8 characters with a lowercase letter, an
/// uppercase letter and a digit.
pub fn password() -> ValidationRule {
    ValidationRule::new()
        .required()
        .min_length(8)
        .custom(|value| password_problem(value).map(str::to_string))
}

fn password_problem(value: &Value) -> Option<&'static str> {
    let text = as_text(value);
    if text.chars().count() < 8 {
        Some("Password must be at least 8 characters")
    } else if !text.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must contain at least one lowercase letter")
    } else if !text.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain at least one uppercase letter")
    } else if !text.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least one number")
    } else {
        None
    }
}

/// Optional international phone number: up to 16 digits, optional `+`.
pub fn phone() -> ValidationRule {
    with_pattern(ValidationRule::new(), phone_regex()).custom(|value| {
        mismatches(phone_regex(), value).then(|| "Invalid phone number".to_string())
    })
}

/// Optional absolute `http`/`https` URL.
pub fn url() -> ValidationRule {
    with_pattern(ValidationRule::new(), url_regex()).custom(|value| {
        Url::parse(&as_text(value))
            .err()
            .map(|_| "Invalid URL".to_string())
    })
}
