//! Per-field validation rules.
//!
//! Rules run in a fixed order and the first failing rule decides the message:
//! required, email shape, numeric parse, numeric minimum. An empty message means valid.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::FormSchema;
use crate::types::{ErrorState, FieldDescriptor, FieldType, FieldValue, FormValues};

pub const INVALID_EMAIL: &str = "Please enter a valid email address.";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is a valid regex"));

/// Returns the error message for `value`, or an empty string when it passes every rule.
pub fn validate_field(field: &FieldDescriptor, value: &FieldValue) -> String {
    if field.required && value.is_empty() {
        return format!("{} is required.", field.label);
    }

    let Some(text) = value.as_text() else {
        return String::new();
    };
    if text.is_empty() {
        return String::new();
    }

    match &field.field_type {
        FieldType::Email if !EMAIL_RE.is_match(text) => INVALID_EMAIL.to_string(),
        FieldType::Number { min } => match parse_number(text) {
            None => format!("{} must be a number.", field.label),
            Some(n) => match min {
                Some(min) if n < *min => format!("{} must be at least {}.", field.label, min),
                _ => String::new(),
            },
        },
        _ => String::new(),
    }
}

/// Validates every field of `schema` in order. Missing values count as empty.
pub fn validate_all(schema: &FormSchema, values: &FormValues) -> ErrorState {
    let mut errors = ErrorState::new();
    for field in schema.fields() {
        let message = match values.get(&field.id) {
            Some(value) => validate_field(field, value),
            None => validate_field(field, &field.field_type.empty_value()),
        };
        errors.record(&field.id, message);
    }
    errors
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
