use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::error::FormResult;
use crate::types::{FieldDescriptor, FieldType};

/// Property name every stored record carries next to its field values.
pub const TIMESTAMP_KEY: &str = "timestamp";

const COMMON_KEYS: [&str; 4] = ["id", "type", "label", "required"];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Schema must declare at least one field")]
    Empty,
    #[error("Field at index {0} has an empty id")]
    MissingId(usize),
    #[error("Field '{0}' is declared more than once")]
    DuplicateId(String),
    #[error("Field id '{0}' is reserved for the submission timestamp")]
    ReservedId(String),
    #[error("Field '{0}' has an empty label")]
    MissingLabel(String),
    #[error("Field '{0}' must include at least one option")]
    NoOptions(String),
    #[error("Field '{field}' lists option '{option}' more than once")]
    DuplicateOption { field: String, option: String },
    #[error("Field '{0}' has a min that is not a finite number")]
    InvalidMin(String),
    #[error("Field '{field}' has unexpected key '{key}'")]
    UnexpectedKey { field: String, key: String },
    #[error("Failed to parse schema as JSON: {0}")]
    Parse(String),
}

/// Ordered list of field descriptors shared by the form and the submissions view.
#[derive(Clone, Debug, PartialEq)]
pub struct FormSchema {
    fields: Vec<FieldDescriptor>,
}

impl FormSchema {
    /// Builds a schema after checking its structure.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, SchemaError> {
        validate_fields(&fields)?;
        Ok(Self { fields })
    }

    /// Registration form used when no schema file is configured.
    pub fn sample() -> Self {
        Self {
            fields: vec![
                FieldDescriptor::text("name", "Name").required(),
                FieldDescriptor::email("email", "Email").required(),
                FieldDescriptor::number("age", "Age", Some(18.0)),
                FieldDescriptor::select("gender", "Gender", &["Male", "Female", "Other"]).required(),
                FieldDescriptor::radio("role", "Role", &["Developer", "Designer", "Manager"])
                    .required(),
                FieldDescriptor::checkbox("skill", "Skills", &["HTML", "CSS", "JS"]).required(),
            ],
        }
    }

    /// Parses a JSON array of field descriptors. Keys that do not belong to a field's
    /// type (`min` on a text field, `options` on a number) are rejected.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let entries: Vec<Value> = serde_json::from_str(json.trim()).map_err(parse_error)?;
        for (index, entry) in entries.iter().enumerate() {
            check_keys(index, entry)?;
        }
        let fields = entries
            .into_iter()
            .map(serde_json::from_value::<FieldDescriptor>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(parse_error)?;
        Self::new(fields)
    }

    pub fn load(path: &Path) -> FormResult<Self> {
        let contents = fs::read_to_string(path)?;
        let schema = Self::from_json(&contents)?;
        tracing::info!(path = %path.display(), fields = schema.len(), "loaded form schema");
        Ok(schema)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json_pretty(&self) -> FormResult<String> {
        Ok(serde_json::to_string_pretty(&self.fields)?)
    }

    /// JSON Schema describing the schema file format.
    pub fn json_schema() -> FormResult<String> {
        let schema = schemars::schema_for!(Vec<FieldDescriptor>);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

fn parse_error(err: serde_json::Error) -> SchemaError {
    SchemaError::Parse(err.to_string())
}

fn check_keys(index: usize, entry: &Value) -> Result<(), SchemaError> {
    // Non-objects are reported by the typed parse.
    let Some(object) = entry.as_object() else {
        return Ok(());
    };
    let type_keys: &[&str] = match object.get("type").and_then(Value::as_str) {
        Some("number") => &["min"],
        Some("select" | "radio" | "checkbox") => &["options"],
        _ => &[],
    };
    let stray = object
        .keys()
        .find(|key| !COMMON_KEYS.contains(&key.as_str()) && !type_keys.contains(&key.as_str()));
    match stray {
        Some(key) => Err(SchemaError::UnexpectedKey {
            field: object
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{index}")),
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

fn validate_fields(fields: &[FieldDescriptor]) -> Result<(), SchemaError> {
    if fields.is_empty() {
        return Err(SchemaError::Empty);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (index, field) in fields.iter().enumerate() {
        if field.id.trim().is_empty() {
            return Err(SchemaError::MissingId(index));
        }
        if field.id == TIMESTAMP_KEY {
            return Err(SchemaError::ReservedId(field.id.clone()));
        }
        if !seen.insert(field.id.as_str()) {
            return Err(SchemaError::DuplicateId(field.id.clone()));
        }
        if field.label.trim().is_empty() {
            return Err(SchemaError::MissingLabel(field.id.clone()));
        }
        validate_field_type(field)?;
    }
    Ok(())
}

fn validate_field_type(field: &FieldDescriptor) -> Result<(), SchemaError> {
    match &field.field_type {
        FieldType::Text | FieldType::Email => Ok(()),
        FieldType::Number { min } => match min {
            Some(min) if !min.is_finite() => Err(SchemaError::InvalidMin(field.id.clone())),
            _ => Ok(()),
        },
        FieldType::Select { options }
        | FieldType::Radio { options }
        | FieldType::Checkbox { options } => {
            if options.is_empty() {
                return Err(SchemaError::NoOptions(field.id.clone()));
            }
            let mut seen: HashSet<&str> = HashSet::new();
            for option in options {
                if !seen.insert(option.as_str()) {
                    return Err(SchemaError::DuplicateOption {
                        field: field.id.clone(),
                        option: option.clone(),
                    });
                }
            }
            Ok(())
        }
    }
}
