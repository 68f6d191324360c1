use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::schema::TIMESTAMP_KEY;

/// Input kind of a field, carrying the constraints that only make sense for that kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
    },
    Select {
        options: Vec<String>,
    },
    Radio {
        options: Vec<String>,
    },
    Checkbox {
        options: Vec<String>,
    },
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Number { .. } => "number",
            FieldType::Select { .. } => "select",
            FieldType::Radio { .. } => "radio",
            FieldType::Checkbox { .. } => "checkbox",
        }
    }

    /// Choices offered by select, radio and checkbox fields; empty for the rest.
    pub fn options(&self) -> &[String] {
        match self {
            FieldType::Select { options }
            | FieldType::Radio { options }
            | FieldType::Checkbox { options } => options,
            _ => &[],
        }
    }

    pub fn min(&self) -> Option<f64> {
        match self {
            FieldType::Number { min } => *min,
            _ => None,
        }
    }

    /// Checkbox fields hold a list of chosen options; every other kind holds one string.
    pub fn is_multi(&self) -> bool {
        matches!(self, FieldType::Checkbox { .. })
    }

    pub fn empty_value(&self) -> FieldValue {
        if self.is_multi() {
            FieldValue::Selection(Vec::new())
        } else {
            FieldValue::Text(String::new())
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a form schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldDescriptor {
    pub id: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

impl FieldDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            field_type,
            label: label.into(),
            required: false,
        }
    }

    pub fn text(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, FieldType::Text)
    }

    pub fn email(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, FieldType::Email)
    }

    pub fn number(id: impl Into<String>, label: impl Into<String>, min: Option<f64>) -> Self {
        Self::new(id, label, FieldType::Number { min })
    }

    pub fn select(id: impl Into<String>, label: impl Into<String>, options: &[&str]) -> Self {
        Self::new(
            id,
            label,
            FieldType::Select {
                options: to_owned_options(options),
            },
        )
    }

    pub fn radio(id: impl Into<String>, label: impl Into<String>, options: &[&str]) -> Self {
        Self::new(
            id,
            label,
            FieldType::Radio {
                options: to_owned_options(options),
            },
        )
    }

    pub fn checkbox(id: impl Into<String>, label: impl Into<String>, options: &[&str]) -> Self {
        Self::new(
            id,
            label,
            FieldType::Checkbox {
                options: to_owned_options(options),
            },
        )
    }

    /// Marks the field as mandatory.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Label as shown next to the input, with ` *` appended for required fields.
    pub fn display_label(&self) -> String {
        if self.required {
            format!("{} *", self.label)
        } else {
            self.label.clone()
        }
    }
}

fn to_owned_options(options: &[&str]) -> Vec<String> {
    options.iter().map(|o| o.to_string()).collect()
}

/// Current value of a single field.
///
/// `Other` only appears in records read back from storage that were written with a
/// different shape (a bare number, `null`, a nested object); the engine never accepts it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Selection(Vec<String>),
    Other(Value),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Selection(items) => items.is_empty(),
            FieldValue::Other(value) => value.is_null(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&[String]> {
        match self {
            FieldValue::Selection(items) => Some(items),
            _ => None,
        }
    }

    /// Text used when the value is shown in a table cell.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Selection(items) => items.join(", "),
            FieldValue::Other(Value::Null) => String::new(),
            FieldValue::Other(value) => value.to_string(),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Text(s),
            Value::Array(items) if items.iter().all(Value::is_string) => FieldValue::Selection(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            other => FieldValue::Other(other),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => Value::String(s),
            FieldValue::Selection(items) => items.into_iter().map(Value::String).collect(),
            FieldValue::Other(value) => value,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::Selection(items)
    }
}

impl From<&[&str]> for FieldValue {
    fn from(items: &[&str]) -> Self {
        FieldValue::Selection(to_owned_options(items))
    }
}

/// Flips membership of `option`: removes it when present, otherwise appends it.
pub fn toggle_selection(current: &[String], option: &str) -> Vec<String> {
    if current.iter().any(|item| item == option) {
        current
            .iter()
            .filter(|item| item.as_str() != option)
            .cloned()
            .collect()
    } else {
        let mut updated = current.to_vec();
        updated.push(option.to_string());
        updated
    }
}

/// Live per-field input state of one form, keyed by field id and kept in schema order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormValues(Vec<(String, FieldValue)>);

impl FormValues {
    /// Every field set to its type-appropriate empty value.
    pub fn empty_for(fields: &[FieldDescriptor]) -> Self {
        Self(
            fields
                .iter()
                .map(|field| (field.id.clone(), field.field_type.empty_value()))
                .collect(),
        )
    }

    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        lookup(&self.0, id)
    }

    pub(crate) fn set(&mut self, id: &str, value: FieldValue) {
        match self.0.iter_mut().find(|(key, _)| key == id) {
            Some(slot) => slot.1 = value,
            None => self.0.push((id.to_string(), value)),
        }
    }

    pub fn entries(&self) -> &[(String, FieldValue)] {
        &self.0
    }
}

fn lookup<'a>(entries: &'a [(String, FieldValue)], id: &str) -> Option<&'a FieldValue> {
    entries.iter().find(|(key, _)| key == id).map(|(_, value)| value)
}

/// Per-field validation messages. An empty message means the field was checked and is valid;
/// a missing entry means it has not been checked yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorState(BTreeMap<String, String>);

impl ErrorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: &str, message: String) {
        self.0.insert(id.to_string(), message);
    }

    /// Message for `id`, or `""` when the field is valid or unchecked.
    pub fn message(&self, id: &str) -> &str {
        self.0.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn is_checked(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn has_errors(&self) -> bool {
        self.0.values().any(|message| !message.is_empty())
    }

    /// Non-empty messages only.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(_, message)| !message.is_empty())
            .map(|(id, message)| (id.as_str(), message.as_str()))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A finalized, timestamped record of form input. Serialized as a flat object:
/// one property per field id in schema order, then `timestamp`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Submission {
    values: Vec<(String, FieldValue)>,
    timestamp: String,
}

impl Submission {
    pub fn new(values: &FormValues, at: DateTime<Utc>) -> Self {
        Self {
            values: values.entries().to_vec(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn value(&self, id: &str) -> Option<&FieldValue> {
        lookup(&self.values, id)
    }

    /// Empty for stored records written without one.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

impl From<Map<String, Value>> for Submission {
    fn from(record: Map<String, Value>) -> Self {
        let mut values = Vec::with_capacity(record.len());
        let mut timestamp = String::new();
        for (key, value) in record {
            if key == TIMESTAMP_KEY {
                timestamp = FieldValue::from(value).display();
            } else {
                values.push((key, FieldValue::from(value)));
            }
        }
        Self { values, timestamp }
    }
}

impl From<Submission> for Map<String, Value> {
    fn from(submission: Submission) -> Self {
        let mut record: Map<String, Value> = submission
            .values
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect();
        record.insert(TIMESTAMP_KEY.to_string(), Value::String(submission.timestamp));
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_descriptor_parses_config_shape() {
        let field: FieldDescriptor = serde_json::from_value(json!({
            "id": "age", "type": "number", "label": "Age", "required": false, "min": 18
        }))
        .unwrap();
        assert_eq!(field.field_type, FieldType::Number { min: Some(18.0) });
        assert!(!field.required);

        let field: FieldDescriptor = serde_json::from_value(json!({
            "id": "skill", "type": "checkbox", "label": "Skills", "required": true,
            "options": ["HTML", "CSS", "JS"]
        }))
        .unwrap();
        assert_eq!(field.field_type.options(), ["HTML", "CSS", "JS"]);
        assert!(field.field_type.is_multi());
    }

    #[test]
    fn test_descriptor_serializes_flat() {
        let field = FieldDescriptor::select("gender", "Gender", &["Male", "Female"]).required();
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["type"], "select");
        assert_eq!(value["options"], json!(["Male", "Female"]));
        assert!(value.get("min").is_none());
    }

    #[test]
    fn test_display_label_marks_required() {
        assert_eq!(FieldDescriptor::text("name", "Name").required().display_label(), "Name *");
        assert_eq!(FieldDescriptor::text("nick", "Nick").display_label(), "Nick");
    }

    #[test]
    fn test_empty_values_per_kind() {
        let fields = vec![
            FieldDescriptor::text("name", "Name"),
            FieldDescriptor::checkbox("skill", "Skills", &["HTML"]),
        ];
        let values = FormValues::empty_for(&fields);
        assert_eq!(values.get("name"), Some(&FieldValue::Text(String::new())));
        assert_eq!(values.get("skill"), Some(&FieldValue::Selection(Vec::new())));
    }

    #[test]
    fn test_toggle_appends_then_removes() {
        let start = vec!["CSS".to_string()];
        let added = toggle_selection(&start, "HTML");
        assert_eq!(added, ["CSS", "HTML"]);
        let removed = toggle_selection(&added, "HTML");
        assert_eq!(removed, start);
    }

    #[test]
    fn test_toggle_preserves_order_of_rest() {
        let current: Vec<String> = vec!["HTML".into(), "CSS".into(), "JS".into()];
        assert_eq!(toggle_selection(&current, "CSS"), ["HTML", "JS"]);
    }

    #[test]
    fn test_selection_display_joins() {
        let value = FieldValue::from(&["HTML", "JS"][..]);
        assert_eq!(value.display(), "HTML, JS");
        assert_eq!(FieldValue::from("Ann").display(), "Ann");
    }

    #[test]
    fn test_error_state_only_counts_messages() {
        let mut errors = ErrorState::new();
        errors.record("name", String::new());
        assert!(!errors.has_errors());
        assert!(errors.is_checked("name"));
        errors.record("email", "Please enter a valid email address.".into());
        assert!(errors.has_errors());
        assert_eq!(errors.failures().count(), 1);
        assert_eq!(errors.message("age"), "");
    }

    #[test]
    fn test_submission_is_flat_object() {
        let fields = vec![
            FieldDescriptor::text("name", "Name"),
            FieldDescriptor::checkbox("skill", "Skills", &["HTML", "JS"]),
        ];
        let mut values = FormValues::empty_for(&fields);
        values.set("name", "Ann".into());
        values.set("skill", FieldValue::from(&["HTML", "JS"][..]));
        let at = Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap();

        let submission = Submission::new(&values, at);
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(
            json,
            json!({"name": "Ann", "skill": ["HTML", "JS"], "timestamp": "2026-10-15T09:30:00.000Z"})
        );

        let back: Submission = serde_json::from_value(json).unwrap();
        assert_eq!(back, submission);
    }

    #[test]
    fn test_submission_keys_follow_schema_order() {
        let fields = vec![
            FieldDescriptor::text("name", "Name"),
            FieldDescriptor::email("email", "Email"),
            FieldDescriptor::number("age", "Age", None),
        ];
        let mut values = FormValues::empty_for(&fields);
        values.set("age", "30".into());
        values.set("name", "Ann".into());
        let at = Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap();

        let raw = serde_json::to_string(&Submission::new(&values, at)).unwrap();
        assert_eq!(
            raw,
            r#"{"name":"Ann","email":"","age":"30","timestamp":"2026-10-15T09:30:00.000Z"}"#
        );
    }

    #[test]
    fn test_foreign_record_shapes_are_kept() {
        let raw = r#"{"name":"Old","age":20,"note":null,"timestamp":"2025-01-01T00:00:00.000Z"}"#;
        let record: Submission = serde_json::from_str(raw).unwrap();
        assert_eq!(record.value("age"), Some(&FieldValue::Other(json!(20))));
        assert_eq!(record.value("age").unwrap().display(), "20");
        assert!(record.value("note").unwrap().is_empty());
        assert_eq!(serde_json::to_string(&record).unwrap(), raw);

        let untimed: Submission = serde_json::from_str(r#"{"name":"Bo"}"#).unwrap();
        assert_eq!(untimed.timestamp(), "");
    }
}
