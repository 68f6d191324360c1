//! Form engine: owns the live values and error state of one form and turns
//! change and submit events into validated, persisted submissions.
//!
//! Live feedback is lenient: only fields that have received a change event carry
//! an entry in the error state, so an untouched required field does not block
//! submission until `submit` re-validates the whole form.

use chrono::{DateTime, Utc};

use crate::error::{FormError, FormResult};
use crate::schema::FormSchema;
use crate::storage::{self, DEFAULT_STORAGE_KEY, KeyValueStore};
use crate::types::{
    ErrorState, FieldDescriptor, FieldValue, FormValues, Submission, toggle_selection,
};
use crate::validator;

/// Result of a submit request. Validation failures are not errors.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Record was appended to the collection and the form was reset.
    Accepted(Submission),
    /// At least one field failed; nothing was stored and values are untouched.
    Rejected(ErrorState),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

/// Snapshot handed to a renderer.
#[derive(Clone, Copy, Debug)]
pub struct FormView<'a> {
    pub fields: &'a [FieldDescriptor],
    pub values: &'a FormValues,
    pub errors: &'a ErrorState,
    pub submittable: bool,
}

pub struct FormEngine<S: KeyValueStore> {
    schema: FormSchema,
    values: FormValues,
    errors: ErrorState,
    store: S,
    storage_key: String,
}

impl<S: KeyValueStore> FormEngine<S> {
    pub fn new(schema: FormSchema, store: S) -> Self {
        let values = FormValues::empty_for(schema.fields());
        Self {
            schema,
            values,
            errors: ErrorState::new(),
            store,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Resets every field to its empty value and forgets all errors.
    pub fn initialize(&mut self) {
        self.values = FormValues::empty_for(self.schema.fields());
        self.errors.clear();
    }

    /// Stores `value` for `id` and re-validates that field only.
    pub fn on_change(&mut self, id: &str, value: FieldValue) -> FormResult<()> {
        let field = self
            .schema
            .field(id)
            .ok_or_else(|| FormError::InvalidField(id.to_string()))?;

        let value = match (field.field_type.is_multi(), value) {
            (true, FieldValue::Selection(items)) => FieldValue::Selection(dedup(items)),
            (false, FieldValue::Text(text)) => FieldValue::Text(text),
            (multi, _) => {
                return Err(FormError::ValueKind {
                    field: id.to_string(),
                    expected: if multi { "a list of options" } else { "a single value" },
                });
            }
        };

        let message = validator::validate_field(field, &value);
        tracing::debug!(field = id, error = %message, "field changed");
        self.values.set(id, value);
        self.errors.record(id, message);
        Ok(())
    }

    /// Checkbox helper: removes `option` if chosen, otherwise appends it, then applies the change.
    pub fn toggle_option(&mut self, id: &str, option: &str) -> FormResult<()> {
        let current = match self.values.get(id) {
            Some(FieldValue::Selection(items)) => items.clone(),
            Some(_) => {
                return Err(FormError::ValueKind {
                    field: id.to_string(),
                    expected: "a single value",
                });
            }
            None => return Err(FormError::InvalidField(id.to_string())),
        };
        self.on_change(id, FieldValue::Selection(toggle_selection(&current, option)))
    }

    /// True when no field checked so far carries an error.
    pub fn is_submittable(&self) -> bool {
        !self.errors.has_errors()
    }

    pub fn submit(&mut self) -> FormResult<SubmitOutcome> {
        self.submit_at(Utc::now())
    }

    /// Validates every field; on success appends a record stamped with `at` and resets the form.
    pub fn submit_at(&mut self, at: DateTime<Utc>) -> FormResult<SubmitOutcome> {
        let errors = validator::validate_all(&self.schema, &self.values);
        if errors.has_errors() {
            tracing::info!(failures = errors.failures().count(), "submission rejected");
            self.errors = errors.clone();
            return Ok(SubmitOutcome::Rejected(errors));
        }
        self.errors = errors;

        let submission = Submission::new(&self.values, at);
        let total = storage::append_submission(&mut self.store, &self.storage_key, &submission)?;
        tracing::info!(
            key = %self.storage_key,
            total,
            timestamp = submission.timestamp(),
            "submission stored"
        );

        self.initialize();
        Ok(SubmitOutcome::Accepted(submission))
    }

    pub fn view(&self) -> FormView<'_> {
        FormView {
            fields: self.schema.fields(),
            values: &self.values,
            errors: &self.errors,
            submittable: self.is_submittable(),
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn errors(&self) -> &ErrorState {
        &self.errors
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
