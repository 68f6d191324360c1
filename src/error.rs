use thiserror::Error;

use crate::schema::SchemaError;
use crate::storage::StorageError;

pub type FormResult<T> = core::result::Result<T, FormError>;

#[derive(Debug, Error)]
pub enum FormError {
    /// A change event named a field the schema does not declare.
    #[error("unknown field '{0}'")]
    InvalidField(String),
    /// A change event carried a list for a text-like field, or a string for a checkbox.
    #[error("field '{field}' expects {expected}")]
    ValueKind {
        field: String,
        expected: &'static str,
    },
    #[error("{0}")]
    Schema(#[from] SchemaError),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("{0}")]
    Config(String),
}
