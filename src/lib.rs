//! Schema-driven forms: a list of typed field descriptors drives input prompts,
//! per-field validation, and a locally persisted history of submissions.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod render;
pub mod schema;
pub mod storage;
pub mod submissions;
pub mod types;
pub mod validator;

pub use engine::{FormEngine, FormView, SubmitOutcome};
pub use error::{FormError, FormResult};
pub use schema::{FormSchema, SchemaError};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use submissions::{SubmissionTable, SubmissionsView};
pub use types::{ErrorState, FieldDescriptor, FieldType, FieldValue, FormValues, Submission};
