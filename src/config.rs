use std::path::PathBuf;

use crate::cli::CommandArguments;
use crate::error::{FormError, FormResult};
use crate::schema::FormSchema;
use crate::storage::FileStore;

/// Settings resolved once from flags and environment before any command runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub schema_path: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub storage_key: String,
}

impl AppConfig {
    pub fn from_args(args: &CommandArguments) -> FormResult<Self> {
        args.validate().map_err(FormError::Config)?;

        let data_dir = match &args.data_dir {
            Some(dir) => dir.clone(),
            None => FileStore::default_dir().ok_or_else(|| {
                FormError::Config(
                    "couldn't resolve a data directory; set DYNFORM_DATA_DIR".to_string(),
                )
            })?,
        };

        let config = Self {
            schema_path: args.schema.clone(),
            data_dir,
            storage_key: args.key.clone(),
        };
        tracing::debug!(?config, "resolved configuration");
        Ok(config)
    }

    /// The configured schema file, or the built-in sample form.
    pub fn load_schema(&self) -> FormResult<FormSchema> {
        match &self.schema_path {
            Some(path) => FormSchema::load(path),
            None => Ok(FormSchema::sample()),
        }
    }

    pub fn open_store(&self) -> FileStore {
        FileStore::new(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_data_dir_wins() {
        let tmp = TempDir::new().unwrap();
        let mut args = CommandArguments::default_settings();
        args.data_dir = Some(tmp.path().to_path_buf());

        let config = AppConfig::from_args(&args).unwrap();
        assert_eq!(config.data_dir, tmp.path());
        assert_eq!(config.storage_key, "formSubmissions");
        assert_eq!(config.open_store().dir(), tmp.path());
    }

    #[test]
    fn test_default_schema_is_sample() {
        let tmp = TempDir::new().unwrap();
        let mut args = CommandArguments::default_settings();
        args.data_dir = Some(tmp.path().to_path_buf());
        let config = AppConfig::from_args(&args).unwrap();
        assert_eq!(config.load_schema().unwrap(), FormSchema::sample());
    }

    #[test]
    fn test_bad_key_is_config_error() {
        let mut args = CommandArguments::default_settings();
        args.key = "a/b".into();
        assert!(matches!(AppConfig::from_args(&args), Err(FormError::Config(_))));
    }

    #[test]
    fn test_missing_schema_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let mut args = CommandArguments::default_settings();
        args.data_dir = Some(tmp.path().to_path_buf());
        args.schema = Some(tmp.path().join("missing.json"));
        let config = AppConfig::from_args(&args).unwrap();
        assert!(matches!(config.load_schema(), Err(FormError::IoError(_))));
    }
}
