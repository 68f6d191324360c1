use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::engine::{FormEngine, SubmitOutcome};
use crate::error::{FormError, FormResult};
use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};
use crate::render::{fill_form, print_errors, print_table};
use crate::schema::FormSchema;
use crate::storage::{DEFAULT_STORAGE_KEY, KeyValueStore, validate_key};
use crate::submissions::SubmissionsView;
use crate::types::FieldValue;

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub args: CommandArguments,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fill in the form interactively, then show the submissions
    Fill,
    /// Submit one record without prompting
    Submit {
        /// Field assignment; checkbox values are comma-separated (e.g. skill=HTML,JS)
        #[arg(long = "set", value_name = "ID=VALUE", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },
    /// Show stored submissions
    Submissions {
        /// Print the raw JSON array instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved form schema
    Schema {
        /// Print the JSON Schema of the schema file format instead
        #[arg(long)]
        json_schema: bool,
    },
    /// Validate a schema file
    Check {
        path: PathBuf,
    },
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct CommandArguments {
    /// Schema file (JSON array of field descriptors); the built-in sample form when omitted
    #[arg(long, global = true, env = "DYNFORM_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Directory holding stored submissions
    #[arg(long, global = true, env = "DYNFORM_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Storage key for the submission collection
    #[arg(long, global = true, env = "DYNFORM_STORAGE_KEY", default_value = DEFAULT_STORAGE_KEY)]
    pub key: String,
}

impl CommandArguments {
    pub fn default_settings() -> Self {
        Self {
            schema: None,
            data_dir: None,
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Validate CLI/environment-derived arguments.
    pub fn validate(&self) -> Result<(), String> {
        validate_key(&self.key)
            .map_err(|_| format!("Invalid DYNFORM_STORAGE_KEY '{}': must be a plain name", self.key))?;
        if let Some(schema) = &self.schema {
            if schema.as_os_str().is_empty() {
                return Err("DYNFORM_SCHEMA cannot be empty".to_string());
            }
        }
        if let Some(dir) = &self.data_dir {
            if dir.as_os_str().is_empty() {
                return Err("DYNFORM_DATA_DIR cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{raw}'"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing field id in '{raw}'"));
    }
    Ok((id.to_string(), value.to_string()))
}

pub fn run(cli: Cli) -> FormResult<ExitCode> {
    if let Command::Version = cli.command {
        println!("{PKG_NAME} {PKG_VERSION}");
        return Ok(ExitCode::SUCCESS);
    }
    if let Command::Check { path } = &cli.command {
        let schema = FormSchema::load(path)?;
        println!("{}: ok ({} fields)", path.display(), schema.len());
        return Ok(ExitCode::SUCCESS);
    }

    let config = AppConfig::from_args(&cli.args)?;
    let schema = config.load_schema()?;

    match cli.command {
        Command::Fill => {
            let mut engine =
                FormEngine::new(schema, config.open_store()).with_storage_key(&config.storage_key);
            fill_form(&mut engine)?;
            let view = SubmissionsView::activate(engine.store(), engine.storage_key());
            print_table(&view.table(engine.schema()));
            Ok(ExitCode::SUCCESS)
        }
        Command::Submit { values } => {
            let mut engine =
                FormEngine::new(schema, config.open_store()).with_storage_key(&config.storage_key);
            apply_assignments(&mut engine, &values)?;
            match engine.submit()? {
                SubmitOutcome::Accepted(submission) => {
                    println!("{}", serde_json::to_string_pretty(&submission)?);
                    Ok(ExitCode::SUCCESS)
                }
                SubmitOutcome::Rejected(errors) => {
                    print_errors(&errors);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Submissions { json } => {
            let store = config.open_store();
            let view = SubmissionsView::activate(&store, &config.storage_key);
            if json {
                println!("{}", serde_json::to_string_pretty(view.submissions())?);
            } else {
                print_table(&view.table(&schema));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Schema { json_schema } => {
            if json_schema {
                println!("{}", FormSchema::json_schema()?);
            } else {
                println!("{}", schema.to_json_pretty()?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { .. } | Command::Version => Ok(ExitCode::SUCCESS),
    }
}

/// Applies `id=value` pairs as change events; checkbox values are split on commas.
pub fn apply_assignments<S: KeyValueStore>(
    engine: &mut FormEngine<S>,
    assignments: &[(String, String)],
) -> FormResult<()> {
    for (id, raw) in assignments {
        let field = engine
            .schema()
            .field(id)
            .ok_or_else(|| FormError::InvalidField(id.clone()))?;
        let value = if field.field_type.is_multi() {
            FieldValue::Selection(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        } else {
            FieldValue::Text(raw.clone())
        };
        engine.on_change(id, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("skill=HTML,JS").unwrap(),
            ("skill".to_string(), "HTML,JS".to_string())
        );
        assert_eq!(parse_assignment("name=").unwrap().1, "");
        assert!(parse_assignment("name").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_cli_parses_submit() {
        let cli = Cli::try_parse_from([
            "dynform", "--key", "team", "submit", "--set", "name=Ann", "--set", "skill=HTML,JS",
        ])
        .unwrap();
        assert_eq!(cli.args.key, "team");
        let Command::Submit { values } = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_validate_rejects_bad_key() {
        let mut args = CommandArguments::default_settings();
        assert!(args.validate().is_ok());
        args.key = "../x".into();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_apply_assignments_splits_checkbox() {
        let mut engine = FormEngine::new(FormSchema::sample(), MemoryStore::new());
        apply_assignments(
            &mut engine,
            &[
                ("name".into(), "Ann".into()),
                ("skill".into(), "HTML, JS,".into()),
            ],
        )
        .unwrap();
        assert_eq!(engine.values().get("name"), Some(&FieldValue::from("Ann")));
        assert_eq!(
            engine.values().get("skill"),
            Some(&FieldValue::from(&["HTML", "JS"][..]))
        );
    }

    #[test]
    fn test_apply_assignments_unknown_field() {
        let mut engine = FormEngine::new(FormSchema::sample(), MemoryStore::new());
        let err = apply_assignments(&mut engine, &[("zip".into(), "1".into())]).unwrap_err();
        assert!(matches!(err, FormError::InvalidField(_)));
    }
}
