//! Terminal renderer: prompts for each field, feeds change and submit events into
//! the engine, and prints the submissions table.

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Select};

use crate::engine::{FormEngine, FormView, SubmitOutcome};
use crate::error::FormResult;
use crate::storage::KeyValueStore;
use crate::submissions::{EMPTY_MESSAGE, SubmissionTable};
use crate::types::{ErrorState, FieldDescriptor, FieldType, FieldValue, Submission};
use crate::validator::validate_field;

pub const SUCCESS_MESSAGE: &str = "Form submitted successfully!";

/// Prompts for every field, then keeps re-prompting the failing fields until a submit is accepted.
/// Submit is only attempted while the view reports the form as submittable.
pub fn fill_form<S: KeyValueStore>(engine: &mut FormEngine<S>) -> FormResult<Submission> {
    let theme = ColorfulTheme::default();
    let mut pending: Vec<FieldDescriptor> = engine.view().fields.to_vec();

    loop {
        for field in &pending {
            prompt_field(engine, &theme, field)?;
            let message = engine.view().errors.message(&field.id);
            if !message.is_empty() {
                println!("  {}", message.red());
            }
        }

        if engine.view().submittable {
            match engine.submit()? {
                SubmitOutcome::Accepted(submission) => {
                    println!("{}", SUCCESS_MESSAGE.green().bold());
                    return Ok(submission);
                }
                SubmitOutcome::Rejected(errors) => print_errors(&errors),
            }
        }
        pending = fields_to_revisit(&engine.view());
    }
}

/// Fields whose last check produced an error, in schema order.
pub fn fields_to_revisit(view: &FormView<'_>) -> Vec<FieldDescriptor> {
    view.fields
        .iter()
        .filter(|field| !view.errors.message(&field.id).is_empty())
        .cloned()
        .collect()
}

fn prompt_field<S: KeyValueStore>(
    engine: &mut FormEngine<S>,
    theme: &ColorfulTheme,
    field: &FieldDescriptor,
) -> FormResult<()> {
    let current = engine
        .view()
        .values
        .get(&field.id)
        .cloned()
        .unwrap_or_else(|| field.field_type.empty_value());

    match &field.field_type {
        FieldType::Text | FieldType::Email | FieldType::Number { .. } => {
            let checked = field.clone();
            let input: String = Input::<String>::with_theme(theme)
                .with_prompt(field.display_label())
                .with_initial_text(current.as_text().unwrap_or_default())
                .allow_empty(true)
                .validate_with(move |input: &String| -> Result<(), String> {
                    let message = validate_field(&checked, &FieldValue::Text(input.clone()));
                    if message.is_empty() { Ok(()) } else { Err(message) }
                })
                .interact_text()?;
            engine.on_change(&field.id, FieldValue::Text(input))
        }
        FieldType::Select { options } => {
            let mut items = vec![format!("Select {}", field.label)];
            items.extend(options.iter().cloned());
            let default = current
                .as_text()
                .and_then(|v| options.iter().position(|o| o == v))
                .map(|i| i + 1)
                .unwrap_or(0);
            let chosen = Select::with_theme(theme)
                .with_prompt(field.display_label())
                .items(&items)
                .default(default)
                .interact()?;
            let value = if chosen == 0 {
                String::new()
            } else {
                options[chosen - 1].clone()
            };
            engine.on_change(&field.id, FieldValue::Text(value))
        }
        FieldType::Radio { options } => {
            let default = current
                .as_text()
                .and_then(|v| options.iter().position(|o| o == v))
                .unwrap_or(0);
            let chosen = Select::with_theme(theme)
                .with_prompt(field.display_label())
                .items(options)
                .default(default)
                .interact()?;
            engine.on_change(&field.id, FieldValue::Text(options[chosen].clone()))
        }
        FieldType::Checkbox { options } => {
            let selected = current.as_selection().unwrap_or_default();
            let checked: Vec<bool> = options.iter().map(|o| selected.contains(o)).collect();
            let picked = MultiSelect::with_theme(theme)
                .with_prompt(field.display_label())
                .items(options)
                .defaults(&checked)
                .interact()?;
            // Apply only the flips so earlier choices keep their position.
            let mut flipped = false;
            for (index, option) in options.iter().enumerate() {
                if picked.contains(&index) != checked[index] {
                    engine.toggle_option(&field.id, option)?;
                    flipped = true;
                }
            }
            if !flipped {
                engine.on_change(&field.id, current.clone())?;
            }
            Ok(())
        }
    }
}

pub fn print_errors(errors: &ErrorState) {
    for (id, message) in errors.failures() {
        println!("{} {}", format!("{id}:").bold(), message.red());
    }
}

pub fn print_table(table: &SubmissionTable) {
    if table.is_empty() {
        println!("{EMPTY_MESSAGE}");
        return;
    }
    let text = format_table(table);
    let mut lines = text.lines();
    if let Some(header) = lines.next() {
        println!("{}", header.bold());
    }
    for line in lines {
        println!("{line}");
    }
}

/// Plain-text table with padded columns and a dashed rule under the header.
pub fn format_table(table: &SubmissionTable) -> String {
    let widths = table.column_widths();
    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = format_row(&table.headers);
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &table.rows {
        out.push_str(&format_row(row));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FormSchema;
    use crate::storage::MemoryStore;

    #[test]
    fn test_revisit_follows_live_errors() {
        let mut engine = FormEngine::new(FormSchema::sample(), MemoryStore::new());
        assert!(fields_to_revisit(&engine.view()).is_empty());

        engine.on_change("gender", "".into()).unwrap();
        engine.on_change("name", "Ann".into()).unwrap();
        let view = engine.view();
        assert!(!view.submittable);
        let ids: Vec<String> = fields_to_revisit(&view).into_iter().map(|f| f.id).collect();
        assert_eq!(ids, ["gender"]);
    }

    #[test]
    fn test_revisit_after_rejected_submit() {
        let mut engine = FormEngine::new(FormSchema::sample(), MemoryStore::new());
        engine.on_change("name", "Ann".into()).unwrap();
        engine.on_change("email", "a@b.co".into()).unwrap();
        assert!(!engine.submit().unwrap().is_accepted());

        let ids: Vec<String> = fields_to_revisit(&engine.view()).into_iter().map(|f| f.id).collect();
        assert_eq!(ids, ["gender", "role", "skill"]);
    }

    #[test]
    fn test_format_table_pads_columns() {
        let table = SubmissionTable {
            headers: vec!["Name".into(), "Skills".into(), "Timestamp".into()],
            rows: vec![vec!["Ann".into(), "HTML, JS".into(), "2026-10-15T08:00:00.000Z".into()]],
        };
        let text = format_table(&table);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Name | Skills   | Timestamp");
        assert!(lines[1].starts_with("-----+-"));
        assert_eq!(lines[2], "Ann  | HTML, JS | 2026-10-15T08:00:00.000Z");
    }

    #[test]
    fn test_format_table_header_only() {
        let table = SubmissionTable {
            headers: vec!["Name".into()],
            rows: Vec::new(),
        };
        assert_eq!(format_table(&table), "Name\n----\n");
    }
}
