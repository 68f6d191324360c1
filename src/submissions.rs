use crate::schema::FormSchema;
use crate::storage::{KeyValueStore, read_submissions};
use crate::types::Submission;

pub const TIMESTAMP_HEADER: &str = "Timestamp";
pub const EMPTY_MESSAGE: &str = "No submissions yet.";

/// Read-only view over the persisted submission history.
#[derive(Clone, Debug)]
pub struct SubmissionsView {
    submissions: Vec<Submission>,
}

impl SubmissionsView {
    /// Loads the collection stored under `key`. Never fails; bad data reads as empty.
    pub fn activate<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Self {
        let submissions = read_submissions(store, key);
        tracing::debug!(key, count = submissions.len(), "loaded submissions");
        Self { submissions }
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    pub fn table(&self, schema: &FormSchema) -> SubmissionTable {
        SubmissionTable::build(schema, &self.submissions)
    }
}

/// Display-ready cells: one column per schema field plus the timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SubmissionTable {
    pub fn build(schema: &FormSchema, submissions: &[Submission]) -> Self {
        let mut headers: Vec<String> = schema.fields().iter().map(|f| f.label.clone()).collect();
        headers.push(TIMESTAMP_HEADER.to_string());

        let rows = submissions
            .iter()
            .map(|submission| {
                let mut row: Vec<String> = schema
                    .fields()
                    .iter()
                    .map(|field| {
                        submission
                            .value(&field.id)
                            .map(|v| v.display())
                            .unwrap_or_default()
                    })
                    .collect();
                row.push(submission.timestamp().to_string());
                row
            })
            .collect();

        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column widths in characters, wide enough for the header and every cell.
    pub fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore, append_submission};
    use crate::types::{FieldDescriptor, FieldValue, FormValues};
    use chrono::{TimeZone, Utc};

    fn stored(store: &mut MemoryStore) {
        let schema = FormSchema::sample();
        let mut values = FormValues::empty_for(schema.fields());
        values.set("name", "Ann".into());
        values.set("email", "a@b.co".into());
        values.set("skill", FieldValue::from(&["HTML", "JS"][..]));
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        append_submission(store, "formSubmissions", &Submission::new(&values, at)).unwrap();
    }

    #[test]
    fn test_empty_store_gives_empty_view() {
        let view = SubmissionsView::activate(&MemoryStore::new(), "formSubmissions");
        assert!(view.is_empty());
        assert!(view.table(&FormSchema::sample()).is_empty());
    }

    #[test]
    fn test_corrupt_store_gives_empty_view() {
        let mut store = MemoryStore::new();
        store.set("formSubmissions", "[{\"name\": 1").unwrap();
        assert!(SubmissionsView::activate(&store, "formSubmissions").is_empty());
    }

    #[test]
    fn test_foreign_values_are_shown() {
        let mut store = MemoryStore::new();
        store
            .set("formSubmissions", r#"[{"name": 1, "age": 30, "timestamp": "t"}]"#)
            .unwrap();
        let table = SubmissionsView::activate(&store, "formSubmissions").table(&FormSchema::sample());
        assert_eq!(table.rows[0], ["1", "", "30", "", "", "", "t"]);
    }

    #[test]
    fn test_table_headers_follow_schema() {
        let table = SubmissionTable::build(&FormSchema::sample(), &[]);
        assert_eq!(
            table.headers,
            ["Name", "Email", "Age", "Gender", "Role", "Skills", "Timestamp"]
        );
    }

    #[test]
    fn test_checkbox_cells_are_joined() {
        let mut store = MemoryStore::new();
        stored(&mut store);
        let view = SubmissionsView::activate(&store, "formSubmissions");
        let table = view.table(&FormSchema::sample());

        assert_eq!(table.rows.len(), 1);
        assert_eq!(
            table.rows[0],
            ["Ann", "a@b.co", "", "", "", "HTML, JS", "2026-03-01T12:00:00.000Z"]
        );
    }

    #[test]
    fn test_missing_values_render_empty() {
        let mut store = MemoryStore::new();
        stored(&mut store);
        let view = SubmissionsView::activate(&store, "formSubmissions");
        let extended = FormSchema::new(vec![
            FieldDescriptor::text("name", "Name"),
            FieldDescriptor::text("city", "City"),
        ])
        .unwrap();
        assert_eq!(view.table(&extended).rows[0][..2], ["Ann", ""]);
    }

    #[test]
    fn test_column_widths() {
        let table = SubmissionTable {
            headers: vec!["Name".into(), "Timestamp".into()],
            rows: vec![vec!["Annabelle".into(), "t".into()]],
        };
        assert_eq!(table.column_widths(), [9, 9]);
    }
}
