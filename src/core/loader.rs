use crate::core::sanitize::{sanitize, DEFAULT_ID_FIELD};
use crate::domain::model::{Record, RunSummary};
use crate::domain::ports::Datastore;
use crate::utils::error::{MaintError, Result};
use crate::utils::validation::validate_table_name;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Key stripped from every record so the datastore assigns identifiers.
    pub id_field: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }
}

/// Turns a JSON document into records. It must be an array of objects.
pub fn parse_records(document: Value) -> Result<Vec<Record>> {
    let items = match document {
        Value::Array(items) => items,
        other => {
            return Err(MaintError::InvalidInput {
                message: format!("expected a JSON array of records, found {}", json_kind(&other)),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(Record::new(map)),
            other => Err(MaintError::InvalidInput {
                message: format!("record {} is {}, expected an object", index, json_kind(&other)),
            }),
        })
        .collect()
}

pub async fn read_records_file<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    let document: Value = serde_json::from_str(&content)?;
    parse_records(document)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Inserts records one at a time, isolating each record's failure.
pub struct BulkLoader<'a, D: Datastore + ?Sized> {
    store: &'a D,
    options: LoadOptions,
}

impl<'a, D: Datastore + ?Sized> BulkLoader<'a, D> {
    pub fn new(store: &'a D, options: LoadOptions) -> Self {
        Self { store, options }
    }

    pub async fn load_batch(&self, table: &str, records: Vec<Record>) -> Result<RunSummary> {
        self.load_selected(table, records, None).await
    }

    /// Like [`Self::load_batch`], attempting only the positions in `only` when
    /// given. Positions are those of the full input, so a summary of this run
    /// lines up with the input file.
    pub async fn load_selected(
        &self,
        table: &str,
        records: Vec<Record>,
        only: Option<&BTreeSet<usize>>,
    ) -> Result<RunSummary> {
        validate_table_name(table)?;

        let total = records.len();
        let mut summary = RunSummary::new(table);
        tracing::info!("📥 Loading {} records into '{}'", total, table);

        for (index, record) in records.into_iter().enumerate() {
            if only.is_some_and(|set| !set.contains(&index)) {
                continue;
            }

            let sanitized = sanitize(record, &self.options.id_field);
            let outcome = self.store.insert(table, &sanitized).await;

            match &outcome {
                Ok(inserted) => tracing::debug!(
                    "✓ Record {} inserted{}",
                    index,
                    inserted
                        .id
                        .as_ref()
                        .map(|id| format!(" as {}", id))
                        .unwrap_or_default()
                ),
                Err(e) => tracing::warn!("✗ Record {} rejected: {}", index, e),
            }
            summary.record(index, outcome);
        }

        summary.finish();
        tracing::info!(
            "📊 Load into '{}' finished: {} attempted, {} succeeded, {} failed",
            table,
            summary.attempted,
            summary.succeeded,
            summary.failed
        );
        Ok(summary)
    }
}
