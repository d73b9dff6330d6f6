use crate::core::sanitize::DEFAULT_ID_FIELD;
use crate::domain::model::{Condition, Filter, FilterOp, InsertedRow, Record, SanitizedRecord};
use crate::domain::ports::{Datastore, DatastoreError, DatastoreResult};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Query,
    Delete,
    Count,
    Insert,
    Update,
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Record>>,
    next_id: i64,
    calls: Vec<(Operation, String)>,
    injected: HashMap<Operation, VecDeque<DatastoreError>>,
}

/// In-process [`Datastore`] holding tables in memory.
///
/// Behaves like a PostgREST table API closely enough to stand in for one:
/// unknown tables are rejected, comparisons against null never match, and
/// deletes without a filter are refused unless explicitly allowed. Failures
/// can be queued per operation and every call is logged.
pub struct MemoryDatastore {
    state: Mutex<State>,
    id_field: String,
    allow_unconditional_delete: bool,
    rejected_inserts: Vec<(String, Value)>,
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                ..State::default()
            }),
            id_field: DEFAULT_ID_FIELD.to_string(),
            allow_unconditional_delete: false,
            rejected_inserts: Vec::new(),
        }
    }

    pub fn with_table(self, table: &str, rows: Vec<Record>) -> Self {
        let mut state = self.state.into_inner();
        state.next_id += rows.len() as i64;
        state.tables.insert(table.to_string(), rows);
        Self {
            state: Mutex::new(state),
            ..self
        }
    }

    pub fn allow_unconditional_delete(mut self) -> Self {
        self.allow_unconditional_delete = true;
        self
    }

    /// Inserts whose `field` equals `value` are rejected like a unique violation.
    pub fn reject_inserts_where(mut self, field: &str, value: Value) -> Self {
        self.rejected_inserts.push((field.to_string(), value));
        self
    }

    /// Queues a failure returned by the next call of `operation`.
    pub async fn fail_next(&self, operation: Operation, error: DatastoreError) {
        let mut state = self.state.lock().await;
        state.injected.entry(operation).or_default().push_back(error);
    }

    pub async fn calls(&self) -> Vec<Operation> {
        let state = self.state.lock().await;
        state.calls.iter().map(|(op, _)| *op).collect()
    }

    pub async fn call_count(&self, operation: Operation) -> usize {
        let state = self.state.lock().await;
        state.calls.iter().filter(|(op, _)| *op == operation).count()
    }

    pub async fn rows(&self, table: &str) -> Vec<Record> {
        let state = self.state.lock().await;
        state.tables.get(table).cloned().unwrap_or_default()
    }

    async fn begin(&self, operation: Operation, table: &str) -> DatastoreResult<tokio::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().await;
        state.calls.push((operation, table.to_string()));
        if let Some(error) = state.injected.get_mut(&operation).and_then(|q| q.pop_front()) {
            return Err(error);
        }
        if !state.tables.contains_key(table) {
            return Err(DatastoreError::Rejected {
                status: 404,
                code: Some("PGRST205".to_string()),
                message: format!("Could not find the table 'public.{}' in the schema cache", table),
                details: None,
                hint: None,
            });
        }
        Ok(state)
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn wildcard_match(pattern: &str, text: &str, case_insensitive: bool) -> bool {
    let escaped = regex::escape(pattern).replace(r"\*", ".*").replace('%', ".*");
    let prefix = if case_insensitive { "(?i)" } else { "" };
    Regex::new(&format!("{}^{}$", prefix, escaped))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

fn compare(value: &Value, expected: &str) -> Option<std::cmp::Ordering> {
    match (value.as_f64(), expected.parse::<f64>().ok()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(text_of(value).as_str().cmp(expected)),
    }
}

// SQL semantics: any comparison against NULL is unknown, so only `is` matches it.
fn matches_condition(record: &Record, condition: &Condition) -> bool {
    use std::cmp::Ordering::*;

    let value = record.get(&condition.column).unwrap_or(&Value::Null);
    match condition.op {
        FilterOp::Is => match condition.value.as_str() {
            "null" => value.is_null(),
            "true" => value == &Value::Bool(true),
            "false" => value == &Value::Bool(false),
            _ => false,
        },
        _ if value.is_null() => false,
        FilterOp::Eq => text_of(value) == condition.value,
        FilterOp::Neq => text_of(value) != condition.value,
        FilterOp::Gt => compare(value, &condition.value) == Some(Greater),
        FilterOp::Gte => matches!(compare(value, &condition.value), Some(Greater | Equal)),
        FilterOp::Lt => compare(value, &condition.value) == Some(Less),
        FilterOp::Lte => matches!(compare(value, &condition.value), Some(Less | Equal)),
        FilterOp::Like => wildcard_match(&condition.value, &text_of(value), false),
        FilterOp::Ilike => wildcard_match(&condition.value, &text_of(value), true),
    }
}

fn matches(record: &Record, filter: &Filter) -> bool {
    filter.conditions().iter().all(|c| matches_condition(record, c))
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn query(
        &self,
        table: &str,
        filter: &Filter,
        projection: Option<&[String]>,
        limit: Option<usize>,
    ) -> DatastoreResult<Vec<Record>> {
        let state = self.begin(Operation::Query, table).await?;
        let rows = state.tables.get(table).map(Vec::as_slice).unwrap_or_default();

        Ok(rows
            .iter()
            .filter(|r| matches(r, filter))
            .take(limit.unwrap_or(usize::MAX))
            .map(|r| match projection {
                Some(columns) => Record::new(
                    columns
                        .iter()
                        .filter_map(|c| r.get(c).map(|v| (c.clone(), v.clone())))
                        .collect(),
                ),
                None => r.clone(),
            })
            .collect())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> DatastoreResult<()> {
        let mut state = self.begin(Operation::Delete, table).await?;
        if filter.is_empty() && !self.allow_unconditional_delete {
            return Err(DatastoreError::Rejected {
                status: 400,
                code: Some("21000".to_string()),
                message: "DELETE requires a WHERE clause".to_string(),
                details: None,
                hint: None,
            });
        }
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|r| !matches(r, filter));
        }
        Ok(())
    }

    async fn count(&self, table: &str, filter: &Filter) -> DatastoreResult<u64> {
        let state = self.begin(Operation::Count, table).await?;
        let rows = state.tables.get(table).map(Vec::as_slice).unwrap_or_default();
        Ok(rows.iter().filter(|r| matches(r, filter)).count() as u64)
    }

    async fn insert(&self, table: &str, record: &SanitizedRecord) -> DatastoreResult<InsertedRow> {
        let mut state = self.begin(Operation::Insert, table).await?;

        if let Some((field, value)) = self
            .rejected_inserts
            .iter()
            .find(|(field, value)| record.fields().get(field) == Some(value))
        {
            return Err(DatastoreError::Rejected {
                status: 409,
                code: Some("23505".to_string()),
                message: format!("duplicate key value violates unique constraint \"{}_{}_key\"", table, field),
                details: Some(format!("Key ({})=({}) already exists.", field, text_of(value))),
                hint: None,
            });
        }

        let mut row = record.clone().into_record();
        if !row.data.contains_key(&self.id_field) {
            let id = Value::from(state.next_id);
            state.next_id += 1;
            row.data.insert(self.id_field.clone(), id);
        }
        let id = row.get(&self.id_field).cloned();

        if let Some(rows) = state.tables.get_mut(table) {
            rows.push(row.clone());
        }
        Ok(InsertedRow { id, row })
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Map<String, Value>,
    ) -> DatastoreResult<Vec<Record>> {
        let mut state = self.begin(Operation::Update, table).await?;
        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| matches(r, filter)) {
                for (key, value) in patch {
                    row.data.insert(key.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sanitize::sanitize;
    use serde_json::json;

    fn row(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn store() -> MemoryDatastore {
        MemoryDatastore::new().with_table(
            "venues",
            vec![
                row(json!({"id": "a1", "name": "MMCA Seoul", "city": "Seoul", "tier": 1})),
                row(json!({"id": "a2", "name": "Leeum", "city": "Seoul", "tier": 2})),
                row(json!({"id": null, "name": "Pending", "city": "Busan", "tier": 3})),
            ],
        )
    }

    #[tokio::test]
    async fn test_neq_does_not_match_null_column() {
        let store = store();
        let filter = Filter::all().neq("id", "00000000-0000-0000-0000-000000000000");
        assert_eq!(store.count("venues", &filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_filters_projects_and_limits() {
        let store = store();
        let filter = Filter::all()
            .with("city", FilterOp::Ilike, "seo*")
            .with("tier", FilterOp::Lte, "2");
        let projection = vec!["name".to_string()];

        let rows = store
            .query("venues", &filter, Some(&projection), Some(1))
            .await
            .unwrap();
        assert_eq!(rows, vec![row(json!({"name": "MMCA Seoul"}))]);
    }

    #[tokio::test]
    async fn test_unconditional_delete_is_refused_by_default() {
        let store = store();
        let error = store.delete("venues", &Filter::all()).await.unwrap_err();
        assert_eq!(error.code(), Some("21000"));
        assert_eq!(store.rows("venues").await.len(), 3);

        let permissive = store.allow_unconditional_delete();
        permissive.delete("venues", &Filter::all()).await.unwrap();
        assert!(permissive.rows("venues").await.is_empty());
    }

    #[tokio::test]
    async fn test_insert_generates_id_and_honours_rejections() {
        let store = MemoryDatastore::new()
            .with_table("exhibitions", vec![])
            .reject_inserts_where("title", json!("Duplicate"));

        let ok = store
            .insert("exhibitions", &sanitize(row(json!({"title": "A"})), "id"))
            .await
            .unwrap();
        assert_eq!(ok.id, Some(json!(1)));

        let err = store
            .insert("exhibitions", &sanitize(row(json!({"title": "Duplicate"})), "id"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(store.rows("exhibitions").await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_table_and_injected_failures() {
        let store = store();
        let missing = store.count("artworks", &Filter::all()).await.unwrap_err();
        assert_eq!(missing.code(), Some("PGRST205"));

        store
            .fail_next(
                Operation::Count,
                DatastoreError::Transport {
                    message: "connection reset".to_string(),
                },
            )
            .await;
        assert!(store.count("venues", &Filter::all()).await.unwrap_err().is_transport());
        assert_eq!(store.count("venues", &Filter::all()).await.unwrap(), 3);
        assert_eq!(store.call_count(Operation::Count).await, 3);
    }

    #[tokio::test]
    async fn test_update_patches_matching_rows() {
        let store = store();
        let mut patch = Map::new();
        patch.insert("tier".to_string(), json!(1));

        let updated = store
            .update("venues", &Filter::all().eq("name", "Leeum"), &patch)
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].get("tier"), Some(&json!(1)));
    }
}
