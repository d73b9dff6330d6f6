use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One row as a flat JSON object. The target table defines the schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

/// A record ready for insertion: no identifier key, no null-valued keys.
///
/// Only [`crate::core::sanitize::sanitize`] constructs one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SanitizedRecord(pub(crate) Map<String, Value>);

impl SanitizedRecord {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_record(self) -> Record {
        Record { data: self.0 }
    }
}

/// What the datastore handed back for one successful insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertedRow {
    pub id: Option<Value>,
    pub row: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertSuccess {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertFailure {
    pub index: usize,
    pub message: String,
}

/// Outcome of one batch load.
///
/// `succeeded + failed == attempted` holds after every call to [`RunSummary::record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub table: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub successes: Vec<InsertSuccess>,
    pub failures: Vec<InsertFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            attempted: 0,
            succeeded: 0,
            failed: 0,
            successes: Vec::new(),
            failures: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record<E: fmt::Display>(&mut self, index: usize, outcome: std::result::Result<InsertedRow, E>) {
        self.attempted += 1;
        match outcome {
            Ok(inserted) => {
                self.succeeded += 1;
                self.successes.push(InsertSuccess {
                    index,
                    id: inserted.id,
                });
            }
            Err(e) => {
                self.failed += 1;
                self.failures.push(InsertFailure {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

/// Row counts observed around a reset. Always read from the datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    pub table: String,
    pub rows_before: Option<u64>,
    pub rows_after: u64,
}

impl TableState {
    pub fn is_empty(&self) -> bool {
        self.rows_after == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    Is,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::Ilike => "ilike",
            Self::Is => "is",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

/// Conjunction of column conditions. Empty matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(column, FilterOp::Eq, value)
    }

    pub fn neq(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(column, FilterOp::Neq, value)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// PostgREST query pairs, `column=op.value`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.conditions
            .iter()
            .map(|c| (c.column.clone(), format!("{}.{}", c.op.as_str(), c.value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Rejected(&'static str);

    impl fmt::Display for Rejected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    fn inserted(id: i64) -> InsertedRow {
        InsertedRow {
            id: Some(json!(id)),
            row: Record::default(),
        }
    }

    #[test]
    fn test_summary_counts_stay_consistent() {
        let mut summary = RunSummary::new("venues");
        summary.record::<Rejected>(0, Ok(inserted(10)));
        summary.record(1, Err::<InsertedRow, _>(Rejected("duplicate key")));
        summary.record::<Rejected>(2, Ok(inserted(11)));

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded + summary.failed, summary.attempted);
        assert_eq!(summary.successes.len(), summary.succeeded);
        assert_eq!(summary.failed_indices(), vec![1]);
        assert_eq!(summary.failures[0].message, "duplicate key");
        assert!(!summary.is_complete_success());
    }

    #[test]
    fn test_summary_survives_json_round_trip_for_reruns() {
        let mut summary = RunSummary::new("exhibitions");
        summary.record(4, Err::<InsertedRow, _>(Rejected("null value in column \"title\"")));
        summary.finish();

        let json = serde_json::to_string(&summary).unwrap();
        let restored: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.failed_indices(), vec![4]);
        assert!(restored.finished_at.is_some());
    }

    #[test]
    fn test_filter_query_pairs() {
        let filter = Filter::all()
            .neq("id", "00000000-0000-0000-0000-000000000000")
            .with("city", FilterOp::Ilike, "*seoul*");

        assert_eq!(
            filter.to_query_pairs(),
            vec![
                ("id".to_string(), "neq.00000000-0000-0000-0000-000000000000".to_string()),
                ("city".to_string(), "ilike.*seoul*".to_string()),
            ]
        );
        assert!(Filter::all().is_empty());
    }
}
