//! Single-request table operations run straight from the command line:
//! counting, probing, sampling and patching.

use crate::domain::model::{Filter, FilterOp, Record};
use crate::domain::ports::Datastore;
use crate::utils::error::{MaintError, Result};
use crate::utils::validation::{is_identifier, validate_table_name};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

// PostgREST codes for a relation that does not exist.
const MISSING_TABLE_CODES: [&str; 2] = ["42P01", "PGRST205"];

const OPERATORS: [(&str, FilterOp); 9] = [
    ("eq", FilterOp::Eq),
    ("neq", FilterOp::Neq),
    ("gt", FilterOp::Gt),
    ("gte", FilterOp::Gte),
    ("lt", FilterOp::Lt),
    ("lte", FilterOp::Lte),
    ("like", FilterOp::Like),
    ("ilike", FilterOp::Ilike),
    ("is", FilterOp::Is),
];

/// Parses `column=value` (equality) or `column=op.value` conditions.
pub fn parse_filter(conditions: &[String]) -> Result<Filter> {
    conditions.iter().try_fold(Filter::all(), |filter, text| {
        let (column, rest) = text.split_once('=').ok_or_else(|| MaintError::InvalidInput {
            message: format!("condition '{}' must look like column=value", text),
        })?;
        if !is_identifier(column) {
            return Err(MaintError::InvalidInput {
                message: format!("'{}' is not a valid column name", column),
            });
        }

        let (op, value) = rest
            .split_once('.')
            .and_then(|(prefix, value)| {
                OPERATORS
                    .iter()
                    .find(|(name, _)| *name == prefix)
                    .map(|(_, op)| (*op, value))
            })
            .unwrap_or((FilterOp::Eq, rest));

        Ok(filter.with(column, op, value))
    })
}

pub fn parse_patch(text: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) if !map.is_empty() => Ok(map),
        _ => Err(MaintError::InvalidInput {
            message: "patch must be a non-empty JSON object".to_string(),
        }),
    }
}

pub async fn count_rows<D: Datastore + ?Sized>(store: &D, table: &str, filter: &Filter) -> Result<u64> {
    validate_table_name(table)?;
    Ok(store.count(table, filter).await?)
}

pub async fn table_exists<D: Datastore + ?Sized>(store: &D, table: &str) -> Result<bool> {
    validate_table_name(table)?;
    match store.query(table, &Filter::all(), None, Some(1)).await {
        Ok(_) => Ok(true),
        Err(e) if e.status() == Some(404) || e.code().is_some_and(|c| MISSING_TABLE_CODES.contains(&c)) => {
            tracing::debug!("Table '{}' not found: {}", table, e);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSample {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

/// Reads up to `limit` rows and collects every column name seen in them.
pub async fn inspect_table<D: Datastore + ?Sized>(store: &D, table: &str, limit: usize) -> Result<TableSample> {
    validate_table_name(table)?;
    let rows = store.query(table, &Filter::all(), None, Some(limit)).await?;

    let columns: BTreeSet<String> = rows.iter().flat_map(|r| r.data.keys().cloned()).collect();
    Ok(TableSample {
        table: table.to_string(),
        columns: columns.into_iter().collect(),
        rows,
    })
}

/// Updates the rows matching `filter`. An empty filter is refused so a typo
/// cannot rewrite a whole table.
pub async fn patch_rows<D: Datastore + ?Sized>(
    store: &D,
    table: &str,
    filter: &Filter,
    patch: &Map<String, Value>,
) -> Result<Vec<Record>> {
    validate_table_name(table)?;
    if filter.is_empty() {
        return Err(MaintError::InvalidInput {
            message: "patch needs at least one --where condition".to_string(),
        });
    }
    if patch.is_empty() {
        return Err(MaintError::InvalidInput {
            message: "patch must set at least one column".to_string(),
        });
    }

    let updated = store.update(table, filter, patch).await?;
    tracing::info!("✏️ Patched {} rows in '{}'", updated.len(), table);
    Ok(updated)
}
