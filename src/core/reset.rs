use crate::domain::model::{Filter, TableState};
use crate::domain::ports::Datastore;
use crate::utils::error::{MaintError, Result};
use crate::utils::validation::validate_table_name;

pub const DEFAULT_SENTINEL_COLUMN: &str = "id";
pub const DEFAULT_SENTINEL_VALUE: &str = "00000000-0000-0000-0000-000000000000";

/// How the delete-all request is expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteMode {
    /// `column neq value` with a value no row holds. Works against APIs that
    /// refuse deletes without a predicate.
    Sentinel { column: String, value: String },
    /// A delete with no predicate at all.
    Unconditional,
}

impl Default for DeleteMode {
    fn default() -> Self {
        Self::Sentinel {
            column: DEFAULT_SENTINEL_COLUMN.to_string(),
            value: DEFAULT_SENTINEL_VALUE.to_string(),
        }
    }
}

impl DeleteMode {
    pub fn filter(&self) -> Filter {
        match self {
            Self::Sentinel { column, value } => Filter::all().neq(column.clone(), value.clone()),
            Self::Unconditional => Filter::all(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetOptions {
    pub mode: DeleteMode,
    /// Count the rows before deleting. Off by default so a rejected delete
    /// leaves the delete as the only request sent.
    pub observe_before: bool,
}

/// Empties a table and reads back its row count.
pub struct TableResetter<'a, D: Datastore + ?Sized> {
    store: &'a D,
    options: ResetOptions,
}

impl<'a, D: Datastore + ?Sized> TableResetter<'a, D> {
    pub fn new(store: &'a D, options: ResetOptions) -> Self {
        Self { store, options }
    }

    /// Deletes every row of `table` and returns the count observed afterwards.
    ///
    /// A rejected delete yields [`MaintError::DeleteFailed`] and no
    /// verification count is issued. A failed verification count yields
    /// [`MaintError::VerificationFailed`]: the delete was accepted by the
    /// transport but whether it took effect is unknown.
    pub async fn reset(&self, table: &str) -> Result<TableState> {
        validate_table_name(table)?;

        let rows_before = if self.options.observe_before {
            match self.store.count(table, &Filter::all()).await {
                Ok(count) => {
                    tracing::info!("📋 Table '{}' holds {} rows before reset", table, count);
                    Some(count)
                }
                Err(e) => {
                    tracing::warn!("⚠️ Could not count '{}' before reset: {}", table, e);
                    None
                }
            }
        } else {
            None
        };

        let filter = self.options.mode.filter();
        tracing::debug!("Deleting from '{}' with filter {:?}", table, filter.to_query_pairs());
        self.store
            .delete(table, &filter)
            .await
            .map_err(|e| MaintError::DeleteFailed {
                table: table.to_string(),
                message: e.to_string(),
            })?;

        let rows_after = self
            .store
            .count(table, &Filter::all())
            .await
            .map_err(|e| MaintError::VerificationFailed {
                table: table.to_string(),
                message: format!("delete was sent but the outcome is unknown: {}", e),
            })?;

        if rows_after == 0 {
            tracing::info!("🧹 Table '{}' is empty", table);
        } else {
            tracing::warn!(
                "⚠️ Table '{}' still holds {} rows after reset; rows may be hidden by row-level security or have a null sentinel column",
                table,
                rows_after
            );
        }

        Ok(TableState {
            table: table.to_string(),
            rows_before,
            rows_after,
        })
    }
}
