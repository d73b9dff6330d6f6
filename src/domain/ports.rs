use crate::domain::model::{Filter, InsertedRow, Record, SanitizedRecord};
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Failure of a single datastore request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatastoreError {
    /// The request never produced a response (unreachable, timeout, TLS).
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The datastore answered with a non-success status.
    #[error("{}", rejection_text(*status, code.as_deref(), message, details.as_deref(), hint.as_deref()))]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    /// The response arrived but could not be understood.
    #[error("unexpected response: {message}")]
    Decode { message: String },
}

fn rejection_text(
    status: u16,
    code: Option<&str>,
    message: &str,
    details: Option<&str>,
    hint: Option<&str>,
) -> String {
    let mut text = match code {
        Some(code) => format!("[{} {}] {}", status, code, message),
        None => format!("[{}] {}", status, message),
    };
    if let Some(details) = details {
        text.push_str(&format!(" ({})", details));
    }
    if let Some(hint) = hint {
        text.push_str(&format!(" hint: {}", hint));
    }
    text
}

impl DatastoreError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type DatastoreResult<T> = std::result::Result<T, DatastoreError>;

/// Request/response access to a table-oriented datastore.
///
/// One handle is created per invocation and passed by reference to every
/// component that needs it.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn query(
        &self,
        table: &str,
        filter: &Filter,
        projection: Option<&[String]>,
        limit: Option<usize>,
    ) -> DatastoreResult<Vec<Record>>;

    async fn delete(&self, table: &str, filter: &Filter) -> DatastoreResult<()>;

    async fn count(&self, table: &str, filter: &Filter) -> DatastoreResult<u64>;

    async fn insert(&self, table: &str, record: &SanitizedRecord) -> DatastoreResult<InsertedRow>;

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Map<String, Value>,
    ) -> DatastoreResult<Vec<Record>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_display_carries_code_and_hint() {
        let error = DatastoreError::Rejected {
            status: 409,
            code: Some("23505".to_string()),
            message: "duplicate key value violates unique constraint \"venues_name_key\"".to_string(),
            details: Some("Key (name)=(MMCA Seoul) already exists.".to_string()),
            hint: None,
        };

        let text = error.to_string();
        assert!(text.starts_with("[409 23505] duplicate key"));
        assert!(text.contains("already exists"));
        assert_eq!(error.code(), Some("23505"));
        assert_eq!(error.status(), Some(409));
        assert!(!error.is_transport());
    }
}
