use crate::domain::model::InsertFailure;
use crate::domain::ports::DatastoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaintError {
    #[error("Cannot reach datastore: {message}")]
    Connection { message: String },

    #[error("Delete on table '{table}' failed: {message}")]
    DeleteFailed { table: String, message: String },

    #[error("Row count of table '{table}' could not be verified after delete: {message}")]
    VerificationFailed { table: String, message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Insert of record {index} failed: {message}")]
    InsertFailed { index: usize, message: String },

    #[error("Datastore request failed: {message}")]
    Datastore { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Datastore,
    Input,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MaintError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection { .. } => ErrorCategory::Network,
            Self::DeleteFailed { .. }
            | Self::VerificationFailed { .. }
            | Self::InsertFailed { .. }
            | Self::Datastore { .. } => ErrorCategory::Datastore,
            Self::InvalidInput { .. } | Self::SerializationError(_) => ErrorCategory::Input,
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InsertFailed { .. } => ErrorSeverity::Low,
            Self::Datastore { .. } | Self::InvalidInput { .. } | Self::SerializationError(_) => {
                ErrorSeverity::Medium
            }
            Self::DeleteFailed { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. }
            | Self::IoError(_) => ErrorSeverity::High,
            // The table may or may not have been emptied.
            Self::VerificationFailed { .. } | Self::Connection { .. } => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for an error that reached the top level. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Network => 3,
            _ => 1,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Connection { .. } => "Could not reach the datastore".to_string(),
            Self::DeleteFailed { table, .. } => {
                format!("Table '{}' was not reset; the delete was rejected", table)
            }
            Self::VerificationFailed { table, .. } => format!(
                "The delete on '{}' was sent but its outcome is unknown; the row count could not be read",
                table
            ),
            Self::InvalidInput { message } => format!("Invalid input: {}", message),
            Self::InsertFailed { index, .. } => format!("Record {} was not inserted", index),
            Self::Datastore { message } => format!("The datastore rejected the request: {}", message),
            Self::IoError(e) => format!("File access failed: {}", e),
            Self::SerializationError(e) => format!("Malformed JSON: {}", e),
            Self::MissingConfigError { field } => format!("Missing setting: {}", field),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting {}: {}", field, reason)
            }
            Self::ConfigValidationError { field, message } => {
                format!("Configuration problem in {}: {}", field, message)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "Check the datastore URL and your network connection",
            Self::DeleteFailed { .. } => {
                "Check that the key has delete permission on the table and that the sentinel column exists"
            }
            Self::VerificationFailed { .. } => {
                "Run `table-maint count <table>` to see whether the rows are gone before retrying"
            }
            Self::InvalidInput { .. } | Self::SerializationError(_) => {
                "The input must be a JSON array of objects"
            }
            Self::InsertFailed { .. } => "Re-run the load with --retry-failed-from the saved summary",
            Self::Datastore { .. } => "Check the table name, the filter columns and the key's permissions",
            Self::IoError(_) => "Check that the file exists and is readable",
            Self::MissingConfigError { .. } => {
                "Pass --url/--api-key, set SUPABASE_URL/SUPABASE_SERVICE_KEY, or add them to the config file"
            }
            Self::InvalidConfigValueError { .. } | Self::ConfigValidationError { .. } => {
                "Fix the value in the config file or on the command line"
            }
        }
    }
}

impl From<DatastoreError> for MaintError {
    fn from(error: DatastoreError) -> Self {
        match error {
            DatastoreError::Transport { message } => Self::Connection { message },
            other => Self::Datastore {
                message: other.to_string(),
            },
        }
    }
}

/// Per-record failures are kept in the run summary rather than raised; this
/// lifts one back into the error taxonomy for reporting.
impl From<&InsertFailure> for MaintError {
    fn from(failure: &InsertFailure) -> Self {
        Self::InsertFailed {
            index: failure.index,
            message: failure.message.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MaintError>;
