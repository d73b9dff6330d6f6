pub mod engine;
pub mod loader;
pub mod ops;
pub mod reset;
pub mod sanitize;

pub use crate::domain::model::{Filter, Record, RunSummary, SanitizedRecord, TableState};
pub use crate::domain::ports::{Datastore, DatastoreError};
pub use crate::utils::error::Result;
