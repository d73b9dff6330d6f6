pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{memory::MemoryDatastore, rest::RestDatastore};
pub use config::{DatastoreSettings, FileConfig, Settings};
pub use crate::core::engine::{MaintenanceEngine, MaintenancePlan, MaintenanceReport};
pub use crate::core::loader::{BulkLoader, LoadOptions};
pub use crate::core::reset::{DeleteMode, ResetOptions, TableResetter};
pub use utils::error::{MaintError, Result};
