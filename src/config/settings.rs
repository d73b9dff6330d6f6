use crate::config::toml_config::FileConfig;
use crate::core::loader::LoadOptions;
use crate::core::reset::{DeleteMode, ResetOptions, DEFAULT_SENTINEL_COLUMN, DEFAULT_SENTINEL_VALUE};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Endpoint and credentials for one datastore handle.
#[derive(Clone, PartialEq, Eq)]
pub struct DatastoreSettings {
    pub url: String,
    pub api_key: String,
    pub schema: Option<String>,
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for DatastoreSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastoreSettings")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("schema", &self.schema)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Validate for DatastoreSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("datastore.url", &self.url)?;
        validation::validate_non_empty_string("datastore.api_key", &self.api_key)?;
        validation::validate_positive_number("datastore.timeout_seconds", self.timeout_seconds, 1)?;
        Ok(())
    }
}

/// Values given on the command line or through the environment. They win
/// over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub schema: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub datastore: DatastoreSettings,
    pub reset: ResetOptions,
    pub load: LoadOptions,
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        file.validate()?;

        let section = file.datastore.unwrap_or_default();
        let url = overrides.url.or(section.url);
        let api_key = overrides.api_key.or(section.api_key);

        let datastore = DatastoreSettings {
            url: validation::validate_required_field("datastore.url", &url)?.clone(),
            api_key: validation::validate_required_field("datastore.api_key", &api_key)?.clone(),
            schema: overrides.schema.or(section.schema),
            timeout_seconds: overrides
                .timeout_seconds
                .or(section.timeout_seconds)
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        };
        datastore.validate()?;

        let reset_section = file.reset.unwrap_or_default();
        let mode = match reset_section.mode.as_deref() {
            Some("unconditional") => DeleteMode::Unconditional,
            _ => DeleteMode::Sentinel {
                column: reset_section
                    .sentinel_column
                    .unwrap_or_else(|| DEFAULT_SENTINEL_COLUMN.to_string()),
                value: reset_section
                    .sentinel_value
                    .unwrap_or_else(|| DEFAULT_SENTINEL_VALUE.to_string()),
            },
        };
        let reset = ResetOptions {
            mode,
            observe_before: reset_section.observe_before.unwrap_or(false),
        };

        let load = match file.load.and_then(|l| l.id_field) {
            Some(id_field) => LoadOptions { id_field },
            None => LoadOptions::default(),
        };

        Ok(Self {
            datastore,
            reset,
            load,
        })
    }
}
