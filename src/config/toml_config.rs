use crate::utils::error::{MaintError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional `table-maint.toml`. Every section and key may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub datastore: Option<DatastoreSection>,
    pub reset: Option<ResetSection>,
    pub load: Option<LoadSection>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DatastoreSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub schema: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl std::fmt::Debug for DatastoreSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastoreSection")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("schema", &self.schema)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetSection {
    /// `sentinel` (default) or `unconditional`.
    pub mode: Option<String>,
    pub sentinel_column: Option<String>,
    pub sentinel_value: Option<String>,
    pub observe_before: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadSection {
    pub id_field: Option<String>,
}

impl FileConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MaintError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the value of the environment variable. Unset
    /// variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MaintError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for FileConfig {
    fn validate(&self) -> Result<()> {
        if let Some(datastore) = &self.datastore {
            if let Some(url) = &datastore.url {
                validation::validate_url("datastore.url", url)?;
            }
            if let Some(timeout) = datastore.timeout_seconds {
                validation::validate_positive_number("datastore.timeout_seconds", timeout, 1)?;
            }
        }

        if let Some(reset) = &self.reset {
            if let Some(mode) = &reset.mode {
                let valid_modes = ["sentinel", "unconditional"];
                if !valid_modes.contains(&mode.as_str()) {
                    return Err(MaintError::InvalidConfigValueError {
                        field: "reset.mode".to_string(),
                        value: mode.clone(),
                        reason: format!("Valid modes: {}", valid_modes.join(", ")),
                    });
                }
            }
            if let Some(column) = &reset.sentinel_column {
                if !validation::is_identifier(column) {
                    return Err(MaintError::InvalidConfigValueError {
                        field: "reset.sentinel_column".to_string(),
                        value: column.clone(),
                        reason: "Must be a plain column name".to_string(),
                    });
                }
            }
            if let Some(value) = &reset.sentinel_value {
                validation::validate_non_empty_string("reset.sentinel_value", value)?;
            }
        }

        if let Some(id_field) = self.load.as_ref().and_then(|l| l.id_field.as_ref()) {
            validation::validate_non_empty_string("load.id_field", id_field)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let config = FileConfig::from_toml_str(
            r#"
[datastore]
url = "https://project.supabase.co"
api_key = "service-key"
schema = "public"
timeout_seconds = 10

[reset]
mode = "sentinel"
sentinel_column = "uuid"
sentinel_value = "00000000-0000-0000-0000-000000000000"
observe_before = false

[load]
id_field = "uuid"
"#,
        )
        .unwrap();

        let datastore = config.datastore.as_ref().unwrap();
        assert_eq!(datastore.timeout_seconds, Some(10));
        assert_eq!(config.reset.as_ref().unwrap().observe_before, Some(false));
        assert_eq!(config.load.as_ref().unwrap().id_field.as_deref(), Some("uuid"));
        assert!(config.validate().is_ok());
        assert!(!format!("{:?}", config).contains("service-key"));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TABLE_MAINT_TEST_URL", "https://test.supabase.co");

        let config = FileConfig::from_toml_str(
            r#"
[datastore]
url = "${TABLE_MAINT_TEST_URL}"
api_key = "${TABLE_MAINT_TEST_UNSET_KEY}"
"#,
        )
        .unwrap();

        let datastore = config.datastore.unwrap();
        assert_eq!(datastore.url.as_deref(), Some("https://test.supabase.co"));
        assert_eq!(datastore.api_key.as_deref(), Some("${TABLE_MAINT_TEST_UNSET_KEY}"));

        std::env::remove_var("TABLE_MAINT_TEST_URL");
    }

    #[test]
    fn test_config_validation() {
        let bad_mode = FileConfig::from_toml_str("[reset]\nmode = \"truncate\"\n").unwrap();
        assert!(bad_mode.validate().is_err());

        let bad_url = FileConfig::from_toml_str("[datastore]\nurl = \"invalid-url\"\n").unwrap();
        assert!(bad_url.validate().is_err());

        let bad_column = FileConfig::from_toml_str("[reset]\nsentinel_column = \"id; --\"\n").unwrap();
        assert!(bad_column.validate().is_err());

        assert!(FileConfig::from_toml_str("").unwrap().validate().is_ok());
        assert!(FileConfig::from_toml_str("[datastore\n").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[load]\nid_field = \"venue_id\"\n")
            .unwrap();

        let config = FileConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.load.unwrap().id_field.as_deref(), Some("venue_id"));
    }
}
