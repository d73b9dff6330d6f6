use crate::config::settings::Overrides;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "table-maint")]
#[command(about = "Reset and reload tables in a PostgREST/Supabase datastore")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Datastore base URL, e.g. https://<project>.supabase.co
    #[arg(long, env = "SUPABASE_URL", global = true)]
    pub url: Option<String>,

    /// Service key sent as apikey and bearer token
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Postgres schema exposed by the API (default: public)
    #[arg(long, global = true)]
    pub schema: Option<String>,

    /// Per-request timeout
    #[arg(long, global = true)]
    pub timeout_seconds: Option<u64>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Delete every row of a table and verify it is empty
    Reset { table: String },

    /// Insert the records of a JSON array file one by one
    Load {
        table: String,
        file: String,

        /// Reset the table before loading
        #[arg(long)]
        reset: bool,

        /// Write the run summary as JSON to this path
        #[arg(long)]
        summary_out: Option<String>,

        /// Only attempt the records that failed in this saved summary
        #[arg(long)]
        retry_failed_from: Option<String>,

        /// Exit with status 2 when any record failed
        #[arg(long)]
        strict: bool,
    },

    /// Count rows, optionally matching conditions
    Count {
        table: String,

        /// Condition as column=value or column=op.value
        #[arg(long = "where")]
        conditions: Vec<String>,
    },

    /// Check whether a table is reachable through the API
    Exists { table: String },

    /// Print sample rows and the columns seen in them
    Inspect {
        table: String,

        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// Update the rows matching the conditions
    Patch {
        table: String,

        /// Condition as column=value or column=op.value
        #[arg(long = "where", required = true)]
        conditions: Vec<String>,

        /// JSON object of columns to set
        #[arg(long)]
        set: String,
    },
}

impl CliConfig {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            schema: self.schema.clone(),
            timeout_seconds: self.timeout_seconds,
        }
    }
}
