use clap::Parser;
use std::collections::BTreeSet;
use table_maint::core::loader::read_records_file;
use table_maint::core::ops;
use table_maint::domain::model::RunSummary;
use table_maint::utils::{logger, report, validation};
use table_maint::{
    CliConfig, Command, FileConfig, MaintError, MaintenanceEngine, MaintenancePlan, RestDatastore, Result, Settings,
};

/// Exit status when the command ran but left work undone.
const EXIT_INCOMPLETE: i32 = 2;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }
    tracing::info!("Starting table-maint");

    match run(config).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(
                "❌ {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(config: CliConfig) -> Result<i32> {
    let file = match &config.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            FileConfig::from_file(path)?
        }
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(file, config.overrides())?;
    tracing::debug!("Resolved settings: {:?}", settings);

    let store = RestDatastore::connect(&settings.datastore)?.with_id_field(settings.load.id_field.clone());
    let engine = MaintenanceEngine::new_with_monitoring(
        &store,
        settings.reset.clone(),
        settings.load.clone(),
        config.monitor,
    );

    match config.command {
        Command::Reset { table } => {
            let outcome = engine
                .run(MaintenancePlan {
                    table,
                    reset: true,
                    ..MaintenancePlan::default()
                })
                .await?;
            Ok(outcome
                .reset
                .map(|state| {
                    println!("{}", report::render_table_state(&state));
                    if state.is_empty() { 0 } else { EXIT_INCOMPLETE }
                })
                .unwrap_or(0))
        }

        Command::Load {
            table,
            file,
            reset,
            summary_out,
            retry_failed_from,
            strict,
        } => {
            validation::validate_path("file", &file)?;
            let records = read_records_file(&file).await?;
            tracing::info!("📄 Read {} records from {}", records.len(), file);

            let only_indices = match &retry_failed_from {
                Some(path) => Some(failed_indices_from(path, &table).await?),
                None => None,
            };

            let outcome = engine
                .run(MaintenancePlan {
                    table,
                    reset,
                    records: Some(records),
                    only_indices,
                })
                .await?;

            let mut exit_code = 0;
            if let Some(state) = &outcome.reset {
                println!("{}", report::render_table_state(state));
                if !state.is_empty() {
                    exit_code = EXIT_INCOMPLETE;
                }
            }
            if let Some(summary) = &outcome.load {
                println!("{}", report::render_summary(summary));
                if let Some(path) = &summary_out {
                    tokio::fs::write(path, serde_json::to_string_pretty(summary)?).await?;
                    println!("📁 Summary saved to: {}", path);
                }
                if strict && !summary.is_complete_success() {
                    for failure in &summary.failures {
                        let e = MaintError::from(failure);
                        tracing::error!("❌ {} (Severity: {:?})", e, e.severity());
                        eprintln!("❌ {}", e.user_friendly_message());
                    }
                    if let Some(failure) = summary.failures.first() {
                        eprintln!("💡 Suggestion: {}", MaintError::from(failure).recovery_suggestion());
                    }
                    exit_code = EXIT_INCOMPLETE;
                }
            }
            Ok(exit_code)
        }

        Command::Count { table, conditions } => {
            let filter = ops::parse_filter(&conditions)?;
            let count = ops::count_rows(&store, &table, &filter).await?;
            println!("📊 '{}': {} rows", table, count);
            Ok(0)
        }

        Command::Exists { table } => {
            if ops::table_exists(&store, &table).await? {
                println!("✅ Table '{}' exists", table);
                Ok(0)
            } else {
                println!("❌ Table '{}' not found", table);
                Ok(EXIT_INCOMPLETE)
            }
        }

        Command::Inspect { table, limit } => {
            let sample = ops::inspect_table(&store, &table, limit).await?;
            println!("{}", report::render_sample(&sample));
            Ok(0)
        }

        Command::Patch {
            table,
            conditions,
            set,
        } => {
            let filter = ops::parse_filter(&conditions)?;
            let patch = ops::parse_patch(&set)?;
            let updated = ops::patch_rows(&store, &table, &filter, &patch).await?;
            println!("✏️ Updated {} rows in '{}'", updated.len(), table);
            for row in &updated {
                println!("{}", serde_json::to_string_pretty(row)?);
            }
            Ok(0)
        }
    }
}

async fn failed_indices_from(path: &str, table: &str) -> Result<BTreeSet<usize>> {
    let content = tokio::fs::read_to_string(path).await?;
    let previous: RunSummary = serde_json::from_str(&content)?;
    if previous.table != table {
        return Err(MaintError::InvalidInput {
            message: format!(
                "summary {} was recorded for table '{}', not '{}'",
                path, previous.table, table
            ),
        });
    }

    let indices: BTreeSet<usize> = previous.failed_indices().into_iter().collect();
    tracing::info!("🔁 Retrying {} previously failed records", indices.len());
    Ok(indices)
}
