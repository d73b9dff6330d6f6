use crate::core::loader::{BulkLoader, LoadOptions};
use crate::core::reset::{ResetOptions, TableResetter};
use crate::domain::model::{Record, RunSummary, TableState};
use crate::domain::ports::Datastore;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::collections::BTreeSet;

/// What one invocation should do to one table.
#[derive(Debug, Clone, Default)]
pub struct MaintenancePlan {
    pub table: String,
    pub reset: bool,
    pub records: Option<Vec<Record>>,
    /// Restrict the load to these input positions.
    pub only_indices: Option<BTreeSet<usize>>,
}

#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub reset: Option<TableState>,
    pub load: Option<RunSummary>,
}

pub struct MaintenanceEngine<'a, D: Datastore + ?Sized> {
    store: &'a D,
    reset_options: ResetOptions,
    load_options: LoadOptions,
    monitor: SystemMonitor,
}

impl<'a, D: Datastore + ?Sized> MaintenanceEngine<'a, D> {
    pub fn new(store: &'a D, reset_options: ResetOptions, load_options: LoadOptions) -> Self {
        Self::new_with_monitoring(store, reset_options, load_options, false)
    }

    pub fn new_with_monitoring(
        store: &'a D,
        reset_options: ResetOptions,
        load_options: LoadOptions,
        enable_monitoring: bool,
    ) -> Self {
        Self {
            store,
            reset_options,
            load_options,
            monitor: SystemMonitor::new(enable_monitoring),
        }
    }

    /// Resets first when asked, then loads. A failed reset stops the run
    /// before any insert is attempted.
    pub async fn run(&self, plan: MaintenancePlan) -> Result<MaintenanceReport> {
        let mut report = MaintenanceReport::default();
        self.monitor.log_stats("Start");

        if plan.reset {
            tracing::info!("🧹 Resetting table '{}'", plan.table);
            let state = TableResetter::new(self.store, self.reset_options.clone())
                .reset(&plan.table)
                .await?;
            self.monitor.log_stats("Reset");
            report.reset = Some(state);
        }

        if let Some(records) = plan.records {
            let loader = BulkLoader::new(self.store, self.load_options.clone());
            let summary = loader
                .load_selected(&plan.table, records, plan.only_indices.as_ref())
                .await?;
            self.monitor.log_stats("Load");
            report.load = Some(summary);
        }

        self.monitor.log_final_stats();
        Ok(report)
    }
}
