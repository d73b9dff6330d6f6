use crate::core::ops::TableSample;
use crate::domain::model::{RunSummary, TableState};
use std::fmt::Write;

pub fn render_table_state(state: &TableState) -> String {
    let before = state
        .rows_before
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let mark = if state.is_empty() { "✅" } else { "⚠️" };
    format!(
        "{} Reset '{}': {} rows before, {} rows after",
        mark, state.table, before, state.rows_after
    )
}

/// Human-readable batch outcome, detailed enough to drive a corrective re-run.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📊 Load into '{}'", summary.table);
    let _ = writeln!(out, "   Attempted: {}", summary.attempted);
    let _ = writeln!(out, "   Succeeded: {}", summary.succeeded);
    let _ = writeln!(out, "   Failed:    {}", summary.failed);

    if let Some(finished_at) = summary.finished_at {
        let elapsed = finished_at - summary.started_at;
        let _ = writeln!(out, "   Duration:  {} ms", elapsed.num_milliseconds());
    }

    let ids: Vec<String> = summary
        .successes
        .iter()
        .filter_map(|s| s.id.as_ref().map(|id| format!("#{} → {}", s.index, id)))
        .collect();
    if !ids.is_empty() {
        let _ = writeln!(out, "   Generated ids:");
        for line in ids {
            let _ = writeln!(out, "     {}", line);
        }
    }

    if !summary.failures.is_empty() {
        let _ = writeln!(out, "   Failures:");
        for failure in &summary.failures {
            let _ = writeln!(out, "     ✗ #{}: {}", failure.index, failure.message);
        }
    }

    out.trim_end().to_string()
}

pub fn render_sample(sample: &TableSample) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "🔍 '{}': {} sample rows, columns: {}",
        sample.table,
        sample.rows.len(),
        if sample.columns.is_empty() {
            "(none seen)".to_string()
        } else {
            sample.columns.join(", ")
        }
    );
    for (index, row) in sample.rows.iter().enumerate() {
        let body = serde_json::to_string_pretty(row).unwrap_or_else(|_| format!("{:?}", row));
        let _ = writeln!(out, "--- row {} ---\n{}", index, body);
    }
    out.trim_end().to_string()
}
