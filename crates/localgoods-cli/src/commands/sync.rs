use localgoods_core::ReconcileReport;

use crate::commands::common::CliContext;
use crate::error::CliError;

pub async fn run_sync(ctx: &CliContext) -> Result<(), CliError> {
    if ctx.backend.is_none() {
        return Err(CliError::BackendNotConfigured);
    }

    let report = ctx.smart.reconcile().await?;
    println!("{}", format_report(&report));
    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError::SyncIncomplete(report.failures.join("; ")))
    }
}

pub fn format_report(report: &ReconcileReport) -> String {
    format!(
        "Sync {}: {} sent, {} received, {} updated, {} removals delivered",
        if report.is_complete() { "completed" } else { "incomplete" },
        report.pushed,
        report.adopted,
        report.refreshed,
        report.ops_drained
    )
}
