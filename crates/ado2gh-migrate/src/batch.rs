//! Sequential execution of a migration plan.

use tracing::{info, warn};

use crate::orchestrator::MigrationOrchestrator;
use crate::types::{MigrationReport, MigrationUnit};

/// Runs an ordered plan through the orchestrator, one unit at a time.
///
/// A unit's failure never prevents later units from running; every unit
/// gets a report, in plan order.
pub struct BatchRunner<'a> {
    orchestrator: &'a MigrationOrchestrator,
}

impl<'a> BatchRunner<'a> {
    pub fn new(orchestrator: &'a MigrationOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub async fn run(&self, plan: &[MigrationUnit]) -> Vec<MigrationReport> {
        info!(units = plan.len(), "starting batch migration");
        let mut reports = Vec::with_capacity(plan.len());

        for (index, unit) in plan.iter().enumerate() {
            info!(
                unit = index + 1,
                total = plan.len(),
                project = %unit.project,
                repo = %unit.repo,
                "running unit"
            );
            let report = self.orchestrator.run_unit(unit).await;
            if !report.success {
                warn!(
                    project = %unit.project,
                    repo = %unit.repo,
                    "unit did not complete successfully, continuing with the rest"
                );
            }
            reports.push(report);
        }

        let succeeded = reports.iter().filter(|r| r.success).count();
        info!(
            succeeded,
            failed = reports.len() - succeeded,
            "batch migration finished"
        );
        reports
    }
}
