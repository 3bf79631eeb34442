use serde::Serialize;
use tracing::{debug, info, Instrument, Level};

use super::{derive_rule_names, RuleRepository};
use crate::error::DfwResult;
use crate::observability::metrics;
use crate::observability::tracker::op_span;
use crate::observability::OperationTracker;
use crate::workload::Workload;

/// What a workload cleanup did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    /// Names of the rules that were found and deleted
    pub deleted: Vec<String>,
    /// Derived names with no matching rule
    pub absent: Vec<String>,
}

impl ClearReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }
}

/// Delete every rule derived for `workload` from the section
///
/// Names without a matching rule are skipped, so running this again, or on a
/// workload that never had rules, deletes nothing and succeeds.
pub async fn clear_workload_rules(
    rules: &RuleRepository,
    workload: &Workload,
    section_id: &str,
) -> DfwResult<ClearReport> {
    let span = op_span!(
        Level::INFO,
        "dfw.workload.clear",
        vm.id = %workload.vm_id,
        section.id = %section_id
    );
    let tracker = OperationTracker::new("clear_workload_rules", span.clone());

    let result: DfwResult<ClearReport> = async {
        let mut report = ClearReport::default();

        for name in derive_rule_names(workload) {
            match rules.find_rule_by_name(&name, Some(section_id)).await? {
                Some(rule) => {
                    rules.delete_rule(&rule.id, section_id).await?;
                    report.deleted.push(name);
                }
                None => {
                    debug!("No rule named '{}', nothing to clear", name);
                    report.absent.push(name);
                }
            }
        }

        if !report.deleted.is_empty() {
            metrics::increment_rules_cleared(u64::try_from(report.deleted.len()).unwrap_or(u64::MAX));
        }
        info!(
            "Cleared {} rule(s) for VM {} ({} already absent)",
            report.deleted.len(),
            workload.vm_id,
            report.absent.len()
        );
        Ok(report)
    }
    .instrument(span)
    .await;

    tracker.finish(result)
}
