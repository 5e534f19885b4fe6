//! Applying scan outcomes back to the CRM.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crm_client::CrmClient;
use pulsetrack_common::{
    ActivitySummary, FailureLogEntry, RecordKind, RecordOutcome, RecordRef, ScanOutcome,
};

use crate::stats::RunStats;

// Aggregate field names, per record kind.
const LEAD_COUNT_FIELD: &str = "Count_of_Activities__c";
const LEAD_DATE_FIELD: &str = "Last_Activity_Date__c";
const ACCOUNT_COUNT_FIELD: &str = "Count_of_Activities_V__c";
const ACCOUNT_DATE_FIELD: &str = "Last_Activity_Date_V__c";

/// Write seam for applying an activity aggregate to one record.
#[async_trait]
pub trait ActivityWriter: Send + Sync {
    async fn write_summary(
        &self,
        record: &RecordRef,
        summary: &ActivitySummary,
    ) -> anyhow::Result<()>;
}

/// The field payload for one record update.
pub fn summary_fields(kind: RecordKind, summary: &ActivitySummary) -> serde_json::Value {
    let (count_field, date_field) = match kind {
        RecordKind::Lead => (LEAD_COUNT_FIELD, LEAD_DATE_FIELD),
        RecordKind::Account => (ACCOUNT_COUNT_FIELD, ACCOUNT_DATE_FIELD),
    };
    json!({
        count_field: summary.count,
        date_field: summary.latest.api_format(),
    })
}

#[async_trait]
impl ActivityWriter for CrmClient {
    async fn write_summary(
        &self,
        record: &RecordRef,
        summary: &ActivitySummary,
    ) -> anyhow::Result<()> {
        let fields = summary_fields(record.kind, summary);
        self.update_record(record.kind, &record.id, &fields).await?;
        Ok(())
    }
}

/// Consumes record outcomes, writes the aggregates back, and classifies every
/// record as updated, skipped, or failed.
pub struct SyncCoordinator<'a> {
    writer: &'a dyn ActivityWriter,
}

impl<'a> SyncCoordinator<'a> {
    pub fn new(writer: &'a dyn ActivityWriter) -> Self {
        Self { writer }
    }

    /// `Activity` → CRM write (`updated`, or `failed` when the write is
    /// rejected); `Empty` → `skipped` (an empty timeline is expected, not an
    /// error); `Failed` → `failed` with the scan error logged.
    ///
    /// Outcomes are read-only; re-applying the same set against unchanged CRM
    /// state yields the same stats.
    pub async fn apply(&self, outcomes: &[RecordOutcome]) -> RunStats {
        let mut stats = RunStats::default();

        for RecordOutcome { record, outcome } in outcomes {
            match outcome {
                ScanOutcome::Activity(summary) => {
                    match self.writer.write_summary(record, summary).await {
                        Ok(()) => {
                            info!(
                                record_id = record.id.as_str(),
                                kind = %record.kind,
                                count = summary.count,
                                latest = %summary.latest,
                                "Record updated"
                            );
                            stats.counts_mut(record.kind).updated += 1;
                        }
                        Err(e) => {
                            warn!(
                                record_id = record.id.as_str(),
                                kind = %record.kind,
                                error = %e,
                                "CRM write rejected"
                            );
                            stats.counts_mut(record.kind).failed += 1;
                            stats.failures.push(FailureLogEntry {
                                kind: record.kind,
                                record_id: record.id.clone(),
                                reason: format!("write failed: {e}"),
                            });
                        }
                    }
                }
                ScanOutcome::Empty => {
                    stats.counts_mut(record.kind).skipped += 1;
                }
                ScanOutcome::Failed(reason) => {
                    stats.counts_mut(record.kind).failed += 1;
                    stats.failures.push(FailureLogEntry {
                        kind: record.kind,
                        record_id: record.id.clone(),
                        reason: reason.clone(),
                    });
                }
            }
        }

        stats
    }
}
