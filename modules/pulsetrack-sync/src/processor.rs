use tracing::{debug, warn};

use pulsetrack_common::{RecordOutcome, RecordRef, ScanOutcome};

use crate::cutoff;
use crate::dates::DateNormalizer;
use crate::scanner::{PageDriver, ScanError, ScanTiming, TimelineScanner};
use crate::summary;

/// Runs scan → filter → normalize → summarize for one record.
///
/// Every error at any stage becomes a `Failed` outcome carrying the error's
/// message; nothing escalates past here. There is no per-record retry.
pub struct RecordProcessor {
    view_url_base: String,
    normalizer: DateNormalizer,
    timing: ScanTiming,
}

impl RecordProcessor {
    pub fn new(view_url_base: &str, normalizer: DateNormalizer, timing: ScanTiming) -> Self {
        Self {
            view_url_base: view_url_base.trim_end_matches('/').to_string(),
            normalizer,
            timing,
        }
    }

    /// Detail-view URL the scanner renders for one record.
    pub fn record_url(&self, record: &RecordRef) -> String {
        format!(
            "{}/lightning/r/{}/{}/view",
            self.view_url_base,
            record.kind.api_name(),
            record.id
        )
    }

    pub async fn process(&self, page: &dyn PageDriver, record: &RecordRef) -> RecordOutcome {
        let outcome = match self.scan_record(page, record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    record_id = record.id.as_str(),
                    kind = %record.kind,
                    error = %e,
                    "Record scan failed"
                );
                ScanOutcome::Failed(e.to_string())
            }
        };
        RecordOutcome {
            record: record.clone(),
            outcome,
        }
    }

    async fn scan_record(
        &self,
        page: &dyn PageDriver,
        record: &RecordRef,
    ) -> Result<ScanOutcome, ScanError> {
        let scanner = TimelineScanner::new(page, &self.timing);
        let capture = scanner.scan(&self.record_url(record)).await?;

        let raw_count = capture.entries.len();
        let cutoff = cutoff::cutoff_position(&capture.section_marks);
        let past = cutoff::retain_past(capture.entries, cutoff);
        let dates = past.iter().filter_map(|e| self.normalizer.normalize(&e.text));

        match summary::summarize(dates) {
            Some(summary) => {
                debug!(
                    record_id = record.id.as_str(),
                    raw_count,
                    count = summary.count,
                    latest = %summary.latest,
                    "Activity extracted"
                );
                Ok(ScanOutcome::Activity(summary))
            }
            None => {
                debug!(
                    record_id = record.id.as_str(),
                    raw_count, "No qualifying activity"
                );
                Ok(ScanOutcome::Empty)
            }
        }
    }
}
