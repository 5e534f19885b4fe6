use async_trait::async_trait;
use tracing::info;

use super::backend::{ReportBackend, RunReport};

/// Used when no email settings are configured; the run proceeds unreported.
pub struct NoopReporter;

#[async_trait]
impl ReportBackend for NoopReporter {
    async fn send(&self, report: &RunReport) -> anyhow::Result<Option<String>> {
        info!(subject = report.subject.as_str(), "Report delivery skipped (no backend configured)");
        Ok(None)
    }
}
