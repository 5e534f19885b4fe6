use async_trait::async_trait;

/// One notification message. `parent_id` threads this message under an
/// earlier one; `csv` attaches a failure log.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub subject: String,
    pub html_body: String,
    pub parent_id: Option<String>,
    pub csv: Option<String>,
}

/// Pluggable delivery backend for run reports.
#[async_trait]
pub trait ReportBackend: Send + Sync {
    /// Deliver a report. Returns the message id for threading when the
    /// backend supports it.
    async fn send(&self, report: &RunReport) -> anyhow::Result<Option<String>>;
}
