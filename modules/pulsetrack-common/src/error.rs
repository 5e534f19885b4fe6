use thiserror::Error;

/// Failures that abort the whole run before any record is processed.
///
/// Everything else in the system is isolated per record; only these reach the
/// process boundary (best-effort failure notification, then exit 1).
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("CRM authentication failed: {0}")]
    Auth(String),

    #[error("record query failed: {0}")]
    Query(String),

    #[error("browser session launch failed: {0}")]
    BrowserLaunch(String),
}
