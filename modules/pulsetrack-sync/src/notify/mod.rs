//! Run reporting: one start message and one completion message per run,
//! threaded as a single conversation, with the failure log attached as CSV
//! when anything failed.

mod backend;
mod email;
mod noop;
mod report;

pub use backend::{ReportBackend, RunReport};
pub use email::EmailReporter;
pub use noop::NoopReporter;
pub use report::{
    completion_report, failure_csv, run_subject, setup_failure_report, start_report,
};
