//! Report content builders: HTML bodies and the CSV failure log.

use chrono::{DateTime, Local, NaiveDate};
use tracing::warn;

use pulsetrack_common::FailureLogEntry;

use super::backend::RunReport;
use crate::stats::RunStats;

/// Subject shared by both legs of the run thread.
pub fn run_subject(today: NaiveDate) -> String {
    format!("CRM Activity Sync [{}]", today.format("%d-%b-%Y"))
}

/// First leg of the thread: what is about to be processed, and how.
pub fn start_report(
    subject: &str,
    lead_count: usize,
    account_count: usize,
    sessions: usize,
) -> RunReport {
    let total = lead_count + account_count;
    let per_session = if sessions > 0 { total.div_ceil(sessions) } else { 0 };
    let rows = vec![
        ("Leads queued", lead_count.to_string()),
        ("Accounts queued", account_count.to_string()),
        ("Browser sessions", sessions.to_string()),
        ("Records per session", per_session.to_string()),
    ];
    RunReport {
        subject: subject.to_string(),
        html_body: html_body(
            "Activity Sync Started",
            &rows,
            "Dispatching records across parallel browser sessions...",
            Local::now(),
        ),
        parent_id: None,
        csv: None,
    }
}

/// Second leg, threaded under the first: per-kind classification counts,
/// with the failure log attached when anything failed.
pub fn completion_report(subject: &str, parent_id: Option<String>, stats: &RunStats) -> RunReport {
    let rows = vec![
        ("Records processed", stats.total_processed().to_string()),
        ("Leads updated", stats.leads.updated.to_string()),
        ("Leads skipped (no activity)", stats.leads.skipped.to_string()),
        ("Leads failed", stats.leads.failed.to_string()),
        ("Accounts updated", stats.accounts.updated.to_string()),
        ("Accounts skipped (no activity)", stats.accounts.skipped.to_string()),
        ("Accounts failed", stats.accounts.failed.to_string()),
    ];
    let footer = if stats.failures.is_empty() {
        "All records processed cleanly."
    } else {
        "Per-record failure details are attached as CSV."
    };

    let csv = if stats.failures.is_empty() {
        None
    } else {
        match failure_csv(&stats.failures) {
            Ok(csv) => Some(csv),
            Err(e) => {
                warn!(error = %e, "Failed to render failure log CSV");
                None
            }
        }
    };

    RunReport {
        subject: subject.to_string(),
        html_body: html_body("Activity Sync Complete", &rows, footer, Local::now()),
        parent_id,
        csv,
    }
}

/// Best-effort notification when the run dies before dispatch.
pub fn setup_failure_report(reason: &str) -> RunReport {
    let rows = vec![("Error", reason.to_string())];
    RunReport {
        subject: "CRM Activity Sync Failed".to_string(),
        html_body: html_body(
            "Activity Sync Failed",
            &rows,
            "The run aborted before any record was processed.",
            Local::now(),
        ),
        parent_id: None,
        csv: None,
    }
}

/// Failure log as CSV: record kind, record id, error reason.
pub fn failure_csv(failures: &[FailureLogEntry]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Record Kind", "Record Id", "Reason"])?;
    for failure in failures {
        writer.write_record([
            failure.kind.api_name(),
            failure.record_id.as_str(),
            failure.reason.as_str(),
        ])?;
    }
    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

fn html_body(
    title: &str,
    rows: &[(&str, String)],
    footer: &str,
    timestamp: DateTime<Local>,
) -> String {
    let rows_html: String = rows
        .iter()
        .map(|(label, value)| {
            format!(
                "<tr>\
                 <td style=\"padding:12px;border-bottom:1px solid #e0e0e0;font-weight:bold;width:50%;\">{label}</td>\
                 <td style=\"padding:12px;border-bottom:1px solid #e0e0e0;\">{value}</td>\
                 </tr>"
            )
        })
        .collect();

    format!(
        "<html><body style=\"font-family:'Segoe UI',Arial,sans-serif;color:#333;background-color:#f9f9f9;padding:20px;\">\
         <div style=\"max-width:600px;margin:auto;background:#fff;padding:30px;border-radius:8px;\">\
         <h2 style=\"color:#2c3e50;margin-top:0;border-bottom:2px solid #3498db;padding-bottom:10px;\">{title}</h2>\
         <p style=\"font-size:14px;color:#7f8c8d;margin-bottom:20px;\">{}</p>\
         <table style=\"width:100%;border-collapse:collapse;\">{rows_html}</table>\
         <p style=\"margin-top:25px;font-style:italic;color:#7f8c8d;font-size:13px;\">{footer}</p>\
         </div></body></html>",
        timestamp.format("%d-%b-%Y %I:%M %p"),
    )
}
