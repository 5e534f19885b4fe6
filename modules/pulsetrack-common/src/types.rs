use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- Record identity ---

/// The two CRM record kinds this system scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Lead,
    Account,
}

impl RecordKind {
    /// Object name used in the CRM's REST paths and detail-view URLs.
    pub fn api_name(&self) -> &'static str {
        match self {
            RecordKind::Lead => "Lead",
            RecordKind::Account => "Account",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_name())
    }
}

/// One CRM record to scan. Supplied by the query collaborator, immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: String,
    pub kind: RecordKind,
}

impl RecordRef {
    pub fn new(id: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

// --- Dates ---

/// A normalized activity date: calendar date only, no time component.
///
/// The canonical textual form (`Display`) is `DD-Mon-YYYY`, e.g. `05-Jan-2024`.
/// Equality and ordering follow the date value, so a set of `ActivityDate`
/// deduplicates repeated renderings of the same date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivityDate(pub NaiveDate);

impl ActivityDate {
    /// The CRM's expected date-field encoding (`YYYY-MM-DD`).
    pub fn api_format(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for ActivityDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%d-%b-%Y"))
    }
}

impl From<NaiveDate> for ActivityDate {
    fn from(d: NaiveDate) -> Self {
        Self(d)
    }
}

// --- Scan outcomes ---

/// Aggregate over a record's deduplicated activity dates.
///
/// `count` is at least 1 by construction: an empty date set is represented as
/// the *absence* of a summary (`ScanOutcome::Empty`), never as a zero count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivitySummary {
    pub count: u32,
    pub latest: ActivityDate,
}

/// What one record's scan produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Scan completed with at least one qualifying activity date.
    Activity(ActivitySummary),
    /// Scan completed but nothing survived filtering and normalization.
    Empty,
    /// Scan failed; carries the triggering error's message.
    Failed(String),
}

/// One record's scan result, produced by the record processor and consumed
/// exactly once by the sync coordinator.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub record: RecordRef,
    pub outcome: ScanOutcome,
}

// --- Failure log ---

/// One row of the run's failure log (attached to the completion report as CSV).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureLogEntry {
    pub kind: RecordKind,
    pub record_id: String,
    pub reason: String,
}
