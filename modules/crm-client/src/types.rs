use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- Wire types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub security_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub records: Vec<QueryRecord>,
    #[serde(default)]
    pub done: bool,
    #[serde(rename = "nextRecordsUrl")]
    pub next_records_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRecord {
    #[serde(rename = "Id")]
    pub id: String,
}

// --- Query criteria ---

/// Selection criteria for lead records: source match, creation-date window,
/// optional sub-source exclusion, hard row limit.
#[derive(Debug, Clone)]
pub struct LeadCriteria {
    pub source: String,
    pub window_days: i64,
    pub exclude_sub_source: Option<String>,
    pub limit: u32,
}

/// Build the lead selection query. `window_start` is the inclusive lower bound
/// of the creation-date window (callers derive it from the reference date so
/// the builder stays deterministic).
pub fn leads_query(criteria: &LeadCriteria, window_start: NaiveDate) -> String {
    let mut query = format!(
        "SELECT Id FROM Lead WHERE LeadSource = '{}' AND CreatedDate >= {}T00:00:00Z",
        escape_literal(&criteria.source),
        window_start.format("%Y-%m-%d"),
    );
    if let Some(ref sub) = criteria.exclude_sub_source {
        query.push_str(&format!(" AND Sub_Source__c != '{}'", escape_literal(sub)));
    }
    query.push_str(&format!(" LIMIT {}", criteria.limit));
    query
}

/// Build the account selection query: membership of the owner name in a set.
pub fn accounts_query(owners: &[String]) -> String {
    let list = owners
        .iter()
        .map(|o| format!("'{}'", escape_literal(o)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT Id FROM Account WHERE Owner.Name IN ({list})")
}

/// Escape a string literal for inclusion in a query: backslashes and quotes.
fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 14).unwrap()
    }

    #[test]
    fn leads_query_without_exclusion() {
        let q = leads_query(
            &LeadCriteria {
                source: "Marketing Inbound".to_string(),
                window_days: 30,
                exclude_sub_source: None,
                limit: 400,
            },
            start(),
        );
        assert_eq!(
            q,
            "SELECT Id FROM Lead WHERE LeadSource = 'Marketing Inbound' \
             AND CreatedDate >= 2024-02-14T00:00:00Z LIMIT 400"
        );
    }

    #[test]
    fn leads_query_with_exclusion() {
        let q = leads_query(
            &LeadCriteria {
                source: "Marketing Inbound".to_string(),
                window_days: 30,
                exclude_sub_source: Some("App Install".to_string()),
                limit: 400,
            },
            start(),
        );
        assert!(q.contains("Sub_Source__c != 'App Install'"));
        assert!(q.ends_with("LIMIT 400"));
    }

    #[test]
    fn accounts_query_lists_owners() {
        let q = accounts_query(&["Ana Ruiz".to_string(), "Sam O'Neil".to_string()]);
        assert_eq!(
            q,
            "SELECT Id FROM Account WHERE Owner.Name IN ('Ana Ruiz', 'Sam O\\'Neil')"
        );
    }

    #[test]
    fn literal_escaping() {
        assert_eq!(escape_literal("a'b\\c"), "a\\'b\\\\c");
    }
}
