pub mod error;
pub mod types;

pub use error::{CrmError, Result};
pub use types::{accounts_query, leads_query, LeadCriteria};

use std::time::Duration;

use chrono::{Days, Utc};
use tracing::info;

use pulsetrack_common::{RecordKind, RecordRef};
use types::{LoginRequest, LoginResponse, QueryResponse};

/// Data API prefix under the CRM base URL.
const DATA_PATH: &str = "/services/data/v59.0";

/// Header that suppresses assignment-rule re-routing on lead writes. Without
/// it a field update can silently change record ownership.
const AUTO_ASSIGN_HEADER: &str = "Sforce-Auto-Assign";

/// Authenticated CRM REST client. Holds the short-lived session token issued
/// at login; the same token is exchanged by each browser session through the
/// front-door URL.
pub struct CrmClient {
    client: reqwest::Client,
    base_url: String,
    session_token: String,
}

impl CrmClient {
    /// Log in with username + password + security token, returning an
    /// authenticated client.
    pub async fn login(
        base_url: &str,
        username: &str,
        password: &str,
        security_token: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        let base_url = base_url.trim_end_matches('/').to_string();
        let endpoint = format!("{base_url}/services/auth/login");
        let body = LoginRequest {
            username,
            password,
            security_token,
        };

        let resp = client.post(&endpoint).json(&body).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let message = resp.text().await.unwrap_or_default();
            return Err(CrmError::Auth(message));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CrmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let login: LoginResponse = resp.json().await?;
        info!(username, "CRM login succeeded");

        Ok(Self {
            client,
            base_url,
            session_token: login.session_id,
        })
    }

    /// The short-lived session token issued at login. Read-only, shared by
    /// value with each browser worker.
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Front-door URL that exchanges the session token for a browser-side
    /// session cookie.
    pub fn frontdoor_url(&self) -> String {
        format!(
            "{}/secur/frontdoor.jsp?sid={}",
            self.base_url, self.session_token
        )
    }

    /// Query lead records matching the criteria (creation window anchored at
    /// `window_days` before today).
    pub async fn query_leads(&self, criteria: &LeadCriteria) -> Result<Vec<RecordRef>> {
        let window_start = Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(criteria.window_days.max(0) as u64))
            .unwrap_or_else(|| Utc::now().date_naive());
        let query = leads_query(criteria, window_start);
        let ids = self.query_all(&query).await?;
        info!(count = ids.len(), "Lead query complete");
        Ok(ids
            .into_iter()
            .map(|id| RecordRef::new(id, RecordKind::Lead))
            .collect())
    }

    /// Query account records whose owner name is in the given set. An empty
    /// owner set selects nothing.
    pub async fn query_accounts(&self, owners: &[String]) -> Result<Vec<RecordRef>> {
        if owners.is_empty() {
            return Ok(Vec::new());
        }
        let ids = self.query_all(&accounts_query(owners)).await?;
        info!(count = ids.len(), "Account query complete");
        Ok(ids
            .into_iter()
            .map(|id| RecordRef::new(id, RecordKind::Account))
            .collect())
    }

    /// Write fields to one record. Lead writes carry the auto-assignment
    /// suppression header.
    pub async fn update_record(
        &self,
        kind: RecordKind,
        id: &str,
        fields: &serde_json::Value,
    ) -> Result<()> {
        let endpoint = format!(
            "{}{}/sobjects/{}/{}",
            self.base_url,
            DATA_PATH,
            kind.api_name(),
            id
        );

        let mut req = self
            .client
            .patch(&endpoint)
            .bearer_auth(&self.session_token)
            .json(fields);
        if kind == RecordKind::Lead {
            req = req.header(AUTO_ASSIGN_HEADER, "FALSE");
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CrmError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Run a query and follow `nextRecordsUrl` pagination until `done`.
    async fn query_all(&self, query: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut endpoint = format!("{}{}/query", self.base_url, DATA_PATH);
        let mut params = Some([("q", query.to_string())]);

        loop {
            let mut req = self.client.get(&endpoint).bearer_auth(&self.session_token);
            if let Some(ref p) = params {
                req = req.query(p);
            }

            let resp = req.send().await?;
            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(CrmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let page: QueryResponse = resp.json().await?;
            ids.extend(page.records.into_iter().map(|r| r.id));

            match (page.done, page.next_records_url) {
                (false, Some(next)) => {
                    endpoint = format!("{}{}", self.base_url, next);
                    params = None;
                }
                _ => break,
            }
        }

        Ok(ids)
    }
}
