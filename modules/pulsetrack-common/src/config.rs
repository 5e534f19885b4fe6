use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
///
/// Loaded once at startup and passed into components at construction; nothing
/// reads the environment after this.
#[derive(Debug, Clone)]
pub struct Config {
    // CRM
    pub crm_base_url: String,
    pub crm_username: String,
    pub crm_password: String,
    pub crm_security_token: String,

    // Record selection
    pub lead_source: String,
    pub lead_window_days: i64,
    pub lead_limit: u32,
    pub lead_sub_source_exclude: Option<String>,
    pub account_owners: Vec<String>,

    // Scan pool
    pub worker_count: usize,
    pub chrome_bin: Option<String>,

    // Email reporting (all-or-nothing; reporting is skipped when absent)
    pub smtp_host: String,
    pub report_sender: Option<String>,
    pub report_password: Option<String>,
    pub report_recipient: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            crm_base_url: required_env("CRM_BASE_URL"),
            crm_username: required_env("CRM_USERNAME"),
            crm_password: required_env("CRM_PASSWORD"),
            crm_security_token: required_env("CRM_SECURITY_TOKEN"),
            lead_source: env::var("LEAD_SOURCE").unwrap_or_else(|_| "Marketing Inbound".to_string()),
            lead_window_days: env::var("LEAD_WINDOW_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("LEAD_WINDOW_DAYS must be a number"),
            lead_limit: env::var("LEAD_LIMIT")
                .unwrap_or_else(|_| "400".to_string())
                .parse()
                .expect("LEAD_LIMIT must be a number"),
            lead_sub_source_exclude: env::var("LEAD_SUB_SOURCE_EXCLUDE").ok(),
            account_owners: env::var("ACCOUNT_OWNERS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            worker_count: env::var("WORKER_COUNT")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .expect("WORKER_COUNT must be a number"),
            chrome_bin: env::var("CHROME_BIN").ok(),
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            report_sender: env::var("REPORT_SENDER").ok(),
            report_password: env::var("REPORT_PASSWORD").ok(),
            report_recipient: env::var("REPORT_RECIPIENT").ok(),
        }
    }

    /// Log the non-secret parts of the configuration.
    pub fn log_redacted(&self) {
        info!(
            crm_base_url = self.crm_base_url.as_str(),
            crm_username = self.crm_username.as_str(),
            lead_source = self.lead_source.as_str(),
            lead_window_days = self.lead_window_days,
            lead_limit = self.lead_limit,
            account_owners = self.account_owners.len(),
            worker_count = self.worker_count,
            reporting = self.reporting_configured(),
            "Configuration loaded"
        );
    }

    /// True when all three email settings are present.
    pub fn reporting_configured(&self) -> bool {
        self.report_sender.is_some()
            && self.report_password.is_some()
            && self.report_recipient.is_some()
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
