use anyhow::Result;
use chrono::Local;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crm_client::{CrmClient, LeadCriteria};
use pulsetrack_common::{Config, SetupError};
use pulsetrack_sync::browser::ChromeSessionFactory;
use pulsetrack_sync::dates::DateNormalizer;
use pulsetrack_sync::notify::{self, EmailReporter, NoopReporter, ReportBackend};
use pulsetrack_sync::pool::SessionOrchestrator;
use pulsetrack_sync::processor::RecordProcessor;
use pulsetrack_sync::scanner::ScanTiming;
use pulsetrack_sync::sync::SyncCoordinator;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Pulsetrack sync starting...");

    let config = Config::from_env();
    config.log_redacted();

    let reporter = build_reporter(&config);

    if let Err(e) = run(&config, reporter.as_ref()).await {
        error!(error = %e, "Run aborted during setup");
        let report = notify::setup_failure_report(&e.to_string());
        if let Err(send_err) = reporter.send(&report).await {
            error!(error = %send_err, "Failed to send failure notification");
        }
        std::process::exit(1);
    }

    Ok(())
}

/// One full run. Only setup failures escape; everything past dispatch is
/// isolated per record.
async fn run(config: &Config, reporter: &dyn ReportBackend) -> Result<(), SetupError> {
    // CRM login
    let crm = CrmClient::login(
        &config.crm_base_url,
        &config.crm_username,
        &config.crm_password,
        &config.crm_security_token,
    )
    .await
    .map_err(|e| SetupError::Auth(e.to_string()))?;

    // Record selection
    let criteria = LeadCriteria {
        source: config.lead_source.clone(),
        window_days: config.lead_window_days,
        exclude_sub_source: config.lead_sub_source_exclude.clone(),
        limit: config.lead_limit,
    };
    let leads = crm
        .query_leads(&criteria)
        .await
        .map_err(|e| SetupError::Query(e.to_string()))?;
    let accounts = crm
        .query_accounts(&config.account_owners)
        .await
        .map_err(|e| SetupError::Query(e.to_string()))?;

    let lead_count = leads.len();
    let account_count = accounts.len();
    let mut records = leads;
    records.extend(accounts);
    info!(
        leads = lead_count,
        accounts = account_count,
        "Records queued for scan"
    );

    // Start report (its id threads the completion report)
    let sessions = config.worker_count.clamp(1, records.len().max(1));
    let subject = notify::run_subject(Local::now().date_naive());
    let start = notify::start_report(&subject, lead_count, account_count, sessions);
    let parent_id = match reporter.send(&start).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Failed to send start report");
            None
        }
    };

    // Scan
    let factory = ChromeSessionFactory::new(crm.frontdoor_url(), config.chrome_bin.clone());
    let processor = RecordProcessor::new(
        &config.crm_base_url,
        DateNormalizer::for_today(),
        ScanTiming::default(),
    );
    let orchestrator = SessionOrchestrator::new(&factory, config.worker_count);
    let outcomes = orchestrator.run(&records, &processor).await?;

    // Sync
    let coordinator = SyncCoordinator::new(&crm);
    let stats = coordinator.apply(&outcomes).await;
    info!("{stats}");

    // Completion report — always attempted, never fatal
    let completion = notify::completion_report(&subject, parent_id, &stats);
    if let Err(e) = reporter.send(&completion).await {
        warn!(error = %e, "Failed to send completion report");
    }

    Ok(())
}

fn build_reporter(config: &Config) -> Box<dyn ReportBackend> {
    match (
        &config.report_sender,
        &config.report_password,
        &config.report_recipient,
    ) {
        (Some(sender), Some(password), Some(recipient)) => {
            match EmailReporter::new(&config.smtp_host, sender, password, recipient) {
                Ok(reporter) => Box::new(reporter),
                Err(e) => {
                    warn!(error = %e, "Email reporter unavailable, reports disabled");
                    Box::new(NoopReporter)
                }
            }
        }
        _ => {
            warn!("Email settings missing, reports disabled");
            Box::new(NoopReporter)
        }
    }
}
