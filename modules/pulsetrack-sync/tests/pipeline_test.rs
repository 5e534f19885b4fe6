//! Pipeline integration tests: scanner, pool, processor, and coordinator
//! wired together over in-memory fakes. No browser, no network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use pulsetrack_common::{
    ActivitySummary, RecordKind, RecordOutcome, RecordRef, ScanOutcome, SetupError,
};
use pulsetrack_sync::dates::DateNormalizer;
use pulsetrack_sync::dom::DomNode;
use pulsetrack_sync::pool::{Session, SessionFactory, SessionOrchestrator};
use pulsetrack_sync::processor::RecordProcessor;
use pulsetrack_sync::scanner::{PageDriver, ScanError, ScanTiming};
use pulsetrack_sync::sync::{ActivityWriter, SyncCoordinator};

const VIEW_BASE: &str = "https://crm.test";

fn fast_timing() -> ScanTiming {
    ScanTiming {
        indicator_timeout: Duration::from_millis(50),
        poll_interval: Duration::from_millis(5),
        expansion_passes: 3,
        expansion_settle: Duration::from_millis(5),
        scroll_settle: Duration::from_millis(5),
    }
}

fn processor() -> RecordProcessor {
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    RecordProcessor::new(VIEW_BASE, DateNormalizer::new(today), fast_timing())
}

// =========================================================================
// DOM fixtures
// =========================================================================

fn dated(class: &str, text: &str, y: f64) -> DomNode {
    DomNode {
        tag: "span".to_string(),
        text: text.to_string(),
        classes: vec![class.to_string()],
        y,
        visible: true,
        ..Default::default()
    }
}

/// A rendered timeline: an optional section marker plus dated entries.
fn timeline(marker_y: Option<f64>, entries: &[(&str, f64)]) -> DomNode {
    let mut children = Vec::new();
    if let Some(y) = marker_y {
        children.push(dated("slds-timeline__date", "March 2024", y));
    }
    for (text, y) in entries {
        children.push(dated("dueDate", text, *y));
    }
    DomNode {
        tag: "body".to_string(),
        visible: true,
        children,
        ..Default::default()
    }
}

// =========================================================================
// In-memory sessions
// =========================================================================

struct FakeWorld {
    /// record id → final snapshot for that record's page
    pages: HashMap<String, DomNode>,
    /// record ids whose navigation fails
    broken: Vec<String>,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
}

impl FakeWorld {
    fn new(pages: HashMap<String, DomNode>, broken: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            pages,
            broken,
            sessions_opened: AtomicUsize::new(0),
            sessions_closed: AtomicUsize::new(0),
        })
    }
}

struct FakeSession {
    world: Arc<FakeWorld>,
    current: Mutex<Option<String>>,
}

#[async_trait]
impl PageDriver for FakeSession {
    async fn navigate(&self, url: &str) -> Result<(), ScanError> {
        if self.world.broken.iter().any(|id| url.contains(id.as_str())) {
            return Err(ScanError::Navigation(format!("net::ERR_TIMED_OUT at {url}")));
        }
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn eval_bool(&self, _script: &str) -> Result<bool, ScanError> {
        Ok(true)
    }

    async fn snapshot(&self) -> Result<DomNode, ScanError> {
        let current = self.current.lock().unwrap().clone().unwrap_or_default();
        Ok(self
            .world
            .pages
            .iter()
            .find(|(id, _)| current.contains(id.as_str()))
            .map(|(_, dom)| dom.clone())
            .unwrap_or_default())
    }

    async fn press(&self, _path: &[usize]) -> Result<bool, ScanError> {
        Ok(true)
    }

    async fn scroll_to_end(&self) -> Result<(), ScanError> {
        Ok(())
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn shutdown(self: Box<Self>) -> anyhow::Result<()> {
        self.world.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeFactory {
    world: Arc<FakeWorld>,
    /// Fail every open() after this many successes.
    fail_after: Option<usize>,
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open(&self) -> anyhow::Result<Box<dyn Session>> {
        let opened = self.world.sessions_opened.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if opened >= limit {
                anyhow::bail!("browser failed to start: Cannot fork");
            }
        }
        Ok(Box::new(FakeSession {
            world: self.world.clone(),
            current: Mutex::new(None),
        }))
    }
}

// =========================================================================
// Recording CRM writer
// =========================================================================

#[derive(Default)]
struct FakeWriter {
    written: Mutex<Vec<(String, u32, String)>>,
    reject: Vec<String>,
}

#[async_trait]
impl ActivityWriter for FakeWriter {
    async fn write_summary(
        &self,
        record: &RecordRef,
        summary: &ActivitySummary,
    ) -> anyhow::Result<()> {
        if self.reject.contains(&record.id) {
            anyhow::bail!("API error (status 400): FIELD_INTEGRITY_EXCEPTION");
        }
        self.written.lock().unwrap().push((
            record.id.clone(),
            summary.count,
            summary.latest.api_format(),
        ));
        Ok(())
    }
}

fn find<'a>(outcomes: &'a [RecordOutcome], id: &str) -> &'a RecordOutcome {
    outcomes
        .iter()
        .find(|o| o.record.id == id)
        .unwrap_or_else(|| panic!("no outcome for {id}"))
}

// =========================================================================
// Scenarios
// =========================================================================

#[tokio::test]
async fn end_to_end_activity_empty_and_failure() {
    // A: two distinct past dates (one rendered twice), upcoming noise above
    // the cutoff, an overdue entry. B: nothing at all. C: navigation error.
    let pages = HashMap::from([
        (
            "L-A".to_string(),
            timeline(
                Some(100.0),
                &[
                    ("Tomorrow", 40.0),
                    ("2 Overdue", 180.0),
                    ("05-Jan-2024", 150.0),
                    ("10-Feb-2024", 200.0),
                    ("10-Feb-2024", 260.0),
                ],
            ),
        ),
        ("L-B".to_string(), timeline(None, &[])),
    ]);
    let world = FakeWorld::new(pages, vec!["A-C".to_string()]);
    let factory = FakeFactory {
        world: world.clone(),
        fail_after: None,
    };

    let records = vec![
        RecordRef::new("L-A", RecordKind::Lead),
        RecordRef::new("L-B", RecordKind::Lead),
        RecordRef::new("A-C", RecordKind::Account),
    ];

    let orchestrator = SessionOrchestrator::new(&factory, 2);
    let outcomes = orchestrator.run(&records, &processor()).await.unwrap();
    assert_eq!(outcomes.len(), 3);

    match &find(&outcomes, "L-A").outcome {
        ScanOutcome::Activity(summary) => {
            assert_eq!(summary.count, 2);
            assert_eq!(summary.latest.to_string(), "10-Feb-2024");
        }
        other => panic!("expected activity for L-A, got {other:?}"),
    }
    assert_eq!(find(&outcomes, "L-B").outcome, ScanOutcome::Empty);
    assert!(matches!(
        find(&outcomes, "A-C").outcome,
        ScanOutcome::Failed(_)
    ));

    // Apply to the CRM and classify.
    let writer = FakeWriter::default();
    let stats = SyncCoordinator::new(&writer).apply(&outcomes).await;

    assert_eq!(stats.leads.updated, 1);
    assert_eq!(stats.leads.skipped, 1);
    assert_eq!(stats.leads.failed, 0);
    assert_eq!(stats.accounts.failed, 1);
    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].record_id, "A-C");
    assert!(stats.failures[0].reason.contains("navigation"));

    let written = writer.written.lock().unwrap();
    assert_eq!(
        *written,
        vec![("L-A".to_string(), 2, "2024-02-10".to_string())]
    );
}

#[tokio::test]
async fn one_failing_record_does_not_affect_siblings() {
    let mut pages = HashMap::new();
    for id in ["L-1", "L-2", "L-4", "L-5"] {
        pages.insert(id.to_string(), timeline(None, &[("05-Mar-2024", 120.0)]));
    }
    let world = FakeWorld::new(pages, vec!["L-3".to_string()]);
    let factory = FakeFactory {
        world: world.clone(),
        fail_after: None,
    };

    let records: Vec<RecordRef> = (1..=5)
        .map(|i| RecordRef::new(format!("L-{i}"), RecordKind::Lead))
        .collect();

    let orchestrator = SessionOrchestrator::new(&factory, 2);
    let outcomes = orchestrator.run(&records, &processor()).await.unwrap();

    let writer = FakeWriter::default();
    let stats = SyncCoordinator::new(&writer).apply(&outcomes).await;
    assert_eq!(stats.leads.updated, 4);
    assert_eq!(stats.leads.failed, 1);
    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].record_id, "L-3");
}

#[tokio::test]
async fn every_record_yields_exactly_one_outcome() {
    let mut pages = HashMap::new();
    for i in 1..=7 {
        pages.insert(format!("L-{i}"), timeline(None, &[]));
    }
    let world = FakeWorld::new(pages, Vec::new());
    let factory = FakeFactory {
        world: world.clone(),
        fail_after: None,
    };

    let records: Vec<RecordRef> = (1..=7)
        .map(|i| RecordRef::new(format!("L-{i}"), RecordKind::Lead))
        .collect();

    let orchestrator = SessionOrchestrator::new(&factory, 3);
    let outcomes = orchestrator.run(&records, &processor()).await.unwrap();

    assert_eq!(outcomes.len(), records.len());
    let mut ids: Vec<&str> = outcomes.iter().map(|o| o.record.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), records.len());
}

#[tokio::test]
async fn sessions_are_closed_on_completion() {
    let pages = HashMap::from([("L-1".to_string(), timeline(None, &[]))]);
    let world = FakeWorld::new(pages, Vec::new());
    let factory = FakeFactory {
        world: world.clone(),
        fail_after: None,
    };

    let records = vec![
        RecordRef::new("L-1", RecordKind::Lead),
        RecordRef::new("L-2", RecordKind::Lead),
        RecordRef::new("L-3", RecordKind::Lead),
    ];
    let orchestrator = SessionOrchestrator::new(&factory, 4);
    orchestrator.run(&records, &processor()).await.unwrap();

    let opened = world.sessions_opened.load(Ordering::SeqCst);
    assert!(opened > 0);
    assert_eq!(world.sessions_closed.load(Ordering::SeqCst), opened);
}

#[tokio::test]
async fn launch_failure_aborts_before_dispatch() {
    let world = FakeWorld::new(HashMap::new(), Vec::new());
    let factory = FakeFactory {
        world: world.clone(),
        fail_after: Some(1),
    };

    let records: Vec<RecordRef> = (1..=4)
        .map(|i| RecordRef::new(format!("L-{i}"), RecordKind::Lead))
        .collect();

    let orchestrator = SessionOrchestrator::new(&factory, 2);
    let err = orchestrator.run(&records, &processor()).await.unwrap_err();
    assert!(matches!(err, SetupError::BrowserLaunch(_)));

    // The session that did open was closed during the abort.
    assert_eq!(world.sessions_closed.load(Ordering::SeqCst), 1);
}

// =========================================================================
// Expansion: collapsed reply threads must be opened before collection
// =========================================================================

/// Page whose collapsed state hides one of two dates behind a reply toggle.
struct ExpandingSession {
    expanded: Arc<AtomicBool>,
}

fn collapsed_page() -> DomNode {
    let toggle = DomNode {
        tag: "button".to_string(),
        pressed: Some("false".to_string()),
        visible: true,
        children: vec![DomNode {
            tag: "span".to_string(),
            text: "3 replies".to_string(),
            visible: true,
            ..Default::default()
        }],
        ..Default::default()
    };
    DomNode {
        tag: "body".to_string(),
        visible: true,
        children: vec![toggle, dated("dueDate", "01-Mar-2024", 120.0)],
        ..Default::default()
    }
}

fn expanded_page() -> DomNode {
    let mut page = collapsed_page();
    page.children[0].pressed = Some("true".to_string());
    page.children
        .push(dated("email-message-date", "05-Mar-2024", 160.0));
    page
}

#[async_trait]
impl PageDriver for ExpandingSession {
    async fn navigate(&self, _url: &str) -> Result<(), ScanError> {
        Ok(())
    }

    async fn eval_bool(&self, _script: &str) -> Result<bool, ScanError> {
        Ok(true)
    }

    async fn snapshot(&self) -> Result<DomNode, ScanError> {
        if self.expanded.load(Ordering::SeqCst) {
            Ok(expanded_page())
        } else {
            Ok(collapsed_page())
        }
    }

    async fn press(&self, _path: &[usize]) -> Result<bool, ScanError> {
        self.expanded.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn scroll_to_end(&self) -> Result<(), ScanError> {
        Ok(())
    }
}

#[tokio::test]
async fn collapsed_replies_are_expanded_before_collection() {
    let session = ExpandingSession {
        expanded: Arc::new(AtomicBool::new(false)),
    };
    let record = RecordRef::new("L-X", RecordKind::Lead);

    let outcome = processor().process(&session, &record).await;
    match outcome.outcome {
        ScanOutcome::Activity(summary) => {
            // Both the visible date and the one revealed by expansion count.
            assert_eq!(summary.count, 2);
            assert_eq!(summary.latest.to_string(), "05-Mar-2024");
        }
        other => panic!("expected activity, got {other:?}"),
    }
}
