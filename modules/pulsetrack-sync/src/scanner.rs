//! Timeline scanning: force a record's rendered detail view to reveal its
//! collapsed history, then collect every date-bearing element with its
//! vertical position.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::dom::{deep_find, DomNode, MAX_WALK_DEPTH};
use crate::scripts;

// --- Page markers ---

/// Date on a task or call entry.
const DUE_DATE_CLASS: &str = "dueDate";
/// Date heading of a chronological timeline section. Doubles as the cutoff
/// marker between upcoming and past entries.
const SECTION_DATE_CLASS: &str = "slds-timeline__date";
/// Date on an expanded email message.
const MESSAGE_DATE_CLASS: &str = "email-message-date";

/// Button labels that reveal collapsed timeline content.
const EXPAND_LABELS: &[&str] = &["show all", "view more", "email body"];

// --- Errors ---

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("script evaluation failed: {0}")]
    Evaluation(String),
}

// --- Page seam ---

/// Minimal surface the scanner needs from a live page. Implemented by the
/// Chromium session and by in-memory fakes in tests.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ScanError>;
    /// Evaluate a boolean predicate in the page.
    async fn eval_bool(&self, script: &str) -> Result<bool, ScanError>;
    /// Serialize the current element tree, shadow roots included.
    async fn snapshot(&self) -> Result<DomNode, ScanError>;
    /// Synthesize a press sequence on the element at `path`. `false` when the
    /// path no longer resolves in the live document.
    async fn press(&self, path: &[usize]) -> Result<bool, ScanError>;
    async fn scroll_to_end(&self) -> Result<(), ScanError>;
}

// --- Raw capture ---

/// One date-bearing element as rendered: its text and vertical position.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub text: String,
    pub y: f64,
}

/// Unfiltered scan output: every date-bearing element plus the positions of
/// the section-date markers (the cutoff filter's input).
#[derive(Debug, Default)]
pub struct ScanCapture {
    pub entries: Vec<RawEntry>,
    pub section_marks: Vec<f64>,
}

// --- Timing ---

/// Timing knobs for one record scan. All waits are bounded; none is adaptive.
#[derive(Debug, Clone)]
pub struct ScanTiming {
    /// How long to wait for the first timeline marker after navigation.
    /// Expiry is not fatal — the record may legitimately have no timeline.
    pub indicator_timeout: Duration,
    pub poll_interval: Duration,
    /// Upper bound on expansion passes. Expanding one section can reveal
    /// further collapsed sections nested inside it; this bound caps how deep
    /// that chain is chased rather than iterating to a true fixed point.
    pub expansion_passes: u32,
    /// Pause after each pass's presses, letting revealed content render.
    pub expansion_settle: Duration,
    pub scroll_settle: Duration,
}

impl Default for ScanTiming {
    fn default() -> Self {
        Self {
            indicator_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(250),
            expansion_passes: 3,
            expansion_settle: Duration::from_secs(3),
            scroll_settle: Duration::from_secs(1),
        }
    }
}

// --- Scanner ---

/// Drives one page through navigate → expand → collect for a single record.
pub struct TimelineScanner<'a> {
    page: &'a dyn PageDriver,
    timing: &'a ScanTiming,
}

impl<'a> TimelineScanner<'a> {
    pub fn new(page: &'a dyn PageDriver, timing: &'a ScanTiming) -> Self {
        Self { page, timing }
    }

    /// Scan one record's detail view. Returns the raw positioned entries;
    /// filtering is the cutoff filter's job.
    pub async fn scan(&self, url: &str) -> Result<ScanCapture, ScanError> {
        self.page.navigate(url).await?;
        self.wait_for_indicator().await?;
        self.expand_collapsed().await?;

        self.page.scroll_to_end().await?;
        tokio::time::sleep(self.timing.scroll_settle).await;

        let snapshot = self.page.snapshot().await?;
        Ok(collect_entries(&snapshot))
    }

    /// Poll for a timeline marker until it appears or the bound expires.
    async fn wait_for_indicator(&self) -> Result<(), ScanError> {
        let deadline = tokio::time::Instant::now() + self.timing.indicator_timeout;
        loop {
            if self.page.eval_bool(scripts::INDICATOR_JS).await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("No timeline indicator within timeout, continuing");
                return Ok(());
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }

    /// Run bounded expansion passes. A pass that finds nothing to press ends
    /// the phase early; presses that fail individually are logged and
    /// skipped, since the remaining targets are still worth opening.
    async fn expand_collapsed(&self) -> Result<(), ScanError> {
        for pass in 0..self.timing.expansion_passes {
            let snapshot = self.page.snapshot().await?;
            let targets = expansion_targets(&snapshot);
            if targets.is_empty() {
                debug!(pass, "Nothing left to expand");
                return Ok(());
            }

            let mut pressed = 0u32;
            for path in &targets {
                match self.page.press(path).await {
                    Ok(true) => pressed += 1,
                    Ok(false) => debug!(pass, "Press target no longer resolvable"),
                    Err(e) => warn!(pass, error = %e, "Press failed, continuing"),
                }
            }
            debug!(pass, pressed, targets = targets.len(), "Expansion pass complete");

            tokio::time::sleep(self.timing.expansion_settle).await;
        }
        Ok(())
    }
}

// --- Pure tree logic ---

/// Controls worth pressing: unexpanded reply-thread toggles plus labeled
/// reveal buttons. Paths are returned in document order, deduplicated.
pub(crate) fn expansion_targets(root: &DomNode) -> Vec<Vec<usize>> {
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut targets = Vec::new();

    // Reply-thread toggles: a button with an explicit "not pressed" state
    // whose subtree mentions replies outside any nested button. Stopping the
    // descent at nested buttons keeps the nearest enclosing control.
    for (path, node) in deep_find(root, |n| {
        n.tag == "button" && n.pressed.as_deref() == Some("false")
    }) {
        if owns_reply_text(node, 0) && seen.insert(path.clone()) {
            targets.push(path);
        }
    }

    // Labeled reveal buttons, pressed regardless of toggle state.
    for (path, node) in deep_find(root, |n| n.tag == "button" && n.visible) {
        let label = node.subtree_text().to_lowercase();
        if EXPAND_LABELS.iter().any(|l| label.contains(l)) && seen.insert(path.clone()) {
            targets.push(path);
        }
    }

    targets
}

fn owns_reply_text(node: &DomNode, depth: usize) -> bool {
    if depth > MAX_WALK_DEPTH {
        return false;
    }
    if is_reply_text(&node.text) {
        return true;
    }
    node.children
        .iter()
        .filter(|c| c.tag != "button")
        .any(|c| owns_reply_text(c, depth + 1))
}

fn is_reply_text(text: &str) -> bool {
    let t = text.to_lowercase();
    (t.contains("reply") || t.contains("replies")) && !t.contains("collapse")
}

/// Collect every date-bearing element and the section-marker positions from
/// a final snapshot.
pub(crate) fn collect_entries(root: &DomNode) -> ScanCapture {
    let mut capture = ScanCapture::default();
    for (_, node) in deep_find(root, |n| {
        n.has_class(DUE_DATE_CLASS)
            || n.has_class(SECTION_DATE_CLASS)
            || n.has_class(MESSAGE_DATE_CLASS)
    }) {
        if node.has_class(SECTION_DATE_CLASS) {
            capture.section_marks.push(node.y);
        }
        let text = node.subtree_text();
        let text = text.trim();
        if !text.is_empty() {
            capture.entries.push(RawEntry {
                text: text.to_string(),
                y: node.y,
            });
        }
    }
    capture
}
