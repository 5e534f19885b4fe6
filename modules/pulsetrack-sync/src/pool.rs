//! Bounded pool of authenticated browser sessions.
//!
//! Records are static-partitioned into contiguous chunks, one chunk per
//! session, each chunk processed sequentially inside its worker. A pool of
//! size 1 degenerates to the single-shared-session sequential strategy
//! through the same code path.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use pulsetrack_common::{RecordOutcome, RecordRef, SetupError};

use crate::processor::RecordProcessor;
use crate::scanner::PageDriver;

/// Opens one authenticated browser session per worker.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> anyhow::Result<Box<dyn Session>>;
}

/// A live, authenticated session. Shut down on every exit path.
#[async_trait]
pub trait Session: PageDriver {
    async fn shutdown(self: Box<Self>) -> anyhow::Result<()>;
}

/// Maps record refs onto the session pool with bounded concurrency and
/// per-record failure isolation.
pub struct SessionOrchestrator<'a> {
    factory: &'a dyn SessionFactory,
    worker_count: usize,
}

impl<'a> SessionOrchestrator<'a> {
    pub fn new(factory: &'a dyn SessionFactory, worker_count: usize) -> Self {
        Self {
            factory,
            worker_count,
        }
    }

    /// Process every record, at most one chunk per session in flight.
    ///
    /// All sessions are opened (and front-door authenticated) before any
    /// record is dispatched; a launch failure at that stage aborts the run as
    /// a setup failure with the already-opened sessions closed. After
    /// dispatch, one record's failure never affects its siblings — the
    /// processor downgrades everything to a `Failed` outcome. Exactly one
    /// outcome comes back per submitted record, in no guaranteed order.
    pub async fn run(
        &self,
        records: &[RecordRef],
        processor: &RecordProcessor,
    ) -> Result<Vec<RecordOutcome>, SetupError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.worker_count.clamp(1, records.len());
        let chunk_size = records.len().div_ceil(workers);
        let chunks: Vec<&[RecordRef]> = records.chunks(chunk_size).collect();

        let mut sessions = Vec::with_capacity(chunks.len());
        for slot in 0..chunks.len() {
            match self.factory.open().await {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    error!(slot, error = %e, "Failed to open browser session");
                    for opened in sessions {
                        if let Err(close_err) = opened.shutdown().await {
                            warn!(error = %close_err, "Failed to close session during abort");
                        }
                    }
                    return Err(SetupError::BrowserLaunch(e.to_string()));
                }
            }
        }
        info!(
            sessions = sessions.len(),
            records = records.len(),
            chunk_size,
            "Browser sessions ready"
        );

        let workers = sessions
            .into_iter()
            .zip(chunks)
            .enumerate()
            .map(|(worker, (session, chunk))| async move {
                let mut outcomes = Vec::with_capacity(chunk.len());
                for record in chunk {
                    outcomes.push(processor.process(session.as_ref(), record).await);
                }
                if let Err(e) = session.shutdown().await {
                    warn!(worker, error = %e, "Failed to shut down browser session");
                }
                info!(worker, processed = outcomes.len(), "Worker chunk complete");
                outcomes
            });

        let results: Vec<Vec<RecordOutcome>> = stream::iter(workers)
            .buffer_unordered(self.worker_count.max(1))
            .collect()
            .await;

        Ok(results.into_iter().flatten().collect())
    }
}
