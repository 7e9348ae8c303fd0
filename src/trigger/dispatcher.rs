// ABOUTME: Single-flight dispatch of runs for one workload.
// ABOUTME: Triggers during a run are queued; only the newest queued revision survives.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::pipeline::{RunOutcome, RunReport};
use crate::types::Revision;

/// Something that runs a revision to completion.
#[async_trait]
pub trait Deployer: Send + Sync + 'static {
    async fn deploy(&self, revision: Revision) -> RunReport;
}

/// What happened to a dispatched revision.
#[derive(Debug)]
pub enum DispatchStatus {
    /// A run started; the handle finishes when the queue drains.
    Started(JoinHandle<()>),
    /// Another run is in flight; this revision runs after it unless a
    /// newer one arrives first.
    Queued,
}

/// Outcome of the most recent finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub revision: String,
    /// `None` when the run task panicked.
    pub outcome: Option<RunOutcome>,
    pub message: String,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn from_report(report: &RunReport) -> Self {
        Self {
            revision: report.revision.clone(),
            outcome: Some(report.outcome),
            message: report.summary(),
            finished_at: report.finished_at,
        }
    }

    fn panicked(revision: &Revision) -> Self {
        Self {
            revision: revision.as_str().to_string(),
            outcome: None,
            message: "run task panicked".to_string(),
            finished_at: Utc::now(),
        }
    }
}

/// Snapshot for `GET /status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatcherStatus {
    pub in_flight: Option<String>,
    pub queued: Option<String>,
    pub last_run: Option<RunSummary>,
}

#[derive(Default)]
struct Slots {
    in_flight: Option<Revision>,
    queued: Option<Revision>,
    last_run: Option<RunSummary>,
}

struct Inner {
    deployer: Arc<dyn Deployer>,
    slots: Mutex<Slots>,
    busy: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(deployer: Arc<dyn Deployer>) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                deployer,
                slots: Mutex::new(Slots::default()),
                busy,
            }),
        }
    }

    /// Start `revision` now, or queue it behind the run in flight.
    pub fn dispatch(&self, revision: Revision) -> DispatchStatus {
        {
            let mut slots = self.inner.slots.lock();
            if let Some(ref running) = slots.in_flight {
                tracing::info!(
                    revision = revision.short(),
                    in_flight = running.short(),
                    "run in flight, queueing"
                );
                if let Some(superseded) = slots.queued.replace(revision) {
                    tracing::info!(revision = superseded.short(), "queued revision superseded");
                }
                return DispatchStatus::Queued;
            }
            slots.in_flight = Some(revision.clone());
            self.inner.busy.send_replace(true);
        }

        let this = self.clone();
        DispatchStatus::Started(tokio::spawn(async move { this.drive(revision).await }))
    }

    /// Run revisions until the queue is empty.
    async fn drive(self, first: Revision) {
        let mut next = Some(first);
        while let Some(revision) = next {
            tracing::info!(revision = revision.short(), "run started");
            let run = self.inner.deployer.deploy(revision.clone());
            let summary = match AssertUnwindSafe(run).catch_unwind().await {
                Ok(report) => {
                    tracing::info!(
                        revision = revision.short(),
                        outcome = %report.outcome,
                        summary = %report.summary(),
                        "run finished"
                    );
                    RunSummary::from_report(&report)
                }
                Err(_) => {
                    tracing::error!(revision = revision.short(), "run task panicked");
                    RunSummary::panicked(&revision)
                }
            };

            next = {
                let mut slots = self.inner.slots.lock();
                slots.last_run = Some(summary);
                let queued = slots.queued.take();
                slots.in_flight = queued.clone();
                if queued.is_none() {
                    self.inner.busy.send_replace(false);
                }
                queued
            };
        }
    }

    pub fn status(&self) -> DispatcherStatus {
        let slots = self.inner.slots.lock();
        DispatcherStatus {
            in_flight: slots.in_flight.as_ref().map(|r| r.as_str().to_string()),
            queued: slots.queued.as_ref().map(|r| r.as_str().to_string()),
            last_run: slots.last_run.clone(),
        }
    }

    /// Wait until no run is in flight or queued.
    pub async fn wait_idle(&self) {
        let mut busy = self.inner.busy.subscribe();
        let _ = busy.wait_for(|busy| !*busy).await;
    }
}
