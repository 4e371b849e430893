// src/scheduler.rs
//! The two periodic tasks that keep the banner current without user
//! action: a short non-mutating cache poll and a longer full-refresh
//! cycle. Both are cancellable together via `SchedulerHandles`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::orchestrator::{FetchOrchestrator, Trigger};

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    /// Short interval: fresh-cache re-check only, never a network call.
    pub poll_interval: Duration,
    /// Long interval: the full cycle, letting the freshness window lapse
    /// naturally trigger a provider call.
    pub refresh_interval: Duration,
}

/// Handles to both timers. Teardown must clear both; an in-flight provider
/// call is abandoned, which is safe because cache writes are overwrites.
pub struct SchedulerHandles {
    poll: JoinHandle<()>,
    refresh: JoinHandle<()>,
}

impl SchedulerHandles {
    pub fn shutdown(self) {
        self.poll.abort();
        self.refresh.abort();
    }
}

/// Spawn both periodic tasks. The refresh ticker fires immediately, which
/// doubles as the initial load on startup.
pub fn spawn(orchestrator: Arc<FetchOrchestrator>, cfg: SchedulerCfg) -> SchedulerHandles {
    let poll_orch = orchestrator.clone();
    let poll = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.poll_interval);
        // Skip the immediate first tick; the refresh task covers startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match poll_orch.poll() {
                Some(report) => tracing::trace!(
                    provenance = ?report.snapshot.provenance,
                    "cache poll tick: fresh entry present"
                ),
                None => tracing::trace!("cache poll tick: no fresh entry"),
            }
        }
    });

    let refresh = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.refresh_interval);
        let mut first = true;
        loop {
            ticker.tick().await;
            let trigger = if first { Trigger::Mount } else { Trigger::FullRefresh };
            first = false;
            let report = orchestrator.load(trigger).await;
            tracing::info!(
                target: "session_refresh",
                ?trigger,
                provenance = ?report.snapshot.provenance,
                degraded = report.degraded(),
                quota_remaining = report.quota_remaining,
                "refresh tick"
            );
        }
    });

    SchedulerHandles { poll, refresh }
}
