// src/orchestrator.rs
//! The fetch decision machine: serve fresh cache, or spend quota on a
//! bounded provider call, or degrade to stale-cache-then-fallback. Every
//! path yields a renderable `FetchReport`.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::cache::{now_unix, ResultCache};
use crate::provider::SessionProvider;
use crate::quota::QuotaTracker;
use crate::session::{Diagnostic, FetchReport, Provenance, SessionInfo, SessionSnapshot};
use crate::store::StorePort;

const KEY_LAST_ERROR: &str = "last_api_error_time";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "session_fetch_total",
            "Fetch cycles that reached the provider call."
        );
        describe_counter!(
            "session_cache_hits_total",
            "Loads served from the fresh cache without a provider call."
        );
        describe_counter!(
            "session_quota_exhausted_total",
            "Cycles degraded because the daily budget was spent."
        );
        describe_counter!(
            "session_provider_errors_total",
            "Provider transport/parse/timeout errors."
        );
        describe_gauge!("session_quota_remaining", "Calls left in today's budget.");
        describe_gauge!(
            "session_last_success_ts",
            "Unix ts of the last successful provider fetch."
        );
        describe_histogram!("session_provider_ms", "Provider call time in milliseconds.");
    });
}

/// What caused a load. `Manual` skips the fresh-cache check; the others
/// are cache-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// First load after startup.
    Mount,
    /// The long periodic timer re-running the full cycle.
    FullRefresh,
    /// User-initiated refresh. Still respects the quota ceiling.
    Manual,
}

/// Owns the cache, the quota tracker, and the single-flight gate. All
/// mutation of the persisted quota/cache state goes through here.
pub struct FetchOrchestrator {
    provider: Option<Arc<dyn SessionProvider>>,
    cache: ResultCache,
    quota: QuotaTracker,
    store: Arc<dyn StorePort>,
    fallback: SessionInfo,
    request_timeout: Duration,
    in_flight: Mutex<()>,
}

impl FetchOrchestrator {
    /// `provider: None` means credentials are missing; every network-bound
    /// cycle then degrades straight to the fallback record.
    pub fn new(
        provider: Option<Arc<dyn SessionProvider>>,
        cache: ResultCache,
        quota: QuotaTracker,
        store: Arc<dyn StorePort>,
        fallback: SessionInfo,
        request_timeout: Duration,
    ) -> Self {
        ensure_metrics_described();
        Self {
            provider,
            cache,
            quota,
            store,
            fallback,
            request_timeout,
            in_flight: Mutex::new(()),
        }
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Run one load for `trigger`. At most one provider call is in flight
    /// across concurrent invocations; a trigger arriving mid-fetch is
    /// answered from the cache (any age) or the fallback, charging nothing.
    pub async fn load(&self, trigger: Trigger) -> FetchReport {
        if trigger != Trigger::Manual {
            if let Some(hit) = self.cache.read() {
                counter!("session_cache_hits_total").increment(1);
                return self.report(hit.session, hit.fetched_at, Provenance::Cached, None);
            }
        }

        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!(?trigger, "fetch already in flight; coalescing");
            return match self.cache.read() {
                Some(hit) => self.report(hit.session, hit.fetched_at, Provenance::Cached, None),
                None => self.stale_or_fallback(None),
            };
        };
        self.network_cycle(trigger).await
    }

    /// The short-interval re-check: consults the fresh cache only, never
    /// the network or the quota. Exists to pick up a cache write made by
    /// another process sharing the store.
    pub fn poll(&self) -> Option<FetchReport> {
        let hit = self.cache.read()?;
        Some(self.report(hit.session, hit.fetched_at, Provenance::Cached, None))
    }

    async fn network_cycle(&self, trigger: Trigger) -> FetchReport {
        let Some(provider) = self.provider.as_deref() else {
            return self.fallback_report(Diagnostic::MissingConfig {
                what: "API key or channel id".to_string(),
            });
        };

        if !self.quota.can_proceed() {
            counter!("session_quota_exhausted_total").increment(1);
            tracing::info!(?trigger, "daily call budget exhausted; degrading");
            return self.stale_or_fallback(Some(Diagnostic::QuotaExhausted {
                remaining: self.quota.remaining(),
            }));
        }

        // Pre-charge the budget: a crash mid-call may undercount, never
        // overcount.
        let used = self.quota.increment_and_get();
        gauge!("session_quota_remaining").set(self.quota.remaining() as f64);
        counter!("session_fetch_total").increment(1);
        tracing::debug!(used, ceiling = self.quota.ceiling(), "provider call charged");

        match tokio::time::timeout(self.request_timeout, provider.fetch_upcoming()).await {
            Ok(Ok(Some(session))) => {
                self.cache.write(&session);
                gauge!("session_last_success_ts").set(now_unix() as f64);
                tracing::info!(id = %session.id, live = session.live, "fetched upcoming session");
                self.report(session, now_unix(), Provenance::Fresh, None)
            }
            Ok(Ok(None)) => {
                tracing::info!(provider = provider.name(), "no upcoming broadcast scheduled");
                self.stale_or_fallback(Some(Diagnostic::NoUpcomingSession))
            }
            Ok(Err(e)) => {
                self.note_provider_error();
                tracing::warn!(error = ?e, provider = provider.name(), "provider error");
                self.stale_or_fallback(Some(Diagnostic::ProviderUnreachable {
                    reason: format!("{e:#}"),
                }))
            }
            Err(_) => {
                self.note_provider_error();
                counter!("session_provider_errors_total").increment(1);
                tracing::warn!(
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    provider = provider.name(),
                    "provider call timed out"
                );
                self.stale_or_fallback(Some(Diagnostic::ProviderUnreachable {
                    reason: format!("timed out after {}ms", self.request_timeout.as_millis()),
                }))
            }
        }
    }

    /// Stale-but-present cache beats the static fallback.
    fn stale_or_fallback(&self, diagnostic: Option<Diagnostic>) -> FetchReport {
        match self.cache.read_any() {
            Some(entry) => self.report(entry.session, entry.fetched_at, Provenance::Cached, diagnostic),
            None => match diagnostic {
                Some(d) => self.fallback_report(d),
                None => self.report(self.fallback.clone(), 0, Provenance::Fallback, None),
            },
        }
    }

    fn fallback_report(&self, diagnostic: Diagnostic) -> FetchReport {
        self.report(self.fallback.clone(), 0, Provenance::Fallback, Some(diagnostic))
    }

    fn report(
        &self,
        session: SessionInfo,
        fetched_at: u64,
        provenance: Provenance,
        diagnostic: Option<Diagnostic>,
    ) -> FetchReport {
        FetchReport {
            snapshot: SessionSnapshot {
                session,
                fetched_at,
                provenance,
            },
            diagnostic,
            quota_remaining: self.quota.remaining(),
        }
    }

    fn note_provider_error(&self) {
        self.store.put(KEY_LAST_ERROR, &now_unix().to_string());
    }
}
