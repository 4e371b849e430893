// tests/orchestrator_cycles.rs
//
// Full fetch-cycle behavior against a scripted provider and the in-memory
// store: cache-first loads, quota accounting, timeout degradation,
// stale-vs-fallback policy, manual refresh, and single-flight coalescing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use session_spotlight::config::builtin_fallback;
use session_spotlight::orchestrator::{FetchOrchestrator, Trigger};
use session_spotlight::provider::SessionProvider;
use session_spotlight::session::{Diagnostic, Provenance, SessionInfo};
use session_spotlight::store::{MemoryStore, StorePort};
use session_spotlight::{QuotaTracker, ResultCache};

fn session(id: &str) -> SessionInfo {
    SessionInfo {
        id: id.into(),
        title: "Introduction to System Design".into(),
        description: "Fundamentals of designing scalable distributed systems.".into(),
        scheduled_start: Some(4_000_000_000),
        thumbnails: session_spotlight::session::ThumbnailSet {
            maxres: Some("https://i.ytimg.com/vi/x/maxresdefault.jpg".into()),
            ..Default::default()
        },
        watch_url: format!("https://www.youtube.com/watch?v={id}"),
        live: false,
        viewer_count: Some(156),
    }
}

enum Script {
    Success(SessionInfo),
    Empty,
    Fail,
    /// Never resolves within any test timeout.
    Hang,
    /// Resolves successfully after the given delay.
    Slow(Duration, SessionInfo),
}

struct ScriptedProvider {
    script: Script,
    calls: AtomicU32,
}

impl ScriptedProvider {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionProvider for ScriptedProvider {
    async fn fetch_upcoming(&self) -> Result<Option<SessionInfo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Success(s) => Ok(Some(s.clone())),
            Script::Empty => Ok(None),
            Script::Fail => Err(anyhow!("connection refused")),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
            Script::Slow(d, s) => {
                tokio::time::sleep(*d).await;
                Ok(Some(s.clone()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct Rig {
    orchestrator: FetchOrchestrator,
    store: Arc<MemoryStore>,
}

fn rig(
    provider: Option<Arc<ScriptedProvider>>,
    ceiling: u32,
    freshness: Duration,
    timeout: Duration,
) -> Rig {
    let store = Arc::new(MemoryStore::new());
    let port: Arc<dyn StorePort> = store.clone();
    let orchestrator = FetchOrchestrator::new(
        provider.map(|p| p as Arc<dyn SessionProvider>),
        ResultCache::new(port.clone(), freshness),
        QuotaTracker::new(port.clone(), ceiling),
        port,
        builtin_fallback(),
        timeout,
    );
    Rig {
        orchestrator,
        store,
    }
}

const LONG: Duration = Duration::from_secs(3600);
const TIMEOUT: Duration = Duration::from_millis(50);

#[tokio::test]
async fn fresh_fetch_then_cache_hit() {
    let p = ScriptedProvider::new(Script::Success(session("s1")));
    let r = rig(Some(p.clone()), 50, LONG, TIMEOUT);

    let first = r.orchestrator.load(Trigger::Mount).await;
    assert_eq!(first.snapshot.provenance, Provenance::Fresh);
    assert_eq!(first.snapshot.session.id, "s1");
    assert!(first.diagnostic.is_none());
    assert_eq!(first.quota_remaining, 49);

    let second = r.orchestrator.load(Trigger::Mount).await;
    assert_eq!(second.snapshot.provenance, Provenance::Cached);
    assert_eq!(second.snapshot.session.id, "s1");
    assert!(second.diagnostic.is_none());

    // one provider call, one quota charge
    assert_eq!(p.calls(), 1);
    assert_eq!(r.orchestrator.quota().current_count(), 1);
}

#[tokio::test]
async fn quota_exhaustion_degrades_without_a_provider_call() {
    // ceiling=2, freshness zero so every cycle wants the network
    let p = ScriptedProvider::new(Script::Success(session("s1")));
    let r = rig(Some(p.clone()), 2, Duration::ZERO, TIMEOUT);

    assert_eq!(
        r.orchestrator.load(Trigger::Mount).await.snapshot.provenance,
        Provenance::Fresh
    );
    assert_eq!(
        r.orchestrator.load(Trigger::FullRefresh).await.snapshot.provenance,
        Provenance::Fresh
    );

    let third = r.orchestrator.load(Trigger::FullRefresh).await;
    assert_eq!(p.calls(), 2, "third cycle must not reach the provider");
    assert_eq!(r.orchestrator.quota().current_count(), 2);
    assert_eq!(
        third.diagnostic,
        Some(Diagnostic::QuotaExhausted { remaining: 0 })
    );
    // stale data beats the static fallback
    assert_eq!(third.snapshot.provenance, Provenance::Cached);
    assert_eq!(third.snapshot.session.id, "s1");
}

#[tokio::test]
async fn freshness_window_governs_refetch() {
    // Within the window the cache answers; with the window collapsed a
    // new trigger goes back to the provider.
    let p = ScriptedProvider::new(Script::Success(session("s1")));
    let r = rig(Some(p.clone()), 50, LONG, TIMEOUT);
    r.orchestrator.load(Trigger::Mount).await;
    r.orchestrator.load(Trigger::FullRefresh).await;
    assert_eq!(p.calls(), 1, "fresh cache must absorb the second trigger");

    let p2 = ScriptedProvider::new(Script::Success(session("s2")));
    let r2 = rig(Some(p2.clone()), 50, Duration::ZERO, TIMEOUT);
    r2.orchestrator.load(Trigger::Mount).await;
    r2.orchestrator.load(Trigger::FullRefresh).await;
    assert_eq!(p2.calls(), 2, "lapsed freshness must trigger a fresh call");
}

#[tokio::test]
async fn timeout_with_stale_cache_serves_the_stale_entry() {
    let p = ScriptedProvider::new(Script::Hang);
    let r = rig(Some(p.clone()), 50, Duration::ZERO, TIMEOUT);
    r.orchestrator.cache().write_at(&session("old"), 0);

    let report = r.orchestrator.load(Trigger::Mount).await;
    assert_eq!(report.snapshot.provenance, Provenance::Cached);
    assert_eq!(report.snapshot.session.id, "old");
    assert!(matches!(
        report.diagnostic,
        Some(Diagnostic::ProviderUnreachable { .. })
    ));
    assert!(
        r.store.get("last_api_error_time").is_some(),
        "provider failures stamp last_api_error_time"
    );
}

#[tokio::test]
async fn timeout_without_any_cache_serves_the_fallback() {
    let p = ScriptedProvider::new(Script::Hang);
    let r = rig(Some(p.clone()), 50, LONG, TIMEOUT);

    let report = r.orchestrator.load(Trigger::Mount).await;
    assert_eq!(report.snapshot.provenance, Provenance::Fallback);
    assert_eq!(report.snapshot.session.title, builtin_fallback().title);
    assert_eq!(report.snapshot.fetched_at, 0);
    assert!(matches!(
        report.diagnostic,
        Some(Diagnostic::ProviderUnreachable { .. })
    ));
}

#[tokio::test]
async fn provider_error_degrades_like_a_timeout() {
    let p = ScriptedProvider::new(Script::Fail);
    let r = rig(Some(p.clone()), 50, LONG, TIMEOUT);

    let report = r.orchestrator.load(Trigger::Mount).await;
    assert_eq!(report.snapshot.provenance, Provenance::Fallback);
    assert!(matches!(
        report.diagnostic,
        Some(Diagnostic::ProviderUnreachable { .. })
    ));
    assert!(r.store.get("last_api_error_time").is_some());
    // the attempt was made, so it was charged
    assert_eq!(r.orchestrator.quota().current_count(), 1);
}

#[tokio::test]
async fn empty_result_is_not_an_error_but_still_charges_quota() {
    let p = ScriptedProvider::new(Script::Empty);
    let r = rig(Some(p.clone()), 50, LONG, TIMEOUT);

    let report = r.orchestrator.load(Trigger::Mount).await;
    assert_eq!(report.diagnostic, Some(Diagnostic::NoUpcomingSession));
    assert_eq!(report.snapshot.provenance, Provenance::Fallback);
    assert_eq!(p.calls(), 1);
    assert_eq!(r.orchestrator.quota().current_count(), 1);
    assert!(
        r.store.get("last_api_error_time").is_none(),
        "an empty result is not a provider failure"
    );
}

#[tokio::test]
async fn manual_refresh_bypasses_fresh_cache_but_not_quota() {
    let p = ScriptedProvider::new(Script::Success(session("s1")));
    let r = rig(Some(p.clone()), 2, LONG, TIMEOUT);

    assert_eq!(
        r.orchestrator.load(Trigger::Mount).await.snapshot.provenance,
        Provenance::Fresh
    );
    // cache is fresh; a manual refresh must still hit the provider
    let manual = r.orchestrator.load(Trigger::Manual).await;
    assert_eq!(manual.snapshot.provenance, Provenance::Fresh);
    assert_eq!(p.calls(), 2);

    // budget is now spent; the next manual reports it instead of
    // silently serving the cache
    let exhausted = r.orchestrator.load(Trigger::Manual).await;
    assert_eq!(
        exhausted.diagnostic,
        Some(Diagnostic::QuotaExhausted { remaining: 0 })
    );
    assert_eq!(exhausted.snapshot.provenance, Provenance::Cached);
    assert_eq!(p.calls(), 2);
}

#[tokio::test]
async fn poll_consults_the_cache_only() {
    let p = ScriptedProvider::new(Script::Success(session("s1")));
    let r = rig(Some(p.clone()), 50, LONG, TIMEOUT);

    assert!(r.orchestrator.poll().is_none(), "empty cache, nothing to poll");
    assert_eq!(p.calls(), 0, "poll must never reach the provider");

    r.orchestrator.load(Trigger::Mount).await;
    let polled = r.orchestrator.poll().expect("fresh entry after load");
    assert_eq!(polled.snapshot.provenance, Provenance::Cached);
    assert_eq!(p.calls(), 1);
}

#[tokio::test]
async fn concurrent_triggers_are_coalesced_into_one_charge() {
    let p = ScriptedProvider::new(Script::Slow(Duration::from_millis(100), session("s1")));
    let r = rig(Some(p.clone()), 50, LONG, Duration::from_secs(5));

    let (a, b) = tokio::join!(
        r.orchestrator.load(Trigger::Mount),
        r.orchestrator.load(Trigger::Manual)
    );

    assert_eq!(p.calls(), 1, "overlapping triggers must share one call");
    assert_eq!(r.orchestrator.quota().current_count(), 1);
    let fresh_count = [&a, &b]
        .iter()
        .filter(|rep| rep.snapshot.provenance == Provenance::Fresh)
        .count();
    assert_eq!(fresh_count, 1, "exactly one trigger performed the fetch");
}

#[tokio::test]
async fn missing_credentials_serve_fallback_without_charging() {
    let r = rig(None, 50, LONG, TIMEOUT);

    let report = r.orchestrator.load(Trigger::Mount).await;
    assert_eq!(report.snapshot.provenance, Provenance::Fallback);
    assert!(matches!(
        report.diagnostic,
        Some(Diagnostic::MissingConfig { .. })
    ));
    assert_eq!(r.orchestrator.quota().current_count(), 0);
    assert_eq!(report.quota_remaining, 50);
}

#[tokio::test]
async fn cleared_cache_forces_the_next_cycle_to_the_provider() {
    let p = ScriptedProvider::new(Script::Success(session("s1")));
    let r = rig(Some(p.clone()), 50, LONG, TIMEOUT);

    r.orchestrator.load(Trigger::Mount).await;
    r.orchestrator.cache().clear();
    let report = r.orchestrator.load(Trigger::Mount).await;
    assert_eq!(report.snapshot.provenance, Provenance::Fresh);
    assert_eq!(p.calls(), 2);
}
