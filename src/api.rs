use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::cache::now_unix;
use crate::countdown::{time_until, TimeLeft};
use crate::orchestrator::{FetchOrchestrator, Trigger};
use crate::session::{Diagnostic, FetchReport, Provenance, SessionInfo};

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<FetchOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<FetchOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/session", get(get_session))
        .route("/session/refresh", post(refresh_session))
        .route("/debug/quota", get(debug_quota))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// What the banner widget consumes. Always populated: fresh, cached, or
/// the fallback record; the diagnostic is an advisory badge.
#[derive(serde::Serialize)]
struct SessionView {
    session: SessionInfo,
    /// Pre-picked best-resolution thumbnail for the banner.
    thumbnail_url: String,
    provenance: Provenance,
    /// Unix seconds when the payload was fetched; 0 for the fallback.
    fetched_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostic: Option<DiagnosticView>,
    /// Countdown to the scheduled start, absent when no start is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    starts_in: Option<TimeLeft>,
    quota_remaining: u32,
}

#[derive(serde::Serialize)]
struct DiagnosticView {
    kind: &'static str,
    message: String,
}

fn diagnostic_view(d: &Diagnostic) -> DiagnosticView {
    let kind = match d {
        Diagnostic::QuotaExhausted { .. } => "quota_exhausted",
        Diagnostic::NoUpcomingSession => "no_upcoming_session",
        Diagnostic::ProviderUnreachable { .. } => "provider_unreachable",
        Diagnostic::MissingConfig { .. } => "missing_config",
    };
    DiagnosticView {
        kind,
        message: d.message(),
    }
}

fn session_view(report: FetchReport) -> SessionView {
    let starts_in = report
        .snapshot
        .session
        .scheduled_start
        .map(|target| time_until(target, now_unix()));
    SessionView {
        diagnostic: report.diagnostic.as_ref().map(diagnostic_view),
        thumbnail_url: report.snapshot.session.thumbnails.best().to_string(),
        provenance: report.snapshot.provenance,
        fetched_at: report.snapshot.fetched_at,
        quota_remaining: report.quota_remaining,
        session: report.snapshot.session,
        starts_in,
    }
}

async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    let report = state.orchestrator.load(Trigger::Mount).await;
    Json(session_view(report))
}

/// Manual refresh: skips the fresh-cache check but still respects the
/// daily budget; when exhausted it reports the budget diagnostic instead
/// of silently serving stale data.
async fn refresh_session(State(state): State<AppState>) -> Json<SessionView> {
    let report = state.orchestrator.load(Trigger::Manual).await;
    Json(session_view(report))
}

#[derive(serde::Serialize)]
struct QuotaInfo {
    ceiling: u32,
    used_today: u32,
    remaining: u32,
    date_key: String,
}

async fn debug_quota(State(state): State<AppState>) -> Json<QuotaInfo> {
    let quota = state.orchestrator.quota();
    Json(QuotaInfo {
        ceiling: quota.ceiling(),
        used_today: quota.current_count(),
        remaining: quota.remaining(),
        date_key: crate::quota::QuotaTracker::today_key(),
    })
}
