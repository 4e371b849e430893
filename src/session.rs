//! session.rs — Domain types for the live-session pipeline.
//!
//! `SessionInfo` is the payload the UI renders; `FetchReport` is what every
//! load returns: a snapshot plus an optional advisory diagnostic. Reports
//! always carry a snapshot, so the UI never receives a blank state.

use serde::{Deserialize, Serialize};

/// Shown when the provider reports no usable thumbnail at any resolution.
pub const PLACEHOLDER_THUMBNAIL: &str = "/images/session-placeholder.jpg";

/// Thumbnail URIs by resolution, as reported by the provider. Any subset
/// may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxres: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ThumbnailSet {
    /// Highest-resolution URI available, walking the fixed priority list
    /// down to the placeholder image.
    pub fn best(&self) -> &str {
        [
            &self.maxres,
            &self.standard,
            &self.high,
            &self.medium,
            &self.default,
        ]
        .into_iter()
        .flatten()
        .next()
        .map(String::as_str)
        .unwrap_or(PLACEHOLDER_THUMBNAIL)
    }
}

/// One live or upcoming broadcast, as rendered on the website banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Provider-side video id.
    pub id: String,
    pub title: String,
    pub description: String,
    /// Scheduled start in unix seconds; `None` when the provider did not
    /// announce a start time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<u64>,
    #[serde(default)]
    pub thumbnails: ThumbnailSet,
    /// Public watch URL.
    pub watch_url: String,
    /// True once the broadcast is on air, false while still upcoming.
    pub live: bool,
    /// View/viewer statistic from the provider, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_count: Option<u64>,
}

/// Where a returned session came from. Mutually exclusive, set once per
/// fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Obtained from the provider in this cycle.
    Fresh,
    /// Served from the persisted cache (fresh or stale; a stale serve is
    /// always accompanied by a diagnostic).
    Cached,
    /// The configuration-supplied sample record.
    Fallback,
}

/// A cached or freshly fetched session together with its fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session: SessionInfo,
    /// Unix seconds at which `session` was obtained from the provider.
    /// Zero for the fallback record, which was never fetched.
    pub fetched_at: u64,
    pub provenance: Provenance,
}

/// Advisory note attached to degraded results. Never blocking: the
/// snapshot next to it is still renderable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Today's call budget is spent; it resets at local midnight.
    QuotaExhausted { remaining: u32 },
    /// The provider answered but had no upcoming broadcast scheduled.
    NoUpcomingSession,
    /// Timeout, transport, or parse failure talking to the provider.
    ProviderUnreachable { reason: String },
    /// API key or channel id is not configured; nothing was attempted.
    MissingConfig { what: String },
}

impl Diagnostic {
    /// Human-readable one-liner for UI badges and logs.
    pub fn message(&self) -> String {
        match self {
            Diagnostic::QuotaExhausted { remaining } => format!(
                "daily API budget used up ({remaining} calls left); showing saved data until tomorrow"
            ),
            Diagnostic::NoUpcomingSession => "no upcoming session is scheduled right now".to_string(),
            Diagnostic::ProviderUnreachable { reason } => {
                format!("session provider unreachable: {reason}")
            }
            Diagnostic::MissingConfig { what } => {
                format!("session lookup not configured ({what}); showing sample data")
            }
        }
    }
}

/// The outcome of one load: what to render, where it came from, and an
/// optional advisory diagnostic when the cycle degraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    pub snapshot: SessionSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
    /// Calls left in today's budget after this cycle.
    pub quota_remaining: u32,
}

impl FetchReport {
    /// True when the cycle did not produce a fresh or fresh-cached result.
    pub fn degraded(&self) -> bool {
        self.diagnostic.is_some()
    }
}
