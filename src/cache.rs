// src/cache.rs
//! Single-slot result cache with a freshness window.
//!
//! Freshness is a pure function of elapsed time, checked lazily at read
//! time, with no background sweep. An expired entry stays in storage until the
//! next `write` overwrites it or `clear` evicts it explicitly; `read`
//! merely refuses to return it. Absolute TTL, no sliding refresh.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::session::SessionInfo;
use crate::store::StorePort;

const KEY_DATA: &str = "session_data";
const KEY_TIME: &str = "session_time";

/// A persisted fetch result together with when it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    pub session: SessionInfo,
    /// Unix seconds at which the payload was fetched.
    pub fetched_at: u64,
}

/// Last-successful-fetch cache over the injected store. Caching is
/// best-effort: serialization or storage trouble reads as a miss and never
/// blocks the fetch path.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn StorePort>,
    freshness: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn StorePort>, freshness: Duration) -> Self {
        Self { store, freshness }
    }

    pub fn freshness_secs(&self) -> u64 {
        self.freshness.as_secs()
    }

    /// The persisted result, only while younger than the freshness window.
    pub fn read(&self) -> Option<CachedSession> {
        self.read_at(now_unix())
    }

    /// As `read`, against an explicit clock.
    pub fn read_at(&self, now: u64) -> Option<CachedSession> {
        let entry = self.read_any()?;
        if now.saturating_sub(entry.fetched_at) < self.freshness.as_secs() {
            Some(entry)
        } else {
            None
        }
    }

    /// The persisted result regardless of age. Degraded paths use this to
    /// prefer stale-but-real data over the static fallback.
    pub fn read_any(&self) -> Option<CachedSession> {
        let fetched_at: u64 = self.store.get(KEY_TIME)?.trim().parse().ok()?;
        let session: SessionInfo = serde_json::from_str(&self.store.get(KEY_DATA)?).ok()?;
        Some(CachedSession {
            session,
            fetched_at,
        })
    }

    /// Persist a fresh payload, unconditionally replacing prior contents.
    pub fn write(&self, session: &SessionInfo) {
        self.write_at(session, now_unix());
    }

    pub fn write_at(&self, session: &SessionInfo, now: u64) {
        match serde_json::to_string(session) {
            Ok(json) => {
                self.store.put(KEY_DATA, &json);
                self.store.put(KEY_TIME, &now.to_string());
            }
            Err(e) => tracing::warn!("cache serialize: {e:#}"),
        }
    }

    /// Explicit eviction, used by manual force-refresh.
    pub fn clear(&self) {
        self.store.remove(KEY_DATA);
        self.store.remove(KEY_TIME);
    }
}

/// Current UNIX time in seconds.
pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
