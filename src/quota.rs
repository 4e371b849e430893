// src/quota.rs
//! Daily call budget for the external session provider.
//!
//! Counts are keyed by the local calendar date (`api_calls_today_YYYY-MM-DD`),
//! so the budget resets at local midnight rather than 24h after first use.
//! The ceiling sits well below the provider's real quota to absorb that
//! slack and any clock skew.
//!
//! The counter is incremented immediately BEFORE an outbound call is
//! issued: a crash mid-call may undercount, never overcount.

use std::sync::Arc;

use crate::store::StorePort;

const KEY_PREFIX: &str = "api_calls_today_";

/// Tracks calls made within the current calendar day against a fixed
/// ceiling, persisting the count through the injected store.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn StorePort>,
    ceiling: u32,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn StorePort>, ceiling: u32) -> Self {
        Self { store, ceiling }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Today's date key in local time, e.g. `2026-08-06`.
    pub fn today_key() -> String {
        chrono::Local::now().format("%Y-%m-%d").to_string()
    }

    fn store_key(date_key: &str) -> String {
        format!("{KEY_PREFIX}{date_key}")
    }

    /// Increment the counter for today and return the new count, persisting
    /// it keyed by today's date. Call this right before going to the network.
    pub fn increment_and_get(&self) -> u32 {
        self.increment_and_get_for(&Self::today_key())
    }

    /// As `increment_and_get`, for an explicit date key.
    pub fn increment_and_get_for(&self, date_key: &str) -> u32 {
        let next = self.current_count_for(date_key).saturating_add(1);
        self.store.put(&Self::store_key(date_key), &next.to_string());
        next
    }

    /// Today's count without mutating; 0 when no entry exists for today
    /// (including after a date rollover, or when the store is unreadable).
    pub fn current_count(&self) -> u32 {
        self.current_count_for(&Self::today_key())
    }

    pub fn current_count_for(&self, date_key: &str) -> u32 {
        self.store
            .get(&Self::store_key(date_key))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// True while today's count is below the ceiling.
    pub fn can_proceed(&self) -> bool {
        self.can_proceed_for(&Self::today_key())
    }

    pub fn can_proceed_for(&self, date_key: &str) -> bool {
        self.current_count_for(date_key) < self.ceiling
    }

    /// Calls left in today's budget, saturating at zero.
    pub fn remaining(&self) -> u32 {
        self.remaining_for(&Self::today_key())
    }

    pub fn remaining_for(&self, date_key: &str) -> u32 {
        self.ceiling.saturating_sub(self.current_count_for(date_key))
    }
}
