// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod cache;
pub mod config;
pub mod countdown;
pub mod orchestrator;
pub mod provider;
pub mod quota;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::cache::{CachedSession, ResultCache};
pub use crate::orchestrator::{FetchOrchestrator, Trigger};
pub use crate::quota::QuotaTracker;
pub use crate::session::{
    Diagnostic, FetchReport, Provenance, SessionInfo, SessionSnapshot, ThumbnailSet,
};
pub use crate::store::{JsonFileStore, MemoryStore, StorePort};
