// src/config.rs
//! Environment configuration and the deployment-overridable fallback record.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;

use crate::session::{SessionInfo, ThumbnailSet, PLACEHOLDER_THUMBNAIL};

const ENV_FALLBACK_PATH: &str = "SESSION_FALLBACK_PATH";

/// All tuning knobs for the fetch pipeline, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub channel_id: Option<String>,
    /// Calls allowed per calendar day. Deliberately far below the
    /// provider's hard quota.
    pub daily_ceiling: u32,
    pub freshness: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub refresh_interval: Duration,
    pub state_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: nonempty_var("YOUTUBE_API_KEY"),
            channel_id: nonempty_var("YOUTUBE_CHANNEL_ID"),
            daily_ceiling: parsed_var("SESSION_DAILY_CALL_CEILING", 50),
            freshness: Duration::from_secs(parsed_var("SESSION_FRESHNESS_SECS", 1800)),
            request_timeout: Duration::from_millis(parsed_var("SESSION_REQUEST_TIMEOUT_MS", 10_000)),
            poll_interval: Duration::from_secs(parsed_var("SESSION_POLL_INTERVAL_SECS", 60)),
            refresh_interval: Duration::from_secs(parsed_var("SESSION_REFRESH_INTERVAL_SECS", 300)),
            state_path: std::env::var("SESSION_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("state/session_store.json")),
        }
    }

    /// Key and channel id, present and well-formed; `None` puts the
    /// pipeline on the configuration-error path (fallback data, no calls).
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let key = self.api_key.as_deref()?;
        let channel = self.channel_id.as_deref()?;
        if !channel_id_looks_valid(channel) {
            tracing::warn!(channel, "YOUTUBE_CHANNEL_ID does not look like a channel id");
            return None;
        }
        Some((key, channel))
    }
}

fn nonempty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Channel ids are `UC` followed by 22 URL-safe base64 characters.
pub fn channel_id_looks_valid(channel: &str) -> bool {
    static RE: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"^UC[0-9A-Za-z_-]{22}$").unwrap());
    re.is_match(channel)
}

/// Load the fallback record from an explicit path. Supports TOML or JSON.
pub fn load_fallback_from(path: &Path) -> Result<SessionInfo> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading fallback session from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_fallback(&content, ext.as_str())
}

/// Load the fallback record using env var + fallbacks:
/// 1) $SESSION_FALLBACK_PATH
/// 2) config/fallback_session.toml
/// 3) config/fallback_session.json
/// 4) compiled-in sample record
pub fn load_fallback_default() -> SessionInfo {
    if let Ok(p) = std::env::var(ENV_FALLBACK_PATH) {
        let pb = PathBuf::from(p);
        match load_fallback_from(&pb) {
            Ok(s) => return s,
            Err(e) => tracing::warn!("fallback from {}: {e:#}", pb.display()),
        }
    }
    for candidate in [
        "config/fallback_session.toml",
        "config/fallback_session.json",
    ] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            match load_fallback_from(&pb) {
                Ok(s) => return s,
                Err(e) => tracing::warn!("fallback from {}: {e:#}", pb.display()),
            }
        }
    }
    builtin_fallback()
}

fn parse_fallback(s: &str, hint_ext: &str) -> Result<SessionInfo> {
    if hint_ext == "toml" {
        return toml::from_str(s).context("parsing fallback session toml");
    }
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing fallback session json");
    }
    // No usable extension hint: try TOML, then JSON.
    if let Ok(v) = toml::from_str(s) {
        return Ok(v);
    }
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    Err(anyhow!("unsupported fallback session format"))
}

/// Last-resort sample record so the banner never goes blank even on a
/// config-less deployment.
pub fn builtin_fallback() -> SessionInfo {
    SessionInfo {
        id: String::new(),
        title: "Weekly community session".to_string(),
        description: "Live workshops and Q&A with mentors. Schedule is announced on the channel."
            .to_string(),
        scheduled_start: None,
        thumbnails: ThumbnailSet {
            default: Some(PLACEHOLDER_THUMBNAIL.to_string()),
            ..ThumbnailSet::default()
        },
        watch_url: "https://youtube.com/@techandinnovationclub".to_string(),
        live: false,
        viewer_count: None,
    }
}
