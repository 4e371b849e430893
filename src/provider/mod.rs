// src/provider/mod.rs
pub mod youtube;

use anyhow::Result;

use crate::session::SessionInfo;

/// Upstream source of the "next session" record.
///
/// Implementations return `Ok(None)` when the channel has nothing upcoming;
/// that is a valid empty result, not an error.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    async fn fetch_upcoming(&self) -> Result<Option<SessionInfo>>;
    fn name(&self) -> &'static str;
}

/// Normalize provider text: decode HTML entities, strip tags, collapse
/// whitespace, trim, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 4) Length cap: 1000 chars, enough for the banner blurb
    if out.chars().count() > 1000 {
        out = out.chars().take(1000).collect();
    }

    out
}
