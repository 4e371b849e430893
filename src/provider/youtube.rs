// src/provider/youtube.rs
//! YouTube Data API provider: a search call narrowing to at most one
//! upcoming broadcast on the configured channel, then a videos.list call
//! for the details of that id.

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::provider::{normalize_text, SessionProvider};
use crate::session::{self, SessionInfo};

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

// --- search.list response (only the id is consumed) ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}
#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
}
#[derive(Debug, Deserialize)]
struct SearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

// --- videos.list response ---

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}
#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(rename = "liveStreamingDetails")]
    live_streaming_details: Option<LiveStreamingDetails>,
    statistics: Option<Statistics>,
}
#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "liveBroadcastContent", default)]
    live_broadcast_content: String,
    #[serde(default)]
    thumbnails: ThumbnailSet,
}
#[derive(Debug, Default, Deserialize)]
struct ThumbnailSet {
    maxres: Option<Thumbnail>,
    standard: Option<Thumbnail>,
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}
#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}
#[derive(Debug, Deserialize)]
struct LiveStreamingDetails {
    #[serde(rename = "scheduledStartTime")]
    scheduled_start_time: Option<String>,
    #[serde(rename = "concurrentViewers")]
    concurrent_viewers: Option<String>,
}
#[derive(Debug, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
}

fn parse_rfc3339_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts, &Rfc3339)
        .ok()
        .map(|dt| dt.unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

fn into_thumbnail_set(t: ThumbnailSet) -> session::ThumbnailSet {
    session::ThumbnailSet {
        maxres: t.maxres.map(|th| th.url),
        standard: t.standard.map(|th| th.url),
        high: t.high.map(|th| th.url),
        medium: t.medium.map(|th| th.url),
        default: t.default.map(|th| th.url),
    }
}

pub struct YouTubeProvider {
    mode: Mode,
}

enum Mode {
    Http {
        client: reqwest::Client,
        api_key: String,
        channel_id: String,
    },
    /// Canned responses for tests: (search body, videos body).
    Fixture { search: String, details: String },
}

impl YouTubeProvider {
    pub fn new(api_key: &str, channel_id: &str) -> Self {
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
                api_key: api_key.to_string(),
                channel_id: channel_id.to_string(),
            },
        }
    }

    pub fn from_fixtures(search_json: &str, details_json: &str) -> Self {
        Self {
            mode: Mode::Fixture {
                search: search_json.to_string(),
                details: details_json.to_string(),
            },
        }
    }

    /// Id of the single upcoming broadcast, if the search returned one.
    fn parse_search_id(body: &str) -> Result<Option<String>> {
        let resp: SearchResponse = serde_json::from_str(body).context("parsing search response")?;
        Ok(resp.items.into_iter().find_map(|it| it.id.video_id))
    }

    fn parse_session_from_details(body: &str) -> Result<Option<SessionInfo>> {
        let resp: VideosResponse = serde_json::from_str(body).context("parsing videos response")?;
        let Some(item) = resp.items.into_iter().next() else {
            return Ok(None);
        };

        let live = item.snippet.live_broadcast_content == "live";
        let details = item.live_streaming_details.as_ref();
        let scheduled_start = details
            .and_then(|d| d.scheduled_start_time.as_deref())
            .and_then(parse_rfc3339_to_unix);
        // Live audience while on air, lifetime views otherwise.
        let viewer_count = details
            .and_then(|d| d.concurrent_viewers.as_deref())
            .or(item
                .statistics
                .as_ref()
                .and_then(|s| s.view_count.as_deref()))
            .and_then(|v| v.parse().ok());

        Ok(Some(SessionInfo {
            watch_url: format!("https://www.youtube.com/watch?v={}", item.id),
            title: normalize_text(&item.snippet.title),
            description: normalize_text(&item.snippet.description),
            thumbnails: into_thumbnail_set(item.snippet.thumbnails),
            scheduled_start,
            live,
            viewer_count,
            id: item.id,
        }))
    }

    async fn fetch_http(
        client: &reqwest::Client,
        api_key: &str,
        channel_id: &str,
    ) -> Result<Option<SessionInfo>> {
        let search_body = client
            .get(SEARCH_URL)
            .query(&[
                ("part", "snippet"),
                ("channelId", channel_id),
                ("eventType", "upcoming"),
                ("type", "video"),
                ("order", "date"),
                ("maxResults", "1"),
                ("key", api_key),
            ])
            .send()
            .await
            .context("youtube search get()")?
            .error_for_status()
            .context("youtube search status")?
            .text()
            .await
            .context("youtube search .text()")?;

        let Some(video_id) = Self::parse_search_id(&search_body)? else {
            return Ok(None);
        };

        let details_body = client
            .get(VIDEOS_URL)
            .query(&[
                ("part", "snippet,liveStreamingDetails,statistics"),
                ("id", video_id.as_str()),
                ("key", api_key),
            ])
            .send()
            .await
            .context("youtube videos get()")?
            .error_for_status()
            .context("youtube videos status")?
            .text()
            .await
            .context("youtube videos .text()")?;

        Self::parse_session_from_details(&details_body)
    }
}

#[async_trait::async_trait]
impl SessionProvider for YouTubeProvider {
    async fn fetch_upcoming(&self) -> Result<Option<SessionInfo>> {
        let t0 = std::time::Instant::now();
        let out = match &self.mode {
            Mode::Http {
                client,
                api_key,
                channel_id,
            } => Self::fetch_http(client, api_key, channel_id).await,
            Mode::Fixture { search, details } => {
                Self::parse_search_id(search).and_then(|id| match id {
                    Some(_) => Self::parse_session_from_details(details),
                    None => Ok(None),
                })
            }
        };

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("session_provider_ms").record(ms);
        if out.is_err() {
            counter!("session_provider_errors_total").increment(1);
        }
        out
    }

    fn name(&self) -> &'static str {
        "YouTube"
    }
}
