//! YouTube Data API v3 gateway.
//!
//! Stateless request/response wrapper around the three read-only endpoints the
//! showcase needs. Errors are returned to the caller; no fallback data is ever
//! substituted here.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::models::{ChannelStats, ImpactFormula, Video, days_since, relative_upload_label};

#[derive(Error, Debug)]
pub enum GatewayError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("API returned status {status}: {body}")]
  Status { status: u16, body: String },

  #[error("Quota exceeded - please try again tomorrow")]
  QuotaExceeded,

  #[error("Malformed API response: {0}")]
  Malformed(String),

  #[error("No playlist configured for filter '{0}'")]
  UnknownPlaylist(String),
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<I> {
  next_page_token: Option<String>,
  items: Option<Vec<I>>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
  statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
  subscriber_count: Option<String>,
  view_count: Option<String>,
  video_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
  video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
  id: Option<SearchId>,
  snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
  video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
  snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
  published_at: Option<DateTime<Utc>>,
  title: Option<String>,
  #[serde(default)]
  description: String,
  #[serde(default)]
  thumbnails: Thumbnails,
  resource_id: Option<ResourceId>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
  default: Option<Thumbnail>,
  medium: Option<Thumbnail>,
  high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
  url: String,
}

impl Thumbnails {
  fn best(self) -> Option<String> {
    self.high.or(self.medium).or(self.default).map(|t| t.url)
  }
}

/// A listing item that can be turned into a [`Video`].
trait IntoVideo {
  fn into_video(self) -> Result<Video, GatewayError>;
}

fn video_from_snippet(video_id: Option<String>, snippet: Snippet) -> Result<Video, GatewayError> {
  let id = video_id.filter(|s| !s.is_empty()).ok_or_else(|| GatewayError::Malformed("item without video id".into()))?;
  let title = snippet.title.ok_or_else(|| GatewayError::Malformed(format!("video {} has no title", id)))?;
  let published_at =
    snippet.published_at.ok_or_else(|| GatewayError::Malformed(format!("video {} has no publishedAt", id)))?;
  Ok(Video {
    id,
    title: decode_entities(&title),
    description: decode_entities(&snippet.description),
    thumbnail_url: snippet.thumbnails.best(),
    published_at,
  })
}

impl IntoVideo for SearchItem {
  fn into_video(self) -> Result<Video, GatewayError> {
    let snippet = self.snippet.ok_or_else(|| GatewayError::Malformed("search item without snippet".into()))?;
    video_from_snippet(self.id.and_then(|i| i.video_id), snippet)
  }
}

impl IntoVideo for PlaylistItem {
  fn into_video(self) -> Result<Video, GatewayError> {
    let mut snippet = self.snippet.ok_or_else(|| GatewayError::Malformed("playlist item without snippet".into()))?;
    let video_id = snippet.resource_id.take().and_then(|r| r.video_id);
    video_from_snippet(video_id, snippet)
  }
}

/// Undo the HTML escaping the search endpoint applies to titles and descriptions.
fn decode_entities(s: &str) -> String {
  html_escape::decode_html_entities(s).into_owned()
}

fn parse_count(field: &str, raw: Option<String>) -> Result<u64, GatewayError> {
  let raw = raw.ok_or_else(|| GatewayError::Malformed(format!("statistics.{} missing", field)))?;
  raw.trim().parse().map_err(|_| GatewayError::Malformed(format!("statistics.{} is not a number: {:?}", field, raw)))
}

// --- Client ---

#[derive(Debug, Clone)]
pub struct YouTubeClient {
  client: Client,
  api_base: String,
  api_key: String,
  channel_id: String,
  /// Filter key → playlist id.
  playlists: HashMap<String, String>,
  page_size: u32,
  impact: ImpactFormula,
}

impl YouTubeClient {
  pub fn new(api_base: impl Into<String>, api_key: impl Into<String>, channel_id: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      api_base: api_base.into().trim_end_matches('/').to_string(),
      api_key: api_key.into(),
      channel_id: channel_id.into(),
      playlists: HashMap::new(),
      page_size: 50,
      impact: ImpactFormula::default(),
    }
  }

  /// Build a client from resolved settings. Returns `None` when the live API
  /// is switched off or no API key is available.
  pub fn from_settings(settings: &Settings) -> Option<Self> {
    if !settings.use_live_api {
      info!("gateway: live API disabled by configuration");
      return None;
    }
    let Some(key) = settings.api_key.clone() else {
      warn!("gateway: no API key configured, using fallback data");
      return None;
    };
    let playlists = settings.filters.iter().map(|f| (f.key.clone(), f.playlist_id.clone())).collect();
    Some(
      Self::new(&settings.api_base, key, &settings.channel_id)
        .with_playlists(playlists)
        .with_page_size(settings.search_page_size)
        .with_impact(settings.impact),
    )
  }

  pub fn with_playlists(mut self, playlists: HashMap<String, String>) -> Self {
    self.playlists = playlists;
    self
  }

  pub fn with_page_size(mut self, page_size: u32) -> Self {
    self.page_size = page_size.clamp(1, 50);
    self
  }

  pub fn with_impact(mut self, impact: ImpactFormula) -> Self {
    self.impact = impact;
    self
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    params: &[(&str, &str)],
    page_token: Option<&str>,
  ) -> Result<T, GatewayError> {
    let url = format!("{}/{}", self.api_base, endpoint);
    let mut request = self.client.get(&url).query(params).query(&[("key", self.api_key.as_str())]);
    if let Some(token) = page_token {
      request = request.query(&[("pageToken", token)]);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      if status == StatusCode::FORBIDDEN && body.contains("quotaExceeded") {
        warn!(endpoint, "gateway: daily quota exceeded");
        return Err(GatewayError::QuotaExceeded);
      }
      warn!(endpoint, status = status.as_u16(), "gateway: request failed");
      return Err(GatewayError::Status { status: status.as_u16(), body });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| GatewayError::Malformed(format!("{}: {}", endpoint, e)))
  }

  /// Follow `nextPageToken` until exhausted, concatenating items in server order.
  async fn collect_pages<I>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Vec<Video>, GatewayError>
  where
    I: DeserializeOwned + IntoVideo,
  {
    let mut videos = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
      let page: Page<I> = self.get_json(endpoint, params, token.as_deref()).await?;
      let items = page.items.ok_or_else(|| GatewayError::Malformed(format!("{}: missing items", endpoint)))?;
      for item in items {
        videos.push(item.into_video()?);
      }
      pages += 1;

      match page.next_page_token.filter(|t| !t.is_empty()) {
        Some(next) if token.as_deref() == Some(next.as_str()) => {
          return Err(GatewayError::Malformed(format!("{}: page token {} repeated", endpoint, next)));
        }
        Some(next) => token = Some(next),
        None => break,
      }
    }

    debug!(endpoint, pages, count = videos.len(), "gateway: listing complete");
    Ok(videos)
  }

  pub async fn fetch_channel_stats(&self) -> Result<ChannelStats, GatewayError> {
    info!(channel = %self.channel_id, "gateway: fetching channel statistics");

    let page: Page<ChannelItem> =
      self.get_json("channels", &[("part", "statistics,snippet"), ("id", self.channel_id.as_str())], None).await?;
    let stats = page
      .items
      .and_then(|items| items.into_iter().next())
      .and_then(|item| item.statistics)
      .ok_or_else(|| GatewayError::Malformed("no channel data found".into()))?;

    let subscribers = parse_count("subscriberCount", stats.subscriber_count)?;
    let views = parse_count("viewCount", stats.view_count)?;
    let videos = parse_count("videoCount", stats.video_count)?;

    // A failed lookup keeps the live counts and only loses the label.
    let latest_upload = match self.fetch_latest_video().await {
      Ok(Some(video)) => relative_upload_label(days_since(video.published_at, Utc::now())),
      Ok(None) => "Recently".to_string(),
      Err(e) => {
        warn!(err = %e, "gateway: latest upload lookup failed");
        "Recently".to_string()
      }
    };

    let stats = ChannelStats::from_counts(subscribers, views, videos, latest_upload, self.impact);
    info!(subscribers, views, videos, latest = %stats.latest_upload, "gateway: channel statistics fetched");
    Ok(stats)
  }

  async fn fetch_latest_video(&self) -> Result<Option<Video>, GatewayError> {
    let page: Page<SearchItem> = self
      .get_json(
        "search",
        &[
          ("part", "snippet"),
          ("channelId", self.channel_id.as_str()),
          ("order", "date"),
          ("type", "video"),
          ("maxResults", "1"),
        ],
        None,
      )
      .await?;
    page.items.unwrap_or_default().into_iter().next().map(IntoVideo::into_video).transpose()
  }

  pub async fn fetch_all_channel_videos(&self) -> Result<Vec<Video>, GatewayError> {
    info!(channel = %self.channel_id, "gateway: listing channel uploads");
    let page_size = self.page_size.to_string();
    self
      .collect_pages::<SearchItem>(
        "search",
        &[
          ("part", "snippet"),
          ("channelId", self.channel_id.as_str()),
          ("order", "date"),
          ("type", "video"),
          ("maxResults", page_size.as_str()),
        ],
      )
      .await
  }

  pub async fn fetch_playlist_videos(&self, playlist_key: &str) -> Result<Vec<Video>, GatewayError> {
    let playlist_id = self
      .playlists
      .get(playlist_key)
      .filter(|id| !id.is_empty())
      .ok_or_else(|| GatewayError::UnknownPlaylist(playlist_key.to_string()))?;
    info!(key = playlist_key, playlist = %playlist_id, "gateway: listing playlist");
    let page_size = self.page_size.to_string();
    self
      .collect_pages::<PlaylistItem>(
        "playlistItems",
        &[("part", "snippet"), ("playlistId", playlist_id.as_str()), ("maxResults", page_size.as_str())],
      )
      .await
  }
}
