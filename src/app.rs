use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::widgets::ListState;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cache::{TtlCache, VideoSource};
use crate::config::Settings;
use crate::counter::StatsPresenter;
use crate::models::{ChannelStats, Video};
use crate::videos::{ListEvent, RenderInstruction, VideoListState};
use crate::youtube::{GatewayError, YouTubeClient};

// --- Types ---

pub type StatsResult = Result<ChannelStats, GatewayError>;
pub type VideosResult = Result<Vec<Video>, GatewayError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Browse,
  Search,
}

/// Cards currently on screen, as last instructed by the video engine.
#[derive(Debug, Default)]
pub struct VideoGrid {
  pub cards: Vec<Video>,
  pub results_label: String,
  /// Label of the load-more control; `None` hides it.
  pub load_more: Option<String>,
}

impl VideoGrid {
  pub fn apply(&mut self, instruction: RenderInstruction) {
    self.results_label = instruction.results_label();
    self.load_more = instruction.load_more_label();
    if instruction.append {
      self.cards.extend(instruction.videos);
    } else {
      self.cards = instruction.videos;
    }
  }
}

/// A video fetch in flight, tagged with the operation that started it.
struct PendingVideos {
  source: VideoSource,
  generation: u64,
  rx: oneshot::Receiver<VideosResult>,
}

/// In-flight async task receivers.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  stats_rx: Option<oneshot::Receiver<StatsResult>>,
  videos: Vec<PendingVideos>,
}

pub struct App {
  pub settings: Settings,
  gateway: Option<YouTubeClient>,
  pub cache: TtlCache,
  pub videos: VideoListState,
  pub presenter: StatsPresenter,
  pub stats: Option<ChannelStats>,
  pub stats_loading: bool,
  pub grid: VideoGrid,
  pub list_state: ListState,
  pub mode: AppMode,
  /// Search box contents.
  pub input: String,
  pub cursor_position: usize,
  /// 0 is "All", `i + 1` is `settings.filters[i]`.
  pub active_tab: usize,
  pub status_message: Option<String>,
  pub last_error: Option<String>,
  pub should_quit: bool,
  last_refresh: Instant,
  rng: StdRng,
  pub(crate) tasks: AsyncTasks,
}

impl App {
  pub fn new(settings: Settings) -> Self {
    let gateway = YouTubeClient::from_settings(&settings);
    let cache = TtlCache::new(settings.cache_ttl);
    let videos = VideoListState::new(settings.initial_page_size, settings.increment_page_size);
    let presenter = StatsPresenter::new(
      &settings.stat_cards,
      settings.counter_duration,
      settings.counter_tick,
      settings.visibility_threshold,
    );

    Self {
      settings,
      gateway,
      cache,
      videos,
      presenter,
      stats: None,
      stats_loading: false,
      grid: VideoGrid::default(),
      list_state: ListState::default(),
      mode: AppMode::Browse,
      input: String::new(),
      cursor_position: 0,
      active_tab: 0,
      status_message: None,
      last_error: None,
      should_quit: false,
      last_refresh: Instant::now(),
      rng: StdRng::from_entropy(),
      tasks: AsyncTasks::default(),
    }
  }

  pub fn is_live(&self) -> bool {
    self.gateway.is_some()
  }

  /// Kick off the initial stats and channel listing fetches.
  pub fn start(&mut self) {
    self.trigger_stats();
    self.trigger_load();
  }

  pub fn has_pending(&self) -> bool {
    self.tasks.stats_rx.is_some() || !self.tasks.videos.is_empty()
  }

  pub fn tab_labels(&self) -> Vec<&str> {
    std::iter::once("All").chain(self.settings.filters.iter().map(|f| f.label.as_str())).collect()
  }

  // --- Stats ---

  /// Fetch channel stats through the cache. Without a gateway the fallback
  /// record is used directly.
  pub fn trigger_stats(&mut self) {
    if let Some(stats) = self.cache.get_stats() {
      self.stats = Some(stats);
      return;
    }
    let Some(gateway) = self.gateway.clone() else {
      self.stats = Some(self.settings.fallback.to_stats());
      return;
    };

    self.stats_loading = true;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(gateway.fetch_channel_stats().await);
    });
    self.tasks.stats_rx = Some(rx);
  }

  /// Invalidate the cache and refetch the stats widget. Runs every TTL.
  pub fn refresh(&mut self) {
    info!("refresh: cache expired, refreshing channel stats");
    self.cache.invalidate();
    self.last_refresh = Instant::now();
    self.trigger_stats();
  }

  /// Let a stat card know how much of it is on screen.
  pub fn observe_stat(&mut self, index: usize, visible_ratio: f64) {
    if let Some(ref stats) = self.stats {
      self.presenter.observe(index, visible_ratio, stats, Instant::now());
    }
  }

  // --- Video list ---

  fn dispatch(&mut self, event: ListEvent) {
    let Some(instruction) = self.videos.apply(event, &mut self.rng) else { return };
    let append = instruction.append;
    debug!(
      filter = self.videos.current_filter().key(),
      search = self.videos.search_term(),
      shown = instruction.shown_count,
      total = instruction.total_count,
      "videos: grid updated"
    );
    self.grid.apply(instruction);
    if !append || self.list_state.selected().is_none() {
      self.list_state.select(if self.grid.cards.is_empty() { None } else { Some(0) });
    }
  }

  /// Re-apply an active search after a fetch replaced the view underneath it.
  fn reapply_search(&mut self) {
    if !self.input.trim().is_empty() {
      self.dispatch(ListEvent::Search(self.input.clone()));
    }
  }

  fn spawn_videos(&mut self, source: VideoSource, generation: u64) {
    let Some(gateway) = self.gateway.clone() else {
      debug!(?source, "videos: live API disabled, no listing available");
      return;
    };
    self.status_message = Some("Loading tutorials…".to_string());
    let (tx, rx) = oneshot::channel();
    let task_source = source.clone();
    tokio::spawn(async move {
      let result = match task_source {
        VideoSource::Channel => gateway.fetch_all_channel_videos().await,
        VideoSource::Playlist(ref key) => gateway.fetch_playlist_videos(key).await,
      };
      let _ = tx.send(result);
    });
    self.tasks.videos.push(PendingVideos { source, generation, rx });
  }

  /// Load the whole-channel listing (through the cache).
  pub fn trigger_load(&mut self) {
    let generation = self.videos.begin();
    self.active_tab = 0;
    match self.cache.get_videos(&VideoSource::Channel) {
      Some(videos) => {
        self.dispatch(ListEvent::Loaded(videos));
        self.reapply_search();
      }
      None => self.spawn_videos(VideoSource::Channel, generation),
    }
  }

  /// Switch to tab `index`. Clears the search box like a filter click does.
  pub fn select_tab(&mut self, index: usize) {
    if index > self.settings.filters.len() {
      return;
    }
    self.active_tab = index;
    self.input.clear();
    self.cursor_position = 0;

    if index == 0 {
      if self.videos.all_videos().is_empty() {
        self.trigger_load();
      } else {
        self.videos.begin();
        self.dispatch(ListEvent::FilterAll);
      }
      return;
    }

    let key = self.settings.filters[index - 1].key.clone();
    let generation = self.videos.begin();
    let source = VideoSource::Playlist(key.clone());
    match self.cache.get_videos(&source) {
      Some(videos) => self.dispatch(ListEvent::FilterLoaded { key, videos }),
      None => self.spawn_videos(source, generation),
    }
  }

  pub fn next_tab(&mut self) {
    let count = self.settings.filters.len() + 1;
    self.select_tab((self.active_tab + 1) % count);
  }

  pub fn prev_tab(&mut self) {
    let count = self.settings.filters.len() + 1;
    self.select_tab((self.active_tab + count - 1) % count);
  }

  /// Search box changed.
  pub fn set_search(&mut self) {
    self.dispatch(ListEvent::Search(self.input.clone()));
  }

  pub fn clear_search(&mut self) {
    self.input.clear();
    self.cursor_position = 0;
    self.set_search();
  }

  pub fn load_more(&mut self) {
    self.dispatch(ListEvent::LoadMore);
  }

  pub fn selected_video(&self) -> Option<&Video> {
    self.list_state.selected().and_then(|i| self.grid.cards.get(i))
  }

  // --- Event loop hooks ---

  /// Advance counters and fire the periodic refresh when due.
  pub fn tick(&mut self, now: Instant) {
    self.presenter.advance(now);
    if now.saturating_duration_since(self.last_refresh) >= self.cache.ttl() {
      self.refresh();
    }
  }

  /// Apply results of finished background fetches.
  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.tasks.stats_rx.take() {
      match rx.try_recv() {
        Ok(Ok(stats)) => {
          self.stats_loading = false;
          self.cache.put_stats(stats.clone());
          self.stats = Some(stats);
        }
        Ok(Err(e)) => {
          self.stats_loading = false;
          warn!(err = %e, "stats: fetch failed, falling back to static data");
          self.stats = Some(self.settings.fallback.to_stats());
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.stats_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.stats_loading = false;
          warn!("stats: fetch task vanished, falling back to static data");
          self.stats = Some(self.settings.fallback.to_stats());
        }
      }
    }

    let mut still_pending = Vec::new();
    for mut pending in std::mem::take(&mut self.tasks.videos) {
      match pending.rx.try_recv() {
        Ok(result) => self.finish_videos(pending.source, pending.generation, result),
        Err(oneshot::error::TryRecvError::Empty) => still_pending.push(pending),
        Err(oneshot::error::TryRecvError::Closed) => {
          warn!(source = ?pending.source, "videos: fetch task vanished");
        }
      }
    }
    self.tasks.videos = still_pending;
    if self.tasks.videos.is_empty() {
      self.status_message = None;
    }
  }

  fn finish_videos(&mut self, source: VideoSource, generation: u64, result: VideosResult) {
    let videos = match result {
      Ok(videos) => videos,
      Err(e) => {
        warn!(?source, err = %e, "videos: fetch failed, keeping current grid");
        return;
      }
    };
    info!(?source, count = videos.len(), "videos: listing received");
    self.cache.put_videos(source.clone(), videos.clone());

    if !self.videos.is_current(generation) {
      debug!(?source, generation, current = self.videos.generation(), "videos: stale result discarded");
      return;
    }
    match source {
      VideoSource::Channel => {
        self.dispatch(ListEvent::Loaded(videos));
        self.reapply_search();
      }
      VideoSource::Playlist(key) => {
        self.dispatch(ListEvent::FilterLoaded { key, videos });
        self.reapply_search();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::constants::FilterDef;
  use crate::videos::Filter;
  use crate::videos::tests::make_videos;
  use crate::youtube::tests::{CHANNEL, KEY, channel_body, search_item};
  use chrono::{Duration as ChronoDuration, Utc};
  use mockito::{Matcher, Server, ServerGuard};
  use serde_json::json;
  use std::time::Duration;

  fn settings(server: Option<&ServerGuard>) -> Settings {
    let mut s = Settings::resolve(Config::default(), None);
    s.filters = vec![
      FilterDef { key: "web".into(), label: "Web".into(), playlist_id: "PLweb".into() },
      FilterDef { key: "python".into(), label: "Python".into(), playlist_id: "PLpy".into() },
    ];
    match server {
      Some(server) => {
        s.api_base = server.url();
        s.api_key = Some(KEY.into());
        s.channel_id = CHANNEL.into();
      }
      None => s.use_live_api = false,
    }
    s
  }

  async fn settle(app: &mut App) {
    for _ in 0..500 {
      app.check_pending();
      if !app.has_pending() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("background fetches did not finish");
  }

  fn listing(n: usize) -> String {
    let now = Utc::now();
    let items: Vec<_> = (0..n).map(|i| search_item(&format!("v{}", i), now - ChronoDuration::days(i as i64))).collect();
    json!({ "items": items }).to_string()
  }

  #[tokio::test]
  async fn end_to_end_channel_load() {
    let mut server = Server::new_async().await;
    let _channels = server
      .mock("GET", "/channels")
      .match_query(Matcher::Any)
      .with_body(channel_body(3_020, 500_000, 121))
      .create_async()
      .await;
    let _latest = server
      .mock("GET", "/search")
      .match_query(Matcher::UrlEncoded("maxResults".into(), "1".into()))
      .with_body(json!({ "items": [search_item("v0", Utc::now())] }).to_string())
      .create_async()
      .await;
    let _all = server
      .mock("GET", "/search")
      .match_query(Matcher::UrlEncoded("maxResults".into(), "50".into()))
      .with_body(listing(121))
      .create_async()
      .await;

    let mut app = App::new(settings(Some(&server)));
    assert!(app.is_live());
    app.start();
    settle(&mut app).await;

    let stats = app.stats.clone().unwrap();
    assert_eq!(stats.subscriber_display, "3.0K");
    assert_eq!(stats.video_count_display, "121+");
    assert_eq!(stats.latest_upload, "Today");

    assert_eq!(app.videos.all_videos().len(), 121);
    assert_eq!(app.grid.cards.len(), 3);
    assert_eq!(app.grid.load_more.as_deref(), Some("Load More (9 more)"));
    assert_eq!(app.grid.results_label, "Showing 3 of 121 tutorials");

    app.load_more();
    assert_eq!(app.grid.cards.len(), 12);
    assert_eq!(app.grid.results_label, "Showing 12 of 121 tutorials");
  }

  #[tokio::test]
  async fn offline_uses_fallback_and_leaves_grid_empty() {
    let mut app = App::new(settings(None));
    assert!(!app.is_live());
    app.start();
    assert!(!app.has_pending());
    assert_eq!(app.stats, Some(app.settings.fallback.to_stats()));
    assert!(app.grid.cards.is_empty());
    assert!(app.grid.load_more.is_none());
  }

  #[tokio::test]
  async fn failed_stats_fall_back() {
    let mut server = Server::new_async().await;
    let _channels =
      server.mock("GET", "/channels").match_query(Matcher::Any).with_status(503).create_async().await;
    let mut app = App::new(settings(Some(&server)));
    app.trigger_stats();
    settle(&mut app).await;
    assert_eq!(app.stats, Some(app.settings.fallback.to_stats()));
    assert!(!app.stats_loading);
  }

  #[tokio::test]
  async fn failed_playlist_keeps_grid() {
    let mut server = Server::new_async().await;
    let _items = server.mock("GET", "/playlistItems").match_query(Matcher::Any).with_status(500).create_async().await;

    let mut app = App::new(settings(Some(&server)));
    app.cache.put_videos(VideoSource::Channel, make_videos(10));
    app.trigger_load();
    let before: Vec<String> = app.grid.cards.iter().map(|v| v.id.clone()).collect();
    assert_eq!(before.len(), 3);

    app.select_tab(1);
    settle(&mut app).await;
    let after: Vec<String> = app.grid.cards.iter().map(|v| v.id.clone()).collect();
    assert_eq!(before, after);
    assert_eq!(app.videos.current_filter(), &Filter::All);
  }

  #[tokio::test]
  async fn superseded_filter_fetch_is_discarded_but_cached() {
    let mut server = Server::new_async().await;
    let body = json!({ "items": [
      { "snippet": { "publishedAt": "2024-01-01T00:00:00Z", "title": "Web one", "resourceId": { "videoId": "w1" } } },
      { "snippet": { "publishedAt": "2024-01-02T00:00:00Z", "title": "Web two", "resourceId": { "videoId": "w2" } } }
    ]});
    let _web = server
      .mock("GET", "/playlistItems")
      .match_query(Matcher::UrlEncoded("playlistId".into(), "PLweb".into()))
      .with_body(body.to_string())
      .create_async()
      .await;

    let mut app = App::new(settings(Some(&server)));
    app.cache.put_videos(VideoSource::Channel, make_videos(10));
    app.cache.put_videos(VideoSource::Playlist("python".into()), make_videos(5));
    app.trigger_load();

    // Web misses the cache and starts a fetch; Python is a cache hit and wins.
    app.select_tab(1);
    app.select_tab(2);
    assert_eq!(app.videos.current_filter(), &Filter::Category("python".into()));

    settle(&mut app).await;
    assert_eq!(app.videos.current_filter(), &Filter::Category("python".into()));
    assert_eq!(app.videos.current_videos().len(), 5);
    assert_eq!(app.active_tab, 2);
    let cached = app.cache.get_videos(&VideoSource::Playlist("web".into())).unwrap();
    assert_eq!(cached.len(), 2);
  }

  #[tokio::test]
  async fn filter_click_clears_search() {
    let mut app = App::new(settings(None));
    app.cache.put_videos(VideoSource::Channel, make_videos(20));
    app.cache.put_videos(VideoSource::Playlist("web".into()), make_videos(6));
    app.trigger_load();

    app.input = "python".into();
    app.set_search();
    assert_eq!(app.grid.cards.len(), 10);
    assert!(app.grid.load_more.is_none());

    app.select_tab(1);
    assert!(app.input.is_empty());
    assert!(!app.videos.is_searching());
    assert_eq!(app.grid.cards.len(), 3);
    assert_eq!(app.grid.results_label, "Showing 3 of 6 tutorials");

    app.select_tab(0);
    assert_eq!(app.videos.current_filter(), &Filter::All);
    assert_eq!(app.grid.results_label, "Showing 3 of 20 tutorials");
  }

  #[tokio::test]
  async fn search_typed_during_playlist_fetch_survives_arrival() {
    let mut server = Server::new_async().await;
    let body = json!({ "items": [
      { "snippet": { "publishedAt": "2024-01-01T00:00:00Z", "title": "Web one", "resourceId": { "videoId": "w1" } } },
      { "snippet": { "publishedAt": "2024-01-02T00:00:00Z", "title": "Web two", "resourceId": { "videoId": "w2" } } },
      { "snippet": { "publishedAt": "2024-01-03T00:00:00Z", "title": "Web three", "resourceId": { "videoId": "w3" } } },
      { "snippet": { "publishedAt": "2024-01-04T00:00:00Z", "title": "Web four", "resourceId": { "videoId": "w4" } } }
    ]});
    let _web = server
      .mock("GET", "/playlistItems")
      .match_query(Matcher::UrlEncoded("playlistId".into(), "PLweb".into()))
      .with_body(body.to_string())
      .create_async()
      .await;

    let mut app = App::new(settings(Some(&server)));
    app.cache.put_videos(VideoSource::Channel, make_videos(10));
    app.trigger_load();

    app.select_tab(1);
    app.input = "one".into();
    app.set_search();
    settle(&mut app).await;

    assert_eq!(app.videos.current_filter(), &Filter::Category("web".into()));
    assert!(app.videos.is_searching());
    let titles: Vec<&str> = app.grid.cards.iter().map(|v| v.title.as_str()).collect();
    assert_eq!(titles, ["Web one"]);
    assert_eq!(app.grid.results_label, "Found 1 of 4 tutorials");
    assert!(app.grid.load_more.is_none());
  }

  #[tokio::test]
  async fn tabs_wrap_around() {
    let mut app = App::new(settings(None));
    assert_eq!(app.tab_labels(), ["All", "Web", "Python"]);
    app.prev_tab();
    assert_eq!(app.active_tab, 2);
    app.next_tab();
    assert_eq!(app.active_tab, 0);
  }

  #[tokio::test]
  async fn refresh_invalidates_and_refetches_stats() {
    let mut app = App::new(settings(None));
    app.cache.put_videos(VideoSource::Channel, make_videos(4));
    app.start();
    assert!(app.cache.get_videos(&VideoSource::Channel).is_some());

    app.tick(Instant::now() + app.settings.cache_ttl);
    assert!(app.cache.get_videos(&VideoSource::Channel).is_none());
    assert_eq!(app.stats, Some(app.settings.fallback.to_stats()));
  }

  #[tokio::test]
  async fn counters_wait_for_stats() {
    let mut app = App::new(settings(None));
    app.observe_stat(0, 1.0);
    assert!(!app.presenter.is_animating());
    app.trigger_stats();
    app.observe_stat(0, 1.0);
    assert!(app.presenter.is_animating());
  }
}
