//! In-memory TTL cache for gateway results.
//!
//! Holds the channel stats, the whole-channel upload list and one upload list
//! per playlist key. Every entry keeps its own fetch timestamp; one TTL applies
//! to all of them. There is no request de-duplication: two callers that both
//! observe a miss will both hit the network, and the later `put` wins.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::{ChannelStats, Video};

/// Where a video list comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VideoSource {
  /// Every upload on the channel.
  Channel,
  /// A configured playlist, by filter key.
  Playlist(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
  ChannelStats,
  Videos(VideoSource),
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
  payload: Option<T>,
  fetched_at: Option<Instant>,
}

impl<T> Default for CacheEntry<T> {
  fn default() -> Self {
    Self { payload: None, fetched_at: None }
  }
}

impl<T: Clone> CacheEntry<T> {
  fn store(&mut self, value: T, now: Instant) {
    self.payload = Some(value);
    self.fetched_at = Some(now);
  }

  fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
    match (&self.payload, self.fetched_at) {
      (Some(_), Some(at)) => now.saturating_duration_since(at) < ttl,
      _ => false,
    }
  }
}

#[derive(Debug)]
pub struct TtlCache {
  ttl: Duration,
  stats: CacheEntry<ChannelStats>,
  channel_videos: CacheEntry<Vec<Video>>,
  playlists: HashMap<String, CacheEntry<Vec<Video>>>,
}

impl TtlCache {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, stats: CacheEntry::default(), channel_videos: CacheEntry::default(), playlists: HashMap::new() }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  #[cfg(test)]
  pub fn is_fresh(&self, key: &CacheKey) -> bool {
    self.is_fresh_at(key, Instant::now())
  }

  pub fn is_fresh_at(&self, key: &CacheKey, now: Instant) -> bool {
    match key {
      CacheKey::ChannelStats => self.stats.is_fresh(self.ttl, now),
      CacheKey::Videos(VideoSource::Channel) => self.channel_videos.is_fresh(self.ttl, now),
      CacheKey::Videos(VideoSource::Playlist(k)) => self.playlists.get(k).is_some_and(|e| e.is_fresh(self.ttl, now)),
    }
  }

  pub fn get_stats(&self) -> Option<ChannelStats> {
    self.get_stats_at(Instant::now())
  }

  pub fn get_stats_at(&self, now: Instant) -> Option<ChannelStats> {
    let hit = if self.is_fresh_at(&CacheKey::ChannelStats, now) { self.stats.payload.clone() } else { None };
    debug!(hit = hit.is_some(), "cache: channel stats lookup");
    hit
  }

  pub fn put_stats(&mut self, stats: ChannelStats) {
    self.put_stats_at(stats, Instant::now());
  }

  pub fn put_stats_at(&mut self, stats: ChannelStats, now: Instant) {
    self.stats.store(stats, now);
    debug!(ttl_secs = self.ttl.as_secs(), "cache: channel stats stored");
  }

  pub fn get_videos(&self, source: &VideoSource) -> Option<Vec<Video>> {
    self.get_videos_at(source, Instant::now())
  }

  pub fn get_videos_at(&self, source: &VideoSource, now: Instant) -> Option<Vec<Video>> {
    let hit = if self.is_fresh_at(&CacheKey::Videos(source.clone()), now) {
      match source {
        VideoSource::Channel => self.channel_videos.payload.clone(),
        VideoSource::Playlist(k) => self.playlists.get(k).and_then(|e| e.payload.clone()),
      }
    } else {
      None
    };
    debug!(?source, hit = hit.is_some(), "cache: video list lookup");
    hit
  }

  pub fn put_videos(&mut self, source: VideoSource, videos: Vec<Video>) {
    self.put_videos_at(source, videos, Instant::now());
  }

  pub fn put_videos_at(&mut self, source: VideoSource, videos: Vec<Video>, now: Instant) {
    debug!(?source, count = videos.len(), "cache: video list stored");
    match source {
      VideoSource::Channel => self.channel_videos.store(videos, now),
      VideoSource::Playlist(k) => self.playlists.entry(k).or_default().store(videos, now),
    }
  }

  /// Mark every entry stale. Payloads are kept but never served again until
  /// they are replaced by a fresh `put`.
  pub fn invalidate(&mut self) {
    self.stats.fetched_at = None;
    self.channel_videos.fetched_at = None;
    for entry in self.playlists.values_mut() {
      entry.fetched_at = None;
    }
    debug!("cache: all entries invalidated");
  }
}
