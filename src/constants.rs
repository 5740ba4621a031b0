//! Built-in channel defaults from `constants.ron`, embedded with
//! `include_str!` and parsed on first access. `config.toml` overrides most of
//! these at runtime (see `config.rs`).

use serde::Deserialize;
use std::sync::LazyLock;

use crate::fallback::FallbackStats;

/// A category tab in the video grid, bound to one playlist.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FilterDef {
  pub key: String,
  pub label: String,
  pub playlist_id: String,
}

/// A headline stat card. `target` is the static number shown when the label
/// does not map onto a live channel statistic.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StatCardDef {
  pub label: String,
  pub target: u64,
}

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  pub channel_id: String,
  pub api_base: String,
  pub use_live_api: bool,

  // Cache
  pub cache_ttl_secs: u64,

  // Gateway paging
  pub search_page_size: u32,

  // Video grid paging
  pub initial_page_size: usize,
  pub increment_page_size: usize,

  // Count-up counters
  pub counter_duration_ms: u64,
  pub counter_tick_ms: u64,
  pub visibility_threshold: f64,

  pub impact_multiplier: f64,
  pub filters: Vec<FilterDef>,
  pub stat_cards: Vec<StatCardDef>,
  pub fallback: FallbackStats,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.cache_ttl_secs, 300);
    assert_eq!(c.initial_page_size, 3);
    assert_eq!(c.increment_page_size, 9);
    assert_eq!(c.search_page_size, 50);
    assert!(!c.filters.is_empty());
    assert_eq!(c.stat_cards.len(), 4);
  }

  #[test]
  fn filter_keys_are_unique() {
    let c = constants();
    let mut keys: Vec<&str> = c.filters.iter().map(|f| f.key.as_str()).collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), c.filters.len());
    assert!(!keys.contains(&"all"));
  }
}
