use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::{FilterDef, StatCardDef, constants};
use crate::fallback::FallbackStats;
use crate::models::ImpactFormula;

/// Environment variable consulted when `api_key` is absent from the config file.
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// User overrides read from `config.toml`. Every field is optional; anything
/// missing falls back to the compiled-in constants.
#[derive(Deserialize, Default, Debug)]
pub struct Config {
  pub api_key: Option<String>,
  pub api_base: Option<String>,
  pub channel_id: Option<String>,
  pub use_live_api: Option<bool>,
  pub cache_ttl_secs: Option<u64>,
  pub impact_multiplier: Option<f64>,
  pub initial_page_size: Option<usize>,
  pub increment_page_size: Option<usize>,
  pub filters: Option<Vec<FilterDef>>,
  pub stat_cards: Option<Vec<StatCardDef>>,
  pub fallback: Option<FallbackStats>,
}

pub fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "showcase")
}

pub fn config_path() -> Option<PathBuf> {
  project_dirs().map(|d| d.config_dir().join("config.toml"))
}

impl Config {
  pub fn load() -> Self {
    let Some(path) = config_path() else { return Self::default() };
    match std::fs::read_to_string(&path) {
      Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), err = %e, "config: ignoring unparsable config file");
        Self::default()
      }),
      Err(_) => {
        debug!(path = %path.display(), "config: no config file, using defaults");
        Self::default()
      }
    }
  }

  pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(content)
  }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
  pub api_key: Option<String>,
  pub api_base: String,
  pub channel_id: String,
  pub use_live_api: bool,
  pub cache_ttl: Duration,
  pub search_page_size: u32,
  pub initial_page_size: usize,
  pub increment_page_size: usize,
  pub counter_duration: Duration,
  pub counter_tick: Duration,
  pub visibility_threshold: f64,
  pub impact: ImpactFormula,
  pub filters: Vec<FilterDef>,
  pub stat_cards: Vec<StatCardDef>,
  pub fallback: FallbackStats,
}

impl Settings {
  /// Merge the user's config over the compiled-in constants. `env_key` is the
  /// value of [`API_KEY_ENV`], consulted only when the config has no key.
  pub fn resolve(config: Config, env_key: Option<String>) -> Self {
    let c = constants();
    let api_key = config.api_key.or(env_key).map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
    Self {
      api_key,
      api_base: config.api_base.unwrap_or_else(|| c.api_base.clone()),
      channel_id: config.channel_id.unwrap_or_else(|| c.channel_id.clone()),
      use_live_api: config.use_live_api.unwrap_or(c.use_live_api),
      cache_ttl: Duration::from_secs(config.cache_ttl_secs.unwrap_or(c.cache_ttl_secs).max(1)),
      search_page_size: c.search_page_size,
      initial_page_size: config.initial_page_size.unwrap_or(c.initial_page_size).max(1),
      increment_page_size: config.increment_page_size.unwrap_or(c.increment_page_size).max(1),
      counter_duration: Duration::from_millis(c.counter_duration_ms),
      counter_tick: Duration::from_millis(c.counter_tick_ms),
      visibility_threshold: c.visibility_threshold,
      impact: ImpactFormula { multiplier: config.impact_multiplier.unwrap_or(c.impact_multiplier) },
      filters: config.filters.unwrap_or_else(|| c.filters.clone()),
      stat_cards: config.stat_cards.unwrap_or_else(|| c.stat_cards.clone()),
      fallback: config.fallback.unwrap_or_else(|| c.fallback.clone()),
    }
  }

  /// Settings from the config file plus the environment.
  pub fn load() -> Self {
    Self::resolve(Config::load(), std::env::var(API_KEY_ENV).ok())
  }

  pub fn filter(&self, key: &str) -> Option<&FilterDef> {
    self.filters.iter().find(|f| f.key == key)
  }
}
