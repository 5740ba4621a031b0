use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::ChannelStats;
use crate::youtube::YouTubeClient;

/// Pre-baked channel numbers shown when the live API is disabled or failing.
/// Display strings are stored verbatim rather than derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackStats {
  pub subscriber_count: u64,
  pub total_view_count: u64,
  pub video_count: u64,
  pub estimated_impact: u64,
  pub latest_upload: String,
  pub subscriber_display: String,
  pub video_count_display: String,
}

impl FallbackStats {
  pub fn to_stats(&self) -> ChannelStats {
    ChannelStats {
      subscriber_count: self.subscriber_count,
      total_view_count: self.total_view_count,
      video_count: self.video_count,
      estimated_impact: self.estimated_impact,
      latest_upload: self.latest_upload.clone(),
      subscriber_display: self.subscriber_display.clone(),
      video_count_display: self.video_count_display.clone(),
    }
  }
}

/// Live stats when a gateway is available and answers, the fallback record otherwise.
pub async fn stats_or_fallback(gateway: Option<&YouTubeClient>, fallback: &FallbackStats) -> ChannelStats {
  let Some(gateway) = gateway else { return fallback.to_stats() };
  match gateway.fetch_channel_stats().await {
    Ok(stats) => stats,
    Err(e) => {
      warn!(err = %e, "stats: fetch failed, falling back to static data");
      fallback.to_stats()
    }
  }
}
