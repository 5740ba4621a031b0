use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of the channel's headline numbers plus their display strings.
/// Replaced wholesale on every refetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
  pub subscriber_count: u64,
  pub total_view_count: u64,
  pub video_count: u64,
  pub estimated_impact: u64,
  /// Relative label of the newest upload, e.g. "3 days ago".
  pub latest_upload: String,
  pub subscriber_display: String,
  pub video_count_display: String,
}

impl ChannelStats {
  /// Build a snapshot from raw counts, deriving every display field.
  pub fn from_counts(
    subscriber_count: u64,
    total_view_count: u64,
    video_count: u64,
    latest_upload: String,
    impact: ImpactFormula,
  ) -> Self {
    Self {
      subscriber_count,
      total_view_count,
      video_count,
      estimated_impact: impact.estimate(subscriber_count),
      latest_upload,
      subscriber_display: format_subscribers(subscriber_count),
      video_count_display: format_video_count(video_count),
    }
  }
}

/// A single channel upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Video {
  pub id: String,
  pub title: String,
  pub description: String,
  pub thumbnail_url: Option<String>,
  pub published_at: DateTime<Utc>,
}

impl Video {
  pub fn watch_url(&self) -> String {
    format!("https://www.youtube.com/watch?v={}", self.id)
  }

  /// Case-insensitive substring match against title and description.
  /// `needle` must already be lowercase.
  pub fn matches(&self, needle: &str) -> bool {
    self.title.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
  }
}

/// Heuristic for the "students impacted" figure. There is no data behind it;
/// it is simply `floor(subscribers × multiplier)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactFormula {
  pub multiplier: f64,
}

impl ImpactFormula {
  pub fn estimate(self, subscribers: u64) -> u64 {
    (subscribers as f64 * self.multiplier).floor().max(0.0) as u64
  }
}

impl Default for ImpactFormula {
  fn default() -> Self {
    Self { multiplier: 2.0 }
  }
}

/// Group an integer with thousands separators: `2500000` → `2,500,000`.
pub fn group_thousands(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

pub fn format_subscribers(count: u64) -> String {
  if count >= 1_000_000 {
    format!("{:.1}M", count as f64 / 1_000_000.0)
  } else if count >= 1_000 {
    format!("{:.1}K", count as f64 / 1_000.0)
  } else {
    group_thousands(count)
  }
}

pub fn format_video_count(count: u64) -> String {
  if count >= 100 { format!("{}+", count) } else { count.to_string() }
}

/// Bucket whole elapsed days into the label shown next to "Latest upload".
pub fn relative_upload_label(days: i64) -> String {
  match days {
    i64::MIN..=0 => "Today".to_string(),
    1 => "Yesterday".to_string(),
    2..=6 => format!("{} days ago", days),
    7..=29 => format!("{} weeks ago", days / 7),
    _ => format!("{} months ago", days / 30),
  }
}

/// Whole days between `published` and `now`, floored.
pub fn days_since(published: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
  (now - published).num_days()
}
