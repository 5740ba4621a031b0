//! Count-up animation for the headline stat cards.
//!
//! A card starts counting the first time enough of it is on screen and never
//! restarts. Each tick adds a fixed step and the last frame is clamped to the
//! exact target.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::constants::StatCardDef;
use crate::models::{ChannelStats, group_thousands};

/// Live statistic a card label maps onto, if any.
pub fn live_target(label: &str, stats: &ChannelStats) -> Option<u64> {
  if label.contains("Subscribers") {
    Some(stats.subscriber_count)
  } else if label.contains("Views") {
    Some(stats.total_view_count)
  } else if label.contains("Tutorials") {
    Some(stats.video_count)
  } else if label.contains("Students") {
    Some(stats.estimated_impact)
  } else {
    None
  }
}

#[derive(Debug, Clone)]
pub struct CounterAnimation {
  target: u64,
  step: f64,
  current: f64,
  shown: u64,
  done: bool,
}

impl CounterAnimation {
  pub fn new(target: u64, duration: Duration, tick: Duration) -> Self {
    let steps = if tick.is_zero() { 0.0 } else { duration.as_nanos() as f64 / tick.as_nanos() as f64 };
    let step = if steps > 0.0 { target as f64 / steps } else { target as f64 };
    Self { target, step, current: 0.0, shown: 0, done: false }
  }

  /// Advance one tick and return the value to display.
  pub fn tick(&mut self) -> u64 {
    if self.done {
      return self.shown;
    }
    self.current += self.step;
    if self.current >= self.target as f64 {
      self.shown = self.target;
      self.done = true;
    } else {
      self.shown = self.current.floor() as u64;
    }
    self.shown
  }

  pub fn value(&self) -> u64 {
    self.shown
  }

  pub fn is_done(&self) -> bool {
    self.done
  }
}

#[derive(Debug)]
struct Card {
  label: String,
  static_target: u64,
  animation: Option<CounterAnimation>,
  next_tick: Option<Instant>,
}

#[derive(Debug)]
pub struct StatsPresenter {
  cards: Vec<Card>,
  duration: Duration,
  tick: Duration,
  threshold: f64,
}

impl StatsPresenter {
  pub fn new(cards: &[StatCardDef], duration: Duration, tick: Duration, threshold: f64) -> Self {
    let cards = cards
      .iter()
      .map(|c| Card { label: c.label.clone(), static_target: c.target, animation: None, next_tick: None })
      .collect();
    Self { cards, duration, tick, threshold }
  }

  pub fn len(&self) -> usize {
    self.cards.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cards.is_empty()
  }

  pub fn label(&self, index: usize) -> Option<&str> {
    self.cards.get(index).map(|c| c.label.as_str())
  }

  /// Report how much of card `index` is on screen (0.0..=1.0). Starts its
  /// counter once, the first time the ratio reaches the threshold. Returns
  /// whether the counter was started by this call.
  pub fn observe(&mut self, index: usize, visible_ratio: f64, stats: &ChannelStats, now: Instant) -> bool {
    let Some(card) = self.cards.get_mut(index) else { return false };
    if card.animation.is_some() || visible_ratio < self.threshold {
      return false;
    }
    let target = live_target(&card.label, stats).unwrap_or(card.static_target);
    debug!(label = %card.label, target, "stats: counter started");
    card.animation = Some(CounterAnimation::new(target, self.duration, self.tick));
    card.next_tick = Some(now + self.tick);
    true
  }

  /// Run every tick that has come due up to `now`.
  pub fn advance(&mut self, now: Instant) {
    let tick = self.tick;
    for card in &mut self.cards {
      let (Some(anim), Some(next)) = (card.animation.as_mut(), card.next_tick.as_mut()) else { continue };
      while !anim.is_done() && *next <= now {
        anim.tick();
        *next += tick;
      }
    }
  }

  pub fn is_animating(&self) -> bool {
    self.cards.iter().any(|c| c.animation.as_ref().is_some_and(|a| !a.is_done()))
  }

  pub fn value(&self, index: usize) -> Option<u64> {
    self.cards.get(index).map(|c| c.animation.as_ref().map_or(0, CounterAnimation::value))
  }

  /// Thousands-grouped numeral for card `index`.
  pub fn display(&self, index: usize) -> String {
    group_thousands(self.value(index).unwrap_or(0))
  }
}
