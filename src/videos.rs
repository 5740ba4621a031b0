//! Video list engine: randomized working set, category filter, free-text
//! search and "load more" paging over the tutorial grid.
//!
//! The engine is a plain state machine. [`VideoListState::apply`] takes one
//! [`ListEvent`] and returns the [`RenderInstruction`] the grid should carry
//! out, or `None` when the grid must be left as it is.

use rand::Rng;
use tracing::debug;

use crate::models::Video;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
  All,
  Category(String),
}

impl Filter {
  pub fn key(&self) -> &str {
    match self {
      Filter::All => "all",
      Filter::Category(k) => k,
    }
  }
}

#[derive(Debug, Clone)]
pub enum ListEvent {
  /// Whole-channel upload list arrived.
  Loaded(Vec<Video>),
  /// Switch back to every upload.
  FilterAll,
  /// A category's playlist arrived (from cache or network).
  FilterLoaded { key: String, videos: Vec<Video> },
  /// Search box contents changed.
  Search(String),
  LoadMore,
}

/// What the grid should draw after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInstruction {
  pub videos: Vec<Video>,
  /// Append to the cards already shown instead of replacing them.
  pub append: bool,
  pub has_more: bool,
  pub total_count: usize,
  pub shown_count: usize,
  /// Set while a search term is active.
  pub searching: bool,
  /// How many cards the next "load more" would add.
  pub next_page: usize,
}

impl RenderInstruction {
  pub fn results_label(&self) -> String {
    if self.searching {
      format!("Found {} of {} tutorials", self.shown_count, self.total_count)
    } else {
      format!("Showing {} of {} tutorials", self.shown_count, self.total_count)
    }
  }

  /// Label of the load-more control, or `None` when it must be hidden.
  pub fn load_more_label(&self) -> Option<String> {
    self.has_more.then(|| format!("Load More ({} more)", self.next_page))
  }
}

/// Uniform in-place Fisher–Yates shuffle.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
  for i in (1..items.len()).rev() {
    let j = rng.gen_range(0..=i);
    items.swap(i, j);
  }
}

fn shuffled<R: Rng + ?Sized>(videos: &[Video], rng: &mut R) -> Vec<Video> {
  let mut out = videos.to_vec();
  fisher_yates(&mut out, rng);
  out
}

#[derive(Debug)]
pub struct VideoListState {
  all_videos: Vec<Video>,
  /// The active filter's view, kept so clearing a search restores it exactly.
  filter_videos: Vec<Video>,
  current_videos: Vec<Video>,
  displayed_count: usize,
  current_filter: Filter,
  search_term: String,
  initial_page_size: usize,
  increment_page_size: usize,
  generation: u64,
}

impl VideoListState {
  pub fn new(initial_page_size: usize, increment_page_size: usize) -> Self {
    Self {
      all_videos: Vec::new(),
      filter_videos: Vec::new(),
      current_videos: Vec::new(),
      displayed_count: 0,
      current_filter: Filter::All,
      search_term: String::new(),
      initial_page_size: initial_page_size.max(1),
      increment_page_size: increment_page_size.max(1),
      generation: 0,
    }
  }

  pub fn all_videos(&self) -> &[Video] {
    &self.all_videos
  }

  #[cfg(test)]
  pub fn current_videos(&self) -> &[Video] {
    &self.current_videos
  }

  #[cfg(test)]
  pub fn displayed_count(&self) -> usize {
    self.displayed_count
  }

  pub fn current_filter(&self) -> &Filter {
    &self.current_filter
  }

  pub fn search_term(&self) -> &str {
    &self.search_term
  }

  pub fn is_searching(&self) -> bool {
    !self.search_term.is_empty()
  }

  pub fn has_more(&self) -> bool {
    !self.is_searching() && self.displayed_count < self.current_videos.len()
  }

  /// Token identifying the latest logical operation. A fetch started under an
  /// older generation must not be applied.
  pub fn generation(&self) -> u64 {
    self.generation
  }

  /// Start a new logical operation and return its token.
  pub fn begin(&mut self) -> u64 {
    self.generation += 1;
    self.generation
  }

  pub fn is_current(&self, generation: u64) -> bool {
    self.generation == generation
  }

  fn page_size(&self) -> usize {
    if self.displayed_count == 0 { self.initial_page_size } else { self.increment_page_size }
  }

  pub fn apply<R: Rng + ?Sized>(&mut self, event: ListEvent, rng: &mut R) -> Option<RenderInstruction> {
    match event {
      ListEvent::Loaded(videos) => {
        if videos.is_empty() {
          debug!("videos: empty channel listing, keeping current grid");
          return None;
        }
        self.all_videos = shuffled(&videos, rng);
        self.current_filter = Filter::All;
        self.reset_view(self.all_videos.clone())
      }
      ListEvent::FilterAll => {
        if self.all_videos.is_empty() {
          return None;
        }
        self.current_filter = Filter::All;
        let view = shuffled(&self.all_videos, rng);
        self.reset_view(view)
      }
      ListEvent::FilterLoaded { key, videos } => {
        if videos.is_empty() {
          debug!(key = %key, "videos: empty playlist, keeping current grid");
          return None;
        }
        self.current_filter = Filter::Category(key);
        let view = shuffled(&videos, rng);
        self.reset_view(view)
      }
      ListEvent::Search(term) => Some(self.search(&term)),
      ListEvent::LoadMore => self.load_more(),
    }
  }

  /// Replace the filter view, clear any search and render the initial page.
  fn reset_view(&mut self, view: Vec<Video>) -> Option<RenderInstruction> {
    self.filter_videos = view;
    self.current_videos = self.filter_videos.clone();
    self.search_term.clear();
    self.displayed_count = 0;
    self.load_more()
  }

  fn search(&mut self, term: &str) -> RenderInstruction {
    let needle = term.trim().to_lowercase();
    self.search_term = needle.clone();
    self.displayed_count = 0;

    if needle.is_empty() {
      self.current_videos = self.filter_videos.clone();
      return self.load_more().unwrap_or_else(|| self.instruction(Vec::new(), false));
    }

    self.current_videos = self.filter_videos.iter().filter(|v| v.matches(&needle)).cloned().collect();
    self.displayed_count = self.current_videos.len();
    debug!(term = %needle, matches = self.current_videos.len(), "videos: search applied");
    self.instruction(self.current_videos.clone(), false)
  }

  fn load_more(&mut self) -> Option<RenderInstruction> {
    if self.is_searching() {
      return None;
    }
    let start = self.displayed_count;
    let total = self.current_videos.len();
    if start >= total {
      return None;
    }
    let end = (start + self.page_size()).min(total);
    let page = self.current_videos[start..end].to_vec();
    self.displayed_count = end;
    Some(self.instruction(page, start > 0))
  }

  fn instruction(&self, videos: Vec<Video>, append: bool) -> RenderInstruction {
    let remaining = self.current_videos.len().saturating_sub(self.displayed_count);
    RenderInstruction {
      videos,
      append,
      has_more: self.has_more(),
      total_count: if self.is_searching() { self.filter_videos.len() } else { self.current_videos.len() },
      shown_count: self.displayed_count,
      searching: self.is_searching(),
      next_page: remaining.min(self.page_size()),
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use chrono::Utc;
  use rand::SeedableRng;
  use rand::rngs::StdRng;

  pub(crate) fn make_videos(n: usize) -> Vec<Video> {
    (0..n)
      .map(|i| Video {
        id: format!("v{}", i),
        title: if i % 2 == 0 { format!("Python basics {}", i) } else { format!("JavaScript deep dive {}", i) },
        description: if i % 5 == 0 { "Includes a Flask project".to_string() } else { String::new() },
        thumbnail_url: None,
        published_at: Utc::now(),
      })
      .collect()
  }

  fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
  }

  fn ids(videos: &[Video]) -> Vec<String> {
    videos.iter().map(|v| v.id.clone()).collect()
  }

  fn loaded(n: usize) -> (VideoListState, StdRng) {
    let mut rng = rng();
    let mut state = VideoListState::new(3, 9);
    state.apply(ListEvent::Loaded(make_videos(n)), &mut rng);
    (state, rng)
  }

  // --- fisher_yates ---

  #[test]
  fn shuffle_preserves_multiset_and_length() {
    let mut rng = rng();
    for n in [0, 1, 2, 10, 121] {
      let original: Vec<usize> = (0..n).collect();
      let mut items = original.clone();
      fisher_yates(&mut items, &mut rng);
      assert_eq!(items.len(), n);
      let mut sorted = items.clone();
      sorted.sort_unstable();
      assert_eq!(sorted, original);
    }
  }

  #[test]
  fn shuffle_reaches_every_ordering_of_three() {
    let mut rng = rng();
    let mut counts = std::collections::HashMap::new();
    for _ in 0..6000 {
      let mut items = [1, 2, 3];
      fisher_yates(&mut items, &mut rng);
      *counts.entry(items).or_insert(0usize) += 1;
    }
    assert_eq!(counts.len(), 6);
    // Each of the 3! orderings should land near 1000.
    assert!(counts.values().all(|&c| (800..1200).contains(&c)), "{:?}", counts);
  }

  // --- load / load more ---

  #[test]
  fn load_renders_initial_page() {
    let mut rng = rng();
    let mut state = VideoListState::new(3, 9);
    let r = state.apply(ListEvent::Loaded(make_videos(121)), &mut rng).unwrap();

    assert_eq!(r.videos.len(), 3);
    assert!(!r.append);
    assert!(r.has_more);
    assert_eq!(r.total_count, 121);
    assert_eq!(r.shown_count, 3);
    assert_eq!(r.next_page, 9);
    assert_eq!(r.load_more_label().as_deref(), Some("Load More (9 more)"));
    assert_eq!(r.results_label(), "Showing 3 of 121 tutorials");
    assert_eq!(state.all_videos().len(), 121);
    assert_eq!(ids(state.all_videos()), ids(state.current_videos()));
  }

  #[test]
  fn empty_load_leaves_grid_alone() {
    let mut rng = rng();
    let mut state = VideoListState::new(3, 9);
    assert!(state.apply(ListEvent::Loaded(Vec::new()), &mut rng).is_none());
    assert!(state.apply(ListEvent::FilterAll, &mut rng).is_none());
    assert!(state.apply(ListEvent::LoadMore, &mut rng).is_none());
  }

  #[test]
  fn load_more_pages_until_exhausted() {
    let (mut state, mut rng) = loaded(20);
    let mut d = state.displayed_count();
    assert_eq!(d, 3);

    loop {
      let before = d;
      let Some(r) = state.apply(ListEvent::LoadMore, &mut rng) else { break };
      let l = state.current_videos().len();
      assert!(r.append);
      assert_eq!(r.videos.len(), 9.min(l - before));
      d = state.displayed_count();
      assert_eq!(d, (before + 9).min(l));
      assert_eq!(r.has_more, d < l);
      assert_eq!(r.load_more_label().is_some(), r.has_more);
    }
    assert_eq!(d, 20);
    assert!(!state.has_more());
  }

  #[test]
  fn load_more_tail_offers_fewer() {
    let (mut state, mut rng) = loaded(10);
    let r = state.apply(ListEvent::LoadMore, &mut rng).unwrap();
    assert_eq!(r.videos.len(), 7);
    assert!(!r.has_more);
    assert!(r.load_more_label().is_none());

    let (mut state, mut rng) = loaded(8);
    let first = state.apply(ListEvent::FilterAll, &mut rng).unwrap();
    assert_eq!(first.next_page, 5);
    assert_eq!(first.load_more_label().as_deref(), Some("Load More (5 more)"));
  }

  #[test]
  fn short_list_has_no_more() {
    let mut rng = rng();
    let mut state = VideoListState::new(3, 9);
    let r = state.apply(ListEvent::Loaded(make_videos(2)), &mut rng).unwrap();
    assert_eq!(r.videos.len(), 2);
    assert!(!r.has_more);
    assert_eq!(state.displayed_count(), 2);
  }

  // --- filters ---

  #[test]
  fn filter_all_reshuffles_and_resets() {
    let (mut state, mut rng) = loaded(50);
    state.apply(ListEvent::LoadMore, &mut rng);
    assert_eq!(state.displayed_count(), 12);

    let r = state.apply(ListEvent::FilterAll, &mut rng).unwrap();
    assert_eq!(r.videos.len(), 3);
    assert!(!r.append);
    assert_eq!(state.displayed_count(), 3);
    assert_eq!(state.current_filter(), &Filter::All);

    let mut a = ids(state.all_videos());
    let mut c = ids(state.current_videos());
    a.sort();
    c.sort();
    assert_eq!(a, c);
  }

  #[test]
  fn filter_category_replaces_current_view() {
    let (mut state, mut rng) = loaded(50);
    let playlist = make_videos(4);
    let r = state.apply(ListEvent::FilterLoaded { key: "python".into(), videos: playlist }, &mut rng).unwrap();

    assert_eq!(state.current_filter(), &Filter::Category("python".into()));
    assert_eq!(state.current_videos().len(), 4);
    assert_eq!(r.total_count, 4);
    assert_eq!(r.videos.len(), 3);
    assert_eq!(state.all_videos().len(), 50);
  }

  #[test]
  fn empty_playlist_keeps_previous_view() {
    let (mut state, mut rng) = loaded(10);
    let before = ids(state.current_videos());
    assert!(state.apply(ListEvent::FilterLoaded { key: "web".into(), videos: vec![] }, &mut rng).is_none());
    assert_eq!(ids(state.current_videos()), before);
    assert_eq!(state.current_filter(), &Filter::All);
  }

  #[test]
  fn filter_all_without_channel_listing_keeps_category() {
    let mut rng = rng();
    let mut state = VideoListState::new(3, 9);
    state.apply(ListEvent::FilterLoaded { key: "web".into(), videos: make_videos(5) }, &mut rng);
    let before = ids(state.current_videos());

    assert!(state.apply(ListEvent::FilterAll, &mut rng).is_none());
    assert_eq!(state.current_filter(), &Filter::Category("web".into()));
    assert_eq!(ids(state.current_videos()), before);
  }

  // --- search ---

  #[test]
  fn search_renders_all_matches_without_paging() {
    let (mut state, mut rng) = loaded(20);
    let r = state.apply(ListEvent::Search("  PYTHON ".into()), &mut rng).unwrap();
    assert_eq!(r.videos.len(), 10);
    assert!(!r.has_more);
    assert!(r.searching);
    assert_eq!(r.results_label(), "Found 10 of 20 tutorials");
    assert!(r.load_more_label().is_none());
    assert!(state.apply(ListEvent::LoadMore, &mut rng).is_none());
  }

  #[test]
  fn search_matches_description() {
    let (mut state, mut rng) = loaded(20);
    let r = state.apply(ListEvent::Search("flask".into()), &mut rng).unwrap();
    // indices 0, 5, 10, 15
    assert_eq!(r.videos.len(), 4);
  }

  #[test]
  fn search_with_no_matches() {
    let (mut state, mut rng) = loaded(20);
    let r = state.apply(ListEvent::Search("haskell".into()), &mut rng).unwrap();
    assert!(r.videos.is_empty());
    assert_eq!(r.results_label(), "Found 0 of 20 tutorials");
  }

  #[test]
  fn clearing_search_restores_exact_view() {
    let (mut state, mut rng) = loaded(30);
    state.apply(ListEvent::FilterLoaded { key: "python".into(), videos: make_videos(15) }, &mut rng);
    let before = ids(state.current_videos());

    state.apply(ListEvent::Search("java".into()), &mut rng);
    assert_ne!(ids(state.current_videos()), before);

    let r = state.apply(ListEvent::Search(String::new()), &mut rng).unwrap();
    assert_eq!(ids(state.current_videos()), before);
    assert_eq!(state.current_filter(), &Filter::Category("python".into()));
    assert_eq!(r.videos.len(), 3);
    assert_eq!(ids(&r.videos), before[..3].to_vec());
    assert!(!r.append);
    assert_eq!(state.displayed_count(), 3);
  }

  #[test]
  fn displayed_count_resets_on_every_change() {
    let (mut state, mut rng) = loaded(40);
    state.apply(ListEvent::LoadMore, &mut rng);
    state.apply(ListEvent::LoadMore, &mut rng);
    assert_eq!(state.displayed_count(), 21);

    // Each change renders exactly the initial page, i.e. it started from zero.
    let r = state.apply(ListEvent::FilterLoaded { key: "web".into(), videos: make_videos(12) }, &mut rng).unwrap();
    assert_eq!(r.shown_count, 3);
    state.apply(ListEvent::LoadMore, &mut rng);
    let r = state.apply(ListEvent::Search("python".into()), &mut rng).unwrap();
    assert_eq!(r.shown_count, r.videos.len());
    let r = state.apply(ListEvent::Search(String::new()), &mut rng).unwrap();
    assert_eq!(r.shown_count, 3);
  }

  // --- generation ---

  #[test]
  fn generation_tokens() {
    let mut state = VideoListState::new(3, 9);
    let first = state.begin();
    let second = state.begin();
    assert!(!state.is_current(first));
    assert!(state.is_current(second));
    assert_eq!(state.generation(), second);
  }
}
