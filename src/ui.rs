use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph, Tabs},
};

use crate::app::{App, AppMode};

// --- Palette ---

const BG: Color = Color::Rgb(0x1e, 0x1e, 0x2e);
const FG: Color = Color::Rgb(0xcd, 0xd6, 0xf4);
const MUTED: Color = Color::Rgb(0x7f, 0x84, 0x9c);
const ACCENT: Color = Color::Rgb(0xf3, 0x8b, 0xa8);
const BORDER: Color = Color::Rgb(0x45, 0x47, 0x5a);
const HIGHLIGHT_BG: Color = Color::Rgb(0x31, 0x32, 0x44);
const ERROR: Color = Color::Rgb(0xf3, 0x8b, 0x8b);

/// Rows a stat card needs to be fully visible.
const STAT_CARD_HEIGHT: u16 = 4;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn bordered(title: Line<'_>) -> Block<'_> {
  Block::bordered().title(title).border_type(BorderType::Rounded).border_style(Style::default().fg(BORDER))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  frame.render_widget(Block::default().style(Style::default().bg(BG)), frame.area());

  let [header_area, stats_area, widget_area, tabs_area, search_area, grid_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Max(STAT_CARD_HEIGHT),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Min(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_stats(frame, app, stats_area);
  render_widget(frame, app, widget_area);
  render_tabs(frame, app, tabs_area);
  render_search(frame, app, search_area);
  render_grid(frame, app, grid_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let mode = if app.is_live() { "live" } else { "offline" };
  let left = Line::from(vec![
    Span::styled(" ▶ showcase ", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    Span::styled(format!("[{}] ", mode), Style::default().fg(MUTED)),
  ]);
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(MUTED)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_stats(frame: &mut Frame, app: &mut App, area: Rect) {
  if app.presenter.is_empty() || area.height == 0 {
    return;
  }
  let count = app.presenter.len();
  let visible_ratio = f64::from(area.height) / f64::from(STAT_CARD_HEIGHT);
  let areas = Layout::horizontal(vec![Constraint::Ratio(1, count as u32); count]).split(area);

  for (i, card_area) in areas.iter().enumerate() {
    app.observe_stat(i, visible_ratio);
    let label = app.presenter.label(i).unwrap_or_default().to_string();
    let lines = vec![
      Line::from(Span::styled(app.presenter.display(i), Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))),
      Line::from(Span::styled(truncate_str(&label, card_area.width.saturating_sub(2) as usize), Style::default().fg(MUTED))),
    ];
    let card = Paragraph::new(lines).alignment(Alignment::Center).block(bordered(Line::default()));
    frame.render_widget(card, *card_area);
  }
}

fn render_widget(frame: &mut Frame, app: &App, area: Rect) {
  let value = |s: &str| Span::styled(s.to_string(), Style::default().fg(FG).add_modifier(Modifier::BOLD));
  let key = |s: &str| Span::styled(s.to_string(), Style::default().fg(MUTED));

  let line = match (&app.stats, app.stats_loading) {
    (Some(stats), false) => Line::from(vec![
      key(" Latest upload: "),
      value(&stats.latest_upload),
      key("   Subscribers: "),
      value(&stats.subscriber_display),
      key("   Videos: "),
      value(&stats.video_count_display),
    ]),
    _ => Line::from(vec![
      key(" Latest upload: "),
      value("Loading…"),
      key("   Subscribers: "),
      value("Loading…"),
      key("   Videos: "),
      value("Loading…"),
    ]),
  };
  frame.render_widget(line, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
  let tabs = Tabs::new(app.tab_labels())
    .select(app.active_tab)
    .style(Style::default().fg(MUTED))
    .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD | Modifier::UNDERLINED))
    .padding(" ", " ")
    .divider("│");
  frame.render_widget(tabs, area);
}

fn render_search(frame: &mut Frame, app: &App, area: Rect) {
  let focused = app.mode == AppMode::Search;
  let title = Line::from(Span::styled(
    " Search tutorials ",
    Style::default().fg(if focused { ACCENT } else { MUTED }).add_modifier(Modifier::BOLD),
  ));
  let block = bordered(title).padding(Padding::horizontal(1));
  let inner_w = area.width.saturating_sub(4) as usize;

  let (text, style) = if app.input.is_empty() && !focused {
    ("press / to search".to_string(), Style::default().fg(MUTED))
  } else {
    (app.input.clone(), Style::default().fg(FG))
  };

  // Keep the cursor in view by scrolling the start of the text.
  let cursor_w = display_width(&app.input, app.cursor_position);
  let skip = cursor_w.saturating_sub(inner_w.saturating_sub(1));
  let shown: String = text.chars().skip(skip).collect();
  frame.render_widget(Paragraph::new(Span::styled(shown, style)).block(block), area);

  if focused {
    let x = area.x + 2 + (cursor_w - skip) as u16;
    frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
  }
}

fn render_grid(frame: &mut Frame, app: &mut App, area: Rect) {
  let title = Line::from(vec![
    Span::styled(" Tutorials ", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    Span::styled(format!("{} ", app.grid.results_label), Style::default().fg(MUTED)),
  ]);
  let block = bordered(title);

  if app.grid.cards.is_empty() {
    let message = if app.status_message.is_some() {
      "Loading tutorials…"
    } else if app.videos.is_searching() {
      "No tutorials match your search."
    } else {
      "No tutorials available."
    };
    let empty = Paragraph::new(Span::styled(message, Style::default().fg(MUTED))).alignment(Alignment::Center).block(block);
    frame.render_widget(empty, area);
    return;
  }

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let items: Vec<ListItem> = app
    .grid
    .cards
    .iter()
    .map(|video| {
      let date = video.published_at.format("%Y-%m-%d").to_string();
      let title_w = inner_w.saturating_sub(date.len() + 2);
      let first = Line::from(vec![
        Span::styled(truncate_str(&video.title, title_w), Style::default().fg(FG).add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(date, Style::default().fg(MUTED)),
      ]);
      let summary = video.description.lines().next().unwrap_or_default();
      let second = Line::from(Span::styled(truncate_str(summary, inner_w), Style::default().fg(MUTED)));
      ListItem::new(vec![first, second])
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(Style::default().bg(HIGHLIGHT_BG).fg(ACCENT))
    .highlight_symbol("▶ ");
  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  if let Some(ref err) = app.last_error {
    frame.render_widget(Line::from(Span::styled(format!(" {}", err), Style::default().fg(ERROR))), area);
    return;
  }
  let mut spans = Vec::new();
  if let Some(ref label) = app.grid.load_more {
    spans.push(Span::styled(format!(" [m] {} ", label), Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)));
  }
  let hints = match app.mode {
    AppMode::Browse => " Tab filter · / search · ↑↓ select · Enter open · r refresh · q quit",
    AppMode::Search => " type to filter · Enter done · Esc clear",
  };
  spans.push(Span::styled(hints, Style::default().fg(MUTED)));
  frame.render_widget(Line::from(spans), area);
}
