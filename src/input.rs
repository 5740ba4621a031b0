use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use crate::app::{App, AppMode};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Open `url` in the default browser without blocking the UI.
fn open_in_browser(url: &str) -> std::io::Result<()> {
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";
  let mut child = std::process::Command::new(cmd)
    .arg(url)
    .stdin(std::process::Stdio::null())
    .stdout(std::process::Stdio::null())
    .stderr(std::process::Stdio::null())
    .spawn()?;
  // Reap the child in a background thread to avoid zombie processes.
  std::thread::spawn(move || {
    let _ = child.wait();
  });
  Ok(())
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }
  app.last_error = None;

  match app.mode {
    AppMode::Browse => handle_browse_key(app, key),
    AppMode::Search => handle_search_key(app, key),
  }
}

fn handle_browse_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Char('q') => app.should_quit = true,
    KeyCode::Tab => app.next_tab(),
    KeyCode::BackTab => app.prev_tab(),
    KeyCode::Char('/') => {
      app.cursor_position = app.input.chars().count();
      app.mode = AppMode::Search;
    }
    KeyCode::Char('m') | KeyCode::Char(' ') => app.load_more(),
    KeyCode::Char('r') => app.refresh(),
    KeyCode::Down | KeyCode::Char('j') => {
      let count = app.grid.cards.len();
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| (i + 1) % count);
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      let count = app.grid.cards.len();
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Enter => {
      let Some(url) = app.selected_video().map(|v| v.watch_url()) else { return };
      if let Err(e) = open_in_browser(&url) {
        warn!(%url, err = %e, "input: failed to open browser");
        app.last_error = Some(format!("Failed to open browser: {}", e));
      }
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.clear_search();
      }
    }
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
      app.set_search();
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.set_search();
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.set_search();
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Enter | KeyCode::Down => {
      app.mode = AppMode::Browse;
    }
    KeyCode::Esc => {
      app.clear_search();
      app.mode = AppMode::Browse;
    }
    _ => {}
  }
}
