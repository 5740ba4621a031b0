mod app;
mod cache;
mod config;
mod constants;
mod counter;
mod fallback;
mod input;
mod models;
mod ui;
mod videos;
mod youtube;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use app::App;
use config::{API_KEY_ENV, Settings, project_dirs};
use fallback::stats_or_fallback;
use youtube::YouTubeClient;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Skip the YouTube API and show the built-in stats
  #[arg(long)]
  offline: bool,

  /// Channel to showcase (overrides the config file)
  #[arg(long)]
  channel: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print channel stats as JSON and exit
  Stats,
  /// Print the full video listing as JSON and exit
  Videos {
    /// Playlist filter key (e.g. 'python'); the whole channel when omitted
    #[arg(short, long)]
    filter: Option<String>,
  },
  /// Generate shell completions
  Completions { shell: Shell },
}

// --- Logging ---

/// Log to a daily rolling file so the terminal UI stays clean. Returns `None`
/// when there is no usable data directory.
fn init_logging() -> Option<WorkerGuard> {
  use tracing_subscriber::EnvFilter;

  let dir = project_dirs()?.data_local_dir().join("logs");
  std::fs::create_dir_all(&dir).ok()?;
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "showcase.log"));
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(writer).with_ansi(false).try_init().ok()?;
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _guard = init_logging();

  let mut settings = Settings::load();
  if args.offline {
    settings.use_live_api = false;
  }
  if let Some(channel) = args.channel {
    settings.channel_id = channel;
  }
  info!(channel = %settings.channel_id, live = settings.use_live_api, "startup");

  match args.command {
    Some(Command::Stats) => print_stats(&settings).await,
    Some(Command::Videos { filter }) => print_videos(&settings, filter.as_deref()).await,
    Some(Command::Completions { shell }) => {
      clap_complete::generate(shell, &mut Args::command(), env!("CARGO_PKG_NAME"), &mut std::io::stdout());
      Ok(())
    }
    None => {
      let default_hook = std::panic::take_hook();
      std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        default_hook(info);
      }));

      let mut terminal = ratatui::init();
      let result = run(&mut terminal, settings).await;
      ratatui::restore();
      result
    }
  }
}

async fn print_stats(settings: &Settings) -> Result<()> {
  let gateway = YouTubeClient::from_settings(settings);
  let stats = stats_or_fallback(gateway.as_ref(), &settings.fallback).await;
  println!("{}", serde_json::to_string_pretty(&stats)?);
  Ok(())
}

async fn print_videos(settings: &Settings, filter: Option<&str>) -> Result<()> {
  let Some(gateway) = YouTubeClient::from_settings(settings) else {
    bail!("Video listings need the live API: set {} or `api_key` in the config file", API_KEY_ENV);
  };
  let videos = match filter {
    Some(key) => {
      if settings.filter(key).is_none() {
        let known: Vec<&str> = settings.filters.iter().map(|f| f.key.as_str()).collect();
        bail!("Unknown filter '{}' (known: {})", key, known.join(", "));
      }
      gateway.fetch_playlist_videos(key).await
    }
    None => gateway.fetch_all_channel_videos().await,
  }
  .context("Failed to fetch video listing")?;
  println!("{}", serde_json::to_string_pretty(&videos)?);
  Ok(())
}

async fn run(terminal: &mut DefaultTerminal, settings: Settings) -> Result<()> {
  let mut app = App::new(settings);
  app.start();

  loop {
    app.check_pending();
    app.tick(Instant::now());

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    let busy = app.presenter.is_animating() || app.has_pending();
    let timeout = if busy { app.settings.counter_tick } else { Duration::from_millis(100) };
    if event::poll(timeout)? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(&mut app, key),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("shutdown");
  Ok(())
}
