//! signage-player - headless runner for the signage slideshow
//!
//! Plays a playlist file on the current terminal the way an in-store screen
//! plays it in the viewer.
//!
//! # Execution Flow
//!
//! 1. Parse arguments, open the data directory and load `signage.yaml`
//! 2. Initialize logging → `<data-dir>/<log_dir>/signage.<date>`
//! 3. Load the playlist and the stored playback preferences
//! 4. Open a gallery session on a [`TerminalSurface`] on a current-thread runtime
//! 5. Feed stdin lines to the keyboard hub until the session closes
//! 6. Log the metrics summary
//!
//! # Keys (one per line)
//!
//! - `right` / `n`: next item, `left` / `p`: previous item
//! - `esc` / `q`: close
//! - `a`: toggle autoplay, `+` / `-`: longer / shorter interval

use anyhow::{Context, Result};
use clap::Parser;
use signage::config::ConfigManager;
use signage::models::{MediaSequence, PlaybackPreferences, SignageSettings};
use signage::services::{EngineSettings, FullscreenLifecycleManager, Key, KeyboardHub};
use signage::state::PreferencesManager;
use signage::ui::{GalleryController, SurfaceHandle, TerminalSurface};
use signage::{APP_NAME, Metrics, VERSION, logging};
use std::io::{self, BufRead};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "signage-player", author, version, about, long_about = None)]
struct Args {
    /// Playlist file (YAML list of media, or a mapping with `items` and `start`)
    #[arg(short, long)]
    playlist: String,

    /// Index of the first item to show; overrides the playlist's `start`
    #[arg(short, long)]
    start: Option<usize>,

    /// Directory holding signage.yaml, preferences.yaml and logs
    #[arg(long, default_value = "signage-data")]
    data_dir: String,

    /// Debug logging, also mirrored to stderr
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = ConfigManager::new(&args.data_dir)?;
    let settings = config_manager.load_settings()?;

    let debug_mode = args.debug || settings.debug_mode;
    let log_dir = config_manager.config_dir().join(&settings.log_dir);
    let _log_guard = logging::setup_logging_with_console(&log_dir, "signage", debug_mode, debug_mode)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let playlist = config_manager.load_playlist(&args.playlist)?;
    let start = args.start.unwrap_or_else(|| playlist.start_index());
    let sequence = playlist
        .into_sequence()
        .with_context(|| format!("Playlist {} has no items", args.playlist))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run_player(&config_manager, &settings, sequence, start));

    tracing::info!("Player shutdown complete");
    result
}

async fn run_player(
    config_manager: &ConfigManager,
    settings: &SignageSettings,
    sequence: MediaSequence,
    start: usize,
) -> Result<()> {
    let metrics = Arc::new(Metrics::new());

    let store = config_manager.preference_store()?;
    let preferences = PreferencesManager::load(
        Box::new(store),
        PlaybackPreferences::with_default_interval(settings.default_interval_ms),
    );

    let keyboard = KeyboardHub::new();
    let controller = GalleryController::new(
        preferences.clone(),
        keyboard.clone(),
        EngineSettings::from(settings),
        metrics.clone(),
    );

    let fullscreen = FullscreenLifecycleManager::from_settings(settings).with_metrics(metrics.clone());
    let surface = TerminalSurface::stdout(
        SurfaceHandle::new("player", APP_NAME),
        settings.simulated_video_length(),
    );

    let mut session = controller.open(sequence, start, fullscreen, surface, |reason| {
        tracing::info!("Slideshow closed: {:?}", reason);
    });

    spawn_stdin_reader(keyboard, preferences)?;

    let summary = tokio::select! {
        summary = session.closed() => summary?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, closing slideshow");
            session.close()?;
            session.closed().await?
        }
    };

    tracing::info!(
        "Session ended ({:?}): {} items shown, {} replays, fullscreen {:?}",
        summary.reason,
        summary.items_shown,
        summary.replays,
        summary.fullscreen
    );
    metrics.log_summary();
    Ok(())
}

/// Read stdin on a plain thread; it blocks and must not stall the runtime.
fn spawn_stdin_reader(keyboard: KeyboardHub, preferences: PreferencesManager) -> Result<()> {
    std::thread::Builder::new()
        .name("signage-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => handle_input(&Key::parse(&line), &keyboard, &preferences),
                    Err(e) => {
                        tracing::warn!("Stopped reading stdin: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("stdin closed");
        })
        .context("Failed to spawn stdin reader")?;
    Ok(())
}

fn handle_input(key: &Key, keyboard: &KeyboardHub, preferences: &PreferencesManager) {
    let result = match key {
        Key::Char('n') => {
            keyboard.dispatch(&Key::ArrowRight);
            Ok(())
        }
        Key::Char('p') => {
            keyboard.dispatch(&Key::ArrowLeft);
            Ok(())
        }
        Key::Char('q') => {
            keyboard.dispatch(&Key::Escape);
            Ok(())
        }
        Key::Char('a') => preferences.toggle_autoplay().map(|_| ()),
        Key::Char('+') => {
            let interval = preferences.current().interval.longer();
            preferences.set_interval(interval).map(|_| ())
        }
        Key::Char('-') => {
            let interval = preferences.current().interval.shorter();
            preferences.set_interval(interval).map(|_| ())
        }
        other => {
            keyboard.dispatch(other);
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::warn!("Preference change not saved: {}", e);
    }
}
