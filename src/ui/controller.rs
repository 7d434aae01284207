// Gallery controller - runs one fullscreen slideshow session
//
// This module wires the slideshow core together for one activation:
// - SlideshowEngine (position and advance policy)
// - FullscreenLifecycleManager (enter once, release once)
// - InputController (arrow keys and Escape)
// - PresentationSurface (rendering and playback reports)
// - SessionStateManager (observable snapshot)
//
// All of it is owned by a single session task that consumes commands,
// preference changes and the engine's current deadline in one select loop.

use crate::metrics::Metrics;
use crate::models::{FullscreenStatus, MediaDescriptor, MediaSequence, PlaybackPreferences, SessionState};
use crate::services::{
    EngineEvent, EngineSettings, FullscreenLifecycleManager, InputAction, InputController, KeyboardHub,
    SlideshowEngine,
};
use crate::state::{PreferencesManager, SessionStateManager};
use crate::ui::surface::{PresentationSurface, SurfaceEvents, SurfaceFrame};
use std::ops::ControlFlow;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Errors surfaced to callers of the gallery
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    #[error("Cannot present an empty media sequence")]
    EmptySequence,

    #[error("Gallery session is already closed")]
    SessionClosed,

    #[error("Gallery session task ended abnormally: {0}")]
    SessionAborted(String),
}

/// Why a session closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The close affordance or [`GallerySession::close`]
    Explicit,
    /// The Escape key
    Escape,
    /// The session handle was dropped
    Unmount,
}

/// Messages consumed by the session loop
#[derive(Debug)]
pub enum GalleryCommand {
    Next,
    Previous,
    /// `playback` is the token of the rendering the report is about, when known
    MediaEnded {
        media_id: String,
        playback: Option<u64>,
    },
    MediaFailed {
        media_id: String,
        playback: Option<u64>,
        reason: String,
    },
    ReplaceSequence(MediaSequence),
    Close(CloseReason),
}

/// What happened during a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub reason: CloseReason,
    pub items_shown: usize,
    pub replays: usize,
    pub fullscreen: FullscreenStatus,
}

/// Opens slideshow sessions with shared preferences, keyboard and metrics.
///
/// # Example
/// ```ignore
/// let controller = GalleryController::new(preferences, keyboard, EngineSettings::default(), metrics);
/// let mut session = controller.open(sequence, 0, fullscreen, surface, |reason| {
///     tracing::info!("closed: {:?}", reason);
/// });
/// let summary = session.closed().await?;
/// ```
#[derive(Clone)]
pub struct GalleryController {
    preferences: PreferencesManager,
    keyboard: KeyboardHub,
    engine_settings: EngineSettings,
    metrics: Arc<Metrics>,
    state: SessionStateManager,
}

impl GalleryController {
    pub fn new(
        preferences: PreferencesManager,
        keyboard: KeyboardHub,
        engine_settings: EngineSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            preferences,
            keyboard,
            engine_settings,
            metrics,
            state: SessionStateManager::new(),
        }
    }

    pub fn state(&self) -> &SessionStateManager {
        &self.state
    }

    pub fn preferences(&self) -> &PreferencesManager {
        &self.preferences
    }

    /// Validate raw items and open a session over them
    pub fn open_items<S, F>(
        &self,
        items: Vec<MediaDescriptor>,
        initial_index: usize,
        fullscreen: FullscreenLifecycleManager,
        surface: S,
        on_close: F,
    ) -> Result<GallerySession, GalleryError>
    where
        S: PresentationSurface + 'static,
        F: FnOnce(CloseReason) + Send + 'static,
    {
        let sequence = MediaSequence::new(items)?;
        Ok(self.open(sequence, initial_index, fullscreen, surface, on_close))
    }

    /// Start presenting `sequence` at `initial_index` (clamped into range).
    ///
    /// Enters fullscreen, binds keys, shows the first item and spawns the
    /// session loop. Must be called from within a tokio runtime.
    pub fn open<S, F>(
        &self,
        sequence: MediaSequence,
        initial_index: usize,
        mut fullscreen: FullscreenLifecycleManager,
        mut surface: S,
        on_close: F,
    ) -> GallerySession
    where
        S: PresentationSurface + 'static,
        F: FnOnce(CloseReason) + Send + 'static,
    {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let mut prefs_rx = self.preferences.subscribe();
        let prefs = *prefs_rx.borrow_and_update();

        tracing::info!(
            "Opening gallery on {} with {} items",
            surface.handle().id,
            sequence.len()
        );

        surface.attach(SurfaceEvents::new(commands_tx.clone()));
        self.state.open_session(&sequence, &prefs);

        let status = fullscreen.enter(surface.handle());
        self.state.set_fullscreen(status);

        let mut input = InputController::new(self.keyboard.clone());
        let key_tx = commands_tx.clone();
        input.bind(move |action| {
            let command = match action {
                InputAction::Next => GalleryCommand::Next,
                InputAction::Previous => GalleryCommand::Previous,
                InputAction::Close => GalleryCommand::Close(CloseReason::Escape),
            };
            // Session already gone; nothing to deliver to
            let _ = key_tx.send(command);
        });

        let mut engine = SlideshowEngine::new(self.engine_settings, self.metrics.clone());
        let events = engine.activate(sequence, initial_index, &prefs, Instant::now());

        let mut session = SessionLoop {
            engine,
            surface: Box::new(surface),
            fullscreen,
            input,
            state: self.state.clone(),
            prefs,
            on_close: Some(Box::new(on_close)),
        };
        session.apply_events(events);

        let task = tokio::spawn(session.run(commands_rx, prefs_rx));

        GallerySession {
            commands: commands_tx,
            task: Some(task),
            state: self.state.clone(),
        }
    }
}

/// Handle to a running session.
///
/// Every method returns immediately; the work happens on the session task.
/// Dropping the handle closes the session with [`CloseReason::Unmount`].
pub struct GallerySession {
    commands: mpsc::UnboundedSender<GalleryCommand>,
    task: Option<JoinHandle<SessionSummary>>,
    state: SessionStateManager,
}

impl GallerySession {
    fn send(&self, command: GalleryCommand) -> Result<(), GalleryError> {
        self.commands.send(command).map_err(|_| GalleryError::SessionClosed)
    }

    pub fn go_to_next(&self) -> Result<(), GalleryError> {
        self.send(GalleryCommand::Next)
    }

    pub fn go_to_previous(&self) -> Result<(), GalleryError> {
        self.send(GalleryCommand::Previous)
    }

    /// Report that `media_id` finished playing.
    ///
    /// Only the media id is checked; surfaces attached to the session report
    /// through [`SurfaceEvents`], which also matches the playback token.
    pub fn media_ended(&self, media_id: &str) -> Result<(), GalleryError> {
        self.send(GalleryCommand::MediaEnded {
            media_id: media_id.to_string(),
            playback: None,
        })
    }

    pub fn media_failed(&self, media_id: &str, reason: impl Into<String>) -> Result<(), GalleryError> {
        self.send(GalleryCommand::MediaFailed {
            media_id: media_id.to_string(),
            playback: None,
            reason: reason.into(),
        })
    }

    pub fn replace_sequence(&self, sequence: MediaSequence) -> Result<(), GalleryError> {
        self.send(GalleryCommand::ReplaceSequence(sequence))
    }

    pub fn close(&self) -> Result<(), GalleryError> {
        self.send(GalleryCommand::Close(CloseReason::Explicit))
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.snapshot()
    }

    /// Wait for the session to close and return its summary.
    ///
    /// Cancel safe; once the summary was returned, later calls fail with
    /// [`GalleryError::SessionClosed`].
    pub async fn closed(&mut self) -> Result<SessionSummary, GalleryError> {
        let task = self.task.as_mut().ok_or(GalleryError::SessionClosed)?;
        let result = task.await;
        self.task = None;
        result.map_err(|e| GalleryError::SessionAborted(e.to_string()))
    }
}

impl Drop for GallerySession {
    fn drop(&mut self) {
        if !self.commands.is_closed() {
            let _ = self.commands.send(GalleryCommand::Close(CloseReason::Unmount));
        }
    }
}

/// Everything one session owns; lives on the session task
struct SessionLoop {
    engine: SlideshowEngine,
    surface: Box<dyn PresentationSurface>,
    fullscreen: FullscreenLifecycleManager,
    input: InputController,
    state: SessionStateManager,
    prefs: PlaybackPreferences,
    on_close: Option<Box<dyn FnOnce(CloseReason) + Send>>,
}

impl SessionLoop {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<GalleryCommand>,
        mut prefs_rx: watch::Receiver<PlaybackPreferences>,
    ) -> SessionSummary {
        let mut prefs_open = true;

        loop {
            let deadline = self.engine.next_deadline();

            tokio::select! {
                biased;

                command = commands.recv() => {
                    let command = command.unwrap_or(GalleryCommand::Close(CloseReason::Unmount));
                    if let ControlFlow::Break(reason) = self.handle_command(command) {
                        return self.close(reason);
                    }
                }

                changed = prefs_rx.changed(), if prefs_open => match changed {
                    Ok(()) => {
                        let new = *prefs_rx.borrow_and_update();
                        self.handle_preferences(new);
                    }
                    Err(_) => {
                        tracing::debug!("Preferences publisher dropped, keeping last values");
                        prefs_open = false;
                    }
                },

                _ = wait_for(deadline) => {
                    if let Some((_, generation)) = deadline {
                        let events = self.engine.on_trigger_elapsed(generation, &self.prefs, Instant::now());
                        self.apply_events(events);
                    }
                }
            }
        }
    }

    /// Apply one command; `Break` carries the reason the session must close
    fn handle_command(&mut self, command: GalleryCommand) -> ControlFlow<CloseReason> {
        let now = Instant::now();
        let events = match command {
            GalleryCommand::Close(reason) => return ControlFlow::Break(reason),
            GalleryCommand::Next => self.engine.go_to_next(&self.prefs, now),
            GalleryCommand::Previous => self.engine.go_to_previous(&self.prefs, now),
            GalleryCommand::MediaEnded {
                media_id,
                playback: Some(playback),
            } => self.engine.on_playback_ended(&media_id, playback, &self.prefs, now),
            GalleryCommand::MediaEnded {
                media_id,
                playback: None,
            } => self.engine.on_current_media_ended(Some(&media_id), &self.prefs, now),
            GalleryCommand::MediaFailed {
                media_id,
                playback,
                reason,
            } => {
                match playback {
                    Some(playback) => {
                        self.engine.on_playback_failed(&media_id, playback, &reason, &self.prefs, now)
                    }
                    None => self.engine.on_media_failed(Some(&media_id), &reason, &self.prefs, now),
                }
                Vec::new()
            }
            GalleryCommand::ReplaceSequence(sequence) => {
                self.state.set_total_items(sequence.len());
                self.engine.replace_sequence(sequence, &self.prefs, now)
            }
        };
        self.apply_events(events);
        ControlFlow::Continue(())
    }

    fn handle_preferences(&mut self, new: PlaybackPreferences) {
        let old = self.prefs;
        if old == new {
            return;
        }
        self.prefs = new;

        self.engine.on_preferences_changed(&old, &new, Instant::now());
        self.state.set_preferences(&new);

        if old.autoplay_enabled != new.autoplay_enabled {
            self.surface.set_video_looping(!new.autoplay_enabled);
        }
    }

    fn apply_events(&mut self, events: Vec<EngineEvent>) {
        for event in events {
            self.state.apply_engine_event(&event);

            match event {
                EngineEvent::Displayed {
                    index,
                    media,
                    playback,
                    ..
                } => {
                    let total = self.engine.sequence().map_or(0, |s| s.len());
                    let frame = SurfaceFrame::new(media, index, total, playback, &self.prefs);
                    self.surface.show(&frame);
                }
                EngineEvent::Replay { media, playback, .. } => self.surface.restart_video(&media, playback),
                EngineEvent::MediaEnded { .. } | EngineEvent::Deactivated => {}
            }
        }
    }

    /// Tear down in order: engine, keys, fullscreen, surface, state, caller
    fn close(mut self, reason: CloseReason) -> SessionSummary {
        tracing::info!("Closing gallery session ({:?})", reason);

        let events = self.engine.deactivate();
        for event in &events {
            self.state.apply_engine_event(event);
        }

        self.input.unbind();
        self.fullscreen.exit();
        self.surface.clear();

        let snapshot = self.state.snapshot();
        self.state.close_session();

        if let Some(on_close) = self.on_close.take() {
            on_close(reason);
        }

        SessionSummary {
            reason,
            items_shown: snapshot.items_shown,
            replays: snapshot.replays,
            fullscreen: snapshot.fullscreen,
        }
    }
}

async fn wait_for(deadline: Option<(Instant, u64)>) {
    match deadline {
        Some((at, _)) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryPreferenceStore;
    use crate::services::{FullscreenPort, Key};
    use crate::ui::SurfaceHandle;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorded {
        shown: Vec<String>,
        restarted: Vec<String>,
        cleared: usize,
    }

    struct RecordingSurface {
        handle: SurfaceHandle,
        log: Arc<Mutex<Recorded>>,
    }

    impl PresentationSurface for RecordingSurface {
        fn handle(&self) -> &SurfaceHandle {
            &self.handle
        }
        fn attach(&mut self, _events: SurfaceEvents) {}
        fn show(&mut self, frame: &SurfaceFrame) {
            self.log.lock().unwrap().shown.push(frame.media.id.clone());
        }
        fn restart_video(&mut self, media: &MediaDescriptor, _playback: u64) {
            self.log.lock().unwrap().restarted.push(media.id.clone());
        }
        fn clear(&mut self) {
            self.log.lock().unwrap().cleared += 1;
        }
    }

    struct CountingPort {
        exits: Arc<Mutex<usize>>,
    }

    impl FullscreenPort for CountingPort {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn is_supported(&self) -> bool {
            true
        }
        fn request(&mut self, _surface: &SurfaceHandle) -> Result<(), crate::services::FullscreenError> {
            Ok(())
        }
        fn exit(&mut self) -> Result<(), crate::services::FullscreenError> {
            *self.exits.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn controller() -> GalleryController {
        let preferences = PreferencesManager::load(
            Box::new(MemoryPreferenceStore::new()),
            PlaybackPreferences::with_default_interval(2000),
        );
        GalleryController::new(
            preferences,
            KeyboardHub::new(),
            EngineSettings::default(),
            Arc::new(Metrics::new()),
        )
    }

    fn sequence() -> MediaSequence {
        MediaSequence::new(vec![
            MediaDescriptor::image("a", "/a.png"),
            MediaDescriptor::image("b", "/b.png"),
        ])
        .unwrap()
    }

    fn surface() -> (RecordingSurface, Arc<Mutex<Recorded>>) {
        let log = Arc::new(Mutex::new(Recorded::default()));
        let surface = RecordingSurface {
            handle: SurfaceHandle::new("tv", "Test"),
            log: log.clone(),
        };
        (surface, log)
    }

    #[test]
    fn test_open_items_rejects_empty() {
        let controller = controller();
        let (surface, _) = surface();
        let result = controller.open_items(
            Vec::new(),
            0,
            FullscreenLifecycleManager::new(Vec::new()),
            surface,
            |_| {},
        );
        assert!(matches!(result, Err(GalleryError::EmptySequence)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_frame_and_interval_advance() {
        let controller = controller();
        let (surface, log) = surface();
        let mut session = controller.open(sequence(), 1, FullscreenLifecycleManager::new(Vec::new()), surface, |_| {});

        assert_eq!(log.lock().unwrap().shown, vec!["b"]);
        assert_eq!(session.snapshot().fullscreen, FullscreenStatus::Degraded);

        tokio::time::sleep(Duration::from_millis(2001)).await;
        assert_eq!(log.lock().unwrap().shown, vec!["b", "a"]);

        session.close().unwrap();
        let summary = session.closed().await.unwrap();
        assert_eq!(summary.reason, CloseReason::Explicit);
        assert_eq!(summary.items_shown, 2);
        assert_eq!(log.lock().unwrap().cleared, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_closes_once() {
        let controller = controller();
        let hub = controller.keyboard.clone();
        let (surface, _) = surface();
        let exits = Arc::new(Mutex::new(0));
        let closes = Arc::new(Mutex::new(Vec::new()));
        let fullscreen = FullscreenLifecycleManager::new(vec![Box::new(CountingPort { exits: exits.clone() })]);

        let recorded = closes.clone();
        let mut session = controller.open(sequence(), 0, fullscreen, surface, move |reason| {
            recorded.lock().unwrap().push(reason);
        });

        hub.dispatch(&Key::Escape);
        hub.dispatch(&Key::Escape);

        let summary = session.closed().await.unwrap();
        assert_eq!(summary.reason, CloseReason::Escape);
        assert_eq!(*exits.lock().unwrap(), 1);
        assert_eq!(*closes.lock().unwrap(), vec![CloseReason::Escape]);
        assert_eq!(hub.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_handle_unmounts() {
        let controller = controller();
        let (surface, log) = surface();
        let closes = Arc::new(Mutex::new(Vec::new()));
        let recorded = closes.clone();

        let session = controller.open(sequence(), 0, FullscreenLifecycleManager::new(Vec::new()), surface, move |reason| {
            recorded.lock().unwrap().push(reason);
        });
        drop(session);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*closes.lock().unwrap(), vec![CloseReason::Unmount]);
        assert_eq!(log.lock().unwrap().cleared, 1);
        assert!(!controller.state().snapshot().is_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_after_close_fail() {
        let controller = controller();
        let (surface, _) = surface();
        let session = controller.open(sequence(), 0, FullscreenLifecycleManager::new(Vec::new()), surface, |_| {});

        session.close().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(session.is_closed());
        assert_eq!(session.go_to_next(), Err(GalleryError::SessionClosed));
    }
}
