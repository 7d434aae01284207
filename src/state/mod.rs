// State management module
//
// This module provides the SessionStateManager which wraps SessionState with
// thread-safe access using Arc<RwLock<T>> and emits change events for the
// presentation layer, plus the PreferencesManager that owns playback
// preferences across sessions.

pub mod preferences;

pub use preferences::PreferencesManager;

use crate::models::{FullscreenStatus, MediaSequence, PlaybackPreferences, SessionState};
use crate::services::EngineEvent;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Change events emitted when session state is modified
///
/// These events let observers (status lines, logs, tests) follow a
/// presentation without polling.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionChange {
    /// A presentation session started
    SessionOpened { total_items: usize },

    /// A (possibly identical) item was displayed
    PositionChanged {
        index: usize,
        total: usize,
        media_id: Option<String>,
    },

    /// The current video finished
    MediaEnded { index: usize },

    /// The current video restarted in place
    VideoReplayed { index: usize },

    /// Fullscreen was entered, degraded, or released
    FullscreenChanged { status: FullscreenStatus },

    /// Autoplay or interval changed
    PreferencesChanged {
        autoplay_enabled: bool,
        interval_ms: u64,
    },

    /// The presentation session ended
    SessionClosed { items_shown: usize },
}

/// Thread-safe session state with event emission
///
/// - [`read()`](Self::read) for reading state
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to changes
///
/// Clones share the same state and channel.
#[derive(Clone)]
pub struct SessionStateManager {
    state: Arc<RwLock<SessionState>>,
    state_tx: broadcast::Sender<SessionChange>,
}

impl SessionStateManager {
    /// Create a manager with closed state and a 100-event buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            state_tx,
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionState {
        self.read_guard().clone()
    }

    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SessionState) -> R,
    {
        f(&self.read_guard())
    }

    /// Apply `update_fn`, then emit one event per detected change.
    ///
    /// Returns the emitted events in emission order.
    pub fn update<F>(&self, update_fn: F) -> Vec<SessionChange>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.write_guard();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = detect_changes(&old_state, &state);
        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.state_tx.subscribe()
    }

    // Convenience methods for session transitions

    pub fn open_session(&self, sequence: &MediaSequence, prefs: &PlaybackPreferences) -> Vec<SessionChange> {
        self.update(|state| {
            state.reset_session();
            state.is_open = true;
            state.total_items = sequence.len();
            state.apply_preferences(prefs);
        })
    }

    /// Mirror one engine event into the session state
    pub fn apply_engine_event(&self, event: &EngineEvent) -> Vec<SessionChange> {
        self.update(|state| match event {
            EngineEvent::Displayed { index, media, .. } => {
                state.current_index = *index;
                state.current_media = Some(media.clone());
                state.media_ended = false;
                state.items_shown += 1;
            }
            EngineEvent::MediaEnded { .. } => {
                state.media_ended = true;
            }
            EngineEvent::Replay { .. } => {
                state.media_ended = false;
                state.replays += 1;
            }
            EngineEvent::Deactivated => {
                state.current_media = None;
                state.media_ended = false;
            }
        })
    }

    pub fn set_total_items(&self, total: usize) -> Vec<SessionChange> {
        self.update(|state| state.total_items = total)
    }

    pub fn set_fullscreen(&self, status: FullscreenStatus) -> Vec<SessionChange> {
        self.update(|state| state.fullscreen = status)
    }

    pub fn set_preferences(&self, prefs: &PlaybackPreferences) -> Vec<SessionChange> {
        self.update(|state| state.apply_preferences(prefs))
    }

    pub fn close_session(&self) -> Vec<SessionChange> {
        self.update(|state| {
            state.is_open = false;
            state.current_media = None;
            state.media_ended = false;
            state.fullscreen = FullscreenStatus::Inactive;
        })
    }
}

impl Default for SessionStateManager {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_changes(old: &SessionState, new: &SessionState) -> Vec<SessionChange> {
    let mut changes = Vec::new();

    if !old.is_open && new.is_open {
        changes.push(SessionChange::SessionOpened {
            total_items: new.total_items,
        });
    }

    if new.is_open
        && (old.items_shown != new.items_shown
            || old.current_index != new.current_index
            || old.total_items != new.total_items)
        && new.current_media.is_some()
    {
        changes.push(SessionChange::PositionChanged {
            index: new.current_index,
            total: new.total_items,
            media_id: new.current_media.as_ref().map(|m| m.id.clone()),
        });
    }

    if !old.media_ended && new.media_ended {
        changes.push(SessionChange::MediaEnded {
            index: new.current_index,
        });
    }

    if new.replays > old.replays {
        changes.push(SessionChange::VideoReplayed {
            index: new.current_index,
        });
    }

    if old.fullscreen != new.fullscreen {
        changes.push(SessionChange::FullscreenChanged {
            status: new.fullscreen,
        });
    }

    if old.autoplay_enabled != new.autoplay_enabled || old.interval_ms != new.interval_ms {
        changes.push(SessionChange::PreferencesChanged {
            autoplay_enabled: new.autoplay_enabled,
            interval_ms: new.interval_ms,
        });
    }

    if old.is_open && !new.is_open {
        changes.push(SessionChange::SessionClosed {
            items_shown: new.items_shown,
        });
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaDescriptor, SlideInterval};
    use crate::services::AdvanceCause;

    fn sequence() -> MediaSequence {
        MediaSequence::new(vec![
            MediaDescriptor::image("a", "https://cdn.example/a.jpg"),
            MediaDescriptor::video("b", "https://cdn.example/b.mp4"),
        ])
        .unwrap()
    }

    fn displayed(index: usize, media: MediaDescriptor) -> EngineEvent {
        EngineEvent::Displayed {
            index,
            media,
            cause: AdvanceCause::ManualNext,
            playback: 0,
        }
    }

    #[test]
    fn test_new_manager_is_closed() {
        let manager = SessionStateManager::new();
        let state = manager.snapshot();
        assert!(!state.is_open);
        assert_eq!(state.items_shown, 0);
    }

    #[test]
    fn test_open_session_emits_opened_and_preferences() {
        let manager = SessionStateManager::new();
        let changes = manager.open_session(&sequence(), &PlaybackPreferences::default());

        assert_eq!(changes[0], SessionChange::SessionOpened { total_items: 2 });
        assert!(matches!(changes[1], SessionChange::PreferencesChanged { autoplay_enabled: true, .. }));
    }

    #[test]
    fn test_displayed_event_updates_position() {
        let manager = SessionStateManager::new();
        let seq = sequence();
        manager.open_session(&seq, &PlaybackPreferences::default());

        let changes = manager.apply_engine_event(&displayed(1, seq.get(1).unwrap().clone()));
        assert_eq!(
            changes,
            vec![SessionChange::PositionChanged {
                index: 1,
                total: 2,
                media_id: Some("b".to_string()),
            }]
        );
        assert_eq!(manager.read(|s| s.position_label()), "2 / 2");
    }

    #[test]
    fn test_redisplay_of_same_index_still_reported() {
        let manager = SessionStateManager::new();
        let seq = MediaSequence::new(vec![MediaDescriptor::image("only", "/only.png")]).unwrap();
        manager.open_session(&seq, &PlaybackPreferences::default());

        let media = seq.get(0).unwrap().clone();
        manager.apply_engine_event(&displayed(0, media.clone()));
        let changes = manager.apply_engine_event(&displayed(0, media));

        assert!(matches!(changes[0], SessionChange::PositionChanged { index: 0, .. }));
        assert_eq!(manager.read(|s| s.items_shown), 2);
    }

    #[test]
    fn test_ended_then_replay() {
        let manager = SessionStateManager::new();
        let seq = sequence();
        manager.open_session(&seq, &PlaybackPreferences::default());
        let video = seq.get(1).unwrap().clone();
        manager.apply_engine_event(&displayed(1, video.clone()));

        let ended = manager.apply_engine_event(&EngineEvent::MediaEnded { index: 1 });
        assert_eq!(ended, vec![SessionChange::MediaEnded { index: 1 }]);

        let replay = manager.apply_engine_event(&EngineEvent::Replay { index: 1, media: video, playback: 0 });
        assert_eq!(replay, vec![SessionChange::VideoReplayed { index: 1 }]);
        assert!(!manager.read(|s| s.media_ended));
    }

    #[test]
    fn test_close_session_releases_fullscreen() {
        let manager = SessionStateManager::new();
        manager.open_session(&sequence(), &PlaybackPreferences::default());
        manager.set_fullscreen(FullscreenStatus::Active { adapter: "test" });

        let changes = manager.close_session();
        assert_eq!(changes[0], SessionChange::FullscreenChanged { status: FullscreenStatus::Inactive });
        assert!(matches!(changes[1], SessionChange::SessionClosed { .. }));

        // Closing twice emits nothing
        assert!(manager.close_session().is_empty());
    }

    #[test]
    fn test_preferences_change_detected() {
        let manager = SessionStateManager::new();
        manager.open_session(&sequence(), &PlaybackPreferences::default());

        let prefs = PlaybackPreferences::new(true, SlideInterval::from_millis(8000));
        let changes = manager.set_preferences(&prefs);
        assert_eq!(
            changes,
            vec![SessionChange::PreferencesChanged {
                autoplay_enabled: true,
                interval_ms: 8000,
            }]
        );
        assert!(manager.set_preferences(&prefs).is_empty());
    }

    #[test]
    fn test_subscribers_receive_changes() {
        let manager = SessionStateManager::new();
        let mut rx1 = manager.subscribe();
        let mut rx2 = manager.subscribe();

        manager.open_session(&sequence(), &PlaybackPreferences::default());

        assert!(matches!(rx1.try_recv(), Ok(SessionChange::SessionOpened { .. })));
        assert!(matches!(rx2.try_recv(), Ok(SessionChange::SessionOpened { .. })));
    }

    #[test]
    fn test_clone_shares_state() {
        let manager1 = SessionStateManager::new();
        let manager2 = manager1.clone();

        manager1.open_session(&sequence(), &PlaybackPreferences::default());
        assert!(manager2.snapshot().is_open);
    }
}
