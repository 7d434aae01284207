use crate::models::{MediaDescriptor, PlaybackPreferences};

/// Outcome of the fullscreen request for the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullscreenStatus {
    /// No request made yet, or released after close
    #[default]
    Inactive,

    /// An adapter accepted the request
    Active {
        adapter: &'static str,
    },

    /// Every adapter refused; presentation continues windowed
    Degraded,
}

impl FullscreenStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, FullscreenStatus::Active { .. })
    }
}

/// Snapshot of one presentation session.
///
/// Lives only between opening and closing the gallery and is never
/// persisted. Always access it through
/// [`SessionStateManager`](crate::state::SessionStateManager).
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    // Lifecycle
    pub is_open: bool,

    // Position
    pub current_index: usize,
    pub total_items: usize,
    pub current_media: Option<MediaDescriptor>,
    pub media_ended: bool,

    // Presentation
    pub fullscreen: FullscreenStatus,

    // Preferences mirror
    pub autoplay_enabled: bool,
    pub interval_ms: u64,

    // Counters for the current session
    pub items_shown: usize,
    pub replays: usize,
}

impl SessionState {
    /// Reset everything except the preferences mirror
    pub fn reset_session(&mut self) {
        self.is_open = false;
        self.current_index = 0;
        self.total_items = 0;
        self.current_media = None;
        self.media_ended = false;
        self.fullscreen = FullscreenStatus::Inactive;
        self.items_shown = 0;
        self.replays = 0;
    }

    pub fn apply_preferences(&mut self, prefs: &PlaybackPreferences) {
        self.autoplay_enabled = prefs.autoplay_enabled;
        self.interval_ms = prefs.interval.as_millis();
    }

    /// Whether navigation affordances should be visible
    pub fn shows_navigation(&self) -> bool {
        self.total_items > 1
    }

    /// Human-readable "3 / 7" style counter, empty when closed
    pub fn position_label(&self) -> String {
        if !self.is_open || self.total_items == 0 {
            return String::new();
        }
        format!("{} / {}", self.current_index + 1, self.total_items)
    }
}
