//! Data models for the signage slideshow.
//!
//! - [`MediaDescriptor`] / [`MediaSequence`]: what is shown, in which order
//! - [`PlaybackPreferences`] / [`SlideInterval`]: user-set autoplay settings
//! - [`SessionState`]: transient snapshot of one presentation session
//! - [`SignageSettings`]: static configuration for the player
//!
//! Sequences are read-only to the slideshow core. Preferences are mutated only
//! through [`PreferencesManager`](crate::state::PreferencesManager), session
//! state only through [`SessionStateManager`](crate::state::SessionStateManager).

pub mod media;
pub mod preferences;
pub mod session;
pub mod settings;

pub use media::{
    MediaDescriptor, MediaKind, MediaSequence, PlaybackPosition, Playlist, PlaylistEntry,
};
pub use preferences::{
    AUTOPLAY_KEY, IMAGE_PAGE_DEFAULT_INTERVAL_MS, INTERVAL_KEY, MEDIA_PAGE_DEFAULT_INTERVAL_MS,
    PlaybackPreferences, SlideInterval,
};
pub use session::{FullscreenStatus, SessionState};
pub use settings::SignageSettings;
