// Signage - fullscreen mixed-media slideshow for restaurant screens
//
// This is the library crate containing the slideshow core and its supporting
// preference, configuration and presentation code.
// The binary crate (main.rs) provides the headless player entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{MediaDescriptor, MediaKind, MediaSequence, PlaybackPreferences, SignageSettings, SlideInterval};
pub use services::{FullscreenLifecycleManager, KeyboardHub, SlideshowEngine};
pub use state::{PreferencesManager, SessionChange, SessionStateManager};
pub use ui::{CloseReason, GalleryController, GalleryError, GallerySession};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
