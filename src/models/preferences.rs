use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest selectable advance interval
pub const MIN_INTERVAL_MS: u64 = 1000;

/// Longest selectable advance interval
pub const MAX_INTERVAL_MS: u64 = 10_000;

/// Interval options are whole seconds
pub const INTERVAL_STEP_MS: u64 = 1000;

/// Default interval for image-only galleries
pub const IMAGE_PAGE_DEFAULT_INTERVAL_MS: u64 = 2000;

/// Default interval for mixed image/video galleries
pub const MEDIA_PAGE_DEFAULT_INTERVAL_MS: u64 = 5000;

/// Storage key for the autoplay flag
pub const AUTOPLAY_KEY: &str = "isSliding";

/// Storage key for the advance interval in milliseconds
pub const INTERVAL_KEY: &str = "slidingTime";

/// Per-item advance interval, one of 1s, 2s, ... 10s.
///
/// Arbitrary values are snapped to the nearest whole second and clamped into
/// the selectable range, so every `SlideInterval` is a valid menu option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct SlideInterval(u64);

impl SlideInterval {
    pub fn from_millis(ms: u64) -> Self {
        let snapped = ms.saturating_add(INTERVAL_STEP_MS / 2) / INTERVAL_STEP_MS * INTERVAL_STEP_MS;
        Self(snapped.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS))
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::from_millis(secs.saturating_mul(1000))
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Next longer option, saturating at the maximum
    pub fn longer(self) -> Self {
        Self::from_millis(self.0 + INTERVAL_STEP_MS)
    }

    /// Next shorter option, saturating at the minimum
    pub fn shorter(self) -> Self {
        Self::from_millis(self.0.saturating_sub(INTERVAL_STEP_MS))
    }

    /// All selectable intervals in ascending order
    pub fn options() -> impl Iterator<Item = SlideInterval> {
        (MIN_INTERVAL_MS..=MAX_INTERVAL_MS)
            .step_by(INTERVAL_STEP_MS as usize)
            .map(SlideInterval)
    }

    /// Menu label, e.g. "5 sec"
    pub fn label(self) -> String {
        format!("{} sec", self.0 / 1000)
    }
}

impl Default for SlideInterval {
    fn default() -> Self {
        Self(MEDIA_PAGE_DEFAULT_INTERVAL_MS)
    }
}

impl From<u64> for SlideInterval {
    fn from(ms: u64) -> Self {
        Self::from_millis(ms)
    }
}

impl From<SlideInterval> for u64 {
    fn from(interval: SlideInterval) -> Self {
        interval.0
    }
}

/// User-set playback settings shared between the settings UI and the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackPreferences {
    pub autoplay_enabled: bool,
    pub interval: SlideInterval,
}

impl PlaybackPreferences {
    pub fn new(autoplay_enabled: bool, interval: SlideInterval) -> Self {
        Self {
            autoplay_enabled,
            interval,
        }
    }

    /// Defaults for a call site with its own interval default
    pub fn with_default_interval(interval_ms: u64) -> Self {
        Self::new(true, SlideInterval::from_millis(interval_ms))
    }
}

impl Default for PlaybackPreferences {
    fn default() -> Self {
        Self::with_default_interval(MEDIA_PAGE_DEFAULT_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_snaps_and_clamps() {
        assert_eq!(SlideInterval::from_millis(0).as_millis(), 1000);
        assert_eq!(SlideInterval::from_millis(2400).as_millis(), 2000);
        assert_eq!(SlideInterval::from_millis(2500).as_millis(), 3000);
        assert_eq!(SlideInterval::from_millis(60_000).as_millis(), 10_000);
        assert_eq!(SlideInterval::from_secs(7).as_duration(), Duration::from_secs(7));
    }

    #[test]
    fn test_interval_options_match_menu() {
        let options: Vec<u64> = SlideInterval::options().map(SlideInterval::as_millis).collect();
        assert_eq!(options.len(), 10);
        assert_eq!(options.first(), Some(&1000));
        assert_eq!(options.last(), Some(&10_000));
        assert_eq!(SlideInterval::from_millis(4000).label(), "4 sec");
    }

    #[test]
    fn test_longer_and_shorter_saturate() {
        assert_eq!(SlideInterval::from_millis(10_000).longer().as_millis(), 10_000);
        assert_eq!(SlideInterval::from_millis(1000).shorter().as_millis(), 1000);
        assert_eq!(SlideInterval::from_millis(3000).longer().as_millis(), 4000);
    }

    #[test]
    fn test_preference_defaults() {
        let prefs = PlaybackPreferences::default();
        assert!(prefs.autoplay_enabled);
        assert_eq!(prefs.interval.as_millis(), MEDIA_PAGE_DEFAULT_INTERVAL_MS);

        let image_page = PlaybackPreferences::with_default_interval(IMAGE_PAGE_DEFAULT_INTERVAL_MS);
        assert_eq!(image_page.interval.as_millis(), 2000);
    }
}
