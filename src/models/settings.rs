use crate::models::MEDIA_PAGE_DEFAULT_INTERVAL_MS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Static player configuration from `signage.yaml` and `SIGNAGE_*` variables
///
/// Every field has a default so a missing or partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignageSettings {
    /// Interval used when no preference has been stored yet
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,

    /// Delay before skipping an item the surface failed to render (autoplay only)
    #[serde(default = "default_failure_skip_delay_ms")]
    pub failure_skip_delay_ms: u64,

    /// Longest wait for a video's ended report before skipping it; 0 disables
    #[serde(default = "default_video_stall_timeout_secs")]
    pub video_stall_timeout_secs: u64,

    /// Playback length the terminal surface pretends each video has
    #[serde(default = "default_simulated_video_secs")]
    pub simulated_video_secs: u64,

    /// Use the terminal alternate screen as the fullscreen presentation
    #[serde(default = "default_true")]
    pub alternate_screen: bool,

    /// Whitespace-separated command that makes the player window fullscreen
    #[serde(default)]
    pub kiosk_enter_command: Option<String>,

    /// Whitespace-separated command that leaves fullscreen
    #[serde(default)]
    pub kiosk_exit_command: Option<String>,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub debug_mode: bool,
}

impl Default for SignageSettings {
    fn default() -> Self {
        Self {
            default_interval_ms: default_interval_ms(),
            failure_skip_delay_ms: default_failure_skip_delay_ms(),
            video_stall_timeout_secs: default_video_stall_timeout_secs(),
            simulated_video_secs: default_simulated_video_secs(),
            alternate_screen: true,
            kiosk_enter_command: None,
            kiosk_exit_command: None,
            log_dir: default_log_dir(),
            debug_mode: false,
        }
    }
}

impl SignageSettings {
    pub fn failure_skip_delay(&self) -> Duration {
        Duration::from_millis(self.failure_skip_delay_ms)
    }

    /// `None` when the stall guard is disabled
    pub fn video_stall_timeout(&self) -> Option<Duration> {
        (self.video_stall_timeout_secs > 0).then(|| Duration::from_secs(self.video_stall_timeout_secs))
    }

    pub fn simulated_video_length(&self) -> Duration {
        Duration::from_secs(self.simulated_video_secs.max(1))
    }

    /// Split a configured kiosk command into program and arguments
    pub fn split_command(command: Option<&str>) -> Option<Vec<String>> {
        let parts: Vec<String> = command?.split_whitespace().map(str::to_string).collect();
        (!parts.is_empty()).then_some(parts)
    }
}

fn default_interval_ms() -> u64 {
    MEDIA_PAGE_DEFAULT_INTERVAL_MS
}

fn default_failure_skip_delay_ms() -> u64 {
    1000
}

fn default_video_stall_timeout_secs() -> u64 {
    600
}

fn default_simulated_video_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_log_dir() -> String {
    "logs".to_string()
}
