// Playback metrics module
//
// Lightweight counters for monitoring a signage screen over long runs

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Playback counters shared by the engine and the player
///
/// Uses atomic operations so the counters can be read from any thread
/// without locks. Logged on shutdown for field diagnostics.
#[derive(Debug)]
pub struct Metrics {
    /// Items put on screen (including re-displays of the same item)
    pub items_displayed: AtomicU64,

    /// Advances decided by the autoplay policy
    pub auto_advances: AtomicU64,

    /// Advances requested by the viewer
    pub manual_advances: AtomicU64,

    /// Videos restarted because autoplay was off
    pub video_replays: AtomicU64,

    /// Deadlines that fired for a trigger that was already replaced
    pub stale_triggers: AtomicU64,

    /// Items skipped after a render failure or a stalled video
    pub failure_skips: AtomicU64,

    /// Sessions where every fullscreen adapter refused
    pub fullscreen_failures: AtomicU64,

    /// Player start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            items_displayed: AtomicU64::new(0),
            auto_advances: AtomicU64::new(0),
            manual_advances: AtomicU64::new(0),
            video_replays: AtomicU64::new(0),
            stale_triggers: AtomicU64::new(0),
            failure_skips: AtomicU64::new(0),
            fullscreen_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_display(&self) {
        self.items_displayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auto_advance(&self) {
        self.auto_advances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_manual_advance(&self) {
        self.manual_advances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replay(&self) {
        self.video_replays.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_trigger(&self) {
        self.stale_triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure_skip(&self) {
        self.failure_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fullscreen_failure(&self) {
        self.fullscreen_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Share of advances that were automatic, in percent
    pub fn autoplay_share(&self) -> f64 {
        let auto = self.auto_advances.load(Ordering::Relaxed);
        let total = auto + self.manual_advances.load(Ordering::Relaxed);
        if total > 0 {
            auto as f64 * 100.0 / total as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Playback Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Displayed: {} items, advances: {} auto / {} manual ({:.0}% auto)",
            self.items_displayed.load(Ordering::Relaxed),
            self.auto_advances.load(Ordering::Relaxed),
            self.manual_advances.load(Ordering::Relaxed),
            self.autoplay_share()
        );
        tracing::info!(
            "Video replays: {}, skipped items: {}, stale triggers: {}",
            self.video_replays.load(Ordering::Relaxed),
            self.failure_skips.load(Ordering::Relaxed),
            self.stale_triggers.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Fullscreen failures: {}",
            self.fullscreen_failures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
