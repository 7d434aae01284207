use crate::metrics::Metrics;
use crate::models::{
    MediaDescriptor, MediaKind, MediaSequence, PlaybackPosition, PlaybackPreferences,
    SignageSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Why a timer trigger was armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPurpose {
    /// Regular image display interval
    Interval,

    /// Short grace period before skipping an item that failed to render
    FailureSkip,
}

/// The single piece of pending work that may move the slideshow on its own.
///
/// Exactly one value exists per engine, so "at most one outstanding advance"
/// holds by construction: arming a new trigger replaces the old one and bumps
/// the generation, which turns any deadline still held by the scheduler into
/// a stale no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceTrigger {
    /// Nothing pending (autoplay off on an image, or engine inactive)
    Idle,

    /// Advance when the deadline passes
    Timer {
        deadline: Instant,
        generation: u64,
        purpose: TimerPurpose,
    },

    /// Wait for the surface to report that `source_id` finished playing.
    /// The optional deadline guards against a video that never reports.
    AwaitEvent {
        source_id: String,
        deadline: Option<Instant>,
        generation: u64,
    },
}

impl AdvanceTrigger {
    pub fn generation(&self) -> Option<u64> {
        match self {
            AdvanceTrigger::Idle => None,
            AdvanceTrigger::Timer { generation, .. } => Some(*generation),
            AdvanceTrigger::AwaitEvent { generation, .. } => Some(*generation),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self {
            AdvanceTrigger::Idle => None,
            AdvanceTrigger::Timer { deadline, .. } => Some(*deadline),
            AdvanceTrigger::AwaitEvent { deadline, .. } => *deadline,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, AdvanceTrigger::Idle)
    }

    pub fn is_timer(&self) -> bool {
        matches!(self, AdvanceTrigger::Timer { .. })
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self, AdvanceTrigger::AwaitEvent { .. })
    }
}

/// What caused the engine to show an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceCause {
    Activated,
    ManualNext,
    ManualPrevious,
    IntervalElapsed,
    VideoEnded,
    FailureSkip,
    StallTimeout,
    SequenceReplaced,
}

impl AdvanceCause {
    pub fn is_automatic(self) -> bool {
        matches!(
            self,
            AdvanceCause::IntervalElapsed
                | AdvanceCause::VideoEnded
                | AdvanceCause::FailureSkip
                | AdvanceCause::StallTimeout
        )
    }
}

/// Observable outcome of an engine operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// An item is now current and must be rendered
    Displayed {
        index: usize,
        media: MediaDescriptor,
        cause: AdvanceCause,
        playback: u64,
    },

    /// The current video finished playing
    MediaEnded { index: usize },

    /// The current video must restart from the beginning
    Replay {
        index: usize,
        media: MediaDescriptor,
        playback: u64,
    },

    /// The engine released its sequence
    Deactivated,
}

/// Tunables for the failure paths of the advance policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub failure_skip_delay: Duration,
    pub video_stall_timeout: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&SignageSettings::default())
    }
}

impl From<&SignageSettings> for EngineSettings {
    fn from(settings: &SignageSettings) -> Self {
        Self {
            failure_skip_delay: settings.failure_skip_delay(),
            video_stall_timeout: settings.video_stall_timeout(),
        }
    }
}

#[derive(Debug)]
enum EngineState {
    Inactive,
    Displaying {
        sequence: MediaSequence,
        position: PlaybackPosition,
    },
}

/// Decides which item is current and when to move to the next one.
///
/// The engine is a synchronous state machine: every operation receives the
/// latest preferences and the current time, mutates position and trigger in
/// one step, and returns the events the presentation must reflect. It never
/// sleeps; a scheduler asks [`next_deadline`](Self::next_deadline) what to
/// wait for and reports back through
/// [`on_trigger_elapsed`](Self::on_trigger_elapsed).
///
/// # Advance policy
///
/// - Image + autoplay: single-shot timer of the preference interval, rearmed
///   on every position change.
/// - Video: no timer; wait for the ended report. With autoplay the report
///   advances immediately, without autoplay the video replays in place.
/// - Manual navigation is always allowed and always rearms.
pub struct SlideshowEngine {
    state: EngineState,
    trigger: AdvanceTrigger,
    generation: u64,
    playback: u64,
    settings: EngineSettings,
    metrics: Arc<Metrics>,
}

impl SlideshowEngine {
    pub fn new(settings: EngineSettings, metrics: Arc<Metrics>) -> Self {
        Self {
            state: EngineState::Inactive,
            trigger: AdvanceTrigger::Idle,
            generation: 0,
            playback: 0,
            settings,
            metrics,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, EngineState::Displaying { .. })
    }

    pub fn position(&self) -> Option<PlaybackPosition> {
        match &self.state {
            EngineState::Displaying { position, .. } => Some(*position),
            EngineState::Inactive => None,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        self.position().map(|p| p.current_index)
    }

    pub fn current_media(&self) -> Option<&MediaDescriptor> {
        match &self.state {
            EngineState::Displaying { sequence, position } => sequence.get(position.current_index),
            EngineState::Inactive => None,
        }
    }

    pub fn sequence(&self) -> Option<&MediaSequence> {
        match &self.state {
            EngineState::Displaying { sequence, .. } => Some(sequence),
            EngineState::Inactive => None,
        }
    }

    /// Token of the current rendering; bumped on every display and replay
    pub fn playback(&self) -> u64 {
        self.playback
    }

    pub fn trigger(&self) -> &AdvanceTrigger {
        &self.trigger
    }

    /// Deadline the scheduler should wait for, tagged with its generation
    pub fn next_deadline(&self) -> Option<(Instant, u64)> {
        let deadline = self.trigger.deadline()?;
        Some((deadline, self.trigger.generation()?))
    }

    /// Start governing `sequence`, showing `initial_index` clamped into range.
    ///
    /// Activating an already active engine replaces the previous session.
    pub fn activate(
        &mut self,
        sequence: MediaSequence,
        initial_index: usize,
        prefs: &PlaybackPreferences,
        now: Instant,
    ) -> Vec<EngineEvent> {
        let mut events = self.deactivate();

        let index = sequence.clamp_index(initial_index);
        if index != initial_index {
            tracing::debug!(
                "Initial index {} out of range for {} items, clamped to {}",
                initial_index,
                sequence.len(),
                index
            );
        }

        tracing::info!(
            "Slideshow activated: {} items, starting at {}, autoplay={}, interval={}ms",
            sequence.len(),
            index,
            prefs.autoplay_enabled,
            prefs.interval.as_millis()
        );

        self.state = EngineState::Displaying {
            sequence,
            position: PlaybackPosition::default(),
        };
        events.extend(self.display(index, AdvanceCause::Activated, prefs, now));
        events
    }

    /// Release the sequence and cancel pending work. Safe to call repeatedly.
    pub fn deactivate(&mut self) -> Vec<EngineEvent> {
        if !self.is_active() {
            return Vec::new();
        }

        self.cancel_trigger();
        self.state = EngineState::Inactive;
        tracing::info!("Slideshow deactivated");
        vec![EngineEvent::Deactivated]
    }

    pub fn go_to_next(&mut self, prefs: &PlaybackPreferences, now: Instant) -> Vec<EngineEvent> {
        self.step(true, AdvanceCause::ManualNext, prefs, now)
    }

    pub fn go_to_previous(&mut self, prefs: &PlaybackPreferences, now: Instant) -> Vec<EngineEvent> {
        self.step(false, AdvanceCause::ManualPrevious, prefs, now)
    }

    /// The current video finished playing.
    ///
    /// `source_id` identifies the item the report is about; a report for any
    /// other item (or for an image) is stale and ignored.
    pub fn on_current_media_ended(
        &mut self,
        source_id: Option<&str>,
        prefs: &PlaybackPreferences,
        now: Instant,
    ) -> Vec<EngineEvent> {
        let (index, media) = match self.current_snapshot() {
            Some(current) => current,
            None => {
                tracing::debug!("Ignoring media ended report: engine inactive");
                return Vec::new();
            }
        };

        if media.kind != MediaKind::Video {
            tracing::debug!("Ignoring media ended report for image {}", media.id);
            return Vec::new();
        }

        if let Some(id) = source_id {
            if id != media.id {
                tracing::debug!("Ignoring stale ended report for {} (current {})", id, media.id);
                return Vec::new();
            }
        }

        self.set_media_ended(true);
        let mut events = vec![EngineEvent::MediaEnded { index }];

        if prefs.autoplay_enabled {
            events.extend(self.step(true, AdvanceCause::VideoEnded, prefs, now));
        } else {
            tracing::debug!("Autoplay off, replaying video {}", media.id);
            self.metrics.record_replay();
            self.set_media_ended(false);
            self.playback += 1;
            self.arm(prefs, now);
            events.push(EngineEvent::Replay {
                index,
                media,
                playback: self.playback,
            });
        }

        events
    }

    /// A surface finished rendering `playback` of `source_id`.
    ///
    /// Reports from an earlier rendering are dropped even when the same
    /// item is current again, so a video shown anew never advances on the
    /// previous run's end.
    pub fn on_playback_ended(
        &mut self,
        source_id: &str,
        playback: u64,
        prefs: &PlaybackPreferences,
        now: Instant,
    ) -> Vec<EngineEvent> {
        if self.is_stale_playback(source_id, playback) {
            return Vec::new();
        }
        self.on_current_media_ended(Some(source_id), prefs, now)
    }

    /// Failure report tagged with the rendering it belongs to
    pub fn on_playback_failed(
        &mut self,
        source_id: &str,
        playback: u64,
        reason: &str,
        prefs: &PlaybackPreferences,
        now: Instant,
    ) {
        if self.is_stale_playback(source_id, playback) {
            return;
        }
        self.on_media_failed(Some(source_id), reason, prefs, now);
    }

    fn is_stale_playback(&self, source_id: &str, playback: u64) -> bool {
        if playback == self.playback {
            return false;
        }
        self.metrics.record_stale_trigger();
        tracing::debug!(
            "Ignoring report for {} from playback {} (current {})",
            source_id,
            playback,
            self.playback
        );
        true
    }

    /// The surface could not render the current item.
    ///
    /// With autoplay the item is skipped after the configured grace delay;
    /// without autoplay it stays on screen until manual navigation.
    pub fn on_media_failed(
        &mut self,
        source_id: Option<&str>,
        reason: &str,
        prefs: &PlaybackPreferences,
        now: Instant,
    ) {
        let Some((_, media)) = self.current_snapshot() else {
            return;
        };

        if let Some(id) = source_id {
            if id != media.id {
                tracing::debug!("Ignoring stale failure report for {}", id);
                return;
            }
        }

        tracing::warn!("Media {} ({}) failed to render: {}", media.id, media.url, reason);

        if !prefs.autoplay_enabled {
            return;
        }

        self.cancel_trigger();
        self.trigger = AdvanceTrigger::Timer {
            deadline: now + self.settings.failure_skip_delay,
            generation: self.generation,
            purpose: TimerPurpose::FailureSkip,
        };
    }

    /// The scheduler waited until the deadline of trigger `generation`.
    ///
    /// A generation that is no longer current is a no-op, as is a call made
    /// before the deadline.
    pub fn on_trigger_elapsed(
        &mut self,
        generation: u64,
        prefs: &PlaybackPreferences,
        now: Instant,
    ) -> Vec<EngineEvent> {
        if !self.is_active() || self.trigger.generation() != Some(generation) {
            self.metrics.record_stale_trigger();
            tracing::debug!("Dropping stale trigger generation {}", generation);
            return Vec::new();
        }

        match self.trigger.deadline() {
            Some(deadline) if now >= deadline => {}
            _ => return Vec::new(),
        }

        if !prefs.autoplay_enabled {
            self.cancel_trigger();
            return Vec::new();
        }

        let cause = match &self.trigger {
            AdvanceTrigger::Timer {
                purpose: TimerPurpose::Interval,
                ..
            } => AdvanceCause::IntervalElapsed,
            AdvanceTrigger::Timer {
                purpose: TimerPurpose::FailureSkip,
                ..
            } => AdvanceCause::FailureSkip,
            AdvanceTrigger::AwaitEvent { source_id, .. } => {
                tracing::warn!("Video {} never reported completion, skipping", source_id);
                AdvanceCause::StallTimeout
            }
            AdvanceTrigger::Idle => return Vec::new(),
        };

        self.step(true, cause, prefs, now)
    }

    /// Re-evaluate the pending trigger after a preference change.
    ///
    /// Returns true when the trigger was rearmed or cancelled.
    pub fn on_preferences_changed(
        &mut self,
        old: &PlaybackPreferences,
        new: &PlaybackPreferences,
        now: Instant,
    ) -> bool {
        let Some(kind) = self.current_media().map(|m| m.kind) else {
            return false;
        };

        let autoplay_changed = old.autoplay_enabled != new.autoplay_enabled;
        let interval_changed = old.interval != new.interval;

        // A pending failure skip keeps its grace deadline; the interval does not govern it
        let skipping_failure = matches!(
            self.trigger,
            AdvanceTrigger::Timer {
                purpose: TimerPurpose::FailureSkip,
                ..
            }
        );

        let rearm = match kind {
            MediaKind::Image => {
                autoplay_changed || (new.autoplay_enabled && interval_changed && !skipping_failure)
            }
            MediaKind::Video => autoplay_changed,
        };

        if rearm {
            tracing::debug!(
                "Preferences changed (autoplay {} -> {}, interval {}ms -> {}ms), rearming",
                old.autoplay_enabled,
                new.autoplay_enabled,
                old.interval.as_millis(),
                new.interval.as_millis()
            );
            self.arm(new, now);
        }

        rearm
    }

    /// Swap in a new sequence mid-session.
    ///
    /// The position follows the current media id when it is still present,
    /// otherwise the old index is clamped into the new range.
    pub fn replace_sequence(
        &mut self,
        sequence: MediaSequence,
        prefs: &PlaybackPreferences,
        now: Instant,
    ) -> Vec<EngineEvent> {
        let (old_index, old_id) = match self.current_snapshot() {
            Some((index, media)) => (index, media.id),
            None => return Vec::new(),
        };

        let index = sequence
            .position_of(&old_id)
            .unwrap_or_else(|| sequence.clamp_index(old_index));

        tracing::info!(
            "Sequence replaced: {} items, position {} -> {}",
            sequence.len(),
            old_index,
            index
        );

        self.state = EngineState::Displaying {
            sequence,
            position: PlaybackPosition::default(),
        };
        self.display(index, AdvanceCause::SequenceReplaced, prefs, now)
    }

    fn current_snapshot(&self) -> Option<(usize, MediaDescriptor)> {
        let index = self.current_index()?;
        let media = self.current_media()?.clone();
        Some((index, media))
    }

    fn set_media_ended(&mut self, ended: bool) {
        if let EngineState::Displaying { position, .. } = &mut self.state {
            position.media_ended = ended;
        }
    }

    fn step(
        &mut self,
        forward: bool,
        cause: AdvanceCause,
        prefs: &PlaybackPreferences,
        now: Instant,
    ) -> Vec<EngineEvent> {
        let target = match &self.state {
            EngineState::Displaying { sequence, position } => {
                if forward {
                    sequence.next_index(position.current_index)
                } else {
                    sequence.previous_index(position.current_index)
                }
            }
            EngineState::Inactive => {
                tracing::debug!("Ignoring navigation: engine inactive");
                return Vec::new();
            }
        };

        match cause {
            AdvanceCause::ManualNext | AdvanceCause::ManualPrevious => {
                self.metrics.record_manual_advance()
            }
            AdvanceCause::FailureSkip | AdvanceCause::StallTimeout => {
                self.metrics.record_failure_skip()
            }
            AdvanceCause::IntervalElapsed | AdvanceCause::VideoEnded => {
                self.metrics.record_auto_advance()
            }
            AdvanceCause::Activated | AdvanceCause::SequenceReplaced => {}
        }

        self.display(target, cause, prefs, now)
    }

    fn display(
        &mut self,
        index: usize,
        cause: AdvanceCause,
        prefs: &PlaybackPreferences,
        now: Instant,
    ) -> Vec<EngineEvent> {
        let media = match &mut self.state {
            EngineState::Displaying { sequence, position } => {
                position.current_index = index;
                position.media_ended = false;
                match sequence.get(index) {
                    Some(media) => media.clone(),
                    None => return Vec::new(),
                }
            }
            EngineState::Inactive => return Vec::new(),
        };

        self.playback += 1;
        self.arm(prefs, now);
        self.metrics.record_display();
        tracing::debug!("Displaying {} ({:?}) at {} via {:?}", media.id, media.kind, index, cause);

        vec![EngineEvent::Displayed {
            index,
            media,
            cause,
            playback: self.playback,
        }]
    }

    fn cancel_trigger(&mut self) {
        self.generation += 1;
        self.trigger = AdvanceTrigger::Idle;
    }

    /// Replace the pending trigger with the one the policy wants for the
    /// current item.
    fn arm(&mut self, prefs: &PlaybackPreferences, now: Instant) {
        self.cancel_trigger();

        let Some(media) = self.current_media() else {
            return;
        };

        let trigger = match media.kind {
            MediaKind::Image if prefs.autoplay_enabled => AdvanceTrigger::Timer {
                deadline: now + prefs.interval.as_duration(),
                generation: self.generation,
                purpose: TimerPurpose::Interval,
            },
            MediaKind::Image => AdvanceTrigger::Idle,
            MediaKind::Video => AdvanceTrigger::AwaitEvent {
                source_id: media.id.clone(),
                deadline: if prefs.autoplay_enabled {
                    self.settings.video_stall_timeout.map(|timeout| now + timeout)
                } else {
                    None
                },
                generation: self.generation,
            },
        };

        self.trigger = trigger;
    }
}
