use crate::models::{MediaDescriptor, PlaybackPreferences};
use crate::ui::controller::GalleryCommand;
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Identity of the element a presentation is rendered into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub id: String,
    pub title: String,
}

impl SurfaceHandle {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Everything a surface needs to render the current item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceFrame {
    pub media: MediaDescriptor,
    pub index: usize,
    pub total: usize,
    /// Previous/next affordances; hidden for single-item sequences
    pub show_navigation: bool,
    pub show_close: bool,
    /// Videos start playing as soon as they are shown
    pub autoplay_video: bool,
    /// Native loop hint, set while autoplay is globally disabled
    pub loop_video: bool,
    /// Token to echo back in playback reports for this rendering
    pub playback: u64,
}

impl SurfaceFrame {
    pub fn new(
        media: MediaDescriptor,
        index: usize,
        total: usize,
        playback: u64,
        prefs: &PlaybackPreferences,
    ) -> Self {
        Self {
            media,
            index,
            total,
            show_navigation: total > 1,
            show_close: true,
            autoplay_video: true,
            loop_video: !prefs.autoplay_enabled,
            playback,
        }
    }

    pub fn position_label(&self) -> String {
        format!("{} / {}", self.index + 1, self.total)
    }
}

/// Channel a surface uses to report playback outcomes back to its session.
///
/// Reports carry the media id and playback token of the rendering they are
/// about, so a report that arrives after the session moved on (even back to
/// the same item) is recognised as stale.
#[derive(Debug, Clone)]
pub struct SurfaceEvents {
    tx: mpsc::UnboundedSender<GalleryCommand>,
}

impl SurfaceEvents {
    pub(crate) fn new(tx: mpsc::UnboundedSender<GalleryCommand>) -> Self {
        Self { tx }
    }

    /// Returns false when the session is already gone
    pub fn media_ended(&self, media_id: &str, playback: u64) -> bool {
        self.tx
            .send(GalleryCommand::MediaEnded {
                media_id: media_id.to_string(),
                playback: Some(playback),
            })
            .is_ok()
    }

    pub fn media_failed(&self, media_id: &str, playback: u64, reason: impl Into<String>) -> bool {
        self.tx
            .send(GalleryCommand::MediaFailed {
                media_id: media_id.to_string(),
                playback: Some(playback),
                reason: reason.into(),
            })
            .is_ok()
    }
}

/// Where engine decisions become visible.
///
/// A surface renders frames and reports when a video ends or an item cannot
/// be rendered. It makes no timing decisions of its own.
pub trait PresentationSurface: Send {
    fn handle(&self) -> &SurfaceHandle;

    /// Called once when a session opens, before the first frame
    fn attach(&mut self, events: SurfaceEvents);

    fn show(&mut self, frame: &SurfaceFrame);

    /// Play the current video again from the start; reports for the new run
    /// carry `playback`
    fn restart_video(&mut self, media: &MediaDescriptor, playback: u64);

    fn set_video_looping(&mut self, _looping: bool) {}

    /// Remove everything; the session is closing
    fn clear(&mut self);
}

/// Text rendition of the slideshow for headless screens and debugging.
///
/// Video playback is simulated: a task sleeps for the configured length and
/// then reports `media_ended`. The task is aborted whenever the frame
/// changes or the surface is cleared.
pub struct TerminalSurface<W: Write + Send> {
    handle: SurfaceHandle,
    writer: W,
    events: Option<SurfaceEvents>,
    video_length: Duration,
    looping: bool,
    playback: Option<JoinHandle<()>>,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout(handle: SurfaceHandle, video_length: Duration) -> Self {
        Self::new(handle, io::stdout(), video_length)
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(handle: SurfaceHandle, writer: W, video_length: Duration) -> Self {
        Self {
            handle,
            writer,
            events: None,
            video_length,
            looping: false,
            playback: None,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.writer, "{}", line).and_then(|_| self.writer.flush()) {
            tracing::warn!("Failed to write to surface {}: {}", self.handle.id, e);
        }
    }

    fn stop_playback(&mut self) {
        if let Some(task) = self.playback.take() {
            task.abort();
        }
    }

    fn start_playback(&mut self, media: &MediaDescriptor, playback: u64) {
        self.stop_playback();

        let Some(events) = self.events.clone() else {
            tracing::debug!("Surface {} not attached, video {} will not report", self.handle.id, media.id);
            return;
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!("Cannot simulate playback of {}: {}", media.id, e);
                return;
            }
        };

        let media_id = media.id.clone();
        let length = self.video_length;
        self.playback = Some(runtime.spawn(async move {
            tokio::time::sleep(length).await;
            events.media_ended(&media_id, playback);
        }));
    }
}

impl<W: Write + Send> PresentationSurface for TerminalSurface<W> {
    fn handle(&self) -> &SurfaceHandle {
        &self.handle
    }

    fn attach(&mut self, events: SurfaceEvents) {
        self.events = Some(events);
    }

    fn show(&mut self, frame: &SurfaceFrame) {
        self.stop_playback();
        self.looping = frame.loop_video;

        let mut line = format!(
            "[{}] {:<5} {} <{}>",
            frame.position_label(),
            if frame.media.is_video() { "video" } else { "image" },
            frame.media.display_name(),
            frame.media.url
        );
        if frame.media.is_video() && frame.loop_video {
            line.push_str(" (loop)");
        }
        if frame.show_navigation {
            line.push_str("   < prev | next >");
        }
        if frame.show_close {
            line.push_str("   [esc close]");
        }
        self.write_line(&line);

        if frame.media.is_video() && frame.autoplay_video {
            self.start_playback(&frame.media, frame.playback);
        }
    }

    fn restart_video(&mut self, media: &MediaDescriptor, playback: u64) {
        self.write_line(&format!("  replaying {}", media.display_name()));
        self.start_playback(media, playback);
    }

    fn set_video_looping(&mut self, looping: bool) {
        if self.looping != looping {
            self.looping = looping;
            tracing::debug!("Surface {} video looping set to {}", self.handle.id, looping);
        }
    }

    fn clear(&mut self) {
        self.stop_playback();
        self.write_line("[slideshow closed]");
    }
}

impl<W: Write + Send> Drop for TerminalSurface<W> {
    fn drop(&mut self) {
        self.stop_playback();
    }
}
