use crate::metrics::Metrics;
use crate::models::{FullscreenStatus, SignageSettings};
use crate::ui::SurfaceHandle;
use std::io::{IsTerminal, Write};
use std::process::Command;
use std::sync::Arc;
use thiserror::Error;

/// Errors a fullscreen adapter can report
#[derive(Error, Debug)]
pub enum FullscreenError {
    #[error("Fullscreen adapter {0} is not supported here")]
    Unsupported(&'static str),

    #[error("Fullscreen adapter {adapter} rejected the request: {reason}")]
    Rejected { adapter: &'static str, reason: String },

    #[error("Fullscreen I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One platform variant of "make this surface fill the screen".
///
/// The lifecycle manager tries adapters in order, so an implementation only
/// needs to know about its own mechanism.
#[cfg_attr(test, mockall::automock)]
pub trait FullscreenPort: Send {
    /// Short adapter name for logs and status
    fn name(&self) -> &'static str;

    /// Whether this adapter can work in the current environment
    fn is_supported(&self) -> bool;

    /// Request fullscreen presentation for `surface`
    fn request(&mut self, surface: &SurfaceHandle) -> Result<(), FullscreenError>;

    /// Leave fullscreen. Must be a no-op when not presenting.
    fn exit(&mut self) -> Result<(), FullscreenError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presentation {
    Idle,
    Entered { adapter: usize },
    Degraded,
}

/// Enters fullscreen for a session and guarantees a single release.
///
/// Unsupported adapters are dropped once, at construction. `enter` walks the
/// remaining chain until one adapter accepts; if none does, the session runs
/// windowed ([`FullscreenStatus::Degraded`]) and no error is surfaced.
/// `exit` releases through the adapter that entered and swallows adapter
/// errors. Every path (explicit exit, drop) releases exactly once.
pub struct FullscreenLifecycleManager {
    ports: Vec<Box<dyn FullscreenPort>>,
    presentation: Presentation,
    metrics: Option<Arc<Metrics>>,
}

impl FullscreenLifecycleManager {
    /// Build a manager from candidate adapters, keeping the supported ones in order
    pub fn new(candidates: Vec<Box<dyn FullscreenPort>>) -> Self {
        let ports: Vec<Box<dyn FullscreenPort>> = candidates
            .into_iter()
            .filter(|port| {
                let supported = port.is_supported();
                if !supported {
                    tracing::debug!("Fullscreen adapter {} not supported, skipping", port.name());
                }
                supported
            })
            .collect();

        tracing::info!(
            "Fullscreen adapters selected: [{}]",
            ports.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
        );

        Self {
            ports,
            presentation: Presentation::Idle,
            metrics: None,
        }
    }

    /// Standard adapter chain for the player: kiosk command first, then the
    /// terminal alternate screen.
    pub fn from_settings(settings: &SignageSettings) -> Self {
        let mut candidates: Vec<Box<dyn FullscreenPort>> = Vec::new();

        if let Some(kiosk) = KioskCommandPort::from_settings(settings) {
            candidates.push(Box::new(kiosk));
        }
        if settings.alternate_screen {
            candidates.push(Box::new(AlternateScreenPort::stdout()));
        }

        Self::new(candidates)
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Number of adapters that survived selection
    pub fn adapter_count(&self) -> usize {
        self.ports.len()
    }

    pub fn status(&self) -> FullscreenStatus {
        match self.presentation {
            Presentation::Idle => FullscreenStatus::Inactive,
            Presentation::Entered { adapter } => FullscreenStatus::Active {
                adapter: self.ports[adapter].name(),
            },
            Presentation::Degraded => FullscreenStatus::Degraded,
        }
    }

    /// Request fullscreen for `surface`. Entering twice without an exit in
    /// between returns the current status without touching the adapters.
    pub fn enter(&mut self, surface: &SurfaceHandle) -> FullscreenStatus {
        if self.presentation != Presentation::Idle {
            tracing::debug!("Fullscreen already requested for this session");
            return self.status();
        }

        for (index, port) in self.ports.iter_mut().enumerate() {
            match port.request(surface) {
                Ok(()) => {
                    tracing::info!("Entered fullscreen via {} for {}", port.name(), surface.id);
                    self.presentation = Presentation::Entered { adapter: index };
                    return self.status();
                }
                Err(e) => {
                    tracing::debug!("Fullscreen adapter {} failed: {}", port.name(), e);
                }
            }
        }

        tracing::warn!(
            "No fullscreen adapter accepted surface {}, continuing windowed",
            surface.id
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_fullscreen_failure();
        }
        self.presentation = Presentation::Degraded;
        self.status()
    }

    /// Release fullscreen. Returns false when there was nothing to release.
    ///
    /// Never fails: adapter errors are logged and ignored.
    pub fn exit(&mut self) -> bool {
        let presentation = std::mem::replace(&mut self.presentation, Presentation::Idle);

        match presentation {
            Presentation::Idle => false,
            Presentation::Entered { adapter } => {
                match self.ports[adapter].exit() {
                    Ok(()) => {
                        tracing::info!("Exited fullscreen via {}", self.ports[adapter].name());
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Fullscreen exit via {} failed: {}, trying remaining adapters",
                            self.ports[adapter].name(),
                            e
                        );
                        self.release_all_except(Some(adapter));
                    }
                }
                true
            }
            Presentation::Degraded => {
                self.release_all_except(None);
                true
            }
        }
    }

    fn release_all_except(&mut self, skip: Option<usize>) {
        for (index, port) in self.ports.iter_mut().enumerate() {
            if Some(index) == skip {
                continue;
            }
            if let Err(e) = port.exit() {
                tracing::debug!("Ignoring fullscreen exit error from {}: {}", port.name(), e);
            }
        }
    }
}

impl Drop for FullscreenLifecycleManager {
    fn drop(&mut self) {
        if self.presentation != Presentation::Idle {
            tracing::debug!("Fullscreen manager dropped while presenting, releasing");
            self.exit();
        }
    }
}

/// Switch to alternate screen, hide cursor, clear
const ENTER_ALTERNATE_SCREEN: &[u8] = b"\x1b[?1049h\x1b[?25l\x1b[2J\x1b[H";

/// Show cursor, restore the primary screen
const LEAVE_ALTERNATE_SCREEN: &[u8] = b"\x1b[?25h\x1b[?1049l";

/// Terminal adapter: the alternate screen buffer is the terminal's fullscreen
pub struct AlternateScreenPort<W: Write + Send> {
    writer: W,
    interactive: bool,
    presenting: bool,
}

impl AlternateScreenPort<std::io::Stdout> {
    pub fn stdout() -> Self {
        let interactive = std::io::stdout().is_terminal();
        Self::new(std::io::stdout(), interactive)
    }
}

impl<W: Write + Send> AlternateScreenPort<W> {
    pub fn new(writer: W, interactive: bool) -> Self {
        Self {
            writer,
            interactive,
            presenting: false,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<W: Write + Send> FullscreenPort for AlternateScreenPort<W> {
    fn name(&self) -> &'static str {
        "alternate-screen"
    }

    fn is_supported(&self) -> bool {
        self.interactive
    }

    fn request(&mut self, _surface: &SurfaceHandle) -> Result<(), FullscreenError> {
        if !self.interactive {
            return Err(FullscreenError::Unsupported(self.name()));
        }
        self.writer.write_all(ENTER_ALTERNATE_SCREEN)?;
        self.writer.flush()?;
        self.presenting = true;
        Ok(())
    }

    fn exit(&mut self) -> Result<(), FullscreenError> {
        if !self.presenting {
            return Ok(());
        }
        self.presenting = false;
        self.writer.write_all(LEAVE_ALTERNATE_SCREEN)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Window-manager adapter: runs configured external commands.
///
/// `{surface}` in an argument is replaced by the surface title, so commands
/// such as `wmctrl -r {surface} -b add,fullscreen` can target the window.
pub struct KioskCommandPort {
    enter_command: Vec<String>,
    exit_command: Option<Vec<String>>,
    presenting: bool,
}

impl KioskCommandPort {
    pub fn new(enter_command: Vec<String>, exit_command: Option<Vec<String>>) -> Self {
        Self {
            enter_command,
            exit_command,
            presenting: false,
        }
    }

    pub fn from_settings(settings: &SignageSettings) -> Option<Self> {
        let enter = SignageSettings::split_command(settings.kiosk_enter_command.as_deref())?;
        let exit = SignageSettings::split_command(settings.kiosk_exit_command.as_deref());
        Some(Self::new(enter, exit))
    }

    fn run(&self, command: &[String], surface_title: &str) -> Result<(), FullscreenError> {
        let Some((program, args)) = command.split_first() else {
            return Err(FullscreenError::Unsupported(self.name()));
        };

        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.replace("{surface}", surface_title))
            .collect();

        tracing::debug!("Running kiosk command: {} {}", program, args.join(" "));
        let status = Command::new(program).args(&args).status()?;

        if status.success() {
            Ok(())
        } else {
            Err(FullscreenError::Rejected {
                adapter: self.name(),
                reason: format!("{} exited with {}", program, status),
            })
        }
    }
}

impl FullscreenPort for KioskCommandPort {
    fn name(&self) -> &'static str {
        "kiosk-command"
    }

    fn is_supported(&self) -> bool {
        !self.enter_command.is_empty()
    }

    fn request(&mut self, surface: &SurfaceHandle) -> Result<(), FullscreenError> {
        self.run(&self.enter_command, &surface.title)?;
        self.presenting = true;
        Ok(())
    }

    fn exit(&mut self) -> Result<(), FullscreenError> {
        if !self.presenting {
            return Ok(());
        }
        self.presenting = false;
        match &self.exit_command {
            Some(command) => self.run(command, ""),
            None => Ok(()),
        }
    }
}
