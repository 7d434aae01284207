//! Services module - the slideshow core, free of any concrete UI.
//!
//! # Components
//!
//! - [`SlideshowEngine`]: owns the current position and the advance policy.
//!   Every operation is synchronous and returns [`EngineEvent`]s; pending work
//!   is a single [`AdvanceTrigger`] (timer for images, awaited ended report for
//!   videos) so a stale timer can never advance the wrong item.
//!
//! - [`FullscreenLifecycleManager`]: enters fullscreen through a chain of
//!   [`FullscreenPort`] adapters and releases it exactly once per session.
//!
//! - [`InputController`] / [`KeyboardHub`]: maps arrow keys and Escape to
//!   [`InputAction`]s while a presentation is bound.
//!
//! The scheduler loop that drives these lives in
//! [`crate::ui::controller`].

pub mod fullscreen;
pub mod input;
pub mod slideshow;

pub use fullscreen::{
    AlternateScreenPort, FullscreenError, FullscreenLifecycleManager, FullscreenPort,
    KioskCommandPort,
};
pub use input::{InputAction, InputController, Key, KeyboardHub, ListenerId};
pub use slideshow::{
    AdvanceCause, AdvanceTrigger, EngineEvent, EngineSettings, SlideshowEngine, TimerPurpose,
};
