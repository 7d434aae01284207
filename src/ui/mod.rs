// UI module - presentation surface and session controller
//
// This module contains:
// - PresentationSurface: where the current item becomes visible (TerminalSurface ships)
// - GalleryController: opens sessions and runs the per-session scheduler loop

pub mod controller;
pub mod surface;

pub use controller::{
    CloseReason, GalleryCommand, GalleryController, GalleryError, GallerySession, SessionSummary,
};
pub use surface::{PresentationSurface, SurfaceEvents, SurfaceFrame, SurfaceHandle, TerminalSurface};
