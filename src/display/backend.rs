//! Drawing surface abstraction.
//!
//! Coordinates are virtual pixels with the origin at the top-left corner.
//! A backend decides how pixels map onto its device; widgets only ever see
//! sizes returned by [`TextMetrics::measure_text`].

#![allow(missing_docs)]

use crate::core::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextSize {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner of a draw. May be negative when text overflows the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// Everything needed to create (or re-create) the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceOptions {
    pub title: String,
    pub size: SurfaceSize,
    pub borderless: bool,
    /// Initial placement hint; dropped after the first user resize.
    pub position: Option<(i32, i32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Window closed or interrupt key.
    Quit,
    /// Escape key released.
    Escape,
    Resize(SurfaceSize),
}

/// Text measurement, split out so layout code can run without a surface.
pub trait TextMetrics {
    fn measure_text(&self, text: &str, font_size: u32) -> Result<TextSize>;
}

pub trait RenderBackend: TextMetrics {
    /// Create the surface on first call, resize it afterwards. Returns the
    /// size actually obtained, which may differ from the request.
    fn create_or_resize_surface(&mut self, options: &SurfaceOptions) -> Result<SurfaceSize>;

    fn fill(&mut self, color: Rgb) -> Result<()>;

    fn draw_text(&mut self, text: &str, font_size: u32, at: Position, color: Rgb) -> Result<()>;

    /// Make everything drawn since the last present visible.
    fn present(&mut self) -> Result<()>;

    /// Pending input/window events. Never blocks.
    fn poll_events(&mut self) -> Result<Vec<DisplayEvent>>;

    /// Release the surface. Safe to call more than once.
    fn shutdown(&mut self) -> Result<()>;
}
